use std::{
    any::{type_name, TypeId},
    collections::HashMap,
    fmt::Debug,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
};

use crate::{
    ambient::current_scope,
    dependency_graph::DependencyGraph,
    errors::{RequireError, ScopeError},
    factories::DynScopedFactory,
    scope::Scope,
    types::{Injectable, Instance, Lifestyle, TypeInfo},
};

/// A scoped or transient registration
#[derive(Clone)]
pub(crate) struct Registration {
    pub lifestyle: Lifestyle,
    pub factory: Arc<dyn DynScopedFactory>,
}

/// Container holding all initiated singletons and the scoped / transient registrations
///
/// The container is immutable after build and can be shared between sessions without locking.
#[derive(Clone)]
pub struct DiContainer(pub Arc<DiContainerInner>);
pub struct DiContainerInner {
    instances: HashMap<TypeId, (TypeInfo, Option<Instance>)>,
    registrations: HashMap<TypeId, Registration>,
    graph: DependencyGraph,
    scopes_created: AtomicUsize,
    disposed: AtomicBool,
}
impl Debug for DiContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_struct("DiContainer");
        for (info, instance) in self.0.instances.values() {
            let val = if instance.is_some() {
                "enabled"
            } else {
                "disabled"
            };
            map.field(info.type_name, &val);
        }
        for registration in self.0.registrations.values() {
            let lifestyle = match registration.lifestyle {
                Lifestyle::Singleton => "singleton",
                Lifestyle::Scoped => "scoped",
                Lifestyle::Transient => "transient",
            };
            map.field(registration.factory.supplies().type_name, &lifestyle);
        }
        map.finish()
    }
}

impl DiContainer {
    pub(crate) fn new(
        instances: HashMap<TypeId, (TypeInfo, Option<Instance>)>,
        registrations: HashMap<TypeId, Registration>,
        graph: DependencyGraph,
    ) -> Self {
        Self(Arc::new(DiContainerInner {
            instances,
            registrations,
            graph,
            scopes_created: AtomicUsize::new(0),
            disposed: AtomicBool::new(false),
        }))
    }

    /// Attempts to get the requested singleton
    ///
    /// Scoped and transient types need a scope, see [DiContainer::resolve] and [Scope::require].
    pub fn require<T: Injectable>(&self) -> Result<Arc<T>, RequireError> {
        let info = TypeInfo::of::<T>();
        match self.singleton(&info) {
            Some(instance) => {
                instance?
                    .downcast()
                    .map_err(|actual_type| RequireError::DowncastFailed {
                        required_type: type_name::<T>(),
                        actual_type,
                    })
            }
            None if self.0.registrations.contains_key(&info.type_id) => {
                Err(RequireError::NoActiveScope(info.type_name))
            }
            None => Err(RequireError::TypeMissing(info.type_name)),
        }
    }

    /// Resolves `T` through the ambient current scope
    ///
    /// Falls back to the singletons if no scope is active for the calling context.
    pub fn resolve<T: Injectable>(&self) -> Result<Arc<T>, RequireError> {
        match current_scope() {
            Some(scope) if Arc::ptr_eq(&scope.container().0, &self.0) => scope.require(),
            Some(_) => {
                tracing::warn!(
                    "Ambient scope belongs to a different container - resolving '{}' without it",
                    type_name::<T>()
                );
                self.require()
            }
            None => self.require(),
        }
    }

    /// Starts a new scope
    pub fn begin_scope(&self) -> Result<Scope, ScopeError> {
        if self.0.disposed.load(Ordering::Acquire) {
            return Err(ScopeError::ContainerDisposed);
        }

        let scope = Scope::new(self.clone());
        self.0.scopes_created.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(scope = %scope.id(), "Scope started");
        Ok(scope)
    }

    /// Number of scopes started from this container
    pub fn scopes_created(&self) -> usize {
        self.0.scopes_created.load(Ordering::Relaxed)
    }

    /// Stops the container from handing out new scopes
    ///
    /// Existing scopes stay usable until they are disposed themselves.
    pub fn dispose(&self) {
        if !self.0.disposed.swap(true, Ordering::AcqRel) {
            tracing::debug!("Container disposed");
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.0.disposed.load(Ordering::Acquire)
    }

    /// The lifestyle `T` is registered with, if it is registered
    pub fn lifestyle_of<T: 'static + ?Sized>(&self) -> Option<Lifestyle> {
        let type_id = TypeId::of::<T>();
        if self.0.instances.contains_key(&type_id) {
            return Some(Lifestyle::Singleton);
        }
        self.0
            .registrations
            .get(&type_id)
            .map(|registration| registration.lifestyle)
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.0.graph
    }

    /// Singleton lookup - None if the type is not a singleton
    pub(crate) fn singleton(&self, info: &TypeInfo) -> Option<Result<Instance, RequireError>> {
        self.0
            .instances
            .get(&info.type_id)
            .map(|(_, instance)| match instance {
                Some(instance) => Ok(instance.clone()),
                None => Err(RequireError::TypeDisabled(info.type_name)),
            })
    }

    pub(crate) fn registration(&self, type_id: TypeId) -> Option<&Registration> {
        self.0.registrations.get(&type_id)
    }
}
