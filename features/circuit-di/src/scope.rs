use std::{
    any::{type_name, TypeId},
    cell::RefCell,
    collections::HashMap,
    fmt::Debug,
    future::Future,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, PoisonError, Weak,
    },
};

use futures::future::BoxFuture;

use crate::{
    ambient::{self, InScope},
    container::{DiContainer, Registration},
    errors::{RequireError, ScopeError},
    types::{DynError, Injectable, Instance, Lifestyle, TypeInfo},
};

static NEXT_SCOPE_ID: AtomicU64 = AtomicU64::new(1);

/// Unique id of a [Scope] within the process
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct ScopeId(u64);
impl ScopeId {
    fn next() -> Self {
        ScopeId(NEXT_SCOPE_ID.fetch_add(1, Ordering::Relaxed))
    }
}
impl std::fmt::Display for ScopeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "scope-{}", self.0)
    }
}

/// A bounded lifetime for scoped instances
///
/// All scoped instances resolved through a scope are cached in it and released together
/// once the scope is disposed. Cloning a scope is cheap - all clones refer to the same lifetime.
///
/// Started with [DiContainer::begin_scope].
#[derive(Clone)]
pub struct Scope(Arc<ScopeInner>);
struct ScopeInner {
    id: ScopeId,
    container: DiContainer,
    state: Mutex<ScopeState>,
}

#[derive(Default)]
struct ScopeState {
    disposed: bool,
    instances: HashMap<TypeId, Instance>,
    /// Order in which scoped instances were created - released in reverse
    created: Vec<TypeId>,
    cleanups: Vec<Cleanup>,
    /// Scoped types under construction
    pending: HashMap<TypeId, Arc<Mutex<Option<Instance>>>>,
}

enum Cleanup {
    Sync(Box<dyn FnOnce() + Send>),
    Async(Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>),
}

impl Debug for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("Scope")
            .field("id", &self.0.id)
            .field("instances", &state.instances.len())
            .field("disposed", &state.disposed)
            .finish()
    }
}

impl Scope {
    pub(crate) fn new(container: DiContainer) -> Self {
        Scope(Arc::new(ScopeInner {
            id: ScopeId::next(),
            container,
            state: Mutex::new(ScopeState::default()),
        }))
    }

    pub fn id(&self) -> ScopeId {
        self.0.id
    }

    /// The container this scope was started from
    pub fn container(&self) -> &DiContainer {
        &self.0.container
    }

    pub fn is_disposed(&self) -> bool {
        self.state().disposed
    }

    /// Resolves `T` within this scope
    ///
    /// Singletons come from the container, scoped types are built once per scope,
    /// transient types are built on every call.
    pub fn require<T: Injectable>(&self) -> Result<Arc<T>, RequireError> {
        let instance = self.require_instance(TypeInfo::of::<T>())?;
        instance
            .downcast()
            .map_err(|actual_type| RequireError::DowncastFailed {
                required_type: type_name::<T>(),
                actual_type,
            })
    }

    /// Resolves `T`, returning `None` if it is not registered or disabled
    pub fn try_require<T: Injectable>(&self) -> Result<Option<Arc<T>>, RequireError> {
        match self.require::<T>() {
            Ok(instance) => Ok(Some(instance)),
            Err(RequireError::TypeMissing(_)) | Err(RequireError::TypeDisabled(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn require_instance(&self, info: TypeInfo) -> Result<Instance, RequireError> {
        if let Some(singleton) = self.0.container.singleton(&info) {
            return singleton;
        }

        let Some(registration) = self.0.container.registration(info.type_id) else {
            return Err(RequireError::TypeMissing(info.type_name));
        };

        let _building = Building::enter(self.0.id, info)?;
        match registration.lifestyle {
            Lifestyle::Scoped => self.scoped_instance(info, registration),
            _ => self.construct(info, registration),
        }
    }

    fn scoped_instance(
        &self,
        info: TypeInfo,
        registration: &Registration,
    ) -> Result<Instance, RequireError> {
        let pending = {
            let mut state = self.state();
            self.ensure_alive(&state, info)?;
            if let Some(instance) = state.instances.get(&info.type_id) {
                return Ok(instance.clone());
            }
            state.pending.entry(info.type_id).or_default().clone()
        };

        // One construction per type, concurrent first resolutions wait for it.
        // The scope lock is never held here, the factory may resolve other scoped types.
        let mut pending = pending.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(instance) = pending.as_ref() {
            return Ok(instance.clone());
        }

        let instance = self.construct(info, registration)?;

        let mut state = self.state();
        self.ensure_alive(&state, info)?;
        state.pending.remove(&info.type_id);
        state.instances.insert(info.type_id, instance.clone());
        state.created.push(info.type_id);
        *pending = Some(instance.clone());

        tracing::trace!(scope = %self.0.id, "Resolved scoped instance of {}", info.type_name);
        Ok(instance)
    }

    fn construct(&self, info: TypeInfo, registration: &Registration) -> Result<Instance, RequireError> {
        self.ensure_alive(&self.state(), info)?;
        registration
            .factory
            .construct(self)
            .map_err(|error| match error.downcast::<RequireError>() {
                // Report the loop itself, not every factory on it
                Ok(error) if matches!(*error, RequireError::CircularDependency { .. }) => *error,
                Ok(error) => RequireError::FactoryFailed {
                    product: info.type_name,
                    error: Arc::new(error as DynError),
                },
                Err(error) => RequireError::FactoryFailed {
                    product: info.type_name,
                    error: Arc::new(error),
                },
            })
    }

    fn ensure_alive(&self, state: &ScopeState, info: TypeInfo) -> Result<(), RequireError> {
        if state.disposed {
            return Err(RequireError::ScopeDisposed {
                scope: self.0.id,
                type_name: info.type_name,
            });
        }
        Ok(())
    }

    /// Runs `f` with this scope as the ambient current scope
    pub fn enter<R>(&self, f: impl FnOnce() -> R) -> R {
        ambient::enter(self, f)
    }

    /// Wraps a future so that every poll of it runs with this scope as the ambient current scope
    pub fn scoped<F: Future>(&self, future: F) -> InScope<F> {
        InScope::new(self.clone(), future)
    }

    /// Non owning reference, for scoped instances which need to reach back into their scope
    pub fn downgrade(&self) -> WeakScope {
        WeakScope {
            id: self.0.id,
            inner: Arc::downgrade(&self.0),
        }
    }

    /// Registers a cleanup to run when the scope is disposed
    ///
    /// If the scope is already disposed the cleanup runs immediately.
    pub fn register_for_disposal(&self, cleanup: impl FnOnce() + Send + 'static) {
        let mut state = self.state();
        if state.disposed {
            drop(state);
            cleanup();
            return;
        }
        state.cleanups.push(Cleanup::Sync(Box::new(cleanup)));
    }

    /// Registers an async cleanup - the scope must then be disposed with [Scope::dispose_async]
    pub fn register_for_async_disposal<Fut>(&self, cleanup: impl FnOnce() -> Fut + Send + 'static)
    where
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut state = self.state();
        if state.disposed {
            tracing::warn!(scope = %self.0.id, "Async cleanup registered on a disposed scope - dropped");
            return;
        }
        state.cleanups.push(Cleanup::Async(Box::new(move || {
            Box::pin(cleanup()) as BoxFuture<'static, ()>
        })));
    }

    /// Disposes the scope synchronously
    ///
    /// Cleanups run in reverse registration order, then cached instances are released in
    /// reverse creation order. Calling this on a disposed scope does nothing.
    ///
    /// Returns [ScopeError::AsyncDisposalRequired] if async cleanups were registered - these are
    /// skipped, everything else is still released.
    pub fn dispose(&self) -> Result<(), ScopeError> {
        let Some((cleanups, instances)) = self.release() else {
            return Ok(());
        };

        let mut skipped = 0;
        for cleanup in cleanups.into_iter().rev() {
            match cleanup {
                Cleanup::Sync(cleanup) => cleanup(),
                Cleanup::Async(_) => skipped += 1,
            }
        }
        drop(instances);

        tracing::debug!(scope = %self.0.id, "Scope disposed");
        if skipped > 0 {
            return Err(ScopeError::AsyncDisposalRequired(self.0.id, skipped));
        }
        Ok(())
    }

    /// Disposes the scope, awaiting async cleanups
    pub async fn dispose_async(&self) {
        let Some((cleanups, instances)) = self.release() else {
            return;
        };

        for cleanup in cleanups.into_iter().rev() {
            match cleanup {
                Cleanup::Sync(cleanup) => cleanup(),
                Cleanup::Async(cleanup) => cleanup().await,
            }
        }
        drop(instances);

        tracing::debug!(scope = %self.0.id, "Scope disposed asynchronously");
    }

    /// Marks the scope disposed and takes everything it owns
    ///
    /// Returns None if it was already disposed
    fn release(&self) -> Option<(Vec<Cleanup>, Vec<Instance>)> {
        let mut state = self.state();
        if state.disposed {
            return None;
        }
        state.disposed = true;

        state.pending.clear();
        let cleanups = std::mem::take(&mut state.cleanups);
        let mut instances = std::mem::take(&mut state.instances);
        let instances = std::mem::take(&mut state.created)
            .into_iter()
            .rev()
            .filter_map(|type_id| instances.remove(&type_id))
            .collect();

        Some((cleanups, instances))
    }

    fn state(&self) -> MutexGuard<'_, ScopeState> {
        self.0.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

thread_local! {
    /// Types currently built by factories on this thread, per scope
    static BUILDING: RefCell<Vec<(ScopeId, TypeInfo)>> = const { RefCell::new(Vec::new()) };
}

/// Marks a type as under construction until dropped
///
/// Factories run synchronously on the resolving thread, so meeting the same type again
/// while it is built means the factories resolve each other in a loop.
struct Building;
impl Building {
    fn enter(scope: ScopeId, info: TypeInfo) -> Result<Self, RequireError> {
        BUILDING.with(|building| {
            let mut building = building.borrow_mut();
            if let Some(start) = building.iter().position(|entry| *entry == (scope, info)) {
                let chain = building[start..]
                    .iter()
                    .map(|(_, info)| info.type_name)
                    .chain([info.type_name])
                    .collect();
                return Err(RequireError::CircularDependency { chain });
            }
            building.push((scope, info));
            Ok(Building)
        })
    }
}
impl Drop for Building {
    fn drop(&mut self) {
        BUILDING.with(|building| building.borrow_mut().pop());
    }
}

impl PartialEq for Scope {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}
impl Eq for Scope {}

/// Weak reference to a [Scope]
#[derive(Clone)]
pub struct WeakScope {
    id: ScopeId,
    inner: Weak<ScopeInner>,
}
impl Debug for WeakScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("WeakScope").field(&self.id).finish()
    }
}
impl WeakScope {
    pub fn id(&self) -> ScopeId {
        self.id
    }

    /// Returns the scope if it is still alive and not disposed
    pub fn upgrade(&self) -> Option<Scope> {
        self.inner
            .upgrade()
            .map(Scope)
            .filter(|scope| !scope.is_disposed())
    }
}
