use std::{collections::HashMap, sync::Arc, time::Duration};

use crate::{
    container::{DiContainer, Registration},
    errors::InitError,
    factories::{DynFactory, DynScopedFactory, FnFactory, InstanceFactory, ScopedFactory},
    initiator::DiInitiator,
    scope::Scope,
    types::{DependencyInfo, DynError, Injectable, Instance, Lifestyle, TypeInfo},
};

/// Registry of everything the container can provide
///
/// 1. Singletons - existing instances or async [InstanceFactory]s, all built by [DiBuilder::build]
/// 2. Scoped types - built once per [Scope] on first resolve
/// 3. Transient types - built on every resolve
///
/// Building verifies the whole dependency graph before anything is constructed.
pub struct DiBuilder {
    /// Registered factories which can provide instances
    pub(crate) registered_factories: Vec<Box<dyn DynFactory>>,
    /// Registered already created instances
    pub(crate) registered_instances: HashMap<TypeInfo, Instance>,
    /// Registered scoped and transient factories
    pub(crate) registered_scoped: Vec<Registration>,
}
impl Default for DiBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DiBuilder {
    pub fn new() -> Self {
        DiBuilder {
            registered_factories: Vec::new(),
            registered_instances: HashMap::new(),
            registered_scoped: Vec::new(),
        }
    }
}
impl DiBuilder {
    pub fn add_instance<T: Injectable>(mut self, instance: T) -> Self {
        self.registered_instances
            .insert(TypeInfo::of::<T>(), Instance::new(instance));
        self
    }

    pub fn add_factory<Factory: InstanceFactory + 'static>(mut self, factory: Factory) -> Self {
        self.registered_factories.push(Box::new(factory));
        self
    }

    /// Registers a factory building one instance per scope
    pub fn add_scoped<Factory: ScopedFactory>(self, factory: Factory) -> Self {
        self.register(Lifestyle::Scoped, Arc::new(factory))
    }

    /// Registers a factory building a new instance on every resolve
    pub fn add_transient<Factory: ScopedFactory>(self, factory: Factory) -> Self {
        self.register(Lifestyle::Transient, Arc::new(factory))
    }

    /// Registers a closure building one instance per scope
    pub fn add_scoped_fn<T, F>(self, dependencies: Vec<DependencyInfo>, construct: F) -> Self
    where
        T: Injectable,
        F: Fn(&Scope) -> Result<T, DynError> + Send + Sync + 'static,
    {
        self.register(
            Lifestyle::Scoped,
            Arc::new(FnFactory::new(dependencies, construct)),
        )
    }

    /// Registers a closure building a new instance on every resolve
    pub fn add_transient_fn<T, F>(self, dependencies: Vec<DependencyInfo>, construct: F) -> Self
    where
        T: Injectable,
        F: Fn(&Scope) -> Result<T, DynError> + Send + Sync + 'static,
    {
        self.register(
            Lifestyle::Transient,
            Arc::new(FnFactory::new(dependencies, construct)),
        )
    }

    fn register(mut self, lifestyle: Lifestyle, factory: Arc<dyn DynScopedFactory>) -> Self {
        self.registered_scoped.push(Registration { lifestyle, factory });
        self
    }

    pub async fn build(self) -> Result<DiContainer, InitError> {
        DiInitiator::new().initiate(self, None).await
    }

    pub async fn build_timeout(self, timeout: Duration) -> Result<DiContainer, InitError> {
        DiInitiator::new().initiate(self, Some(timeout)).await
    }
}
