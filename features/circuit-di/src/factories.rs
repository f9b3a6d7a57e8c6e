use std::{convert::Infallible, future::Future, marker::PhantomData};

use crate::{
    initiator::DiHandle,
    scope::Scope,
    types::{DependencyInfo, DynError, Injectable, Instance, TypeInfo},
};

/// A Factory providing singleton instances of a given type
pub trait InstanceFactory: Send + Sync {
    type Provides: Injectable;

    /// Returns the typeinfo about the factory's provided type
    fn supplies() -> TypeInfo {
        TypeInfo::of::<Self::Provides>()
    }

    /// Returns a list of dependencies the factory requires to supply it's type
    fn get_dependencies() -> Vec<DependencyInfo>;

    /// Constructs a new instance of the factory's provided type
    ///
    /// Returns the constructed instance, or an error if either Dependencies are not satisfied or the Instantiation failed
    fn construct(
        &mut self,
        di: DiHandle,
    ) -> impl Future<Output = Result<Self::Provides, impl Into<DynError>>> + Send + '_;

    /// Returns a boolean indicating whether the factory is enabled or not
    fn is_enabled(
        &mut self,
        di: DiHandle,
    ) -> impl Future<Output = Result<bool, impl Into<DynError>>> + Send + '_ {
        let _ = di;
        async { Ok::<_, Infallible>(true) }
    }
}

/// Wrapper Trait for factories, providing instances of Any
pub trait DynFactory: Send {
    fn supplies(&self) -> TypeInfo;

    /// Returns a list of dependencies for the factory
    fn dependencies(&self) -> Vec<DependencyInfo>;

    /// Constructs a new instance of the factory's provided type, fulfilling all its dependencies
    fn construct(
        &mut self,
        di: DiHandle,
    ) -> Box<dyn Future<Output = Result<Instance, DynError>> + Send + '_>;

    /// Returns a boolean indicating whether the factory is enabled or not
    fn is_enabled(
        &mut self,
        di: DiHandle,
    ) -> Box<dyn Future<Output = Result<bool, DynError>> + Send + '_>;
}
// Impl DynFactory for any InstanceFactory
impl<T: Injectable, SpecificFactory: InstanceFactory<Provides = T>> DynFactory for SpecificFactory {
    fn supplies(&self) -> TypeInfo {
        SpecificFactory::supplies()
    }

    fn dependencies(&self) -> Vec<DependencyInfo> {
        SpecificFactory::get_dependencies()
    }

    fn construct(
        &mut self,
        di: DiHandle,
    ) -> Box<dyn Future<Output = Result<Instance, DynError>> + Send + '_> {
        let construction_fut = async {
            // Forward the call to the specific implementation
            SpecificFactory::construct(self, di)
                .await
                .map(Instance::new)
                .map_err(|e| e.into())
        };

        Box::new(construction_fut)
    }

    fn is_enabled(
        &mut self,
        di: DiHandle,
    ) -> Box<dyn Future<Output = Result<bool, DynError>> + Send + '_> {
        let future = async {
            // Forward the call to the specific implementation
            SpecificFactory::is_enabled(self, di)
                .await
                .map_err(|e| e.into())
        };

        Box::new(future)
    }
}

/// A Factory producing scoped or transient instances
///
/// Unlike [InstanceFactory] construction is synchronous: it runs on demand while
/// a [Scope] resolves, and may itself resolve further types from that scope.
pub trait ScopedFactory: Send + Sync + 'static {
    type Provides: Injectable;

    /// Returns the typeinfo about the factory's provided type
    fn supplies() -> TypeInfo {
        TypeInfo::of::<Self::Provides>()
    }

    /// Returns a list of dependencies the factory resolves from the scope
    fn get_dependencies() -> Vec<DependencyInfo>;

    /// Constructs a new instance inside the given scope
    fn construct(&self, scope: &Scope) -> Result<Self::Provides, impl Into<DynError>>;
}

/// Object safe version of [ScopedFactory]
pub trait DynScopedFactory: Send + Sync {
    fn supplies(&self) -> TypeInfo;

    fn dependencies(&self) -> Vec<DependencyInfo>;

    fn construct(&self, scope: &Scope) -> Result<Instance, DynError>;
}
impl<T: Injectable, SpecificFactory: ScopedFactory<Provides = T>> DynScopedFactory
    for SpecificFactory
{
    fn supplies(&self) -> TypeInfo {
        SpecificFactory::supplies()
    }

    fn dependencies(&self) -> Vec<DependencyInfo> {
        SpecificFactory::get_dependencies()
    }

    fn construct(&self, scope: &Scope) -> Result<Instance, DynError> {
        SpecificFactory::construct(self, scope)
            .map(Instance::new)
            .map_err(|e| e.into())
    }
}

/// Scoped factory made from a closure and an explicit dependency list
///
/// Used by [DiBuilder::add_scoped_fn](crate::builder::DiBuilder::add_scoped_fn)
/// and [DiBuilder::add_transient_fn](crate::builder::DiBuilder::add_transient_fn).
pub struct FnFactory<T, F> {
    dependencies: Vec<DependencyInfo>,
    construct: F,
    _provides: PhantomData<fn() -> T>,
}
impl<T, F> FnFactory<T, F>
where
    T: Injectable,
    F: Fn(&Scope) -> Result<T, DynError> + Send + Sync + 'static,
{
    pub fn new(dependencies: Vec<DependencyInfo>, construct: F) -> Self {
        FnFactory {
            dependencies,
            construct,
            _provides: PhantomData,
        }
    }
}
impl<T, F> DynScopedFactory for FnFactory<T, F>
where
    T: Injectable,
    F: Fn(&Scope) -> Result<T, DynError> + Send + Sync + 'static,
{
    fn supplies(&self) -> TypeInfo {
        TypeInfo::of::<T>()
    }

    fn dependencies(&self) -> Vec<DependencyInfo> {
        self.dependencies.clone()
    }

    fn construct(&self, scope: &Scope) -> Result<Instance, DynError> {
        (self.construct)(scope).map(Instance::new)
    }
}
