use std::{any::type_name, ops::Deref, sync::Arc};

use circuit_di::{DependencyInfo, DiContainer, DiHandle, InjectError, RequireError, Resolver};

use crate::provider::ConfigProvider;

/// A wrapper type to allow for config injections
///
/// This provides a simple way to retrieve configs from the config registry,
/// and inject them on a factory as a dependency
///
/// # Example
/// ```rust
/// use circuit_config::{config::Config, provider::ConfigProvider};
/// use circuit_di::{DependencyInfo, DiBuilder, DiHandle, DynError, InstanceFactory, Resolver};
///
/// struct PoolConfig {
///     size: usize,
/// }
///
/// struct Pool {
///     size: usize,
/// }
///
/// struct PoolFactory;
/// impl InstanceFactory for PoolFactory {
///     type Provides = Pool;
///
///     fn get_dependencies() -> Vec<DependencyInfo> {
///         vec![Config::<PoolConfig>::dependency_info()]
///     }
///
///     #[allow(refining_impl_trait)]
///     async fn construct(&mut self, mut di: DiHandle) -> Result<Pool, DynError> {
///         let config = di.resolve::<Config<PoolConfig>>().await?;
///         Ok(Pool { size: config.size })
///     }
/// }
///
/// let mut provider = ConfigProvider::new();
/// provider.add_config(PoolConfig { size: 4 }).unwrap();
///
/// let container = futures::executor::block_on(
///     DiBuilder::new()
///         .add_instance(provider)
///         .add_factory(PoolFactory)
///         .build(),
/// )
/// .unwrap();
/// assert_eq!(container.require::<Pool>().unwrap().size, 4);
/// ```
pub struct Config<T> {
    inner: Arc<T>,
}
impl<T> Deref for Config<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}
impl<T> Config<T> {
    pub fn inner(&self) -> Arc<T> {
        self.inner.clone()
    }

    pub fn into_inner(self) -> Arc<T> {
        self.inner
    }
}
impl<T: Send + Sync + 'static> Config<T> {
    /// Looks the config up in a built container
    ///
    /// For scoped factories, which have no [DiHandle]
    pub fn from_container(container: &DiContainer) -> Result<Self, InjectError> {
        let provider = container.require::<ConfigProvider>()?;
        Self::from_provider(&provider)
    }

    fn from_provider(provider: &ConfigProvider) -> Result<Self, InjectError> {
        let inner = provider
            .get_config()
            .map_err(|e| InjectError::Other(Box::new(e)))?
            .ok_or_else(|| InjectError::RequireError(RequireError::TypeMissing(type_name::<T>())))?;

        Ok(Config { inner })
    }
}

impl<T: Send + Sync + 'static> Resolver for Config<T> {
    async fn resolve(handle: &mut DiHandle) -> Result<Self, InjectError>
    where
        Self: Sized,
    {
        let config_provider = handle.resolve::<Arc<ConfigProvider>>().await?;
        Self::from_provider(&config_provider)
    }

    fn dependency_info() -> DependencyInfo {
        // The config itself is not a registered type, the provider is
        DependencyInfo::of::<ConfigProvider>()
    }
}
