use std::{
    any::{Any, TypeId},
    collections::HashMap,
    sync::Arc,
};

use circuit_di::TypeInfo;

use crate::errors::ConfigError;

/// A provider to register all configs.
///
/// Configs can be registered and retrieved based on type.
/// The provider itself is registered as a singleton instance, factories then inject single
/// configs with [Config](crate::config::Config).
#[derive(Default)]
pub struct ConfigProvider {
    configs: HashMap<TypeId, (TypeInfo, Arc<dyn Any + Send + Sync + 'static>)>,
}

impl ConfigProvider {
    /// Initializes an empty Config Provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Retrieve a config with specified type.
    ///
    /// Returns `Ok(None)` if no config of this type is registered
    pub fn get_config<T: Send + Sync + 'static>(&self) -> Result<Option<Arc<T>>, ConfigError> {
        self.configs
            .get(&TypeId::of::<T>())
            .map(|(info, entry)| {
                entry
                    .clone()
                    .downcast()
                    .map_err(|_| ConfigError::ConfigMissing(*info))
            })
            .transpose()
    }

    /// Retrieve a config, falling back to its default if it is not registered
    pub fn get_config_or_default<T: Default + Send + Sync + 'static>(
        &self,
    ) -> Result<Arc<T>, ConfigError> {
        Ok(self.get_config()?.unwrap_or_default())
    }

    /// Add a config to the registry.
    ///
    /// If the config type is already registered, it will return a
    /// [`ConfigError`] runtime error
    pub fn add_config<T: Send + Sync + 'static>(
        &mut self,
        config: T,
    ) -> Result<&mut Self, ConfigError> {
        let info = TypeInfo::of::<T>();

        if self.configs.contains_key(&info.type_id) {
            return Err(ConfigError::ConfigAlreadyRegistered(info));
        }

        self.configs.insert(info.type_id, (info, Arc::new(config)));
        Ok(self)
    }

    /// Can optionally add a config to the registry.
    ///
    /// If the config provided is `Some(T)`, it will be the same as calling [`ConfigProvider::add_config`]
    /// If the config provided is `None`, then the function just returns `Ok(self)` for chaining
    pub fn maybe_add_config<T: Send + Sync + 'static>(
        &mut self,
        config: Option<T>,
    ) -> Result<&mut Self, ConfigError> {
        match config {
            Some(c) => self.add_config(c),
            None => Ok(self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, PartialEq)]
    struct ServerConfig {
        port: u16,
    }

    #[test]
    fn registered_config_is_returned() {
        let mut provider = ConfigProvider::new();
        provider.add_config(ServerConfig { port: 8080 }).unwrap();

        let config = provider.get_config::<ServerConfig>().unwrap().unwrap();
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn duplicate_config_is_rejected() {
        let mut provider = ConfigProvider::new();
        provider.add_config(ServerConfig { port: 1 }).unwrap();

        let err = provider.add_config(ServerConfig { port: 2 }).err().unwrap();
        assert_eq!(
            err,
            ConfigError::ConfigAlreadyRegistered(TypeInfo::of::<ServerConfig>())
        );
    }

    #[test]
    fn missing_config_falls_back_to_default() {
        let mut provider = ConfigProvider::new();
        provider.maybe_add_config::<ServerConfig>(None).unwrap();

        assert!(provider.get_config::<ServerConfig>().unwrap().is_none());
        assert_eq!(
            *provider.get_config_or_default::<ServerConfig>().unwrap(),
            ServerConfig::default()
        );
    }
}
