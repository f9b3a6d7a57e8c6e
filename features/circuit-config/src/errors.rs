use circuit_di::TypeInfo;

/// Errors of the [ConfigProvider](crate::provider::ConfigProvider)
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The required config is not registered
    #[error("The config type '{0}' is not registered")]
    ConfigMissing(TypeInfo),
    /// The config is already registered
    #[error("The config type '{0}' is already registered")]
    ConfigAlreadyRegistered(TypeInfo),
}
