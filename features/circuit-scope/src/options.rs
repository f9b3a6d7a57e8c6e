use std::time::Duration;

use circuit_config::{ConfigProvider, ConfigError};
use circuit_di::{DiBuilder, DiContainer, InitError};

/// Host behaviour for sessions
///
/// Registered in the [ConfigProvider], missing options fall back to the defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CircuitOptions {
    /// End sessions with async disposal, awaiting async cleanups of the session scope
    pub async_disposal: bool,
    /// Upper bound for building all singletons
    pub init_timeout: Option<Duration>,
}

impl CircuitOptions {
    /// Reads the options from a built container
    pub fn from_container(container: &DiContainer) -> Result<Self, ConfigError> {
        match container.require::<ConfigProvider>() {
            Ok(provider) => Ok(provider.get_config_or_default::<CircuitOptions>()?.as_ref().clone()),
            Err(_) => {
                tracing::debug!("No config provider registered, using default circuit options");
                Ok(Self::default())
            }
        }
    }

    /// Builds the container, honoring the configured init timeout
    pub async fn build(&self, builder: DiBuilder) -> Result<DiContainer, InitError> {
        match self.init_timeout {
            Some(timeout) => builder.build_timeout(timeout).await,
            None => builder.build().await,
        }
    }
}
