//! Circuit Config provides a registry of typed configs that can be injected in the rest of the
//! application.
//!
//! It is split into two major parts:
//! 1. [ConfigProvider](provider::ConfigProvider): used to create the registry of all configs,
//!    registered in the container as a singleton instance
//! 2. [Config<T>](config::Config): a wrapper type to resolve and retrieve single configs
//!
//! # Examples
//!
//! ```rust
//! use circuit_config::provider::ConfigProvider;
//!
//! #[derive(Clone)]
//! struct AppConfig {
//!     host: String,
//!     port: u16,
//! }
//!
//! let mut config_provider = ConfigProvider::new();
//! config_provider
//!     .add_config(AppConfig {
//!         host: "localhost".to_string(),
//!         port: 8080,
//!     })
//!     .unwrap();
//!
//! let retrieved = config_provider.get_config::<AppConfig>().unwrap().unwrap();
//! assert_eq!(retrieved.host, "localhost");
//! assert_eq!(retrieved.port, 8080);
//! ```

pub mod config;
pub mod errors;
pub mod provider;

pub use config::Config;
pub use errors::ConfigError;
pub use provider::ConfigProvider;
