//! Session scoped dependency injection for long lived client connections
//!
//! Every session gets one [Scope](circuit_di::Scope) for its whole lifetime. It is started
//! when the session is established, made the ambient current scope for every event the
//! session receives and disposed when the session ends.
//!
//! - [CircuitHost] ties the lifecycle together
//! - [ScopeActivator] starts or re-activates the scope of a session
//! - [SessionBridge] carries the connection resource into the scope
//! - [EventInterceptor] wraps every event, refreshing the state around the handler
//!
//! The [SessionBridge] of the resource type must be registered on the container with
//! [BridgeRegistration::add_session_bridge].

pub mod activator;
pub mod bridge;
pub mod errors;
pub mod holder;
pub mod host;
pub mod interceptor;
pub mod options;
pub mod session;

pub use activator::ScopeActivator;
pub use bridge::{BridgeRegistration, SessionBridge};
pub use errors::{BridgeError, ComponentError, DispatchError, HandlerError, ScopeCreationError};
pub use holder::ScopeHolder;
pub use host::CircuitHost;
pub use interceptor::{EventInterceptor, HandlerResult, StateRefresh};
pub use options::CircuitOptions;
pub use session::{Session, SessionId};
