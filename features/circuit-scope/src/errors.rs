use circuit_di::{DynError, RequireError, ScopeError};
use thiserror::Error;

/// Starting the scope of a session failed
///
/// A startup class error - a misconfigured or disposed container, or an ended session -
/// and never retried.
#[derive(Error, Debug, Clone)]
pub enum ScopeCreationError {
    /// The container refused to start a scope
    #[error("Could not start the session scope: {0}")]
    Container(#[from] ScopeError),
    /// The session bridge is not resolvable in the new scope
    #[error("Could not resolve the session bridge, is it registered? {0}")]
    Bridge(#[from] RequireError),
    /// The session resource could not be captured
    #[error("Could not capture the session resource: {0}")]
    Capture(#[from] BridgeError),
    /// The session was already torn down, its scope is gone for good
    #[error("The session has ended")]
    SessionEnded,
}

/// Errors of the [SessionBridge](crate::bridge::SessionBridge)
#[derive(Error, Debug, Clone)]
pub enum BridgeError {
    /// The resource was requested before it was captured
    #[error("No '{0}' has been captured for this session yet")]
    NotBound(&'static str),
    /// The host tried to capture a second resource for the same session
    #[error("A '{0}' was already captured for this session")]
    AlreadyCaptured(&'static str),
    /// Retrieval through the ambient scope outside of any scope
    #[error("No scope is active, cannot retrieve '{0}'")]
    NoActiveScope(&'static str),
    #[error(transparent)]
    Require(#[from] RequireError),
}

/// Outcome of a failed or canceled event handler
#[derive(Error, Debug)]
pub enum HandlerError {
    /// The handler was canceled - a terminal outcome, never reported as failure
    #[error("The handler was canceled")]
    Canceled,
    /// The handler failed
    #[error("The handler failed: {0}")]
    Failed(DynError),
}
impl HandlerError {
    pub fn failed(error: impl Into<DynError>) -> Self {
        HandlerError::Failed(error.into())
    }
}
impl From<DynError> for HandlerError {
    fn from(error: DynError) -> Self {
        HandlerError::Failed(error)
    }
}
impl From<futures::future::Aborted> for HandlerError {
    fn from(_: futures::future::Aborted) -> Self {
        HandlerError::Canceled
    }
}

/// Errors surfaced from dispatching an event to a session
#[derive(Error, Debug)]
pub enum DispatchError {
    /// The session scope could not be activated, the handler never ran
    #[error(transparent)]
    Activation(#[from] ScopeCreationError),
    /// The handler failed - reported once it settled
    #[error("Event handler failed: {0}")]
    Handler(DynError),
}

/// Errors activating a component for a session
#[derive(Error, Debug, Clone)]
pub enum ComponentError {
    #[error(transparent)]
    Activation(#[from] ScopeCreationError),
    #[error(transparent)]
    Resolve(#[from] RequireError),
}
