use circuit_di::{DynError, RequireError, ScopeId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MediatorError {
    #[error("No handler registered for '{0}'")]
    NoHandler(&'static str),
    #[error("Could not resolve the handler: {0}")]
    Resolve(#[from] RequireError),
    #[error("The scope of the mediator ({0}) has already been disposed")]
    ScopeDisposed(ScopeId),
    #[error("Handler for '{request}' failed: {error}")]
    Handler {
        request: &'static str,
        error: DynError,
    },
}
