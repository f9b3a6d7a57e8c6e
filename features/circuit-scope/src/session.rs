use std::{fmt::Debug, sync::Arc};

use circuit_di::{Scope, ScopeError};
use uuid::Uuid;

use crate::holder::ScopeHolder;

/// Identity of a [Session]
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct SessionId(Uuid);
impl SessionId {
    pub fn new() -> Self {
        SessionId(Uuid::new_v4())
    }
}
impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}
impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

/// One long lived connection between a client and the host
///
/// Owns the [ScopeHolder] of its scope and the resource the host provided on connect.
pub struct Session<R> {
    id: SessionId,
    holder: ScopeHolder,
    resource: Arc<R>,
}
impl<R> Debug for Session<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("scope", &self.holder.get().map(|s| s.id()))
            .finish()
    }
}

impl<R> Session<R> {
    pub fn new(resource: Arc<R>) -> Self {
        Session {
            id: SessionId::new(),
            holder: ScopeHolder::new(),
            resource,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn holder(&self) -> &ScopeHolder {
        &self.holder
    }

    pub fn resource(&self) -> &Arc<R> {
        &self.resource
    }

    /// The scope bound to this session, None before the first activation and after the end
    pub fn scope(&self) -> Option<Scope> {
        self.holder.get()
    }

    /// Releases the session scope synchronously
    ///
    /// Only the first call disposes, later calls find the holder empty.
    pub fn end(&self) -> Result<(), ScopeError> {
        match self.holder.take() {
            Some(scope) => {
                tracing::debug!(session = %self.id, scope = %scope.id(), "Session ended");
                scope.dispose()
            }
            None => Ok(()),
        }
    }

    /// Releases the session scope, awaiting async cleanups
    pub async fn end_async(&self) {
        if let Some(scope) = self.holder.take() {
            tracing::debug!(session = %self.id, scope = %scope.id(), "Session ended");
            scope.dispose_async().await;
        }
    }
}
