use std::{
    any::type_name,
    convert::Infallible,
    fmt::Debug,
    marker::PhantomData,
    sync::{Arc, OnceLock},
};

use circuit_di::{current_scope, DependencyInfo, DiBuilder, Injectable, Scope, ScopedFactory};

use crate::errors::BridgeError;

/// Carries the one-shot resource of a session into its scope
///
/// The host only hands out the per connection resource while the session is established.
/// Later events reach the container on unrelated call paths, so the resource is captured in
/// this scoped slot and retrieved from there.
///
/// Register it with [BridgeRegistration::add_session_bridge].
pub struct SessionBridge<R> {
    resource: OnceLock<Arc<R>>,
}
impl<R> Debug for SessionBridge<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionBridge")
            .field("resource", &type_name::<R>())
            .field("captured", &self.resource.get().is_some())
            .finish()
    }
}
impl<R> Default for SessionBridge<R> {
    fn default() -> Self {
        SessionBridge {
            resource: OnceLock::new(),
        }
    }
}

impl<R: Injectable> SessionBridge<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Captures the resource - only once per session
    pub fn capture(&self, resource: Arc<R>) -> Result<(), BridgeError> {
        self.resource.set(resource).map_err(|_| {
            tracing::warn!("Host tried to capture a second '{}' for a session", type_name::<R>());
            BridgeError::AlreadyCaptured(type_name::<R>())
        })
    }

    /// Returns the captured resource
    pub fn retrieve(&self) -> Result<Arc<R>, BridgeError> {
        self.resource
            .get()
            .cloned()
            .ok_or(BridgeError::NotBound(type_name::<R>()))
    }

    /// Retrieves the resource captured in the given scope
    pub fn from_scope(scope: &Scope) -> Result<Arc<R>, BridgeError> {
        scope.require::<SessionBridge<R>>()?.retrieve()
    }

    /// Retrieves the resource captured in the ambient current scope
    pub fn current() -> Result<Arc<R>, BridgeError> {
        let scope = current_scope().ok_or(BridgeError::NoActiveScope(type_name::<R>()))?;
        Self::from_scope(&scope)
    }
}

/// Builds an empty bridge in every new scope
struct BridgeFactory<R>(PhantomData<fn() -> R>);
impl<R: Injectable> ScopedFactory for BridgeFactory<R> {
    type Provides = SessionBridge<R>;

    fn get_dependencies() -> Vec<DependencyInfo> {
        vec![]
    }

    #[allow(refining_impl_trait)]
    fn construct(&self, _: &Scope) -> Result<Self::Provides, Infallible> {
        Ok(SessionBridge::new())
    }
}

/// Registers [SessionBridge]s on a [DiBuilder]
pub trait BridgeRegistration {
    /// Registers a scoped [SessionBridge] for resources of type `R`
    fn add_session_bridge<R: Injectable>(self) -> Self;
}
impl BridgeRegistration for DiBuilder {
    fn add_session_bridge<R: Injectable>(self) -> Self {
        self.add_scoped(BridgeFactory::<R>(PhantomData))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Connection(&'static str);

    fn scope() -> Scope {
        let container = futures::executor::block_on(
            DiBuilder::new().add_session_bridge::<Connection>().build(),
        )
        .unwrap();
        container.begin_scope().unwrap()
    }

    #[test]
    fn retrieve_before_capture_is_not_bound() {
        let bridge = SessionBridge::<Connection>::new();
        assert!(matches!(bridge.retrieve(), Err(BridgeError::NotBound(_))));
    }

    #[test]
    fn retrieve_returns_captured_resource_every_time() {
        let bridge = SessionBridge::new();
        let connection = Arc::new(Connection("a"));
        bridge.capture(connection.clone()).unwrap();

        for _ in 0..3 {
            assert!(Arc::ptr_eq(&bridge.retrieve().unwrap(), &connection));
        }
    }

    #[test]
    fn second_capture_is_rejected() {
        let bridge = SessionBridge::new();
        bridge.capture(Arc::new(Connection("a"))).unwrap();

        let err = bridge.capture(Arc::new(Connection("b"))).unwrap_err();
        assert!(matches!(err, BridgeError::AlreadyCaptured(_)));
        assert_eq!(*bridge.retrieve().unwrap(), Connection("a"));
    }

    #[test]
    fn current_uses_the_ambient_scope() {
        let scope = scope();
        scope
            .require::<SessionBridge<Connection>>()
            .unwrap()
            .capture(Arc::new(Connection("ambient")))
            .unwrap();

        assert!(matches!(
            SessionBridge::<Connection>::current(),
            Err(BridgeError::NoActiveScope(_))
        ));
        let inside = scope.enter(SessionBridge::<Connection>::current).unwrap();
        assert_eq!(*inside, Connection("ambient"));
    }

    #[test]
    fn every_scope_gets_its_own_bridge() {
        let first = scope();
        let second = first.container().begin_scope().unwrap();
        assert!(SessionBridge::<Connection>::from_scope(&first).is_err());

        first
            .require::<SessionBridge<Connection>>()
            .unwrap()
            .capture(Arc::new(Connection("first")))
            .unwrap();

        assert!(SessionBridge::<Connection>::from_scope(&first).is_ok());
        assert!(matches!(
            SessionBridge::<Connection>::from_scope(&second),
            Err(BridgeError::NotBound(_))
        ));
    }
}
