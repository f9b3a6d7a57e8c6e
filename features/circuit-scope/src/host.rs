use std::{
    collections::HashMap,
    future::Future,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use circuit_config::ConfigError;
use circuit_di::{DiContainer, Injectable, ScopeError};

use crate::{
    activator::ScopeActivator,
    errors::{ComponentError, DispatchError, ScopeCreationError},
    interceptor::{EventInterceptor, HandlerResult, StateRefresh},
    options::CircuitOptions,
    session::{Session, SessionId},
};

/// Entry points a host calls over the lifetime of its sessions
///
/// - [CircuitHost::on_session_established] when a connection is set up
/// - [CircuitHost::activate_component] whenever it constructs session bound components
/// - [CircuitHost::dispatch_event] for every inbound event
/// - [CircuitHost::end_session] when the connection ends
pub struct CircuitHost<R> {
    container: DiContainer,
    activator: ScopeActivator<R>,
    options: CircuitOptions,
    sessions: Mutex<HashMap<SessionId, Arc<Session<R>>>>,
}

impl<R: Injectable> CircuitHost<R> {
    pub fn new(container: DiContainer) -> Result<Self, ConfigError> {
        let options = CircuitOptions::from_container(&container)?;
        Ok(CircuitHost {
            activator: ScopeActivator::new(container.clone()),
            container,
            options,
            sessions: Mutex::new(HashMap::new()),
        })
    }

    pub fn container(&self) -> &DiContainer {
        &self.container
    }

    pub fn options(&self) -> &CircuitOptions {
        &self.options
    }

    /// Creates a session for a new connection
    ///
    /// Starts the session scope right away and captures `resource` in it.
    pub fn on_session_established(
        &self,
        resource: Arc<R>,
    ) -> Result<Arc<Session<R>>, ScopeCreationError> {
        let session = Arc::new(Session::new(resource));
        self.activator
            .activate(session.holder(), session.resource())?;

        tracing::debug!(session = %session.id(), "Session established");
        self.sessions().insert(session.id(), session.clone());
        Ok(session)
    }

    pub fn session(&self, id: SessionId) -> Option<Arc<Session<R>>> {
        self.sessions().get(&id).cloned()
    }

    pub fn session_count(&self) -> usize {
        self.sessions().len()
    }

    /// Interceptor for a component rendering through `refresh`
    pub fn interceptor(&self, refresh: Arc<dyn StateRefresh>) -> EventInterceptor<R> {
        EventInterceptor::new(self.activator.clone(), refresh)
    }

    /// Delivers one event to a session
    pub async fn dispatch_event<A, C, Fut>(
        &self,
        session: &Session<R>,
        refresh: Arc<dyn StateRefresh>,
        callback: C,
        arg: A,
    ) -> Result<(), DispatchError>
    where
        C: FnOnce(A) -> Fut,
        Fut: Future<Output = HandlerResult>,
    {
        self.interceptor(refresh)
            .dispatch(session, callback, arg)
            .await
    }

    /// Constructs `T` for a session - re-activates the session scope first
    pub fn activate_component<T: Injectable>(
        &self,
        session: &Session<R>,
    ) -> Result<Arc<T>, ComponentError> {
        let component = self
            .activator
            .run(session.holder(), session.resource(), |_| {
                self.container.resolve::<T>()
            })??;
        Ok(component)
    }

    /// Ends a session, releasing its scope the way the options ask for
    ///
    /// Unknown or already ended sessions are ignored.
    pub async fn end_session(&self, id: SessionId) -> Result<(), ScopeError> {
        if self.options.async_disposal {
            self.on_session_ended_async(id).await;
            Ok(())
        } else {
            self.on_session_ended(id)
        }
    }

    /// Ends a session, disposing its scope synchronously
    pub fn on_session_ended(&self, id: SessionId) -> Result<(), ScopeError> {
        match self.sessions().remove(&id) {
            Some(session) => session.end(),
            None => Ok(()),
        }
    }

    /// Ends a session, awaiting async cleanups of its scope
    pub async fn on_session_ended_async(&self, id: SessionId) {
        let session = self.sessions().remove(&id);
        if let Some(session) = session {
            session.end_async().await;
        }
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<SessionId, Arc<Session<R>>>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use circuit_config::ConfigProvider;
    use circuit_di::{DiBuilder, DynError, RequireError, Scope};

    use super::*;
    use crate::{
        bridge::{BridgeRegistration, SessionBridge},
        errors::HandlerError,
    };

    #[derive(Debug)]
    struct Connection(&'static str);

    /// Scoped service which records its disposal
    struct Tracker;

    /// Transient component, built per activation from the session scope
    struct Counter {
        connection: Arc<Connection>,
    }

    fn host(async_disposal: bool, disposed: Arc<AtomicUsize>) -> CircuitHost<Connection> {
        let mut provider = ConfigProvider::new();
        provider
            .add_config(CircuitOptions {
                async_disposal,
                init_timeout: None,
            })
            .unwrap();

        let builder = DiBuilder::new()
            .add_instance(provider)
            .add_session_bridge::<Connection>()
            .add_scoped_fn(vec![], move |scope: &Scope| {
                let disposed = disposed.clone();
                scope.register_for_disposal(move || {
                    disposed.fetch_add(1, Ordering::SeqCst);
                });
                Ok::<_, DynError>(Tracker)
            })
            .add_transient_fn(vec![], |scope: &Scope| {
                let connection = SessionBridge::<Connection>::from_scope(scope)?;
                Ok::<_, DynError>(Counter { connection })
            });

        CircuitHost::new(futures::executor::block_on(builder.build()).unwrap()).unwrap()
    }

    #[test]
    fn establishing_starts_the_scope_and_captures() {
        let host = host(false, Arc::default());
        let session = host
            .on_session_established(Arc::new(Connection("a")))
            .unwrap();

        let scope = session.scope().unwrap();
        assert_eq!(
            SessionBridge::<Connection>::from_scope(&scope).unwrap().0,
            "a"
        );
        assert_eq!(host.session_count(), 1);
        assert_eq!(host.session(session.id()).unwrap().id(), session.id());
    }

    #[test]
    fn components_resolve_from_their_session() {
        let host = host(false, Arc::default());
        let a = host.on_session_established(Arc::new(Connection("a"))).unwrap();
        let b = host.on_session_established(Arc::new(Connection("b"))).unwrap();

        assert_eq!(host.activate_component::<Counter>(&a).unwrap().connection.0, "a");
        assert_eq!(host.activate_component::<Counter>(&b).unwrap().connection.0, "b");
        assert_eq!(host.container().scopes_created(), 2);
    }

    #[test]
    fn unknown_component_is_a_resolve_error() {
        let host = host(false, Arc::default());
        let session = host.on_session_established(Arc::new(Connection("a"))).unwrap();

        let err = host.activate_component::<String>(&session).err().unwrap();
        assert!(matches!(err, ComponentError::Resolve(RequireError::TypeMissing(_))));
    }

    #[test]
    fn ending_a_session_disposes_its_scope_once() {
        let disposed = Arc::new(AtomicUsize::new(0));
        let host = host(false, disposed.clone());
        let session = host.on_session_established(Arc::new(Connection("a"))).unwrap();
        let scope = session.scope().unwrap();
        scope.require::<Tracker>().unwrap();

        host.on_session_ended(session.id()).unwrap();
        host.on_session_ended(session.id()).unwrap();
        session.end().unwrap();

        assert_eq!(disposed.load(Ordering::SeqCst), 1);
        assert!(scope.is_disposed());
        assert!(session.scope().is_none());
        assert_eq!(host.session_count(), 0);
    }

    #[test]
    fn end_session_follows_the_disposal_option() {
        let disposed = Arc::new(AtomicUsize::new(0));
        let host = host(true, disposed.clone());
        assert!(host.options().async_disposal);

        let session = host.on_session_established(Arc::new(Connection("a"))).unwrap();
        let scope = session.scope().unwrap();
        scope.require::<Tracker>().unwrap();
        scope.register_for_async_disposal({
            let disposed = disposed.clone();
            move || async move {
                disposed.fetch_add(10, Ordering::SeqCst);
            }
        });

        futures::executor::block_on(host.end_session(session.id())).unwrap();

        assert_eq!(disposed.load(Ordering::SeqCst), 11);
        assert!(scope.is_disposed());
    }

    async fn expect_connection(name: &'static str) -> HandlerResult {
        let connection = SessionBridge::<Connection>::current().map_err(HandlerError::failed)?;
        assert_eq!(connection.0, name);
        Ok(())
    }

    #[test]
    fn dispatch_goes_through_the_session_scope() {
        let host = host(false, Arc::default());
        let session = host.on_session_established(Arc::new(Connection("a"))).unwrap();
        let refreshes = Arc::new(AtomicUsize::new(0));
        let counter = refreshes.clone();

        futures::executor::block_on(host.dispatch_event(
            &session,
            Arc::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
            expect_connection,
            "a",
        ))
        .unwrap();

        assert_eq!(refreshes.load(Ordering::SeqCst), 1);
        assert_eq!(host.container().scopes_created(), 1);
    }

    #[test]
    fn ended_session_refuses_events_and_components() {
        let host = host(false, Arc::default());
        let session = host.on_session_established(Arc::new(Connection("a"))).unwrap();
        futures::executor::block_on(host.end_session(session.id())).unwrap();

        let invoked = Arc::new(AtomicUsize::new(0));
        let refreshes = Arc::new(AtomicUsize::new(0));
        let counter = refreshes.clone();
        let result = futures::executor::block_on(host.dispatch_event(
            &session,
            Arc::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
            |invoked: Arc<AtomicUsize>| async move {
                invoked.fetch_add(1, Ordering::SeqCst);
                Ok(())
            },
            invoked.clone(),
        ));

        assert!(matches!(
            result,
            Err(DispatchError::Activation(ScopeCreationError::SessionEnded))
        ));
        assert_eq!(invoked.load(Ordering::SeqCst), 0);
        assert_eq!(refreshes.load(Ordering::SeqCst), 0);

        let err = host.activate_component::<Counter>(&session).err().unwrap();
        assert!(matches!(
            err,
            ComponentError::Activation(ScopeCreationError::SessionEnded)
        ));

        assert_eq!(host.container().scopes_created(), 1);
        assert!(session.scope().is_none());
    }
}
