use std::{
    future::{poll_fn, Future},
    pin::pin,
    sync::Arc,
    task::Poll,
};

use circuit_di::Injectable;

use crate::{
    activator::ScopeActivator,
    errors::{DispatchError, HandlerError},
    session::Session,
};

/// Result of an event handler
pub type HandlerResult = Result<(), HandlerError>;

/// Signals that the state of a component changed and it should render again
pub trait StateRefresh: Send + Sync {
    fn state_has_changed(&self);
}
impl<F: Fn() + Send + Sync> StateRefresh for F {
    fn state_has_changed(&self) {
        self()
    }
}

/// Wraps every event delivered to session bound logic
///
/// For each event, in order:
/// 1. the session scope is activated - before any handler code runs
/// 2. the handler is invoked and driven until it suspends or completes, inside the scope
/// 3. the state is refreshed once
/// 4. a still pending handler is awaited inside the scope - success refreshes again,
///    cancellation is swallowed, failure is returned once the handler settled
pub struct EventInterceptor<R> {
    activator: ScopeActivator<R>,
    refresh: Arc<dyn StateRefresh>,
}

impl<R: Injectable> EventInterceptor<R> {
    pub fn new(activator: ScopeActivator<R>, refresh: Arc<dyn StateRefresh>) -> Self {
        EventInterceptor { activator, refresh }
    }

    /// Dispatches one event to `callback`
    pub async fn dispatch<A, C, Fut>(
        &self,
        session: &Session<R>,
        callback: C,
        arg: A,
    ) -> Result<(), DispatchError>
    where
        C: FnOnce(A) -> Fut,
        Fut: Future<Output = HandlerResult>,
    {
        let scope = self
            .activator
            .activate(session.holder(), session.resource())?;

        let mut handler = pin!(scope.scoped(scope.enter(|| callback(arg))));
        let first_poll = poll_fn(|cx| Poll::Ready(handler.as_mut().poll(cx))).await;

        self.refresh.state_has_changed();

        let outcome = match first_poll {
            Poll::Ready(outcome) => outcome,
            Poll::Pending => {
                tracing::trace!(session = %session.id(), "Event handler suspended");
                let outcome = handler.await;
                if outcome.is_ok() {
                    self.refresh.state_has_changed();
                }
                outcome
            }
        };

        match outcome {
            Ok(()) => Ok(()),
            Err(HandlerError::Canceled) => {
                tracing::debug!(session = %session.id(), "Event handler canceled");
                Ok(())
            }
            Err(HandlerError::Failed(error)) => {
                tracing::error!(session = %session.id(), "Event handler failed: {error}");
                Err(DispatchError::Handler(error))
            }
        }
    }
}
