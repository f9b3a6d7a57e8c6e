//! In process mediator dispatching requests and notifications to scoped handlers
//!
//! Handlers are registered on the [DiBuilder](circuit_di::DiBuilder) like any other scoped
//! service and routed with the [MediatorBuilder]. A [Mediator] resolved from a scope always
//! dispatches within that scope.

pub mod errors;
pub mod mediator;
pub mod routes;
pub mod traits;

pub use errors::MediatorError;
pub use mediator::{Mediator, MediatorBuilder};
pub use routes::MediatorRoutes;
pub use traits::{Notification, NotificationHandler, Request, RequestHandler};

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use circuit_di::{current_scope, DiBuilder, DiContainer, DynError, InitError, Scope, ScopeId};

    use super::*;

    /// Scoped state shared by the sender and the handlers of one scope
    #[derive(Default)]
    struct Journal(Mutex<Vec<String>>);
    impl Journal {
        fn write(&self, entry: impl Into<String>) {
            self.0.lock().unwrap().push(entry.into());
        }

        fn entries(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }
    }

    struct WhoAmI;
    impl Request for WhoAmI {
        type Response = Option<ScopeId>;
    }

    struct WhoAmIHandler {
        journal: Arc<Journal>,
    }
    impl RequestHandler<WhoAmI> for WhoAmIHandler {
        #[allow(refining_impl_trait)]
        async fn handle(&self, _: WhoAmI) -> Result<Option<ScopeId>, DynError> {
            self.journal.write("who");
            Ok(current_scope().map(|scope| scope.id()))
        }
    }

    #[derive(Clone)]
    struct Saved(&'static str);
    impl Notification for Saved {}

    struct First {
        journal: Arc<Journal>,
    }
    impl NotificationHandler<Saved> for First {
        #[allow(refining_impl_trait)]
        async fn handle(&self, saved: Saved) -> Result<(), DynError> {
            self.journal.write(format!("first {}", saved.0));
            Ok(())
        }
    }

    struct Failing;
    impl NotificationHandler<Saved> for Failing {
        #[allow(refining_impl_trait)]
        async fn handle(&self, _: Saved) -> Result<(), DynError> {
            Err("disk full".into())
        }
    }

    struct Last {
        journal: Arc<Journal>,
    }
    impl NotificationHandler<Saved> for Last {
        #[allow(refining_impl_trait)]
        async fn handle(&self, saved: Saved) -> Result<(), DynError> {
            self.journal.write(format!("last {}", saved.0));
            Ok(())
        }
    }

    fn services() -> DiBuilder {
        fn journal(scope: &Scope) -> Result<Arc<Journal>, DynError> {
            Ok(scope.require::<Journal>()?)
        }

        DiBuilder::new()
            .add_scoped_fn(vec![], |_: &Scope| Ok::<_, DynError>(Journal::default()))
            .add_scoped_fn(vec![], |scope: &Scope| {
                Ok::<_, DynError>(WhoAmIHandler {
                    journal: journal(scope)?,
                })
            })
            .add_scoped_fn(vec![], |scope: &Scope| {
                Ok::<_, DynError>(First {
                    journal: journal(scope)?,
                })
            })
            .add_transient_fn(vec![], |_: &Scope| Ok::<_, DynError>(Failing))
            .add_scoped_fn(vec![], |scope: &Scope| {
                Ok::<_, DynError>(Last {
                    journal: journal(scope)?,
                })
            })
    }

    fn build(mediator: MediatorBuilder) -> Result<DiContainer, InitError> {
        futures::executor::block_on(mediator.install(services()).build())
    }

    #[test]
    fn request_runs_in_the_senders_scope() {
        let container = build(MediatorBuilder::new().request_handler::<WhoAmI, WhoAmIHandler>())
            .unwrap();
        let scope = container.begin_scope().unwrap();
        let other = container.begin_scope().unwrap();

        let mediator = scope.require::<Mediator>().unwrap();
        let answer = futures::executor::block_on(mediator.send(WhoAmI)).unwrap();

        assert_eq!(answer, Some(scope.id()));
        assert_eq!(scope.require::<Journal>().unwrap().entries(), vec!["who"]);
        assert!(other.require::<Journal>().unwrap().entries().is_empty());
    }

    #[test]
    fn unrouted_request_has_no_handler() {
        let container = build(MediatorBuilder::new()).unwrap();
        let scope = container.begin_scope().unwrap();

        let err = futures::executor::block_on(scope.require::<Mediator>().unwrap().send(WhoAmI))
            .unwrap_err();
        assert!(matches!(err, MediatorError::NoHandler(_)));
    }

    #[test]
    fn unregistered_handler_fails_verification() {
        struct Unregistered;
        impl RequestHandler<WhoAmI> for Unregistered {
            #[allow(refining_impl_trait)]
            async fn handle(&self, _: WhoAmI) -> Result<Option<ScopeId>, DynError> {
                Ok(None)
            }
        }

        let err = build(MediatorBuilder::new().request_handler::<WhoAmI, Unregistered>())
            .unwrap_err();
        assert!(matches!(err, InitError::DependencyGraphError(_)));
    }

    #[test]
    fn publish_runs_handlers_in_order() {
        let container = build(
            MediatorBuilder::new()
                .notification_handler::<Saved, First>()
                .notification_handler::<Saved, Last>(),
        )
        .unwrap();
        let scope = container.begin_scope().unwrap();

        futures::executor::block_on(scope.require::<Mediator>().unwrap().publish(Saved("a")))
            .unwrap();

        assert_eq!(
            scope.require::<Journal>().unwrap().entries(),
            vec!["first a", "last a"]
        );
    }

    #[test]
    fn publish_stops_at_the_first_failure() {
        let container = build(
            MediatorBuilder::new()
                .notification_handler::<Saved, First>()
                .notification_handler::<Saved, Failing>()
                .notification_handler::<Saved, Last>(),
        )
        .unwrap();
        let scope = container.begin_scope().unwrap();

        let err =
            futures::executor::block_on(scope.require::<Mediator>().unwrap().publish(Saved("b")))
                .unwrap_err();

        assert!(matches!(err, MediatorError::Handler { error, .. } if error.to_string() == "disk full"));
        assert_eq!(scope.require::<Journal>().unwrap().entries(), vec!["first b"]);
    }

    #[test]
    fn publish_without_handlers_succeeds() {
        let container = build(MediatorBuilder::new()).unwrap();
        let scope = container.begin_scope().unwrap();

        futures::executor::block_on(scope.require::<Mediator>().unwrap().publish(Saved("c")))
            .unwrap();
    }

    #[test]
    fn mediator_of_a_disposed_scope_refuses() {
        let container = build(MediatorBuilder::new().request_handler::<WhoAmI, WhoAmIHandler>())
            .unwrap();
        let scope = container.begin_scope().unwrap();
        let mediator = scope.require::<Mediator>().unwrap();
        scope.dispose().unwrap();

        let err = futures::executor::block_on(mediator.send(WhoAmI)).unwrap_err();
        assert!(matches!(err, MediatorError::ScopeDisposed(id) if id == scope.id()));
    }
}
