use std::{
    any::{type_name, Any},
    sync::Arc,
};

use circuit_di::{DependencyInfo, DiBuilder, DynError, Scope, WeakScope};

use crate::{
    errors::MediatorError,
    routes::{downcast_response, MediatorRoutes},
    traits::{Notification, NotificationHandler, Request, RequestHandler},
};

/// Sends requests and publishes notifications to handlers of the current scope
///
/// The mediator is a scoped service. Handlers are resolved from the scope the mediator was
/// built in, and run with that scope as the ambient current scope, so a handler sees the same
/// scoped instances as the code that sent the message.
pub struct Mediator {
    scope: WeakScope,
    routes: Arc<MediatorRoutes>,
}

impl Mediator {
    /// Sends a request to its handler and returns the response
    pub async fn send<Req: Request>(&self, request: Req) -> Result<Req::Response, MediatorError> {
        let scope = self.scope()?;
        let route = self.routes.request::<Req>()?;
        tracing::debug!(scope = %scope.id(), "Sending '{}'", type_name::<Req>());

        let response = scope
            .scoped(async { route(&scope, Box::new(request) as Box<dyn Any + Send>)?.await })
            .await?;
        downcast_response::<Req>(response)
    }

    /// Publishes a notification to all its handlers, in registration order
    ///
    /// Stops at the first failing handler. A notification without handlers is not an error.
    pub async fn publish<N: Notification>(&self, notification: N) -> Result<(), MediatorError> {
        let scope = self.scope()?;
        let routes = self.routes.notification::<N>();
        tracing::debug!(
            scope = %scope.id(),
            handlers = routes.len(),
            "Publishing '{}'",
            type_name::<N>()
        );

        scope
            .scoped(async {
                for route in routes {
                    route(&scope, &notification as &(dyn Any + Send + Sync))?.await?;
                }
                Ok::<_, MediatorError>(())
            })
            .await
    }

    fn scope(&self) -> Result<Scope, MediatorError> {
        self.scope
            .upgrade()
            .ok_or(MediatorError::ScopeDisposed(self.scope.id()))
    }
}

/// Collects the handlers and installs the [Mediator] into a [DiBuilder]
///
/// The handlers themselves are registered on the [DiBuilder] as scoped or transient services.
///
/// ```rust
/// use circuit_di::{DiBuilder, DynError, Scope};
/// use circuit_mediator::{Mediator, MediatorBuilder, Request, RequestHandler};
///
/// struct Ping;
/// impl Request for Ping {
///     type Response = &'static str;
/// }
///
/// struct PingHandler;
/// impl RequestHandler<Ping> for PingHandler {
///     #[allow(refining_impl_trait)]
///     async fn handle(&self, _: Ping) -> Result<&'static str, DynError> {
///         Ok("pong")
///     }
/// }
///
/// let builder = DiBuilder::new()
///     .add_scoped_fn(vec![], |_: &Scope| Ok::<_, DynError>(PingHandler));
/// let container = futures::executor::block_on(
///     MediatorBuilder::new()
///         .request_handler::<Ping, PingHandler>()
///         .install(builder)
///         .build(),
/// )
/// .unwrap();
///
/// let scope = container.begin_scope().unwrap();
/// let mediator = scope.require::<Mediator>().unwrap();
/// assert_eq!(futures::executor::block_on(mediator.send(Ping)).unwrap(), "pong");
/// ```
#[derive(Default)]
pub struct MediatorBuilder {
    routes: MediatorRoutes,
}

impl MediatorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes `Req` to `H` - a later handler for the same request replaces the former
    pub fn request_handler<Req: Request, H: RequestHandler<Req>>(mut self) -> Self {
        self.routes.add_request::<Req, H>();
        self
    }

    /// Adds `H` to the handlers of `N`
    pub fn notification_handler<N: Notification, H: NotificationHandler<N>>(mut self) -> Self {
        self.routes.add_notification::<N, H>();
        self
    }

    /// Registers the routes as a singleton and the [Mediator] as a scoped service
    ///
    /// The mediator depends on every handler, so unregistered handlers fail the
    /// verification of the container.
    pub fn install(self, di: DiBuilder) -> DiBuilder {
        let mut dependencies = vec![DependencyInfo::of::<MediatorRoutes>()];
        dependencies.extend_from_slice(self.routes.handlers());

        di.add_instance(self.routes)
            .add_scoped_fn(dependencies, |scope: &Scope| {
                Ok::<_, DynError>(Mediator {
                    scope: scope.downgrade(),
                    routes: scope.require::<MediatorRoutes>()?,
                })
            })
    }
}
