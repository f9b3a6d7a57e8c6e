use std::future::Future;

use circuit_di::{DynError, Injectable};

/// A message with exactly one handler, answered with a [Request::Response]
pub trait Request: Send + 'static {
    type Response: Send + 'static;
}

/// Handles one type of [Request]
///
/// Handlers are scoped services: they are resolved from the scope of the sending
/// [Mediator](crate::Mediator) and run inside it.
pub trait RequestHandler<Req: Request>: Injectable {
    fn handle(
        &self,
        request: Req,
    ) -> impl Future<Output = Result<Req::Response, impl Into<DynError>>> + Send + '_;
}

/// A message delivered to every registered handler
pub trait Notification: Clone + Send + Sync + 'static {}

/// Handles one type of [Notification]
pub trait NotificationHandler<N: Notification>: Injectable {
    fn handle(&self, notification: N) -> impl Future<Output = Result<(), impl Into<DynError>>> + Send + '_;
}
