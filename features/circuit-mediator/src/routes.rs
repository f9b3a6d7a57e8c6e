use std::{
    any::{type_name, Any, TypeId},
    collections::HashMap,
    sync::Arc,
};

use circuit_di::{DependencyInfo, Scope};
use futures::future::BoxFuture;

use crate::{
    errors::MediatorError,
    traits::{Notification, NotificationHandler, Request, RequestHandler},
};

pub(crate) type AnyResponse = Box<dyn Any + Send>;

pub(crate) type Dispatch<T> = Result<BoxFuture<'static, Result<T, MediatorError>>, MediatorError>;

/// Borrowed, type erased notification
pub(crate) type AnyNotification<'a> = &'a (dyn Any + Send + Sync + 'static);

pub(crate) type RequestRoute =
    Arc<dyn Fn(&Scope, Box<dyn Any + Send>) -> Dispatch<AnyResponse> + Send + Sync>;
pub(crate) type NotificationRoute =
    Arc<dyn Fn(&Scope, AnyNotification<'_>) -> Dispatch<()> + Send + Sync>;

/// Maps message types to the handlers registered for them
///
/// Registered as a singleton, shared by every [Mediator](crate::Mediator).
#[derive(Default)]
pub struct MediatorRoutes {
    requests: HashMap<TypeId, RequestRoute>,
    notifications: HashMap<TypeId, Vec<NotificationRoute>>,
    handlers: Vec<DependencyInfo>,
}

impl MediatorRoutes {
    pub(crate) fn add_request<Req: Request, H: RequestHandler<Req>>(&mut self) {
        let route: RequestRoute = Arc::new(dispatch_request::<Req, H>);
        if self.requests.insert(TypeId::of::<Req>(), route).is_some() {
            tracing::warn!(
                "Replaced the handler of '{}' with '{}'",
                type_name::<Req>(),
                type_name::<H>()
            );
        }
        self.handlers.push(DependencyInfo::of::<H>());
    }

    pub(crate) fn add_notification<N: Notification, H: NotificationHandler<N>>(&mut self) {
        self.notifications
            .entry(TypeId::of::<N>())
            .or_default()
            .push(Arc::new(dispatch_notification::<N, H>));
        self.handlers.push(DependencyInfo::of::<H>());
    }

    /// All handler types, these must be registered as scoped or transient services
    pub fn handlers(&self) -> &[DependencyInfo] {
        &self.handlers
    }

    pub(crate) fn request<Req: Request>(&self) -> Result<RequestRoute, MediatorError> {
        self.requests
            .get(&TypeId::of::<Req>())
            .cloned()
            .ok_or(MediatorError::NoHandler(type_name::<Req>()))
    }

    pub(crate) fn notification<N: Notification>(&self) -> &[NotificationRoute] {
        self.notifications
            .get(&TypeId::of::<N>())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// Resolves the handler from the scope, the returned future only runs it
fn dispatch_request<Req: Request, H: RequestHandler<Req>>(
    scope: &Scope,
    request: Box<dyn Any + Send>,
) -> Dispatch<AnyResponse> {
    let handler = scope.require::<H>()?;
    let request = request
        .downcast::<Req>()
        .map_err(|_| MediatorError::NoHandler(type_name::<Req>()))?;

    Ok(Box::pin(async move {
        match handler.handle(*request).await {
            Ok(response) => Ok(Box::new(response) as AnyResponse),
            Err(error) => Err(MediatorError::Handler {
                request: type_name::<Req>(),
                error: error.into(),
            }),
        }
    }))
}

fn dispatch_notification<N: Notification, H: NotificationHandler<N>>(
    scope: &Scope,
    notification: AnyNotification<'_>,
) -> Dispatch<()> {
    let handler = scope.require::<H>()?;
    let notification = notification
        .downcast_ref::<N>()
        .ok_or(MediatorError::NoHandler(type_name::<N>()))?
        .clone();

    Ok(Box::pin(async move {
        match handler.handle(notification).await {
            Ok(()) => Ok(()),
            Err(error) => Err(MediatorError::Handler {
                request: type_name::<N>(),
                error: error.into(),
            }),
        }
    }))
}

pub(crate) fn downcast_response<Req: Request>(
    response: AnyResponse,
) -> Result<Req::Response, MediatorError> {
    response
        .downcast::<Req::Response>()
        .map(|response| *response)
        .map_err(|_| MediatorError::NoHandler(type_name::<Req>()))
}
