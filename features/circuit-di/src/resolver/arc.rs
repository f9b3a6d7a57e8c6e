use std::{any::type_name, sync::Arc};

use futures::SinkExt;
use futures_channel::oneshot;

use crate::{
    errors::{InjectError, RequireError},
    initiator::{DiHandle, DiRequest},
    resolver::Resolver,
    types::{DependencyInfo, Injectable, TypeInfo},
};

/// Waits until the singleton `T` is built and shares it
impl<T: Injectable> Resolver for Arc<T> {
    async fn resolve(handle: &mut DiHandle) -> Result<Self, InjectError> {
        let (tx, rx) = oneshot::channel();
        handle
            .request_sender
            .send(DiRequest::Require {
                type_info: TypeInfo::of::<T>(),
                response_channel: tx,
            })
            .await?;

        let resolved = rx.await??;
        let downcasted = resolved
            .downcast::<T>()
            .map_err(|actual_type| RequireError::DowncastFailed {
                required_type: type_name::<T>(),
                actual_type,
            })?;

        Ok(downcasted)
    }

    fn dependency_info() -> DependencyInfo {
        DependencyInfo::of::<T>()
    }
}

/// Resolves to None if the dependency is disabled or not registered
impl<Resolvable: Resolver> Resolver for Option<Resolvable> {
    async fn resolve(handle: &mut DiHandle) -> Result<Self, InjectError>
    where
        Self: Sized,
    {
        match Resolvable::resolve(handle).await {
            Ok(resolved) => Ok(Some(resolved)),
            Err(InjectError::RequireError(RequireError::TypeDisabled(_)))
            | Err(InjectError::RequireError(RequireError::TypeMissing(_))) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn dependency_info() -> DependencyInfo {
        DependencyInfo {
            optional: true,
            ..Resolvable::dependency_info()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;

    use super::*;
    use crate::{builder::DiBuilder, factories::InstanceFactory, types::DynError};

    struct Port(u16);

    struct Listener {
        port: Option<Arc<Port>>,
    }

    struct ListenerFactory;
    impl InstanceFactory for ListenerFactory {
        type Provides = Listener;

        fn get_dependencies() -> Vec<DependencyInfo> {
            vec![Option::<Arc<Port>>::dependency_info()]
        }

        #[allow(refining_impl_trait)]
        async fn construct(&mut self, mut di: DiHandle) -> Result<Self::Provides, DynError> {
            let port = di.resolve::<Option<Arc<Port>>>().await?;
            Ok(Listener { port })
        }
    }

    struct PortFactory;
    impl InstanceFactory for PortFactory {
        type Provides = Port;

        fn get_dependencies() -> Vec<DependencyInfo> {
            vec![]
        }

        #[allow(refining_impl_trait)]
        async fn construct(&mut self, _: DiHandle) -> Result<Self::Provides, Infallible> {
            Ok(Port(8080))
        }
    }

    #[test]
    fn optional_dependency_resolves_when_present() {
        let container = futures::executor::block_on(
            DiBuilder::new()
                .add_factory(ListenerFactory)
                .add_factory(PortFactory)
                .build(),
        )
        .unwrap();

        let listener = container.require::<Listener>().unwrap();
        assert_eq!(listener.port.as_ref().map(|p| p.0), Some(8080));
    }

    #[test]
    fn optional_dependency_is_none_when_missing() {
        let container =
            futures::executor::block_on(DiBuilder::new().add_factory(ListenerFactory).build())
                .unwrap();

        assert!(container.require::<Listener>().unwrap().port.is_none());
    }
}
