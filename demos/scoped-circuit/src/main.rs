use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use circuit_config::ConfigProvider;
use circuit_di::{current_scope, DependencyInfo, DiBuilder, DynError, Scope};
use circuit_mediator::{Mediator, MediatorBuilder, Request, RequestHandler};
use circuit_scope::{
    BridgeRegistration, CircuitHost, CircuitOptions, HandlerError, HandlerResult, SessionBridge,
    StateRefresh,
};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use uuid::Uuid;

/// Per connection resource handed over by the host when a session is established
struct Connection {
    user: String,
}

/// Scoped - every session sees its own id
struct TestScoped {
    id: Uuid,
}

struct TestScopedRequest;
impl Request for TestScopedRequest {
    type Response = Uuid;
}

struct TestScopedRequestHandler {
    scoped: Arc<TestScoped>,
}
impl RequestHandler<TestScopedRequest> for TestScopedRequestHandler {
    #[allow(refining_impl_trait)]
    async fn handle(&self, _: TestScopedRequest) -> Result<Uuid, DynError> {
        let ambient = current_scope()
            .ok_or("handler runs outside of a scope")?
            .require::<TestScoped>()?;
        tracing::info!(injected = %self.scoped.id, ambient = %ambient.id, "Handling request");
        Ok(self.scoped.id)
    }
}

struct ScopedCaller {
    mediator: Arc<Mediator>,
    scoped: Arc<TestScoped>,
}
impl ScopedCaller {
    async fn call_scoped(&self) -> Result<(), DynError> {
        let connection = SessionBridge::<Connection>::current()?;
        let handled_by = self.mediator.send(TestScopedRequest).await?;
        tracing::info!(user = %connection.user, scoped = %self.scoped.id, %handled_by, "Called scoped");

        if handled_by != self.scoped.id {
            return Err("handler saw a different scope".into());
        }
        Ok(())
    }
}

fn services(config: ConfigProvider) -> DiBuilder {
    let builder = DiBuilder::new()
        .add_instance(config)
        .add_session_bridge::<Connection>()
        .add_scoped_fn(vec![], |scope: &Scope| {
            let scoped = TestScoped { id: Uuid::new_v4() };
            let id = scoped.id;
            scope.register_for_async_disposal(move || async move {
                tracing::info!(%id, "Released scoped service");
            });
            Ok::<_, DynError>(scoped)
        })
        .add_scoped_fn(
            vec![DependencyInfo::of::<TestScoped>()],
            |scope: &Scope| {
                Ok::<_, DynError>(TestScopedRequestHandler {
                    scoped: scope.require()?,
                })
            },
        )
        .add_scoped_fn(
            vec![
                DependencyInfo::of::<Mediator>(),
                DependencyInfo::of::<TestScoped>(),
            ],
            |scope: &Scope| {
                Ok::<_, DynError>(ScopedCaller {
                    mediator: scope.require()?,
                    scoped: scope.require()?,
                })
            },
        );

    MediatorBuilder::new()
        .request_handler::<TestScopedRequest, TestScopedRequestHandler>()
        .install(builder)
}

/// A click on a component, delivered through the event interceptor
async fn on_click(user: &'static str) -> HandlerResult {
    let scope = current_scope().ok_or_else(|| HandlerError::failed("click outside of a session"))?;
    let caller = scope
        .require::<ScopedCaller>()
        .map_err(HandlerError::failed)?;

    tokio::time::sleep(Duration::from_millis(5)).await;
    caller.call_scoped().await?;
    tracing::debug!(user, scope = %scope.id(), "Click handled");
    Ok(())
}

async fn run_session(host: Arc<CircuitHost<Connection>>, user: &'static str) -> Result<(), DynError> {
    let session = host.on_session_established(Arc::new(Connection {
        user: user.to_string(),
    }))?;

    let renders = Arc::new(AtomicUsize::new(0));
    let refresh: Arc<dyn StateRefresh> = {
        let renders = renders.clone();
        Arc::new(move || {
            renders.fetch_add(1, Ordering::Relaxed);
        })
    };

    for _ in 0..3 {
        host.dispatch_event(&session, refresh.clone(), on_click, user)
            .await?;
    }

    let caller = host.activate_component::<ScopedCaller>(&session)?;
    tracing::info!(
        session = %session.id(),
        scoped = %caller.scoped.id,
        renders = renders.load(Ordering::Relaxed),
        "Session finished"
    );

    host.end_session(session.id()).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), DynError> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scoped_circuit=info,circuit_scope=debug,info".into()),
        )
        .init();

    let options = CircuitOptions {
        async_disposal: true,
        init_timeout: Some(Duration::from_secs(5)),
    };
    let mut config = ConfigProvider::new();
    config.add_config(options.clone())?;

    let container = options.build(services(config)).await?;
    let host = Arc::new(CircuitHost::<Connection>::new(container)?);

    let sessions = ["ada", "grace"].map(|user| tokio::spawn(run_session(host.clone(), user)));
    for session in sessions {
        session.await??;
    }

    tracing::info!(
        scopes = host.container().scopes_created(),
        open = host.session_count(),
        "All sessions ended"
    );
    Ok(())
}
