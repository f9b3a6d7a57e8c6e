use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use circuit_di::{current_scope, DiBuilder, DynError, Scope};
use circuit_scope::{
    BridgeRegistration, CircuitHost, HandlerError, HandlerResult, SessionBridge,
};

#[derive(Debug)]
struct Connection {
    user: String,
}

/// Scoped service - one per session
struct Cart {
    owner: String,
}

async fn host() -> Arc<CircuitHost<Connection>> {
    let container = DiBuilder::new()
        .add_session_bridge::<Connection>()
        .add_scoped_fn(vec![], |scope: &Scope| {
            let connection = SessionBridge::<Connection>::from_scope(scope)?;
            Ok::<_, DynError>(Cart {
                owner: connection.user.clone(),
            })
        })
        .build()
        .await
        .unwrap();

    Arc::new(CircuitHost::new(container).unwrap())
}

/// Checks the ambient scope of the session on every resumption
async fn observe(user: String, scope: Scope, rounds: usize) -> HandlerResult {
    for _ in 0..rounds {
        let current = current_scope().ok_or_else(|| HandlerError::failed("no ambient scope"))?;
        assert_eq!(current.id(), scope.id());

        let connection = SessionBridge::<Connection>::current().map_err(HandlerError::failed)?;
        assert_eq!(connection.user, user);

        let cart = current.require::<Cart>().map_err(HandlerError::failed)?;
        assert_eq!(cart.owner, user);

        tokio::time::sleep(Duration::from_millis(1)).await;
        tokio::task::yield_now().await;
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_sessions_never_observe_each_other() {
    let host = host().await;

    let tasks = ["alice", "bob", "carol", "dave"].map(|user| {
        let host = host.clone();
        tokio::spawn(async move {
            let session = host
                .on_session_established(Arc::new(Connection {
                    user: user.to_string(),
                }))
                .unwrap();
            let scope = session.scope().unwrap();
            let refreshes = Arc::new(AtomicUsize::new(0));

            for _ in 0..10 {
                let counter = refreshes.clone();
                host.dispatch_event(
                    &session,
                    Arc::new(move || {
                        counter.fetch_add(1, Ordering::SeqCst);
                    }),
                    |rounds| observe(user.to_string(), scope.clone(), rounds),
                    3,
                )
                .await
                .unwrap();
            }

            // Suspending handlers refresh before and after they resume
            assert_eq!(refreshes.load(Ordering::SeqCst), 20);
            session.id()
        })
    });

    let mut ended = Vec::new();
    for task in tasks {
        ended.push(task.await.unwrap());
    }

    assert_eq!(host.container().scopes_created(), 4);
    assert_eq!(host.session_count(), 4);
    assert!(current_scope().is_none());

    for id in ended {
        host.end_session(id).await.unwrap();
    }
    assert_eq!(host.session_count(), 0);
}

#[tokio::test]
async fn session_lifecycle_releases_the_scope() {
    let host = host().await;
    let session = host
        .on_session_established(Arc::new(Connection {
            user: "erin".to_string(),
        }))
        .unwrap();

    let cart = host.activate_component::<Cart>(&session).unwrap();
    let again = host.activate_component::<Cart>(&session).unwrap();
    assert!(Arc::ptr_eq(&cart, &again));

    let scope = session.scope().unwrap();
    host.end_session(session.id()).await.unwrap();

    assert!(scope.is_disposed());
    assert!(session.scope().is_none());
    assert!(host.session(session.id()).is_none());
    // A second end is a no-op
    host.end_session(session.id()).await.unwrap();
}
