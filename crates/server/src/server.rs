use std::future::Future;

use axum::{
    Router,
    middleware,
    routing::{get, post},
};

use engine::Engine;

use crate::{RateLimiter, TokenManager, accounts, auth, rate_limit, transactions};

#[derive(Clone)]
pub struct ServerState {
    pub engine: Engine,
    pub tokens: TokenManager,
}

fn router(state: ServerState, rate_limiter: Option<RateLimiter>) -> Router {
    let mut router = Router::new()
        .route("/accounts", get(accounts::list))
        .route("/transactions", get(transactions::list))
        .route("/transactions/transfer", post(transactions::transfer))
        .route("/transactions/exchange", post(transactions::exchange))
        .route("/auth/me", get(auth::me))
        .route("/auth/logout", post(auth::logout))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_auth,
        ))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .with_state(state);

    if let Some(limiter) = rate_limiter {
        router = router.layer(middleware::from_fn_with_state(limiter, rate_limit::limit));
    }
    router
}

/// Serves the API on an already-bound listener until `shutdown` resolves;
/// then stops accepting connections and drains in-flight requests.
pub async fn run_with_listener(
    engine: Engine,
    tokens: TokenManager,
    rate_limiter: Option<RateLimiter>,
    listener: tokio::net::TcpListener,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    let state = ServerState { engine, tokens };

    axum::serve(listener, router(state, rate_limiter))
        .with_graceful_shutdown(shutdown)
        .await
}
