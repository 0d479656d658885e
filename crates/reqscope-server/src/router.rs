//! Axum router wiring.
//!
//! Business routes go through the instrumentation adapter; the ops routes
//! (`/metrics`, `/healthz`) are served directly so scrapes do not count as
//! traffic.

use axum::{
    extract::{Request, State},
    response::Response,
    routing::get,
    Router,
};

use crate::{adapter, app_state::AppState, ops};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/greet", get(greet))
        .route("/work", get(work))
        .route("/metrics", get(ops::metrics))
        .route("/healthz", get(ops::healthz))
        .fallback(not_found)
        .with_state(state)
}

async fn index(State(state): State<AppState>, req: Request) -> Response {
    adapter::serve(state.index(), req).await
}

async fn greet(State(state): State<AppState>, req: Request) -> Response {
    adapter::serve(state.greet(), req).await
}

async fn work(State(state): State<AppState>, req: Request) -> Response {
    adapter::serve(state.work(), req).await
}

async fn not_found(State(state): State<AppState>, req: Request) -> Response {
    adapter::serve(state.not_found(), req).await
}
