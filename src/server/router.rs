use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use super::handler;
use super::state::AppState;

/// Build the complete axum Router (spec §4.5: only `/schoolbus` and an
/// optional `/` help handler in the core).
pub fn build(state: AppState) -> Router {
    Router::new()
        .route("/schoolbus", post(handler::schoolbus))
        .route("/", get(handler::index))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
