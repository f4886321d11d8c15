//! Route table.

pub mod health;
pub mod redemption;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::auth;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/coupon-redemption/redeem", post(redemption::redeem))
        .route("/coupon-redemption/{code}", get(redemption::lookup))
        .layer(middleware::from_fn(auth::require_pos_user));

    Router::new()
        .route("/health", get(health::health))
        .route("/redeem.html", get(redemption::page))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
