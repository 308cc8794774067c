use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{delete, get, post, put},
    Router,
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/today", get(handlers::get_today))
        .route(
            "/api/entries",
            get(handlers::get_entries).post(handlers::add_entry),
        )
        .route("/api/entries/:id", delete(handlers::remove_entry))
        .route("/api/adjust", post(handlers::adjust))
        .route("/api/reset", post(handlers::reset))
        .route(
            "/api/profile",
            get(handlers::get_profile).put(handlers::put_profile),
        )
        .route("/api/profile/name", put(handlers::put_name))
        .route("/api/profile/targets", put(handlers::put_targets))
        .route("/api/profile/estimate", post(handlers::estimate))
        .route(
            "/api/settings/language",
            get(handlers::get_language).put(handlers::put_language),
        )
        .route(
            "/api/weight",
            get(handlers::get_weights).post(handlers::post_weight),
        )
        .route("/api/history", get(handlers::get_history))
        .route("/api/stats", get(handlers::get_stats))
        .with_state(state)
}
