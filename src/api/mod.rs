mod error;
mod handlers;
mod middleware;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub use error::ApiError;
pub use middleware::{cors_layer, AuthUser};

pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(state.cors_origins.as_deref());

    Router::new()
        // Accounts
        .route("/register", post(handlers::register))
        .route("/token", post(handlers::login))
        // Projects
        .route("/projects/generate-template", post(handlers::generate_template))
        .route("/projects", get(handlers::list_projects).post(handlers::create_project))
        .route(
            "/projects/{id}",
            get(handlers::get_project).delete(handlers::delete_project),
        )
        .route("/projects/{id}/export", get(handlers::export_project))
        // Sections
        .route("/refine", post(handlers::refine_section))
        .route("/feedback", post(handlers::save_feedback))
        // Health
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
