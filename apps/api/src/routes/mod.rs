pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::screening::handlers;
use crate::state::AppState;

/// Ten PDFs per screening.
const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/vacancies/classify", post(handlers::handle_classify))
        .route(
            "/api/v1/screenings",
            post(handlers::handle_create_screening).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/api/v1/screenings/:id", get(handlers::handle_get_screening))
        .route("/api/v1/screenings/:id/graph", get(handlers::handle_get_graph))
        .route("/api/v1/screenings/:id/chat", post(handlers::handle_chat))
        .route(
            "/api/v1/screenings/:id/candidates/:candidate_id/questions",
            get(handlers::handle_interview_questions),
        )
        .with_state(state)
}
