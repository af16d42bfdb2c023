use std::sync::Arc;

use crate::config::Config;
use crate::grounding::GroundedGenerator;
use crate::screening::{ScreeningPipeline, ScreeningSession, SessionStore};

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Classification, ranking, graph and index building for new screenings.
    pub pipeline: ScreeningPipeline,
    /// Grounded answers and interview questions. Unconfigured without GEMINI_API_KEY.
    pub generator: GroundedGenerator,
    pub sessions: Arc<SessionStore<ScreeningSession>>,
}
