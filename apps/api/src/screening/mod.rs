// Screening sessions.
// The pipeline turns a vacancy plus uploaded CVs into an immutable ScreeningSession;
// sessions live in a TTL-bounded store and are served by the handlers.

pub mod handlers;
pub mod pipeline;
pub mod session;

pub use pipeline::{ClassificationOutcome, ScreeningPipeline, ScreeningReport, ScreeningSession, UploadedDocument};
pub use session::SessionStore;
