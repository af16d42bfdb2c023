//! Axum route handlers for the Screening API.

use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;

use crate::documents::VacancyProfile;
use crate::errors::AppError;
use crate::graph::GraphReport;
use crate::grounding::{AnswerResult, InterviewQuestions};
use crate::screening::pipeline::{ClassificationOutcome, ScreeningReport, ScreeningSession, UploadedDocument};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ClassifyRequest {
    pub vacancy_title: String,
    pub vacancy_description: String,
}

#[derive(Debug, Serialize)]
pub struct ClassifyResponse {
    pub vacancy: VacancyProfile,
    pub classification: ClassificationOutcome,
}

#[derive(Debug, Serialize)]
pub struct ScreeningResponse {
    pub session_id: Uuid,
    pub report: ScreeningReport,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub query: String,
    pub top_k: Option<usize>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/vacancies/classify
///
/// Previews the vacancy profile and its cluster before any CVs are uploaded.
pub async fn handle_classify(
    State(state): State<AppState>,
    Json(request): Json<ClassifyRequest>,
) -> Result<Json<ClassifyResponse>, AppError> {
    let (vacancy, classification) = state
        .pipeline
        .prepare_vacancy(&request.vacancy_title, &request.vacancy_description)?;
    Ok(Json(ClassifyResponse {
        vacancy,
        classification,
    }))
}

/// POST /api/v1/screenings
///
/// Multipart form: `vacancy_title`, `vacancy_description` and one `cv_files`
/// part per CV. Runs the full pipeline and stores the session.
pub async fn handle_create_screening(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ScreeningResponse>, AppError> {
    let mut title = String::new();
    let mut description = String::new();
    let mut uploads = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(invalid_form)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "vacancy_title" => title = field.text().await.map_err(invalid_form)?,
            "vacancy_description" => description = field.text().await.map_err(invalid_form)?,
            "cv_files" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(invalid_form)?;
                uploads.push(UploadedDocument { filename, bytes });
            }
            _ => {}
        }
    }

    let session = state.pipeline.run(&title, &description, uploads).await?;
    let (session_id, session) = state.sessions.insert(session).await;
    info!("Screening session {session_id} created");

    Ok(Json(ScreeningResponse {
        session_id,
        report: session.report.clone(),
    }))
}

/// GET /api/v1/screenings/:id
pub async fn handle_get_screening(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<ScreeningResponse>, AppError> {
    let session = load_session(&state, session_id).await?;
    Ok(Json(ScreeningResponse {
        session_id,
        report: session.report.clone(),
    }))
}

/// GET /api/v1/screenings/:id/graph
///
/// Node, edge and metric tables plus duplicate and outlier lists.
pub async fn handle_get_graph(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<GraphReport>, AppError> {
    let session = load_session(&state, session_id).await?;
    Ok(Json(session.report.graph.clone()))
}

/// POST /api/v1/screenings/:id/chat
///
/// Retrieves evidence for the query and answers from it. The whole request,
/// including any pending rate-limit backoff, is bounded by the request timeout.
pub async fn handle_chat(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<AnswerResult>, AppError> {
    if request.query.trim().is_empty() {
        return Err(AppError::Validation("No query provided".to_string()));
    }
    let session = load_session(&state, session_id).await?;
    let k = request
        .top_k
        .unwrap_or(state.pipeline.settings().retrieval_k)
        .max(1);

    let cancel = CancellationToken::new();
    let work = async {
        let evidence = state
            .pipeline
            .retrieval()
            .retrieve(&session.index, &request.query, k)
            .await?;
        Ok::<_, AppError>(
            state
                .generator
                .generate_answer(&request.query, &evidence, &cancel)
                .await,
        )
    };

    let answer = with_timeout(&state, &cancel, work).await?;
    Ok(Json(answer))
}

/// GET /api/v1/screenings/:id/candidates/:candidate_id/questions
pub async fn handle_interview_questions(
    State(state): State<AppState>,
    Path((session_id, candidate_id)): Path<(Uuid, String)>,
) -> Result<Json<InterviewQuestions>, AppError> {
    let session = load_session(&state, session_id).await?;
    let candidate = session
        .candidate(&candidate_id)
        .ok_or_else(|| AppError::NotFound(format!("Candidate {candidate_id} not found")))?;

    let cancel = CancellationToken::new();
    let work = async {
        Ok::<_, AppError>(
            state
                .generator
                .generate_interview_questions(
                    &candidate.candidate_id,
                    &candidate.full_text,
                    &session.report.vacancy.description,
                    state.pipeline.settings().question_count,
                    &cancel,
                )
                .await,
        )
    };

    let questions = with_timeout(&state, &cancel, work).await?;
    Ok(Json(questions))
}

// ────────────────────────────────────────────────────────────────────────────
// Helpers
// ────────────────────────────────────────────────────────────────────────────

async fn load_session(state: &AppState, session_id: Uuid) -> Result<Arc<ScreeningSession>, AppError> {
    state
        .sessions
        .get(&session_id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Screening session {session_id} not found")))
}

async fn with_timeout<T, F>(
    state: &AppState,
    cancel: &CancellationToken,
    work: F,
) -> Result<T, AppError>
where
    F: std::future::Future<Output = Result<T, AppError>>,
{
    let timeout = state.config.request_timeout;
    match tokio::time::timeout(timeout, work).await {
        Ok(result) => result,
        Err(_) => {
            cancel.cancel();
            Err(AppError::Timeout(timeout.as_secs()))
        }
    }
}

fn invalid_form(e: axum::extract::multipart::MultipartError) -> AppError {
    AppError::Validation(format!("Invalid multipart form: {e}"))
}
