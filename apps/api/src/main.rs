mod config;
mod documents;
mod errors;
mod graph;
mod grounding;
mod llm_client;
mod ranking;
mod retrieval;
mod routes;
mod screening;
mod state;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::documents::{DocumentProcessor, PdfTextExtractor};
use crate::grounding::{GroundedGenerator, RetryPolicy};
use crate::llm_client::{GenerativeBackend, LlmClient};
use crate::ranking::{Classifier, PretrainedModel};
use crate::retrieval::{Chunker, Embedder, HashingEmbedder, HttpEmbedder, RetrievalEngine};
use crate::routes::build_router;
use crate::screening::{ScreeningPipeline, SessionStore};
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Screener API v{}", env!("CARGO_PKG_VERSION"));

    config.engine.validate()?;

    // Pretrained artifacts are optional: without them only classification and
    // keyword extraction are disabled.
    let model = match PretrainedModel::load(&config.model_dir) {
        Ok(model) => Some(Arc::new(model)),
        Err(e) => {
            warn!("Classification disabled: {e}");
            None
        }
    };

    let embedder: Arc<dyn Embedder> = match &config.embedding_url {
        Some(url) => {
            info!("Embedding via {url} (model: {})", config.embedding_model);
            Arc::new(
                HttpEmbedder::new(
                    url,
                    config.embedding_api_key.clone(),
                    config.embedding_model.clone(),
                    None,
                    config.request_timeout,
                )
                .context("Failed to build embedding client")?,
            )
        }
        None => {
            info!(
                "EMBEDDING_URL not set; using local hashing embedder ({} dims)",
                config.embedding_dimensions
            );
            Arc::new(HashingEmbedder::new(config.embedding_dimensions))
        }
    };

    let backend: Option<Arc<dyn GenerativeBackend>> = match &config.gemini_api_key {
        Some(key) => {
            let client = LlmClient::new(key.clone(), config.gemini_model.clone(), config.request_timeout)
                .context("Failed to build LLM client")?;
            info!("LLM client initialized (model: {})", config.gemini_model);
            let client: Arc<dyn GenerativeBackend> = Arc::new(client);
            Some(client)
        }
        None => {
            warn!("GEMINI_API_KEY not set; grounded answers and interview questions disabled");
            None
        }
    };

    let chunker = Chunker::new(config.engine.chunk_size, config.engine.chunk_overlap)?;
    let pipeline = ScreeningPipeline::new(
        DocumentProcessor::new(Arc::new(PdfTextExtractor), model.clone()),
        Classifier::new(model),
        RetrievalEngine::new(embedder, chunker),
        config.engine.clone(),
    );
    let generator = GroundedGenerator::new(backend, RetryPolicy::from(&config.engine));
    let sessions = Arc::new(SessionStore::new(config.session_ttl, config.max_sessions));

    // Periodically drop idle sessions.
    let purge_store = sessions.clone();
    let purge_every = config
        .session_ttl
        .clamp(Duration::from_secs(1), Duration::from_secs(300));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(purge_every);
        loop {
            interval.tick().await;
            let removed = purge_store.purge_expired().await;
            if removed > 0 {
                info!("Purged {removed} expired screening sessions");
            }
        }
    });

    let state = AppState {
        config: config.clone(),
        pipeline,
        generator,
        sessions,
    };

    let app = build_router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    );

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
