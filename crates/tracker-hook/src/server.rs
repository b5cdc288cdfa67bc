//! HTTP server for GitHub push webhooks.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, FromRequest, Request, State},
    http::{header::CONTENT_TYPE, StatusCode},
    response::Json,
    routing::get,
    Form, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::dispatch::PushDispatcher;
use crate::push::{PayloadError, PushEvent};

/// Largest webhook body accepted.
const MAX_BODY_BYTES: usize = 5 * 1024 * 1024;

/// Answer to a browser visiting the hook URL.
pub const INDEX_TEXT: &str =
    "Have your github webhook point here; bridge works automatically via POST";

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Push dispatcher.
    pub dispatcher: Arc<PushDispatcher>,
}

/// Classic form-encoded hook delivery.
#[derive(Debug, Deserialize)]
struct HookForm {
    payload: Option<String>,
}

/// Build the HTTP router for the hook service.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index).post(push_webhook))
        .route("/health", get(health_check))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `addr` and serve until Ctrl+C or SIGTERM.
///
/// # Errors
///
/// Returns an error if the server fails to bind or serve.
pub async fn run_server(state: AppState, addr: &str) -> std::io::Result<()> {
    let app = build_router(state);

    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "Tracker hook listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

/// Health check endpoint.
async fn health_check() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

async fn index() -> &'static str {
    INDEX_TEXT
}

/// Handle a push delivery.
///
/// Accepts either a form body with a `payload` field or a raw JSON body.
/// Outbound failures never reach the caller; the response only reports how
/// many story tags matched.
async fn push_webhook(
    State(state): State<AppState>,
    request: Request,
) -> Result<String, (StatusCode, String)> {
    let push = decode_push(request).await.map_err(|e| {
        warn!(error = %e, "Rejecting webhook delivery");
        (StatusCode::BAD_REQUEST, e.to_string())
    })?;

    info!(
        repository = %push.repository.name,
        git_ref = %push.ref_name,
        commits = push.commits.len(),
        "Received push"
    );

    let report = state.dispatcher.dispatch(&push).await;
    Ok(format!("Processed {} commits for stories", report.matches))
}

/// Errors turning a request into a push event.
#[derive(Debug, thiserror::Error)]
enum DecodeError {
    #[error(transparent)]
    Payload(#[from] PayloadError),

    #[error("Unreadable request body: {0}")]
    Body(String),
}

async fn decode_push(request: Request) -> Result<PushEvent, DecodeError> {
    let is_form = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/x-www-form-urlencoded"));

    if is_form {
        let Form(form) = Form::<HookForm>::from_request(request, &())
            .await
            .map_err(|e| DecodeError::Body(e.body_text()))?;
        return Ok(PushEvent::from_form_payload(form.payload.as_deref())?);
    }

    let body = Bytes::from_request(request, &())
        .await
        .map_err(|e| DecodeError::Body(e.body_text()))?;
    Ok(PushEvent::from_json(&body)?)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C, shutting down gracefully");
        },
        () = terminate => {
            info!("Received SIGTERM, shutting down gracefully");
        },
    }
}
