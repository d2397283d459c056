use anyhow::Context;
use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{NaiveDate, Utc};
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use weather_core::{DialogflowError, Fulfillment, WebhookRequest, WebhookResponse};

/// Source of "today" for date-relative intents.
pub type Today = Arc<dyn Fn() -> NaiveDate + Send + Sync>;

/// State shared across all routes
#[derive(Clone)]
pub struct AppState {
    pub fulfillment: Arc<Fulfillment>,
    pub today: Today,
}

impl AppState {
    pub fn new(fulfillment: Fulfillment) -> Self {
        Self {
            fulfillment: Arc::new(fulfillment),
            today: Arc::new(|| Utc::now().date_naive()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("Malformed webhook payload: {0}")]
    Payload(#[from] JsonRejection),

    #[error(transparent)]
    Dialogflow(#[from] DialogflowError),
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let status = match &self {
            WebhookError::Payload(_) | WebhookError::Dialogflow(_) => StatusCode::BAD_REQUEST,
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/webhook", post(webhook))
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn webhook(
    State(state): State<AppState>,
    payload: Result<Json<WebhookRequest>, JsonRejection>,
) -> Result<Json<WebhookResponse>, WebhookError> {
    let Json(payload) = payload.inspect_err(|err| {
        tracing::warn!(error = %err, "Rejecting malformed webhook payload");
    })?;

    let request = payload.to_intent_request().inspect_err(|err| {
        tracing::warn!(session = %payload.session, error = %err, "Rejecting webhook request");
    })?;

    tracing::debug!(
        session = %payload.session,
        response_id = %payload.response_id,
        intent = %request.intent,
        query = %request.query,
        "Webhook request"
    );

    let reply = state.fulfillment.dispatch(&request, (state.today)()).await;

    tracing::info!(
        session = %payload.session,
        intent = %request.intent,
        outcome = ?reply.outcome,
        "Turn fulfilled"
    );

    Ok(Json(WebhookResponse::from_reply(&reply, &payload.session)))
}

async fn healthz() -> &'static str {
    "ok"
}

/// Bind `addr` and serve until Ctrl-C.
pub async fn serve(addr: &str, state: AppState) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    let local_addr = listener.local_addr()?;

    tracing::info!("Webhook listening at http://{local_addr}/webhook");

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutting down");
}
