/// HTTP surface: a liveness probe and the payment gateway's settlement
/// webhook. The webhook body is treated as a hint only; settlement is
/// always re-verified against the gateway before any order is dispatched.
use std::sync::Arc;

use anyhow::Result;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::engine::Engine;

/// Settlement notification pushed by the payment gateway.
#[derive(Debug, Deserialize)]
pub struct PaymentCallback {
    pub tx_ref: String,
    #[serde(default)]
    pub status: Option<String>,
}

pub fn build_router(engine: Arc<Engine>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/webhook/payment", post(payment_webhook_handler))
        .with_state(engine)
}

async fn health_handler() -> &'static str {
    "ok"
}

/// POST /webhook/payment — confirm and finalize a transaction.
///
/// Responds 200 when settled (idempotently: repeats are fine), 202 when
/// the gateway does not yet report the transaction as settled.
async fn payment_webhook_handler(
    State(engine): State<Arc<Engine>>,
    Json(callback): Json<PaymentCallback>,
) -> StatusCode {
    info!(tx_ref = %callback.tx_ref, status = ?callback.status, "Payment webhook received");
    match engine.confirm_payment(&callback.tx_ref).await {
        Ok(true) => StatusCode::OK,
        Ok(false) => {
            warn!(tx_ref = %callback.tx_ref, "Webhook arrived but gateway does not confirm settlement");
            StatusCode::ACCEPTED
        }
        Err(e) => {
            error!(tx_ref = %callback.tx_ref, "Webhook verification failed: {e}");
            StatusCode::BAD_GATEWAY
        }
    }
}

/// Bind and serve in a background task.
pub async fn serve(engine: Arc<Engine>, host: &str, port: u16) -> Result<JoinHandle<()>> {
    let app = build_router(engine);
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("HTTP gateway listening on {addr}");

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("HTTP gateway error: {e}");
        }
    });
    Ok(handle)
}
