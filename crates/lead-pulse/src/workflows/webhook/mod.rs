//! Receiver for Bitrix24 outbound webhooks.
//!
//! Only the most recent delivery is kept, in memory, for display. Deliveries
//! are not authenticated or validated and do not survive a restart.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebhookDelivery {
    pub received_at: DateTime<Utc>,
    pub payload: Value,
}

/// Last-writer-wins slot for the latest webhook payload.
#[derive(Debug, Clone, Default)]
pub struct WebhookInbox {
    latest: Arc<RwLock<Option<WebhookDelivery>>>,
}

impl WebhookInbox {
    pub async fn record(&self, payload: Value) -> WebhookDelivery {
        let delivery = WebhookDelivery {
            received_at: Utc::now(),
            payload,
        };
        *self.latest.write().await = Some(delivery.clone());
        delivery
    }

    pub async fn latest(&self) -> Option<WebhookDelivery> {
        self.latest.read().await.clone()
    }
}

pub fn webhook_router(inbox: WebhookInbox) -> Router {
    Router::new()
        .route("/bitrix-webhook", post(receive_handler))
        .route("/data", get(latest_handler))
        .with_state(inbox)
}

/// Bitrix24 posts form-encoded bodies by default; anything that is not JSON
/// is kept verbatim as a string.
pub(crate) async fn receive_handler(State(inbox): State<WebhookInbox>, body: Bytes) -> Response {
    let payload = serde_json::from_slice::<Value>(&body)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body).into_owned()));
    let delivery = inbox.record(payload).await;

    info!(received_at = %delivery.received_at, bytes = body.len(), "stored Bitrix24 webhook payload");

    (
        StatusCode::OK,
        Json(json!({
            "status": "received",
            "received_at": delivery.received_at,
        })),
    )
        .into_response()
}

pub(crate) async fn latest_handler(State(inbox): State<WebhookInbox>) -> Json<Value> {
    match inbox.latest().await {
        Some(delivery) => Json(json!({
            "status": "ok",
            "received_at": delivery.received_at,
            "payload": delivery.payload,
        })),
        None => Json(json!({
            "status": "waiting",
            "message": "no webhook payload received yet",
        })),
    }
}
