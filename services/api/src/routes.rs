use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use chrono::Utc;
use lead_pulse::error::AppError;
use lead_pulse::workflows::bitrix::{BitrixClient, CrmGateway, CrmSettings};
use lead_pulse::workflows::leads::lead_router;
use lead_pulse::workflows::webhook::{webhook_router, WebhookInbox};
use serde_json::json;
use std::sync::atomic::Ordering;
use tracing::{info, warn};

pub(crate) fn with_service_routes(state: &AppState, inbox: WebhookInbox) -> Router {
    lead_router(state.dashboard.clone())
        .merge(webhook_router(inbox))
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .route(
            "/api/v1/crm/settings",
            get(settings_endpoint).put(save_settings_endpoint),
        )
        .route("/api/v1/crm/settings/test", post(test_settings_endpoint))
}

pub(crate) async fn healthcheck(Extension(state): Extension<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "message": "lead dashboard service is running",
        "port": state.port,
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Current connection settings with the webhook secret masked.
pub(crate) async fn settings_endpoint(Extension(state): Extension<AppState>) -> Response {
    match state.active_settings.read().await.as_ref() {
        Some(settings) => Json(settings.masked()).into_response(),
        None => Json(json!({ "configured": false })).into_response(),
    }
}

pub(crate) async fn save_settings_endpoint(
    Extension(state): Extension<AppState>,
    Json(settings): Json<CrmSettings>,
) -> Result<Response, AppError> {
    let settings = settings.validated()?;
    let client = BitrixClient::with_timeout(&settings, state.request_timeout)?;
    activate(&state, settings.clone(), client).await?;

    Ok(Json(settings.masked()).into_response())
}

/// Probe the portal with `user.get` before saving. A CRM failure is reported
/// in the body and leaves the current settings untouched.
pub(crate) async fn test_settings_endpoint(
    Extension(state): Extension<AppState>,
    Json(settings): Json<CrmSettings>,
) -> Result<Response, AppError> {
    let settings = settings.validated()?;
    let client = BitrixClient::with_timeout(&settings, state.request_timeout)?;

    match client.fetch_users().await {
        Ok(operators) => {
            activate(&state, settings.clone(), client).await?;
            Ok(Json(json!({
                "ok": true,
                "operators": operators.len(),
                "settings": settings.masked(),
            }))
            .into_response())
        }
        Err(err) => {
            warn!(domain = %settings.domain, error = %err, "Bitrix24 connection test failed");
            Ok((
                StatusCode::BAD_GATEWAY,
                Json(json!({ "ok": false, "error": err.to_string() })),
            )
                .into_response())
        }
    }
}

async fn activate(
    state: &AppState,
    settings: CrmSettings,
    client: BitrixClient,
) -> Result<(), AppError> {
    state.settings_store.save(&settings).await?;
    state.dashboard.replace_gateway(Some(client)).await;
    info!(
        domain = %settings.domain,
        path = %state.settings_store.path().display(),
        "Bitrix24 settings saved"
    );
    *state.active_settings.write().await = Some(settings);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::build_dashboard_service;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use lead_pulse::config::CrmConfig;
    use lead_pulse::workflows::bitrix::SettingsStore;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use serde_json::Value;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio::sync::RwLock;
    use tower::ServiceExt;

    fn test_state(dir: &TempDir) -> AppState {
        let config = CrmConfig {
            settings: None,
            settings_path: dir.path().join("crm.json"),
            demo_seed: Some(7),
            request_timeout: Duration::from_secs(1),
        };
        AppState {
            readiness: Arc::new(AtomicBool::new(true)),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
            port: 3000,
            dashboard: Arc::new(build_dashboard_service(&config, None)),
            settings_store: SettingsStore::new(config.settings_path.clone()),
            active_settings: Arc::new(RwLock::new(None)),
            request_timeout: config.request_timeout,
        }
    }

    fn app(state: &AppState) -> Router {
        with_service_routes(state, WebhookInbox::default()).layer(Extension(state.clone()))
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.expect("request handled");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body reads");
        (status, serde_json::from_slice(&bytes).expect("json body"))
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request builds")
    }

    #[tokio::test]
    async fn health_reports_port_and_timestamp() {
        let dir = tempfile::tempdir().expect("temp dir");
        let state = test_state(&dir);
        let request = Request::get("/health").body(Body::empty()).expect("request");

        let (status, body) = send(app(&state), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["port"], 3000);
        assert!(body["timestamp"].as_str().is_some());
    }

    #[tokio::test]
    async fn readiness_reflects_flag() {
        let dir = tempfile::tempdir().expect("temp dir");
        let state = test_state(&dir);
        state.readiness.store(false, Ordering::Release);
        let request = Request::get("/ready").body(Body::empty()).expect("request");

        let (status, body) = send(app(&state), request).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "initializing");
    }

    #[tokio::test]
    async fn settings_start_unconfigured() {
        let dir = tempfile::tempdir().expect("temp dir");
        let state = test_state(&dir);
        let request = Request::get("/api/v1/crm/settings")
            .body(Body::empty())
            .expect("request");

        let (status, body) = send(app(&state), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["configured"], false);
    }

    #[tokio::test]
    async fn saving_settings_persists_and_masks_the_webhook() {
        let dir = tempfile::tempdir().expect("temp dir");
        let state = test_state(&dir);
        let request = json_request(
            "PUT",
            "/api/v1/crm/settings",
            json!({ "domain": "https://Acme.Bitrix24.ru/", "webhook": "/1/abcdef123/", "userId": "7" }),
        );

        let (status, body) = send(app(&state), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["domain"], "acme.bitrix24.ru");
        assert_eq!(body["webhook"], "****f123");
        assert_eq!(body["user_id"], "7");

        assert!(state.dashboard.is_configured().await);
        let saved = state
            .settings_store
            .load()
            .await
            .expect("store readable")
            .expect("settings saved");
        assert_eq!(saved.webhook, "1/abcdef123");

        let request = Request::get("/api/v1/crm/settings")
            .body(Body::empty())
            .expect("request");
        let (_, body) = send(app(&state), request).await;
        assert_eq!(body["configured"], true);
        assert_eq!(body["webhook"], "****f123");
    }

    #[tokio::test]
    async fn foreign_domains_are_rejected_without_saving() {
        let dir = tempfile::tempdir().expect("temp dir");
        let state = test_state(&dir);

        for uri in ["/api/v1/crm/settings", "/api/v1/crm/settings/test"] {
            let method = if uri.ends_with("test") { "POST" } else { "PUT" };
            let request = json_request(
                method,
                uri,
                json!({ "domain": "evil.example.com", "webhook": "1/token" }),
            );
            let (status, body) = send(app(&state), request).await;
            assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
            assert!(body["error"]
                .as_str()
                .expect("error message")
                .contains("evil.example.com"));
        }

        assert!(!state.dashboard.is_configured().await);
        assert!(state
            .settings_store
            .load()
            .await
            .expect("store readable")
            .is_none());
    }

    #[tokio::test]
    async fn dashboard_serves_demo_data_until_configured() {
        let dir = tempfile::tempdir().expect("temp dir");
        let state = test_state(&dir);
        let request = Request::get("/api/v1/leads/dashboard?period=30days")
            .body(Body::empty())
            .expect("request");

        let (status, body) = send(app(&state), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data_source"], "demo");
        assert_eq!(body["period"], "30days");
        assert_eq!(body["stages"].as_array().map(Vec::len), Some(3));
    }
}
