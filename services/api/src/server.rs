use crate::cli::ServeArgs;
use crate::infra::{build_dashboard_service, connect, resolve_settings, AppState};
use crate::routes::with_service_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use lead_pulse::config::AppConfig;
use lead_pulse::error::AppError;
use lead_pulse::telemetry::{self, LogTarget};
use lead_pulse::workflows::bitrix::SettingsStore;
use lead_pulse::workflows::webhook::WebhookInbox;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry, LogTarget::Stdout)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));

    let settings_store = SettingsStore::new(config.crm.settings_path.clone());
    let settings = resolve_settings(&config.crm, &settings_store).await;
    let (active_settings, gateway) = match connect(settings.as_ref(), config.crm.request_timeout) {
        Some((settings, client)) => (Some(settings), Some(client)),
        None => (None, None),
    };
    let dashboard = Arc::new(build_dashboard_service(&config.crm, gateway));

    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        port: config.server.port,
        dashboard,
        settings_store,
        active_settings: Arc::new(RwLock::new(active_settings)),
        request_timeout: config.crm.request_timeout,
    };

    let app = with_service_routes(&app_state, WebhookInbox::default())
        .layer(Extension(app_state.clone()))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    let demo_mode = !app_state.dashboard.is_configured().await;
    info!(?config.environment, %addr, demo_mode, "lead dashboard service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
