use lead_pulse::config::CrmConfig;
use lead_pulse::workflows::bitrix::{BitrixClient, CrmSettings, SettingsStore};
use lead_pulse::workflows::leads::{LeadDashboardService, Period};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{info, warn};

pub(crate) type DashboardService = LeadDashboardService<BitrixClient>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) port: u16,
    pub(crate) dashboard: Arc<DashboardService>,
    pub(crate) settings_store: SettingsStore,
    pub(crate) active_settings: Arc<RwLock<Option<CrmSettings>>>,
    pub(crate) request_timeout: Duration,
}

/// Saved settings win over the environment. An unreadable settings file is
/// logged and ignored.
pub(crate) async fn resolve_settings(
    config: &CrmConfig,
    store: &SettingsStore,
) -> Option<CrmSettings> {
    match store.load().await {
        Ok(Some(saved)) => Some(saved),
        Ok(None) => config.settings.clone(),
        Err(err) => {
            warn!(error = %err, "ignoring unreadable Bitrix24 settings file");
            config.settings.clone()
        }
    }
}

/// Build a client for `settings`, or `None` when they are missing or fail
/// validation.
pub(crate) fn connect(
    settings: Option<&CrmSettings>,
    timeout: Duration,
) -> Option<(CrmSettings, BitrixClient)> {
    let settings = settings?;
    let validated = match settings.validated() {
        Ok(validated) => validated,
        Err(err) => {
            warn!(error = %err, "Bitrix24 settings rejected, dashboard will run on demo data");
            return None;
        }
    };

    match BitrixClient::with_timeout(&validated, timeout) {
        Ok(client) => {
            info!(domain = %validated.domain, "Bitrix24 client configured");
            Some((validated, client))
        }
        Err(err) => {
            warn!(error = %err, "unable to build Bitrix24 client");
            None
        }
    }
}

pub(crate) fn build_dashboard_service(
    config: &CrmConfig,
    gateway: Option<BitrixClient>,
) -> DashboardService {
    LeadDashboardService::new(gateway).with_demo_seed(config.demo_seed)
}

pub(crate) fn parse_period(raw: &str) -> Result<Period, String> {
    Ok(Period::parse(raw))
}
