use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chrono::Local;
use serde::Deserialize;

use super::period::Period;
use super::report::{DailyTrend, DashboardSnapshot};
use super::service::LeadDashboardService;
use crate::workflows::bitrix::CrmGateway;

pub const DEFAULT_TREND_DAYS: u32 = 7;
pub const MAX_TREND_DAYS: u32 = 90;

#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    #[serde(default)]
    pub period: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TrendQuery {
    #[serde(default)]
    pub days: Option<u32>,
}

/// Router builder exposing the dashboard read endpoints.
pub fn lead_router<G>(service: Arc<LeadDashboardService<G>>) -> Router
where
    G: CrmGateway + 'static,
{
    Router::new()
        .route("/api/v1/leads/dashboard", get(dashboard_handler::<G>))
        .route("/api/v1/leads/trend", get(trend_handler::<G>))
        .with_state(service)
}

pub(crate) async fn dashboard_handler<G>(
    State(service): State<Arc<LeadDashboardService<G>>>,
    Query(query): Query<DashboardQuery>,
) -> Json<DashboardSnapshot>
where
    G: CrmGateway + 'static,
{
    let period = query.period.as_deref().map(Period::parse).unwrap_or_default();
    let now = Local::now().naive_local();
    Json(service.snapshot(period, now).await)
}

pub(crate) async fn trend_handler<G>(
    State(service): State<Arc<LeadDashboardService<G>>>,
    Query(query): Query<TrendQuery>,
) -> Json<DailyTrend>
where
    G: CrmGateway + 'static,
{
    let days = query
        .days
        .unwrap_or(DEFAULT_TREND_DAYS)
        .clamp(1, MAX_TREND_DAYS);
    let now = Local::now().naive_local();
    Json(service.daily_trend(days, now).await)
}
