use std::sync::Arc;

use chrono::{Duration, NaiveDateTime};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::demo::DemoLeadGenerator;
use super::domain::{Lead, Operator};
use super::period::{filter_by_period, start_of_day, DateRange, Period};
use super::report::{
    aggregate_leads, trend_over_days, DailyTrend, DashboardSnapshot, DataSource,
};
use crate::workflows::bitrix::{CrmError, CrmGateway};

/// Leads and operators from one load, tagged with where they came from.
#[derive(Debug, Clone)]
pub struct LeadLoad {
    pub leads: Vec<Lead>,
    pub operators: Vec<Operator>,
    pub data_source: DataSource,
    pub demo_reason: Option<String>,
}

/// Service composing the CRM gateway, the demo fallback and the report
/// pipeline behind the dashboard endpoints.
pub struct LeadDashboardService<G> {
    gateway: RwLock<Option<Arc<G>>>,
    demo: DemoLeadGenerator,
    demo_seed: Option<u64>,
}

impl<G> LeadDashboardService<G>
where
    G: CrmGateway + 'static,
{
    /// `None` means no CRM connection is configured; every load then serves
    /// demo data.
    pub fn new(gateway: Option<G>) -> Self {
        Self {
            gateway: RwLock::new(gateway.map(Arc::new)),
            demo: DemoLeadGenerator::default(),
            demo_seed: None,
        }
    }

    pub fn with_demo_generator(mut self, demo: DemoLeadGenerator) -> Self {
        self.demo = demo;
        self
    }

    /// Fix the random source used for demo leads and trend values.
    pub fn with_demo_seed(mut self, seed: Option<u64>) -> Self {
        self.demo_seed = seed;
        self
    }

    pub async fn replace_gateway(&self, gateway: Option<G>) {
        *self.gateway.write().await = gateway.map(Arc::new);
    }

    pub async fn is_configured(&self) -> bool {
        self.gateway.read().await.is_some()
    }

    /// Fetch leads and operators concurrently, falling back to demo data on
    /// any CRM failure or when no gateway is configured.
    pub async fn load_leads(&self, range: DateRange, now: NaiveDateTime) -> LeadLoad {
        let gateway = self.gateway.read().await.clone();
        let Some(gateway) = gateway else {
            debug!("Bitrix24 connection not configured, serving demo data");
            return self.demo_load(range, now, &CrmError::ConfigurationMissing);
        };

        let (leads, operators) = tokio::join!(gateway.fetch_leads(range), gateway.fetch_users());
        match (leads, operators) {
            (Ok(leads), Ok(operators)) => {
                info!(
                    leads = leads.len(),
                    operators = operators.len(),
                    "loaded leads from Bitrix24"
                );
                LeadLoad {
                    leads,
                    operators,
                    data_source: DataSource::Crm,
                    demo_reason: None,
                }
            }
            (Err(err), _) | (_, Err(err)) => {
                warn!(error = %err, "Bitrix24 unavailable, falling back to demo data");
                self.demo_load(range, now, &err)
            }
        }
    }

    /// Stage totals and operator breakdowns for `period` as of `now`.
    pub async fn snapshot(&self, period: Period, now: NaiveDateTime) -> DashboardSnapshot {
        let range = DateRange::since(period.lower_bound(now));
        let load = self.load_leads(range, now).await;
        let leads = filter_by_period(load.leads, period, now);

        let mut rng = self.rng();
        let aggregation = aggregate_leads(&leads, &load.operators, &mut rng);

        DashboardSnapshot {
            period,
            generated_at: now,
            data_source: load.data_source,
            demo_reason: load.demo_reason,
            total_leads: leads.len(),
            stages: aggregation.stages,
            operators_by_stage: aggregation.operators_by_stage,
        }
    }

    /// Per-day stage counts for the last `days` calendar days through `now`.
    pub async fn daily_trend(&self, days: u32, now: NaiveDateTime) -> DailyTrend {
        let today = now.date();
        let first_day = today - Duration::days(i64::from(days.max(1)) - 1);
        let load = self
            .load_leads(DateRange::since(start_of_day(first_day)), now)
            .await;

        DailyTrend {
            data_source: load.data_source,
            demo_reason: load.demo_reason,
            days: trend_over_days(&load.leads, days, today),
        }
    }

    fn demo_load(&self, range: DateRange, now: NaiveDateTime, reason: &CrmError) -> LeadLoad {
        let mut rng = self.rng();
        LeadLoad {
            leads: self.demo.generate_leads(range, now, &mut rng),
            operators: self.demo.operators().to_vec(),
            data_source: DataSource::Demo,
            demo_reason: Some(reason.to_string()),
        }
    }

    fn rng(&self) -> StdRng {
        match self.demo_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}
