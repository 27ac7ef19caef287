//! Lead statistics pipeline: stage classification, period filtering, demo
//! data, aggregation and the dashboard service.

pub mod demo;
pub mod domain;
pub mod period;
pub mod report;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use demo::{demo_operators, DemoLeadGenerator, DEMO_LEAD_COUNT};
pub use domain::{classify, Lead, LeadId, Operator, OperatorId, OperatorStatus, Stage};
pub use period::{filter_by_period, parse_crm_timestamp, DateParseError, DateRange, Period};
pub use report::{
    aggregate_leads, trend_over_days, DailyStageCounts, DailyTrend, DashboardSnapshot,
    DataSource, LeadAggregation, OperatorStageEntry, StageAggregate, StageOperators,
};
pub use router::lead_router;
pub use service::{LeadDashboardService, LeadLoad};
