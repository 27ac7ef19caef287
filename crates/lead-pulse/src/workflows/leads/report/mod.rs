mod aggregate;
mod trend;
pub mod views;

pub use aggregate::{aggregate_leads, LeadAggregation, TREND_SPREAD};
pub use trend::trend_over_days;
pub use views::{
    DailyStageCounts, DailyTrend, DashboardSnapshot, DataSource, OperatorStageEntry,
    StageAggregate, StageOperators,
};
