use super::super::domain::{Lead, OperatorId, OperatorStatus, Stage};
use super::super::period::Period;
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct StageAggregate {
    pub stage: Stage,
    pub label: &'static str,
    pub count: usize,
    pub leads: Vec<Lead>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperatorStageEntry {
    pub operator_id: OperatorId,
    pub name: String,
    pub department: String,
    pub status: OperatorStatus,
    pub last_activity: Option<NaiveDateTime>,
    pub lead_count: usize,
    /// Synthetic placeholder delta, not a historical comparison.
    pub trend: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct StageOperators {
    pub stage: Stage,
    pub label: &'static str,
    pub operators: Vec<OperatorStageEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyStageCounts {
    pub date: NaiveDate,
    pub callback: usize,
    pub approval: usize,
    pub invited: usize,
    pub total: usize,
}

impl DailyStageCounts {
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            callback: 0,
            approval: 0,
            invited: 0,
            total: 0,
        }
    }

    pub fn count(&self, stage: Stage) -> usize {
        match stage {
            Stage::Callback => self.callback,
            Stage::Approval => self.approval,
            Stage::Invited => self.invited,
        }
    }

    pub(crate) fn record(&mut self, stage: Stage) {
        match stage {
            Stage::Callback => self.callback += 1,
            Stage::Approval => self.approval += 1,
            Stage::Invited => self.invited += 1,
        }
        self.total += 1;
    }
}

/// Where the figures on a dashboard response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    Crm,
    Demo,
}

impl DataSource {
    pub const fn label(self) -> &'static str {
        match self {
            DataSource::Crm => "Bitrix24",
            DataSource::Demo => "Demo data",
        }
    }

    pub const fn is_demo(self) -> bool {
        matches!(self, DataSource::Demo)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    pub period: Period,
    pub generated_at: NaiveDateTime,
    pub data_source: DataSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub demo_reason: Option<String>,
    pub total_leads: usize,
    pub stages: Vec<StageAggregate>,
    pub operators_by_stage: Vec<StageOperators>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DailyTrend {
    pub data_source: DataSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub demo_reason: Option<String>,
    pub days: Vec<DailyStageCounts>,
}
