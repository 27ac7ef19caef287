use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lead identifier as text; Bitrix24 sends ids either as strings or numbers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LeadId(pub String);

impl fmt::Display for LeadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Bitrix24 user id of the operator a lead is assigned to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperatorId(pub String);

impl fmt::Display for OperatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Pipeline buckets shown on the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Callback,
    Approval,
    Invited,
}

impl Stage {
    pub const fn ordered() -> [Stage; 3] {
        [Stage::Callback, Stage::Approval, Stage::Invited]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Stage::Callback => "Callback",
            Stage::Approval => "Awaiting approval",
            Stage::Invited => "Invited",
        }
    }

    /// Bitrix24 `STATUS_ID` backing the stage.
    pub const fn status_code(self) -> &'static str {
        match self {
            Stage::Callback => "IN_PROCESS",
            Stage::Approval => "PROCESSED",
            Stage::Invited => "CONVERTED",
        }
    }

    /// Map a CRM status code onto a stage. Codes outside the table land in
    /// [`Stage::Callback`].
    pub fn classify(status_code: &str) -> Self {
        let code = status_code.trim();
        Self::ordered()
            .into_iter()
            .find(|stage| stage.status_code() == code)
            .unwrap_or(Stage::Callback)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

pub fn classify(status_code: &str) -> Stage {
    Stage::classify(status_code)
}

/// A lead as fetched from the CRM. A fresh fetch replaces the whole set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Lead {
    pub id: LeadId,
    pub title: String,
    pub status_code: String,
    pub assigned_operator_id: Option<OperatorId>,
    /// Absent when the CRM sent a timestamp that could not be parsed.
    pub created_at: Option<NaiveDateTime>,
    pub modified_at: Option<NaiveDateTime>,
}

impl Lead {
    pub fn stage(&self) -> Stage {
        Stage::classify(&self.status_code)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Operator {
    pub id: OperatorId,
    pub full_name: String,
    pub department: String,
    pub is_online: bool,
    pub last_activity_at: Option<NaiveDateTime>,
}

impl Operator {
    pub fn status(&self) -> OperatorStatus {
        if self.is_online {
            OperatorStatus::Online
        } else {
            OperatorStatus::Offline
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatorStatus {
    Online,
    Offline,
}

impl OperatorStatus {
    pub const fn label(self) -> &'static str {
        match self {
            OperatorStatus::Online => "Online",
            OperatorStatus::Offline => "Offline",
        }
    }
}
