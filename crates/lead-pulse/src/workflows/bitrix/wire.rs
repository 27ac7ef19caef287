//! Raw Bitrix24 REST records and their conversion into domain values.

use crate::workflows::leads::domain::{Lead, LeadId, Operator, OperatorId};
use crate::workflows::leads::period::parse_crm_timestamp;
use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::debug;

/// Envelope shared by every REST method.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope {
    #[serde(default)]
    pub(crate) result: Option<Value>,
    #[serde(default)]
    pub(crate) next: Option<u64>,
    #[serde(default)]
    pub(crate) total: Option<u64>,
    #[serde(default)]
    pub(crate) error: Option<String>,
    #[serde(default)]
    pub(crate) error_description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub(crate) enum RowError {
    #[error("record is not an object: {0}")]
    Shape(String),
    #[error("record is missing {0}")]
    MissingField(&'static str),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub(crate) struct LeadRow {
    #[serde(default, deserialize_with = "text_or_number")]
    id: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    status_id: Option<String>,
    #[serde(default, deserialize_with = "text_or_number")]
    assigned_by_id: Option<String>,
    #[serde(default)]
    date_create: Option<String>,
    #[serde(default)]
    date_modify: Option<String>,
}

impl LeadRow {
    pub(crate) fn from_value(value: Value) -> Result<Self, RowError> {
        serde_json::from_value(value).map_err(|err| RowError::Shape(err.to_string()))
    }

    pub(crate) fn into_lead(self) -> Result<Lead, RowError> {
        let id = self.id.ok_or(RowError::MissingField("ID"))?;
        // blank statuses classify as callback like any unmapped code
        let status_code = self.status_id.unwrap_or_default().trim().to_string();

        Ok(Lead {
            title: self.title.unwrap_or_default(),
            status_code,
            assigned_operator_id: self.assigned_by_id.map(OperatorId),
            created_at: timestamp(&id, "DATE_CREATE", self.date_create.as_deref()),
            modified_at: timestamp(&id, "DATE_MODIFY", self.date_modify.as_deref()),
            id: LeadId(id),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub(crate) struct UserRow {
    #[serde(default, deserialize_with = "text_or_number")]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    last_name: Option<String>,
    #[serde(default)]
    work_department: Option<String>,
    #[serde(default)]
    work_position: Option<String>,
    #[serde(default)]
    is_online: Option<Value>,
    #[serde(default)]
    last_activity_date: Option<String>,
}

impl UserRow {
    pub(crate) fn from_value(value: Value) -> Result<Self, RowError> {
        serde_json::from_value(value).map_err(|err| RowError::Shape(err.to_string()))
    }

    pub(crate) fn into_operator(self) -> Result<Operator, RowError> {
        let id = self.id.ok_or(RowError::MissingField("ID"))?;

        let full_name = [self.name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        let full_name = if full_name.is_empty() {
            format!("Operator {id}")
        } else {
            full_name
        };

        let department = [self.work_department, self.work_position]
            .into_iter()
            .flatten()
            .map(|value| value.trim().to_string())
            .find(|value| !value.is_empty())
            .unwrap_or_default();

        let is_online = match self.is_online {
            Some(Value::Bool(flag)) => flag,
            Some(Value::String(flag)) => flag.eq_ignore_ascii_case("y"),
            _ => false,
        };

        Ok(Operator {
            last_activity_at: timestamp(&id, "LAST_ACTIVITY_DATE", self.last_activity_date.as_deref()),
            id: OperatorId(id),
            full_name,
            department,
            is_online,
        })
    }
}

fn timestamp(record_id: &str, field: &'static str, raw: Option<&str>) -> Option<NaiveDateTime> {
    let raw = raw.filter(|value| !value.trim().is_empty())?;
    match parse_crm_timestamp(raw) {
        Ok(parsed) => Some(parsed),
        Err(err) => {
            debug!(record_id, field, error = %err, "dropping unparsable timestamp");
            None
        }
    }
}

/// Bitrix24 sends identifiers as either JSON strings or numbers.
fn text_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(text)) if !text.trim().is_empty() => Some(text.trim().to_string()),
        Some(Value::Number(number)) => Some(number.to_string()),
        _ => None,
    })
}
