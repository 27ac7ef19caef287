use super::domain::Lead;
use chrono::{DateTime, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Bitrix24's native date-time text format.
pub const CRM_DATETIME_FORMAT: &str = "%d.%m.%Y %H:%M:%S";
const CRM_DATE_FORMAT: &str = "%d.%m.%Y";

const ISO_DATETIME_FORMATS: [&str; 3] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
];
const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

/// Reporting window selectable on the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Period {
    #[default]
    Today,
    Last7Days,
    Last30Days,
    Last90Days,
}

impl Period {
    /// Total parse: unrecognised values fall back to [`Period::Today`].
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "7days" => Self::Last7Days,
            "30days" => Self::Last30Days,
            "90days" => Self::Last90Days,
            _ => Self::Today,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Today => "today",
            Self::Last7Days => "7days",
            Self::Last30Days => "30days",
            Self::Last90Days => "90days",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Today => "Today",
            Self::Last7Days => "Last 7 days",
            Self::Last30Days => "Last 30 days",
            Self::Last90Days => "Last 90 days",
        }
    }

    pub const fn lookback_days(self) -> Option<i64> {
        match self {
            Self::Today => None,
            Self::Last7Days => Some(7),
            Self::Last30Days => Some(30),
            Self::Last90Days => Some(90),
        }
    }

    /// Earliest creation time a lead may have to fall inside the period.
    pub fn lower_bound(self, now: NaiveDateTime) -> NaiveDateTime {
        match self.lookback_days() {
            Some(days) => now - Duration::days(days),
            None => start_of_day(now.date()),
        }
    }
}

impl From<String> for Period {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<Period> for String {
    fn from(value: Period) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Creation-time window handed to the CRM; open ends are unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateRange {
    pub from: Option<NaiveDateTime>,
    pub to: Option<NaiveDateTime>,
}

impl DateRange {
    pub fn since(from: NaiveDateTime) -> Self {
        Self {
            from: Some(from),
            to: None,
        }
    }

    pub fn between(from: NaiveDateTime, to: NaiveDateTime) -> Self {
        Self {
            from: Some(from),
            to: Some(to),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognised CRM timestamp '{value}'")]
pub struct DateParseError {
    pub value: String,
}

/// Parse a CRM timestamp into local wall-clock time.
///
/// Accepts `DD.MM.YYYY HH:mm:ss` and `DD.MM.YYYY` as shown in the Bitrix24
/// UI, RFC 3339 as returned by the REST API (converted to local time), and
/// plain ISO dates or date-times without an offset.
pub fn parse_crm_timestamp(raw: &str) -> Result<NaiveDateTime, DateParseError> {
    let value = raw.trim();

    if let Ok(parsed) = NaiveDateTime::parse_from_str(value, CRM_DATETIME_FORMAT) {
        return Ok(parsed);
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, CRM_DATE_FORMAT) {
        return Ok(start_of_day(date));
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.with_timezone(&Local).naive_local());
    }
    for format in ISO_DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(parsed);
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, ISO_DATE_FORMAT) {
        return Ok(start_of_day(date));
    }

    Err(DateParseError {
        value: value.to_string(),
    })
}

pub(crate) fn start_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

/// Keep the leads created at or after the period's lower bound. There is no
/// upper bound, so future-dated leads pass; leads without a creation
/// timestamp never do.
pub fn filter_by_period(leads: Vec<Lead>, period: Period, now: NaiveDateTime) -> Vec<Lead> {
    let lower_bound = period.lower_bound(now);
    leads
        .into_iter()
        .filter(|lead| {
            lead.created_at
                .is_some_and(|created_at| created_at >= lower_bound)
        })
        .collect()
}
