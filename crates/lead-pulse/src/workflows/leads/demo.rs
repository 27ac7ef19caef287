use super::domain::{Lead, LeadId, Operator, OperatorId, Stage};
use super::period::DateRange;
use chrono::{Duration, NaiveDateTime};
use rand::Rng;

/// Number of synthetic leads produced per demo load.
pub const DEMO_LEAD_COUNT: usize = 75;
/// Window covered when the caller does not bound the demo data.
pub const DEMO_LOOKBACK_DAYS: i64 = 90;

const DEMO_ROSTER: [(&str, &str, &str, bool); 5] = [
    ("101", "Anna Sokolova", "Recruitment", true),
    ("102", "Dmitry Volkov", "Recruitment", false),
    ("103", "Elena Morozova", "Call centre", true),
    ("104", "Pavel Orlov", "Call centre", true),
    ("105", "Irina Kuznetsova", "Partnerships", false),
];

const DEMO_TITLES: [&str; 6] = [
    "Website inquiry",
    "Job board application",
    "Referral",
    "Inbound call",
    "Social media response",
    "Walk-in candidate",
];

/// Produces synthetic leads with the same shape as CRM records so the
/// dashboard stays usable in demo mode.
#[derive(Debug, Clone)]
pub struct DemoLeadGenerator {
    operators: Vec<Operator>,
    lead_count: usize,
}

impl Default for DemoLeadGenerator {
    fn default() -> Self {
        Self::new(demo_operators())
    }
}

impl DemoLeadGenerator {
    pub fn new(operators: Vec<Operator>) -> Self {
        Self {
            operators,
            lead_count: DEMO_LEAD_COUNT,
        }
    }

    pub fn operators(&self) -> &[Operator] {
        &self.operators
    }

    /// Generate leads created uniformly across `range`. Missing bounds
    /// default to the last [`DEMO_LOOKBACK_DAYS`] days through `now`.
    pub fn generate_leads<R>(&self, range: DateRange, now: NaiveDateTime, rng: &mut R) -> Vec<Lead>
    where
        R: Rng + ?Sized,
    {
        let to = range.to.unwrap_or(now);
        let from = range
            .from
            .unwrap_or(now - Duration::days(DEMO_LOOKBACK_DAYS))
            .min(to);
        let span_seconds = (to - from).num_seconds().max(0);

        (1..=self.lead_count)
            .map(|sequence| {
                let created_at = from + Duration::seconds(rng.gen_range(0..=span_seconds));
                let stage = Stage::ordered()[rng.gen_range(0..Stage::ordered().len())];
                let title = DEMO_TITLES[rng.gen_range(0..DEMO_TITLES.len())];
                let assigned_operator_id = if self.operators.is_empty() {
                    None
                } else {
                    let index = rng.gen_range(0..self.operators.len());
                    Some(self.operators[index].id.clone())
                };

                Lead {
                    id: LeadId(format!("demo-{sequence:03}")),
                    title: format!("{title} #{sequence}"),
                    status_code: stage.status_code().to_string(),
                    assigned_operator_id,
                    created_at: Some(created_at),
                    modified_at: Some(created_at),
                }
            })
            .collect()
    }
}

/// Fixed roster used to populate per-operator views in demo mode.
pub fn demo_operators() -> Vec<Operator> {
    DEMO_ROSTER
        .iter()
        .map(|(id, name, department, online)| Operator {
            id: OperatorId((*id).to_string()),
            full_name: (*name).to_string(),
            department: (*department).to_string(),
            is_online: *online,
            last_activity_at: None,
        })
        .collect()
}
