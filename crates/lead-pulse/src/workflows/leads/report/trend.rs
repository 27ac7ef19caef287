use super::super::domain::Lead;
use super::views::DailyStageCounts;
use chrono::{Duration, NaiveDate};
use std::collections::HashMap;

/// Per-day stage counts for the `days` calendar days ending on `today`,
/// oldest first. Leads without a parsed creation time are left out.
pub fn trend_over_days(leads: &[Lead], days: u32, today: NaiveDate) -> Vec<DailyStageCounts> {
    let mut buckets: Vec<DailyStageCounts> = (0..i64::from(days))
        .rev()
        .map(|offset| DailyStageCounts::empty(today - Duration::days(offset)))
        .collect();

    let index: HashMap<NaiveDate, usize> = buckets
        .iter()
        .enumerate()
        .map(|(position, bucket)| (bucket.date, position))
        .collect();

    for lead in leads {
        let Some(created_at) = lead.created_at else {
            continue;
        };
        if let Some(&position) = index.get(&created_at.date()) {
            buckets[position].record(lead.stage());
        }
    }

    buckets
}
