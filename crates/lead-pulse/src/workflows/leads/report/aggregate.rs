use super::super::domain::{Lead, Operator, OperatorId, Stage};
use super::views::{OperatorStageEntry, StageAggregate, StageOperators};
use rand::Rng;
use std::collections::HashMap;

/// Bound of the synthetic trend delta attached to operator entries.
pub const TREND_SPREAD: i32 = 15;

/// Stage totals and per-operator breakdowns for one lead set.
#[derive(Debug, Clone)]
pub struct LeadAggregation {
    pub stages: Vec<StageAggregate>,
    pub operators_by_stage: Vec<StageOperators>,
}

impl LeadAggregation {
    pub fn count(&self, stage: Stage) -> usize {
        self.stages
            .iter()
            .find(|aggregate| aggregate.stage == stage)
            .map_or(0, |aggregate| aggregate.count)
    }

    pub fn operators(&self, stage: Stage) -> &[OperatorStageEntry] {
        self.operators_by_stage
            .iter()
            .find(|entry| entry.stage == stage)
            .map(|entry| entry.operators.as_slice())
            .unwrap_or_default()
    }

    pub fn total(&self) -> usize {
        self.stages.iter().map(|aggregate| aggregate.count).sum()
    }
}

/// Group leads by stage and by assigned operator within each stage.
///
/// All three stages are always present. Leads whose operator is missing from
/// `operators` count toward stage totals only. Operator lists are sorted by
/// lead count descending; ties keep the order in which each operator first
/// appears among `leads`.
pub fn aggregate_leads<R>(leads: &[Lead], operators: &[Operator], rng: &mut R) -> LeadAggregation
where
    R: Rng + ?Sized,
{
    let lookup: HashMap<&OperatorId, &Operator> = operators
        .iter()
        .rev()
        .map(|operator| (&operator.id, operator))
        .collect();

    let mut stage_leads: HashMap<Stage, Vec<Lead>> = HashMap::new();
    let mut operator_counts: HashMap<(Stage, &OperatorId), usize> = HashMap::new();
    let mut first_seen: HashMap<Stage, Vec<&Operator>> = HashMap::new();

    for lead in leads {
        let stage = lead.stage();
        stage_leads.entry(stage).or_default().push(lead.clone());

        let Some(operator) = lead
            .assigned_operator_id
            .as_ref()
            .and_then(|operator_id| lookup.get(operator_id).copied())
        else {
            continue;
        };

        let count = operator_counts.entry((stage, &operator.id)).or_insert(0);
        if *count == 0 {
            first_seen.entry(stage).or_default().push(operator);
        }
        *count += 1;
    }

    let stages = Stage::ordered()
        .into_iter()
        .map(|stage| {
            let leads = stage_leads.remove(&stage).unwrap_or_default();
            StageAggregate {
                stage,
                label: stage.label(),
                count: leads.len(),
                leads,
            }
        })
        .collect();

    let operators_by_stage = Stage::ordered()
        .into_iter()
        .map(|stage| {
            let mut entries: Vec<OperatorStageEntry> = first_seen
                .remove(&stage)
                .unwrap_or_default()
                .into_iter()
                .map(|operator| OperatorStageEntry {
                    operator_id: operator.id.clone(),
                    name: operator.full_name.clone(),
                    department: operator.department.clone(),
                    status: operator.status(),
                    last_activity: operator.last_activity_at,
                    lead_count: operator_counts
                        .get(&(stage, &operator.id))
                        .copied()
                        .unwrap_or_default(),
                    trend: 0,
                })
                .collect();

            // stable: equal counts keep first-appearance order
            entries.sort_by(|left, right| right.lead_count.cmp(&left.lead_count));
            for entry in &mut entries {
                entry.trend = rng.gen_range(-TREND_SPREAD..=TREND_SPREAD);
            }

            StageOperators {
                stage,
                label: stage.label(),
                operators: entries,
            }
        })
        .collect();

    LeadAggregation {
        stages,
        operators_by_stage,
    }
}
