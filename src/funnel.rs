use std::collections::BTreeMap;

use tracing::debug;

use crate::models::{ConversionStats, FilterSelection, Lead, MetricsBundle, StageCounts};
use crate::stage::Stage;

pub fn filter(leads: &[Lead], selection: &FilterSelection) -> Vec<Lead> {
    leads
        .iter()
        .filter(|lead| selection.accepts(lead))
        .cloned()
        .collect()
}

/// Leads per stage. Stages nobody sits in report zero; leads carrying an
/// unrecognized stage label are left out.
pub fn count_by_stage(leads: &[Lead]) -> StageCounts {
    tally(leads.iter())
}

pub fn count_stuck_by_stage(leads: &[Lead]) -> StageCounts {
    tally(leads.iter().filter(|lead| lead.stuck))
}

fn tally<'a>(leads: impl Iterator<Item = &'a Lead>) -> StageCounts {
    let mut counts = StageCounts::default();
    for lead in leads {
        if let Some(stage) = lead.sales_stage.known() {
            counts.increment(stage);
        }
    }
    counts
}

pub fn conversion_by<F>(leads: &[Lead], key_fn: F) -> BTreeMap<String, ConversionStats>
where
    F: Fn(&Lead) -> &str,
{
    let mut groups: BTreeMap<String, (usize, usize)> = BTreeMap::new();

    for lead in leads {
        let entry = groups.entry(key_fn(lead).to_string()).or_insert((0, 0));
        entry.0 += 1;
        if lead.sales_stage.is(Stage::Enrolled) {
            entry.1 += 1;
        }
    }

    groups
        .into_iter()
        .map(|(key, (total, enrolled))| (key, ConversionStats::new(total, enrolled)))
        .collect()
}

pub fn compute_metrics(leads: &[Lead], selection: &FilterSelection) -> MetricsBundle {
    let filtered = filter(leads, selection);
    debug!(
        total = leads.len(),
        selected = filtered.len(),
        counselors = selection.counselors.len(),
        countries = selection.countries.len(),
        "filtered lead population"
    );
    summarize(&filtered)
}

/// Aggregates an already-filtered population.
pub fn summarize(filtered: &[Lead]) -> MetricsBundle {
    let leads_per_stage = count_by_stage(filtered);
    let stuck_per_stage = count_stuck_by_stage(filtered);

    MetricsBundle {
        total_leads: filtered.len(),
        total_stuck: filtered.iter().filter(|lead| lead.stuck).count(),
        unrecognized_stage_leads: filtered.len() - leads_per_stage.total(),
        leads_per_stage,
        stuck_per_stage,
        counselor_stats: conversion_by(filtered, |lead| lead.counselor.as_str()),
        country_stats: conversion_by(filtered, |lead| lead.country.as_str()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::RecordedStage;

    fn lead(id: &str, counselor: &str, country: &str, stage: Stage, stuck: bool) -> Lead {
        Lead {
            lead_id: id.to_string(),
            counselor: counselor.to_string(),
            country: country.to_string(),
            sales_stage: stage.into(),
            stuck,
            summary: String::new(),
        }
    }

    fn sample_leads() -> Vec<Lead> {
        vec![
            lead("L1", "Cynthia", "India", Stage::Enrolled, false),
            lead("L2", "Cynthia", "Nepal", Stage::Pitched, true),
            lead("L3", "Brian", "India", Stage::CostDiscussions, true),
            lead("L4", "Brian", "India", Stage::CostDiscussions, false),
            lead("L5", "Deepak", "Nepal", Stage::Enrolled, false),
            lead("L6", "Deepak", "India", Stage::Untouched, true),
            lead("L7", "Grace", "Kenya", Stage::ProgramDead, false),
        ]
    }

    #[test]
    fn two_lead_example_produces_expected_bundle() {
        let leads = vec![
            lead("1", "A", "US", Stage::Enrolled, false),
            lead("2", "A", "US", Stage::Pitched, true),
        ];
        let selection = FilterSelection::new(["A"], ["US"]);
        let bundle = compute_metrics(&leads, &selection);

        for (stage, count) in bundle.leads_per_stage.iter() {
            let expected = matches!(stage, Stage::Enrolled | Stage::Pitched) as usize;
            assert_eq!(count, expected, "leads at {stage}");
        }
        for (stage, count) in bundle.stuck_per_stage.iter() {
            let expected = (stage == Stage::Pitched) as usize;
            assert_eq!(count, expected, "stuck at {stage}");
        }
        assert_eq!(
            bundle.counselor_stats["A"],
            ConversionStats {
                total_leads: 2,
                enrolled_leads: 1,
                conversion_percent: 50.0,
            }
        );
    }

    #[test]
    fn empty_selection_yields_zeroed_metrics() {
        let leads = sample_leads();
        let selection = FilterSelection::new(Vec::<String>::new(), ["India", "Nepal"]);
        let bundle = compute_metrics(&leads, &selection);

        assert_eq!(bundle.total_leads, 0);
        assert_eq!(bundle.leads_per_stage.iter().count(), Stage::COUNT);
        assert!(bundle.leads_per_stage.iter().all(|(_, count)| count == 0));
        assert!(bundle.counselor_stats.is_empty());
        assert!(bundle.country_stats.is_empty());
    }

    #[test]
    fn filter_is_a_conjunction() {
        let leads = sample_leads();
        let selection = FilterSelection::new(["Cynthia", "Brian", "Nobody"], ["India"]);
        let filtered = filter(&leads, &selection);

        let ids: Vec<&str> = filtered.iter().map(|lead| lead.lead_id.as_str()).collect();
        assert_eq!(ids, vec!["L1", "L3", "L4"]);
        assert!(filtered.iter().all(|lead| selection.accepts(lead)));
    }

    #[test]
    fn stage_counts_partition_the_population() {
        let leads = sample_leads();
        let counts = count_by_stage(&leads);
        let stuck = count_stuck_by_stage(&leads);

        assert_eq!(counts.iter().count(), 8);
        assert_eq!(counts.total(), leads.len());
        assert_eq!(counts.get(Stage::CostDiscussions), 2);
        assert_eq!(counts.get(Stage::Prescheduled), 0);
        for stage in Stage::ALL {
            assert!(stuck.get(stage) <= counts.get(stage));
        }
        assert_eq!(stuck.total(), 3);
    }

    #[test]
    fn empty_population_still_reports_every_stage() {
        let counts = count_by_stage(&[]);
        assert_eq!(counts.iter().count(), 8);
        assert!(counts.has_no_leads());
    }

    #[test]
    fn conversion_groups_by_key() {
        let leads = sample_leads();
        let by_country = conversion_by(&leads, |lead| lead.country.as_str());

        assert_eq!(by_country.len(), 3);
        assert_eq!(by_country["India"], ConversionStats::new(4, 1));
        assert_eq!(by_country["India"].conversion_percent, 25.0);
        assert_eq!(by_country["Nepal"].conversion_percent, 50.0);
        assert_eq!(by_country["Kenya"].conversion_percent, 0.0);

        for stats in by_country.values() {
            assert!(stats.total_leads >= 1);
            assert!((0.0..=100.0).contains(&stats.conversion_percent));
        }
    }

    #[test]
    fn aggregation_is_idempotent() {
        let leads = sample_leads();
        let selection = FilterSelection::everything(&leads);
        assert_eq!(
            compute_metrics(&leads, &selection),
            compute_metrics(&leads, &selection)
        );
    }

    #[test]
    fn unrecognized_stages_stay_in_totals_only() {
        let mut leads = sample_leads();
        leads.push(Lead {
            sales_stage: RecordedStage::Unrecognized("On Hold".to_string()),
            stuck: true,
            ..lead("L8", "Grace", "Kenya", Stage::Untouched, false)
        });

        let bundle = compute_metrics(&leads, &FilterSelection::everything(&leads));
        assert_eq!(bundle.total_leads, 8);
        assert_eq!(bundle.unrecognized_stage_leads, 1);
        assert_eq!(bundle.leads_per_stage.total(), 7);
        assert_eq!(bundle.stuck_per_stage.total(), 3);
        assert_eq!(bundle.total_stuck, 4);
        assert_eq!(bundle.counselor_stats["Grace"], ConversionStats::new(2, 0));
    }
}
