use std::collections::{BTreeMap, BTreeSet};

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::stage::{RecordedStage, Stage};

#[derive(Debug, Clone, PartialEq)]
pub struct Lead {
    pub lead_id: String,
    pub counselor: String,
    pub country: String,
    pub sales_stage: RecordedStage,
    pub stuck: bool,
    pub summary: String,
}

/// Accepted counselors and countries. A lead passes only when both its
/// counselor and its country are selected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSelection {
    pub counselors: BTreeSet<String>,
    pub countries: BTreeSet<String>,
}

impl FilterSelection {
    pub fn new<C, K>(counselors: C, countries: K) -> Self
    where
        C: IntoIterator,
        C::Item: Into<String>,
        K: IntoIterator,
        K::Item: Into<String>,
    {
        Self {
            counselors: counselors.into_iter().map(Into::into).collect(),
            countries: countries.into_iter().map(Into::into).collect(),
        }
    }

    /// Selects every counselor and country observed in `leads`.
    pub fn everything(leads: &[Lead]) -> Self {
        Self {
            counselors: leads.iter().map(|lead| lead.counselor.clone()).collect(),
            countries: leads.iter().map(|lead| lead.country.clone()).collect(),
        }
    }

    pub fn accepts(&self, lead: &Lead) -> bool {
        self.counselors.contains(&lead.counselor) && self.countries.contains(&lead.country)
    }
}

/// Per-stage counts with every stage present, in funnel order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageCounts {
    counts: [usize; Stage::COUNT],
}

impl StageCounts {
    pub fn get(&self, stage: Stage) -> usize {
        self.counts[stage.index()]
    }

    pub(crate) fn increment(&mut self, stage: Stage) {
        self.counts[stage.index()] += 1;
    }

    pub fn iter(&self) -> impl Iterator<Item = (Stage, usize)> + '_ {
        Stage::ALL
            .into_iter()
            .map(move |stage| (stage, self.get(stage)))
    }

    /// True when no lead sits in any stage.
    pub fn has_no_leads(&self) -> bool {
        self.total() == 0
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    pub fn max(&self) -> usize {
        self.counts.iter().copied().max().unwrap_or(0)
    }
}

impl Serialize for StageCounts {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Stage::COUNT))?;
        for (stage, count) in self.iter() {
            map.serialize_entry(stage.label(), &count)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct ConversionStats {
    pub total_leads: usize,
    pub enrolled_leads: usize,
    pub conversion_percent: f64,
}

impl ConversionStats {
    pub fn new(total_leads: usize, enrolled_leads: usize) -> Self {
        Self {
            total_leads,
            enrolled_leads,
            conversion_percent: conversion_percent(enrolled_leads, total_leads),
        }
    }
}

/// `enrolled / total * 100` rounded to two decimals; zero when `total` is zero.
pub fn conversion_percent(enrolled: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round2(enrolled as f64 / total as f64 * 100.0)
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct MetricsBundle {
    pub total_leads: usize,
    pub total_stuck: usize,
    pub unrecognized_stage_leads: usize,
    pub leads_per_stage: StageCounts,
    pub stuck_per_stage: StageCounts,
    pub counselor_stats: BTreeMap<String, ConversionStats>,
    pub country_stats: BTreeMap<String, ConversionStats>,
}

impl MetricsBundle {
    /// Conversion across the whole filtered population.
    pub fn overall_conversion(&self) -> ConversionStats {
        ConversionStats::new(
            self.total_leads,
            self.leads_per_stage.get(Stage::Enrolled),
        )
    }
}
