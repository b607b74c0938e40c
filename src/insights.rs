use serde::Serialize;

use crate::models::{round2, Lead, MetricsBundle};
use crate::stage::Stage;

pub const DEFAULT_OBJECTIONS: [&str; 3] = ["visa", "placement", "whatsapp"];
const SAMPLE_SUMMARIES: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageDropOff {
    pub from: Stage,
    pub to: Stage,
    pub drop_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectionMention {
    pub keyword: String,
    pub mentions: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insights {
    pub drop_offs: Vec<StageDropOff>,
    pub biggest_leak: Option<StageDropOff>,
    pub effective_counselors: Vec<String>,
    pub ineffective_counselors: Vec<String>,
    pub total_stuck: usize,
    pub objections: Vec<ObjectionMention>,
    pub sample_summaries: Vec<String>,
}

/// Derives the narrative insights from a computed bundle and the filtered
/// leads it was computed from.
pub fn derive(bundle: &MetricsBundle, filtered: &[Lead], objections: &[String]) -> Insights {
    let drop_offs = stage_drop_offs(bundle);
    let biggest_leak = biggest_leak(&drop_offs);
    let (effective_counselors, ineffective_counselors) = rank_counselors(bundle);

    Insights {
        drop_offs,
        biggest_leak,
        effective_counselors,
        ineffective_counselors,
        total_stuck: bundle.total_stuck,
        objections: count_objections(filtered, objections),
        sample_summaries: filtered
            .iter()
            .map(|lead| lead.summary.trim())
            .filter(|summary| !summary.is_empty())
            .take(SAMPLE_SUMMARIES)
            .map(str::to_string)
            .collect(),
    }
}

pub fn stage_drop_offs(bundle: &MetricsBundle) -> Vec<StageDropOff> {
    Stage::progression()
        .windows(2)
        .filter_map(|pair| {
            let from = bundle.leads_per_stage.get(pair[0]);
            let to = bundle.leads_per_stage.get(pair[1]);
            if from == 0 {
                return None;
            }
            Some(StageDropOff {
                from: pair[0],
                to: pair[1],
                drop_percent: round2((from as f64 - to as f64) / from as f64 * 100.0),
            })
        })
        .collect()
}

pub fn biggest_leak(drop_offs: &[StageDropOff]) -> Option<StageDropOff> {
    drop_offs
        .iter()
        .filter(|drop| drop.drop_percent > 0.0)
        .max_by(|a, b| {
            a.drop_percent
                .partial_cmp(&b.drop_percent)
                .unwrap_or(std::cmp::Ordering::Equal)
                // Earlier stage wins a tie.
                .then_with(|| b.from.cmp(&a.from))
        })
        .cloned()
}

/// Splits counselors against the population's overall conversion: at or above
/// it (with at least one enrollment) is effective, under half of it is not.
pub fn rank_counselors(bundle: &MetricsBundle) -> (Vec<String>, Vec<String>) {
    let overall = bundle.overall_conversion().conversion_percent;
    let mut effective = Vec::new();
    let mut ineffective = Vec::new();

    for (name, stats) in &bundle.counselor_stats {
        if stats.enrolled_leads > 0 && stats.conversion_percent >= overall {
            effective.push(name.clone());
        } else if stats.conversion_percent < overall / 2.0 {
            ineffective.push(name.clone());
        }
    }

    (effective, ineffective)
}

pub fn count_objections(filtered: &[Lead], keywords: &[String]) -> Vec<ObjectionMention> {
    let summaries: Vec<String> = filtered
        .iter()
        .map(|lead| lead.summary.to_lowercase())
        .collect();

    let mut mentions: Vec<ObjectionMention> = keywords
        .iter()
        .map(|keyword| keyword.trim().to_lowercase())
        .filter(|keyword| !keyword.is_empty())
        .map(|keyword| ObjectionMention {
            mentions: summaries
                .iter()
                .filter(|summary| summary.contains(&keyword))
                .count(),
            keyword,
        })
        .filter(|mention| mention.mentions > 0)
        .collect();

    mentions.sort_by(|a, b| {
        b.mentions
            .cmp(&a.mentions)
            .then_with(|| a.keyword.cmp(&b.keyword))
    });
    mentions.dedup_by(|a, b| a.keyword == b.keyword);
    mentions
}
