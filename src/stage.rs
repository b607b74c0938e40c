use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// A step in the sales funnel. Variants are declared in funnel order, so the
/// derived `Ord` is the progression order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Stage {
    #[serde(rename = "Untouched")]
    Untouched,
    #[serde(rename = "Prescheduled")]
    Prescheduled,
    #[serde(rename = "Intro Discussions")]
    IntroDiscussions,
    #[serde(rename = "Cost Discussions")]
    CostDiscussions,
    #[serde(rename = "Pitched")]
    Pitched,
    #[serde(rename = "Pitched & Processed")]
    PitchedAndProcessed,
    #[serde(rename = "Enrolled")]
    Enrolled,
    #[serde(rename = "Program Dead")]
    ProgramDead,
}

impl Stage {
    pub const COUNT: usize = 8;

    pub const ALL: [Stage; Stage::COUNT] = [
        Stage::Untouched,
        Stage::Prescheduled,
        Stage::IntroDiscussions,
        Stage::CostDiscussions,
        Stage::Pitched,
        Stage::PitchedAndProcessed,
        Stage::Enrolled,
        Stage::ProgramDead,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Stage::Untouched => "Untouched",
            Stage::Prescheduled => "Prescheduled",
            Stage::IntroDiscussions => "Intro Discussions",
            Stage::CostDiscussions => "Cost Discussions",
            Stage::Pitched => "Pitched",
            Stage::PitchedAndProcessed => "Pitched & Processed",
            Stage::Enrolled => "Enrolled",
            Stage::ProgramDead => "Program Dead",
        }
    }

    /// One-based position in the funnel (Untouched = 1, Program Dead = 8).
    pub fn rank(self) -> u8 {
        self.index() as u8 + 1
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }

    /// Stages a lead moves through on the way to enrollment. Program Dead is
    /// an exit, not a step.
    pub fn progression() -> &'static [Stage] {
        const PROGRESSION: &[Stage] = &[
            Stage::Untouched,
            Stage::Prescheduled,
            Stage::IntroDiscussions,
            Stage::CostDiscussions,
            Stage::Pitched,
            Stage::PitchedAndProcessed,
            Stage::Enrolled,
        ];
        PROGRESSION
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown sales stage '{0}'")]
pub struct UnknownStage(pub String);

impl FromStr for Stage {
    type Err = UnknownStage;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        Stage::ALL
            .iter()
            .copied()
            .find(|stage| stage.label().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnknownStage(trimmed.to_string()))
    }
}

/// The stage as recorded on a lead row. Labels outside the funnel are kept
/// so the lead still counts toward population totals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedStage {
    Known(Stage),
    Unrecognized(String),
}

impl RecordedStage {
    pub fn parse(label: &str) -> Self {
        match label.parse::<Stage>() {
            Ok(stage) => RecordedStage::Known(stage),
            Err(UnknownStage(raw)) => RecordedStage::Unrecognized(raw),
        }
    }

    pub fn known(&self) -> Option<Stage> {
        match self {
            RecordedStage::Known(stage) => Some(*stage),
            RecordedStage::Unrecognized(_) => None,
        }
    }

    pub fn is(&self, stage: Stage) -> bool {
        self.known() == Some(stage)
    }
}

impl From<Stage> for RecordedStage {
    fn from(stage: Stage) -> Self {
        RecordedStage::Known(stage)
    }
}
