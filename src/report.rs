use std::collections::BTreeMap;
use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::insights::Insights;
use crate::models::{ConversionStats, MetricsBundle};

const BAR_WIDTH: usize = 40;

pub fn build_report(
    scope: &str,
    generated_at: DateTime<Utc>,
    bundle: &MetricsBundle,
    insights: &Insights,
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Lead Movement Tracker Report");
    let _ = writeln!(
        output,
        "Generated for {} at {} ({} leads)",
        scope,
        generated_at.format("%Y-%m-%d %H:%M UTC"),
        bundle.total_leads
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Leads per Stage");

    if bundle.total_leads == 0 {
        let _ = writeln!(output, "No leads match the current filters.");
    } else {
        let _ = writeln!(output, "| Stage | Leads | Stuck |");
        let _ = writeln!(output, "| --- | ---: | ---: |");
        for (stage, count) in bundle.leads_per_stage.iter() {
            let _ = writeln!(
                output,
                "| {} | {} | {} |",
                stage,
                count,
                bundle.stuck_per_stage.get(stage)
            );
        }
        if bundle.unrecognized_stage_leads > 0 {
            let _ = writeln!(
                output,
                "\n{} leads carry an unrecognized sales stage and are excluded from the table.",
                bundle.unrecognized_stage_leads
            );
        }
    }

    write_conversion_section(&mut output, "Counselor", &bundle.counselor_stats);
    write_conversion_section(&mut output, "Country", &bundle.country_stats);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Key Insights");
    match &insights.biggest_leak {
        Some(leak) => {
            let _ = writeln!(
                output,
                "- Biggest leak: {} -> {} ({:.2}% drop-off)",
                leak.from, leak.to, leak.drop_percent
            );
        }
        None => {
            let _ = writeln!(output, "- Biggest leak: none in this selection");
        }
    }
    let _ = writeln!(
        output,
        "- Effective counselors: {}",
        list_or_none(&insights.effective_counselors)
    );
    let _ = writeln!(
        output,
        "- Ineffective counselors: {}",
        list_or_none(&insights.ineffective_counselors)
    );
    let _ = writeln!(output, "- Total stuck leads: {}", insights.total_stuck);
    if insights.objections.is_empty() {
        let _ = writeln!(output, "- Common objections: none mentioned");
    } else {
        let objections: Vec<String> = insights
            .objections
            .iter()
            .map(|mention| format!("{} ({})", mention.keyword, mention.mentions))
            .collect();
        let _ = writeln!(output, "- Common objections: {}", objections.join(", "));
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Sample Lead Summaries");
    if insights.sample_summaries.is_empty() {
        let _ = writeln!(output, "No summaries recorded for this selection.");
    } else {
        for summary in &insights.sample_summaries {
            let _ = writeln!(output, "> {}", summary);
            let _ = writeln!(output);
        }
    }

    output
}

fn write_conversion_section(
    output: &mut String,
    label: &str,
    stats: &BTreeMap<String, ConversionStats>,
) {
    let _ = writeln!(output);
    let _ = writeln!(output, "## Conversion by {}", label);

    if stats.is_empty() {
        let _ = writeln!(output, "No leads match the current filters.");
        return;
    }

    let _ = writeln!(output, "| {} | Total Leads | Enrolled | Conversion |", label);
    let _ = writeln!(output, "| --- | ---: | ---: | ---: |");
    for (key, entry) in stats {
        let _ = writeln!(
            output,
            "| {} | {} | {} | {:.2}% |",
            key, entry.total_leads, entry.enrolled_leads, entry.conversion_percent
        );
    }
}

fn list_or_none(names: &[String]) -> String {
    if names.is_empty() {
        "none".to_string()
    } else {
        names.join(", ")
    }
}

/// Terminal funnel: one proportional bar per stage.
pub fn render_funnel(bundle: &MetricsBundle) -> String {
    let mut output = String::new();
    let widest = bundle.leads_per_stage.max();
    let label_width = bundle
        .leads_per_stage
        .iter()
        .map(|(stage, _)| stage.label().len())
        .max()
        .unwrap_or(0);

    for (stage, count) in bundle.leads_per_stage.iter() {
        let width = if widest == 0 {
            0
        } else {
            (count * BAR_WIDTH).div_ceil(widest)
        };
        let _ = writeln!(
            output,
            "{}. {:<label_width$}  {:<bar_width$}  {:>4}  (stuck {})",
            stage.rank(),
            stage.label(),
            "#".repeat(width),
            count,
            bundle.stuck_per_stage.get(stage),
            label_width = label_width,
            bar_width = BAR_WIDTH,
        );
    }
    let _ = writeln!(
        output,
        "Total leads: {} (stuck {}, unrecognized stage {})",
        bundle.total_leads, bundle.total_stuck, bundle.unrecognized_stage_leads
    );
    output
}
