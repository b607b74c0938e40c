use std::path::PathBuf;

use anyhow::{bail, Context};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use tracing::info;

use lead_funnel_tracker::error::LoadError;
use lead_funnel_tracker::models::{FilterSelection, Lead};
use lead_funnel_tracker::{funnel, insights, loader, report, telemetry};

#[derive(Parser)]
#[command(name = "lead-funnel")]
#[command(about = "Sales funnel and conversion tracker over processed lead exports", long_about = None)]
struct Cli {
    /// Processed leads CSV (Lead ID, Counselor, Country, Sales Stage, Stuck, Summary)
    #[arg(
        long,
        global = true,
        env = "LEAD_FUNNEL_DATA",
        default_value = "output/processed_leads.csv"
    )]
    data: PathBuf,
    /// Log level or filter directive; RUST_LOG takes precedence
    #[arg(long, global = true, env = "LEAD_FUNNEL_LOG", default_value = "info")]
    log_level: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the counselors and countries available for filtering
    Options,
    /// Print the stage funnel for the selected leads
    Funnel {
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Emit the metrics bundle as JSON
    Metrics {
        #[command(flatten)]
        filters: FilterArgs,
        /// Write to a file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Generate a markdown report with computed insights
    Report {
        #[command(flatten)]
        filters: FilterArgs,
        /// Keyword to count in lead summaries (repeatable)
        #[arg(long = "objection")]
        objections: Vec<String>,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

#[derive(Args, Debug, Default)]
struct FilterArgs {
    /// Counselor to include (repeatable); every counselor when omitted
    #[arg(long = "counselor")]
    counselors: Vec<String>,
    /// Country to include (repeatable); every country when omitted
    #[arg(long = "country")]
    countries: Vec<String>,
}

impl FilterArgs {
    fn selection(&self, leads: &[Lead]) -> FilterSelection {
        let everything = FilterSelection::everything(leads);
        FilterSelection {
            counselors: if self.counselors.is_empty() {
                everything.counselors
            } else {
                self.counselors.iter().cloned().collect()
            },
            countries: if self.countries.is_empty() {
                everything.countries
            } else {
                self.countries.iter().cloned().collect()
            },
        }
    }

    fn scope_label(&self) -> String {
        let describe = |values: &[String], all: &str| {
            if values.is_empty() {
                all.to_string()
            } else {
                values.join(", ")
            }
        };
        format!(
            "{} in {}",
            describe(&self.counselors, "all counselors"),
            describe(&self.countries, "all countries")
        )
    }
}

fn load(path: &std::path::Path) -> anyhow::Result<Vec<Lead>> {
    match loader::load_leads(path) {
        Err(LoadError::DataUnavailable { path }) => bail!(
            "{} not found. Generate the processed leads export first.",
            path.display()
        ),
        result => result.with_context(|| format!("failed to load leads from {}", path.display())),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    telemetry::init(&cli.log_level).context("failed to initialise logging")?;

    let leads = load(&cli.data)?;

    match cli.command {
        Commands::Options => {
            println!("Counselors:");
            for counselor in loader::distinct_values(&leads, |lead| lead.counselor.as_str()) {
                println!("- {counselor}");
            }
            println!("Countries:");
            for country in loader::distinct_values(&leads, |lead| lead.country.as_str()) {
                println!("- {country}");
            }
        }
        Commands::Funnel { filters } => {
            let bundle = funnel::compute_metrics(&leads, &filters.selection(&leads));
            print!("{}", report::render_funnel(&bundle));
        }
        Commands::Metrics { filters, out } => {
            let bundle = funnel::compute_metrics(&leads, &filters.selection(&leads));
            let json = serde_json::to_string_pretty(&bundle)?;
            match out {
                Some(path) => {
                    std::fs::write(&path, json)?;
                    println!("Metrics written to {}.", path.display());
                }
                None => println!("{json}"),
            }
        }
        Commands::Report {
            filters,
            objections,
            out,
        } => {
            let filtered = funnel::filter(&leads, &filters.selection(&leads));
            let bundle = funnel::summarize(&filtered);
            let objections = if objections.is_empty() {
                insights::DEFAULT_OBJECTIONS
                    .iter()
                    .map(|keyword| keyword.to_string())
                    .collect()
            } else {
                objections
            };
            let insights = insights::derive(&bundle, &filtered, &objections);
            let report =
                report::build_report(&filters.scope_label(), Utc::now(), &bundle, &insights);
            std::fs::write(&out, report)?;
            info!(leads = bundle.total_leads, path = %out.display(), "report written");
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
