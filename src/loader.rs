use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};

use crate::error::LoadError;
use crate::models::Lead;
use crate::stage::RecordedStage;

#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(rename = "Lead ID")]
    lead_id: String,
    #[serde(rename = "Counselor")]
    counselor: String,
    #[serde(rename = "Country")]
    country: String,
    #[serde(rename = "Sales Stage")]
    sales_stage: String,
    #[serde(rename = "Stuck", default)]
    stuck: String,
    #[serde(rename = "Summary", default)]
    summary: String,
}

pub fn load_leads(path: &Path) -> Result<Vec<Lead>, LoadError> {
    if !path.exists() {
        return Err(LoadError::DataUnavailable {
            path: path.to_path_buf(),
        });
    }

    let reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|source| LoadError::Read {
            path: path.to_path_buf(),
            source,
        })?;

    let leads = read_leads(reader)?;
    info!(path = %path.display(), leads = leads.len(), "loaded leads");
    Ok(leads)
}

pub fn read_leads<R: Read>(mut reader: csv::Reader<R>) -> Result<Vec<Lead>, LoadError> {
    let mut leads = Vec::new();

    for (index, result) in reader.deserialize::<CsvRow>().enumerate() {
        // Header is line 1.
        let row_number = index as u64 + 2;
        let row = result.map_err(|err| LoadError::InvalidRow {
            row: row_number,
            message: err.to_string(),
        })?;

        let stuck = parse_flag(&row.stuck).ok_or_else(|| LoadError::InvalidRow {
            row: row_number,
            message: format!("unrecognized Stuck value '{}'", row.stuck),
        })?;

        let sales_stage = RecordedStage::parse(&row.sales_stage);
        if let RecordedStage::Unrecognized(label) = &sales_stage {
            warn!(row = row_number, lead_id = %row.lead_id, stage = %label, "unrecognized sales stage");
        }

        leads.push(Lead {
            lead_id: row.lead_id,
            counselor: row.counselor,
            country: row.country,
            sales_stage,
            stuck,
            summary: row.summary,
        });
    }

    Ok(leads)
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "" | "false" | "no" | "n" | "0" => Some(false),
        "true" | "yes" | "y" | "1" => Some(true),
        _ => None,
    }
}

/// Observed values in first-seen order.
pub fn distinct_values<F>(leads: &[Lead], key_fn: F) -> Vec<String>
where
    F: Fn(&Lead) -> &str,
{
    let mut seen = HashSet::new();
    let mut values = Vec::new();
    for lead in leads {
        let key = key_fn(lead);
        if seen.insert(key) {
            values.push(key.to_string());
        }
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::Stage;
    use std::io::Write;

    const HEADER: &str = "Lead ID,Counselor,Country,Sales Stage,Stuck,Summary\n";

    fn reader(body: &str) -> csv::Reader<std::io::Cursor<Vec<u8>>> {
        let data = format!("{HEADER}{body}");
        csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(std::io::Cursor::new(data.into_bytes()))
    }

    #[test]
    fn reads_rows_with_flag_variants() {
        let leads = read_leads(reader(
            "L1,Cynthia,India,Enrolled,False,Paid the deposit\n\
             L2, Brian ,Nepal,Cost Discussions,TRUE,\"Worried about visa, cost\"\n\
             L3,Grace,Kenya,Pitched,,\n",
        ))
        .expect("rows parse");

        assert_eq!(leads.len(), 3);
        assert_eq!(leads[0].sales_stage, RecordedStage::Known(Stage::Enrolled));
        assert!(!leads[0].stuck);
        assert_eq!(leads[1].counselor, "Brian");
        assert!(leads[1].stuck);
        assert_eq!(leads[1].summary, "Worried about visa, cost");
        assert!(!leads[2].stuck);
        assert!(leads[2].summary.is_empty());
    }

    #[test]
    fn keeps_unrecognized_stages() {
        let leads = read_leads(reader("L1,Cynthia,India,On Hold,no,\n")).expect("row parses");
        assert_eq!(
            leads[0].sales_stage,
            RecordedStage::Unrecognized("On Hold".to_string())
        );
    }

    #[test]
    fn rejects_bad_stuck_flag_with_row_number() {
        let err = read_leads(reader(
            "L1,Cynthia,India,Enrolled,no,\nL2,Brian,Nepal,Pitched,maybe,\n",
        ))
        .expect_err("bad flag fails");
        match err {
            LoadError::InvalidRow { row, message } => {
                assert_eq!(row, 3);
                assert!(message.contains("maybe"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn missing_file_is_data_unavailable() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("processed_leads.csv");
        let err = load_leads(&path).expect_err("missing file");
        assert!(matches!(err, LoadError::DataUnavailable { .. }));
    }

    #[test]
    fn loads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, "{HEADER}L1,Deepak,India,Prescheduled,yes,Call back Monday\n")
            .expect("write fixture");

        let leads = load_leads(file.path()).expect("loads");
        assert_eq!(leads.len(), 1);
        assert_eq!(leads[0].lead_id, "L1");
        assert!(leads[0].stuck);
    }

    #[test]
    fn distinct_values_keep_first_seen_order() {
        let leads = read_leads(reader(
            "L1,Grace,Kenya,Pitched,no,\n\
             L2,Brian,India,Pitched,no,\n\
             L3,Grace,India,Pitched,no,\n",
        ))
        .expect("rows parse");

        assert_eq!(
            distinct_values(&leads, |lead| lead.counselor.as_str()),
            vec!["Grace", "Brian"]
        );
        assert_eq!(
            distinct_values(&leads, |lead| lead.country.as_str()),
            vec!["Kenya", "India"]
        );
    }
}
