//! Experiment cost sheets.
//!
//! Layout: header `type,value,Units`; a `cell concentration` row and a
//! `dilution` row carry the run parameters, every other row is a reagent
//! name with the amount used and its unit. The experiment number comes from
//! `exp <n>` in the file name (`Costs analysis of chemicals - exp 1.csv`).

use crate::db::{DbActorHandle, ExperimentCreate, ReagentValueCreate, StoredExperiment};
use crate::error::PlatelabError;
use crate::ingest::seed::SkippedRow;
use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const CELL_CONCENTRATION: &str = "cell concentration";
const DILUTION: &str = "dilution";

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedExperiment {
    pub cell_concentration: f64,
    pub dilution: f64,
    pub values: Vec<ReagentValueCreate>,
    pub skipped: Vec<SkippedRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestedExperiment {
    pub path: PathBuf,
    pub stored: StoredExperiment,
    pub skipped: Vec<SkippedRow>,
}

#[derive(Debug, Default, Serialize)]
pub struct ExperimentIngestSummary {
    pub files: Vec<IngestedExperiment>,
    pub failed: Vec<(PathBuf, String)>,
}

/// `"Costs analysis of chemicals - exp 12.csv"` -> `12`. Case-insensitive;
/// at least one space must separate `exp` from the number.
pub fn experiment_number_from_filename(file_name: &str) -> Option<i64> {
    let lower = file_name.to_ascii_lowercase();
    lower.match_indices("exp").find_map(|(idx, m)| {
        let rest = &lower[idx + m.len()..];
        let trimmed = rest.trim_start();
        if trimmed.len() == rest.len() {
            return None;
        }
        let digits: String = trimmed.chars().take_while(char::is_ascii_digit).collect();
        digits.parse().ok()
    })
}

fn column(headers: &csv::StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h.eq_ignore_ascii_case(name))
}

pub fn parse_experiment_csv<R: Read>(reader: R) -> Result<ParsedExperiment, PlatelabError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let (Some(type_idx), Some(value_idx)) = (column(&headers, "type"), column(&headers, "value"))
    else {
        return Err(PlatelabError::InvalidInput(
            "experiment sheet needs `type` and `value` columns".to_string(),
        ));
    };
    let unit_idx = column(&headers, "units").or_else(|| column(&headers, "unit"));

    let mut cell_concentration = None;
    let mut dilution = None;
    let mut values = Vec::new();
    let mut skipped = Vec::new();

    for record in rdr.records() {
        let record = record?;
        let line = record.position().map_or(0, csv::Position::line);
        let kind = record.get(type_idx).unwrap_or_default();
        let raw = record.get(value_idx).unwrap_or_default();
        if kind.is_empty() || raw.is_empty() {
            continue;
        }
        let Some(value) = raw.parse::<f64>().ok().filter(|v| v.is_finite()) else {
            skipped.push(SkippedRow {
                line,
                reason: format!("non-numeric value {raw:?} for {kind:?}"),
            });
            continue;
        };

        if kind.eq_ignore_ascii_case(CELL_CONCENTRATION) {
            cell_concentration = Some(value);
        } else if kind.eq_ignore_ascii_case(DILUTION) {
            dilution = Some(value);
        } else if value < 0.0 {
            skipped.push(SkippedRow {
                line,
                reason: format!("negative amount {value} for {kind:?}"),
            });
        } else {
            values.push(ReagentValueCreate {
                reagent_name: kind.to_string(),
                value,
                unit: unit_idx
                    .and_then(|i| record.get(i))
                    .unwrap_or_default()
                    .to_string(),
            });
        }
    }

    let cell_concentration = cell_concentration.ok_or_else(|| {
        PlatelabError::Ingest("experiment sheet has no cell concentration row".to_string())
    })?;
    let dilution = dilution
        .ok_or_else(|| PlatelabError::Ingest("experiment sheet has no dilution row".to_string()))?;

    Ok(ParsedExperiment {
        cell_concentration,
        dilution,
        values,
        skipped,
    })
}

pub async fn ingest_file(
    db: &DbActorHandle,
    path: &Path,
) -> Result<IngestedExperiment, PlatelabError> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    let number = experiment_number_from_filename(file_name).ok_or_else(|| {
        PlatelabError::Ingest(format!("cannot derive experiment number from {file_name:?}"))
    })?;

    let bytes = tokio::fs::read(path).await?;
    let parsed = parse_experiment_csv(bytes.as_slice())?;
    for row in &parsed.skipped {
        warn!(path = %path.display(), line = row.line, reason = %row.reason, "Skipping experiment row");
    }

    let stored = db
        .store_experiment(ExperimentCreate {
            number,
            cell_concentration: parsed.cell_concentration,
            dilution: parsed.dilution,
            values: parsed.values,
        })
        .await?;
    for name in &stored.unknown_reagents {
        warn!(path = %path.display(), reagent = %name, "Reagent not in database; amount not stored");
    }
    info!(
        path = %path.display(),
        number,
        experiment_id = stored.experiment.id,
        inserted = stored.inserted,
        "Experiment sheet ingested"
    );

    Ok(IngestedExperiment {
        path: path.to_path_buf(),
        stored,
        skipped: parsed.skipped,
    })
}

fn is_experiment_sheet(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| {
            n.to_ascii_lowercase().ends_with(".csv") && experiment_number_from_filename(n).is_some()
        })
}

/// Ingests one sheet, or every `*exp <n>*.csv` in a directory. Failing
/// sheets in a directory are logged and recorded; the rest still load.
pub async fn ingest_path(
    db: &DbActorHandle,
    path: &Path,
) -> Result<ExperimentIngestSummary, PlatelabError> {
    let mut summary = ExperimentIngestSummary::default();

    if path.is_file() {
        summary.files.push(ingest_file(db, path).await?);
        return Ok(summary);
    }
    if !path.is_dir() {
        return Err(PlatelabError::Ingest(format!(
            "{} is not a file or directory",
            path.display()
        )));
    }

    let mut entries = tokio::fs::read_dir(path).await?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let p = entry.path();
        if p.is_file() && is_experiment_sheet(&p) {
            files.push(p);
        }
    }
    files.sort();

    for file in files {
        match ingest_file(db, &file).await {
            Ok(done) => summary.files.push(done),
            Err(e) => {
                warn!(path = %file.display(), error = %e, "Failed to ingest experiment sheet");
                summary.failed.push((file, e.to_string()));
            }
        }
    }

    info!(
        path = %path.display(),
        files = summary.files.len(),
        failed = summary.failed.len(),
        "Experiment directory ingested"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_experiment_number_from_file_name() {
        assert_eq!(
            experiment_number_from_filename("Costs analysis of chemicals  - exp 1.csv"),
            Some(1)
        );
        assert_eq!(experiment_number_from_filename("EXP   42 run.csv"), Some(42));
        assert_eq!(experiment_number_from_filename("expected exp 7.csv"), Some(7));
        assert_eq!(experiment_number_from_filename("exp1.csv"), None);
        assert_eq!(experiment_number_from_filename("plate_1.csv"), None);
    }

    #[test]
    fn splits_parameters_from_reagent_lines() {
        let csv = "\
type,value,Units
cell concentration,1000000,
Dilution,10,
Glucose,2.5,g
LB Broth,50,mL
,,
Yeast extract,lots,g
";
        let parsed = parse_experiment_csv(csv.as_bytes()).unwrap();
        assert_eq!(parsed.cell_concentration, 1_000_000.0);
        assert_eq!(parsed.dilution, 10.0);

        let lines: Vec<(&str, f64, &str)> = parsed
            .values
            .iter()
            .map(|v| (v.reagent_name.as_str(), v.value, v.unit.as_str()))
            .collect();
        assert_eq!(lines, vec![("Glucose", 2.5, "g"), ("LB Broth", 50.0, "mL")]);

        assert_eq!(parsed.skipped.len(), 1);
        assert_eq!(parsed.skipped[0].line, 7);
    }

    #[test]
    fn missing_dilution_is_an_error() {
        let csv = "type,value,Units\ncell concentration,5,\nGlucose,1,g\n";
        let err = parse_experiment_csv(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, PlatelabError::Ingest(_)));
    }

    #[test]
    fn nan_parameter_does_not_count_as_present() {
        let csv = "type,value\ncell concentration,NaN\ndilution,2\n";
        let err = parse_experiment_csv(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, PlatelabError::Ingest(_)));
    }
}
