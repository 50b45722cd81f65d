//! Default reagent list import.
//!
//! Expected header: `name,concentration,unit` with optional `unit_cost` and
//! `description` columns (any order, case-insensitive). Rows are upserted by
//! name, so importing the same file twice leaves one row per reagent.

use crate::db::{DbActorHandle, ReagentCreate};
use crate::error::PlatelabError;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

const REQUIRED_COLUMNS: [&str; 3] = ["name", "concentration", "unit"];

/// Literal used in reagent sheets for "no concentration" (neat liquids, water).
const NULL_MARKER: &str = "NULL";

#[derive(Debug, Deserialize)]
struct SeedRecord {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    concentration: Option<String>,
    #[serde(default)]
    unit: Option<String>,
    #[serde(default)]
    unit_cost: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRow {
    /// 1-based line number in the source file (the header is line 1).
    pub line: u64,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedSeed {
    pub reagents: Vec<ReagentCreate>,
    pub skipped: Vec<SkippedRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub inserted: u64,
    pub updated: u64,
    pub skipped: Vec<SkippedRow>,
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Parses an optional number; absent, empty and `NULL` all read as `0.0`.
fn number_or_zero(field: &str, v: Option<String>) -> Result<f64, String> {
    match non_empty(v) {
        None => Ok(0.0),
        Some(s) if s.eq_ignore_ascii_case(NULL_MARKER) => Ok(0.0),
        Some(s) => match s.parse::<f64>() {
            Ok(n) if n.is_finite() => Ok(n),
            _ => Err(format!("non-numeric {field} {s:?}")),
        },
    }
}

fn to_create(rec: SeedRecord) -> Result<ReagentCreate, String> {
    let name = non_empty(rec.name).ok_or_else(|| "missing name".to_string())?;
    let unit = non_empty(rec.unit).ok_or_else(|| format!("reagent {name:?} has no unit"))?;
    let concentration = number_or_zero("concentration", rec.concentration)?;
    let unit_cost = number_or_zero("unit_cost", rec.unit_cost)?;
    if unit_cost < 0.0 {
        return Err(format!("negative unit_cost {unit_cost}"));
    }
    Ok(ReagentCreate {
        name,
        concentration,
        unit,
        unit_cost,
        description: non_empty(rec.description),
    })
}

/// Parses a seed CSV. Malformed rows are collected in `skipped`; only a
/// missing required column fails the whole file.
pub fn parse_seed_csv<R: Read>(reader: R) -> Result<ParsedSeed, PlatelabError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers: csv::StringRecord = rdr
        .headers()?
        .iter()
        .map(str::to_ascii_lowercase)
        .collect();
    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == column) {
            return Err(PlatelabError::InvalidInput(format!(
                "seed CSV is missing the {column:?} column"
            )));
        }
    }

    let mut reagents = Vec::new();
    let mut skipped = Vec::new();
    for result in rdr.records() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                skipped.push(SkippedRow {
                    line: e.position().map_or(0, csv::Position::line),
                    reason: e.to_string(),
                });
                continue;
            }
        };
        let line = record.position().map_or(0, csv::Position::line);
        if record.iter().all(str::is_empty) {
            continue;
        }
        let parsed = record
            .deserialize::<SeedRecord>(Some(&headers))
            .map_err(|e| e.to_string())
            .and_then(to_create);
        match parsed {
            Ok(create) => reagents.push(create),
            Err(reason) => skipped.push(SkippedRow { line, reason }),
        }
    }

    Ok(ParsedSeed { reagents, skipped })
}

/// Reads, parses and upserts the reagent list at `path`.
pub async fn import_file(db: &DbActorHandle, path: &Path) -> Result<SeedReport, PlatelabError> {
    let bytes = tokio::fs::read(path).await?;
    let ParsedSeed { reagents, skipped } = parse_seed_csv(bytes.as_slice())?;

    for row in &skipped {
        warn!(path = %path.display(), line = row.line, reason = %row.reason, "Skipping seed row");
    }

    let counts = db.upsert_reagents(reagents).await?;
    info!(
        path = %path.display(),
        inserted = counts.inserted,
        updated = counts.updated,
        skipped = skipped.len(),
        "Seed reagents imported"
    );

    Ok(SeedReport {
        inserted: counts.inserted,
        updated: counts.updated,
        skipped,
    })
}
