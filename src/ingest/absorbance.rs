//! Plate-reader absorbance exports.
//!
//! Layout: the first row holds well ids (`A1` .. `H12`) after a leading time
//! column; each following row starts with the sample time in seconds and holds
//! one absorbance value per well. The plate is identified by `plate_<n>` in
//! the file name.

use crate::db::{AbsorbanceCreate, DbActorHandle, DbPlate};
use crate::error::PlatelabError;
use crate::ingest::{PlateFormat, Well};
use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const LABEL_PREFIX: &str = "plate_";

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedReadings {
    pub readings: Vec<AbsorbanceCreate>,
    /// Non-numeric cells that were dropped.
    pub skipped_cells: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestedFile {
    pub path: PathBuf,
    pub plate: DbPlate,
    pub inserted: u64,
}

#[derive(Debug, Default, Serialize)]
pub struct IngestSummary {
    pub files: Vec<IngestedFile>,
    pub failed: Vec<(PathBuf, String)>,
}

impl IngestSummary {
    pub fn total_inserted(&self) -> u64 {
        self.files.iter().map(|f| f.inserted).sum()
    }
}

/// `plate_3_abs.csv` -> `plate_3`.
pub fn plate_label_from_filename(file_name: &str) -> Option<String> {
    let start = file_name.find(LABEL_PREFIX)? + LABEL_PREFIX.len();
    let digits: String = file_name[start..]
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    if digits.is_empty() {
        None
    } else {
        Some(format!("{LABEL_PREFIX}{digits}"))
    }
}

/// `NaN` and infinities count as non-numeric.
fn finite_number(cell: &str) -> Option<f64> {
    cell.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parses one export against the given plate layout. Header cells that are not
/// wells of `format` are ignored; parsing stops at the first row whose time
/// cell is not numeric.
pub fn parse_absorbance_csv<R: Read>(
    reader: R,
    format: PlateFormat,
) -> Result<ParsedReadings, PlatelabError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut records = rdr.records();
    let header = match records.next() {
        Some(header) => header?,
        None => return Err(PlatelabError::Ingest("absorbance file is empty".to_string())),
    };

    let wells: Vec<(usize, Well)> = header
        .iter()
        .enumerate()
        .skip(1)
        .filter_map(|(idx, cell)| {
            let well = cell.parse::<Well>().ok()?;
            format.contains(&well).then_some((idx, well))
        })
        .collect();
    if wells.is_empty() {
        return Err(PlatelabError::Ingest(
            "absorbance header has no well columns".to_string(),
        ));
    }

    let mut readings = Vec::new();
    let mut skipped_cells = 0usize;
    let mut data_rows = 0usize;
    for record in records {
        let record = record?;
        let Some(time_cell) = record.get(0).filter(|c| !c.is_empty()) else {
            continue;
        };
        let Some(seconds) = finite_number(time_cell) else {
            break;
        };
        #[allow(clippy::cast_possible_truncation)]
        let seconds_time_sample = seconds.trunc() as i64;
        data_rows += 1;

        for (idx, well) in &wells {
            let Some(cell) = record.get(*idx).filter(|c| !c.is_empty()) else {
                continue;
            };
            match finite_number(cell) {
                Some(value) => readings.push(AbsorbanceCreate {
                    well: *well,
                    seconds_time_sample,
                    value,
                }),
                None => {
                    warn!(well = %well, seconds_time_sample, cell, "Skipping non-numeric absorbance value");
                    skipped_cells += 1;
                }
            }
        }
    }

    if data_rows == 0 {
        return Err(PlatelabError::Ingest(
            "absorbance file has no data rows".to_string(),
        ));
    }

    Ok(ParsedReadings {
        readings,
        skipped_cells,
    })
}

/// Ingests one export. The file is parsed against the layout of the plate
/// it names (96 wells for a new label) before anything is written; the plate
/// is only created together with its readings.
pub async fn ingest_file(db: &DbActorHandle, path: &Path) -> Result<IngestedFile, PlatelabError> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    let label = plate_label_from_filename(file_name).ok_or_else(|| {
        PlatelabError::Ingest(format!("cannot derive plate label from {file_name:?}"))
    })?;

    let bytes = tokio::fs::read(path).await?;
    let format = match db.find_plate_by_label(&label).await? {
        Some(plate) => PlateFormat::from_well_count(plate.well_count).ok_or_else(|| {
            PlatelabError::Ingest(format!(
                "plate {label} has unsupported well count {}",
                plate.well_count
            ))
        })?,
        None => PlateFormat::Wells96,
    };
    let parsed = parse_absorbance_csv(bytes.as_slice(), format)?;

    let (plate, inserted) = db.store_absorbance(&label, parsed.readings).await?;
    info!(
        path = %path.display(),
        plate = %plate.label,
        inserted,
        skipped_cells = parsed.skipped_cells,
        "Absorbance readings ingested"
    );

    Ok(IngestedFile {
        path: path.to_path_buf(),
        plate,
        inserted,
    })
}

fn is_plate_export(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with(LABEL_PREFIX) && n.ends_with(".csv"))
}

/// Ingests a single file, or every `plate_*.csv` in a directory. A failing
/// file in a directory is logged and recorded; the rest still load.
pub async fn ingest_path(db: &DbActorHandle, path: &Path) -> Result<IngestSummary, PlatelabError> {
    let mut summary = IngestSummary::default();

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
        if p.is_file() && is_plate_export(&p) {
            files.push(p);
        }
    }
    files.sort();

    for file in files {
        match ingest_file(db, &file).await {
            Ok(done) => summary.files.push(done),
            Err(e) => {
                warn!(path = %file.display(), error = %e, "Failed to ingest absorbance file");
                summary.failed.push((file, e.to_string()));
            }
        }
    }

    info!(
        path = %path.display(),
        files = summary.files.len(),
        failed = summary.failed.len(),
        inserted = summary.total_inserted(),
        "Absorbance directory ingested"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_plate_label_from_file_name() {
        assert_eq!(
            plate_label_from_filename("plate_1_abs.csv").as_deref(),
            Some("plate_1")
        );
        assert_eq!(
            plate_label_from_filename("run2_plate_42.csv").as_deref(),
            Some("plate_42")
        );
        assert!(plate_label_from_filename("plate_abs.csv").is_none());
        assert!(plate_label_from_filename("exp 1.csv").is_none());
    }

    #[test]
    fn parses_time_rows_until_first_non_numeric_time() {
        let csv = "\
Time,A1,A2,Z9,H12
0,0.10,0.11,9,0.20
600.9,0.15,,9,0.25
1200,0.30,oops,9,0.40
Mean,1,1,1,1
1800,0.5,0.5,0.5,0.5
";
        let parsed = parse_absorbance_csv(csv.as_bytes(), PlateFormat::Wells96).unwrap();
        assert_eq!(parsed.skipped_cells, 1);

        let summary: Vec<(String, i64, f64)> = parsed
            .readings
            .iter()
            .map(|r| (r.well.to_string(), r.seconds_time_sample, r.value))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("A1".to_string(), 0, 0.10),
                ("A2".to_string(), 0, 0.11),
                ("H12".to_string(), 0, 0.20),
                ("A1".to_string(), 600, 0.15),
                ("H12".to_string(), 600, 0.25),
                ("A1".to_string(), 1200, 0.30),
                ("H12".to_string(), 1200, 0.40),
            ]
        );
    }

    #[test]
    fn wells_outside_the_layout_are_ignored() {
        let csv = "t,A1,H13\n0,1.0,2.0\n";
        let parsed = parse_absorbance_csv(csv.as_bytes(), PlateFormat::Wells96).unwrap();
        assert_eq!(parsed.readings.len(), 1);
        assert_eq!(parsed.readings[0].well.to_string(), "A1");
    }

    #[test]
    fn non_finite_values_are_skipped_like_text() {
        let csv = "Time,A1,A2\n0,0.1,NaN\n600,inf,0.3\n";
        let parsed = parse_absorbance_csv(csv.as_bytes(), PlateFormat::Wells96).unwrap();
        assert_eq!(parsed.skipped_cells, 2);
        let kept: Vec<(String, i64, f64)> = parsed
            .readings
            .iter()
            .map(|r| (r.well.to_string(), r.seconds_time_sample, r.value))
            .collect();
        assert_eq!(
            kept,
            vec![("A1".to_string(), 0, 0.1), ("A2".to_string(), 600, 0.3)]
        );
    }

    #[test]
    fn non_finite_time_ends_the_data_block() {
        let csv = "Time,A1\n0,0.1\nNaN,0.9\n1200,0.5\n";
        let parsed = parse_absorbance_csv(csv.as_bytes(), PlateFormat::Wells96).unwrap();
        assert_eq!(parsed.readings.len(), 1);
        assert_eq!(parsed.readings[0].seconds_time_sample, 0);
        assert_eq!(parsed.readings[0].value, 0.1);

        let csv = "Time,A1\ninfinity,0.9\n";
        let err = parse_absorbance_csv(csv.as_bytes(), PlateFormat::Wells96).unwrap_err();
        assert!(matches!(err, PlatelabError::Ingest(_)));
    }

    #[test]
    fn header_only_file_is_rejected() {
        let err = parse_absorbance_csv("t,A1\n".as_bytes(), PlateFormat::Wells96).unwrap_err();
        assert!(matches!(err, PlatelabError::Ingest(_)));
    }
}
