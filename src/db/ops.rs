//! Typed repository operations over the lab database.
//!
//! Relationships are never loaded implicitly: every cross-table read is an
//! explicit join or a fetch keyed by the parent id.

use crate::db::create::{
    AbsorbanceCreate, CellGrowthCreate, ExperimentCreate, PlateCreate, PlateExperimentCreate,
    PlateReagentCreate, ReagentCreate, StoredExperiment, UpsertCounts,
};
use crate::db::models::{
    DbAbsorbanceReading, DbCellGrowth, DbExperiment, DbPlate, DbPlateExperimentMap,
    DbPlateReagentMap, DbReagent, ExperimentCostRow, PlateCostRow,
};
use crate::error::PlatelabError;
use crate::ingest::{PlateFormat, Well};
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

const DEFAULT_WELL_COUNT: i64 = 96;

// ---------------------------------------------------------------------------
// Reagents
// ---------------------------------------------------------------------------

fn validate_reagent(c: &ReagentCreate) -> Result<(), PlatelabError> {
    if c.name.trim().is_empty() {
        return Err(PlatelabError::InvalidInput(
            "reagent name must not be empty".to_string(),
        ));
    }
    if c.unit.trim().is_empty() {
        return Err(PlatelabError::InvalidInput(format!(
            "reagent {:?} has no unit",
            c.name
        )));
    }
    if !c.unit_cost.is_finite() || c.unit_cost < 0.0 {
        return Err(PlatelabError::InvalidInput(format!(
            "reagent {:?} has invalid unit cost {}",
            c.name, c.unit_cost
        )));
    }
    if !c.concentration.is_finite() {
        return Err(PlatelabError::InvalidInput(format!(
            "reagent {:?} has invalid concentration",
            c.name
        )));
    }
    Ok(())
}

pub async fn create_reagent(
    pool: &SqlitePool,
    c: ReagentCreate,
) -> Result<DbReagent, PlatelabError> {
    validate_reagent(&c)?;
    let row = sqlx::query_as::<_, DbReagent>(
        r#"
        INSERT INTO reagent (name, concentration, unit, unit_cost, description, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        RETURNING id, name, concentration, unit, unit_cost, description, created_at
        "#,
    )
    .bind(c.name.trim())
    .bind(c.concentration)
    .bind(c.unit.trim())
    .bind(c.unit_cost)
    .bind(c.description)
    .bind(Utc::now())
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// Inserts or updates reagents by name in one transaction.
///
/// An existing reagent keeps its id and `created_at`, so mappings that point
/// at it stay valid; a `None` description does not clear a stored one.
pub async fn upsert_reagents_by_name(
    pool: &SqlitePool,
    reagents: Vec<ReagentCreate>,
) -> Result<UpsertCounts, PlatelabError> {
    for c in &reagents {
        validate_reagent(c)?;
    }

    let mut counts = UpsertCounts::default();
    let mut tx = pool.begin().await?;
    for c in reagents {
        let name = c.name.trim();
        let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM reagent WHERE name = ?")
            .bind(name)
            .fetch_optional(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO reagent (name, concentration, unit, unit_cost, description, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(name) DO UPDATE SET
                concentration = excluded.concentration,
                unit = excluded.unit,
                unit_cost = excluded.unit_cost,
                description = COALESCE(excluded.description, description)
            "#,
        )
        .bind(name)
        .bind(c.concentration)
        .bind(c.unit.trim())
        .bind(c.unit_cost)
        .bind(c.description)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        if existing.is_some() {
            counts.updated += 1;
        } else {
            counts.inserted += 1;
        }
    }
    tx.commit().await?;

    debug!(
        inserted = counts.inserted,
        updated = counts.updated,
        "Reagent upsert committed"
    );
    Ok(counts)
}

pub async fn get_reagent(pool: &SqlitePool, id: i64) -> Result<DbReagent, PlatelabError> {
    sqlx::query_as::<_, DbReagent>(
        r#"
        SELECT id, name, concentration, unit, unit_cost, description, created_at
        FROM reagent
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(PlatelabError::NotFound {
        entity: "reagent",
        id,
    })
}

pub async fn list_reagents(pool: &SqlitePool) -> Result<Vec<DbReagent>, PlatelabError> {
    let rows = sqlx::query_as::<_, DbReagent>(
        r#"
        SELECT id, name, concentration, unit, unit_cost, description, created_at
        FROM reagent
        ORDER BY name, id
        "#,
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Fails with a foreign-key constraint error while any mapping references the reagent.
pub async fn delete_reagent(pool: &SqlitePool, id: i64) -> Result<(), PlatelabError> {
    let res = sqlx::query("DELETE FROM reagent WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    if res.rows_affected() == 0 {
        return Err(PlatelabError::NotFound {
            entity: "reagent",
            id,
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Plates
// ---------------------------------------------------------------------------

pub async fn create_plate(pool: &SqlitePool, c: PlateCreate) -> Result<DbPlate, PlatelabError> {
    let label = c.label.trim();
    if label.is_empty() {
        return Err(PlatelabError::InvalidInput(
            "plate label must not be empty".to_string(),
        ));
    }
    let well_count = c.well_count.unwrap_or(DEFAULT_WELL_COUNT);
    if PlateFormat::from_well_count(well_count).is_none() {
        return Err(PlatelabError::InvalidInput(format!(
            "unsupported plate format: {well_count} wells"
        )));
    }

    let row = sqlx::query_as::<_, DbPlate>(
        r#"
        INSERT INTO plate (label, well_count, description, created_at)
        VALUES (?, ?, ?, ?)
        RETURNING id, label, well_count, description, created_at
        "#,
    )
    .bind(label)
    .bind(well_count)
    .bind(c.description)
    .bind(Utc::now())
    .fetch_one(pool)
    .await?;
    Ok(row)
}

pub async fn find_plate_by_label(
    pool: &SqlitePool,
    label: &str,
) -> Result<Option<DbPlate>, PlatelabError> {
    let row = sqlx::query_as::<_, DbPlate>(
        r#"
        SELECT id, label, well_count, description, created_at
        FROM plate
        WHERE label = ?
        "#,
    )
    .bind(label)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn get_plate(pool: &SqlitePool, id: i64) -> Result<DbPlate, PlatelabError> {
    sqlx::query_as::<_, DbPlate>(
        r#"
        SELECT id, label, well_count, description, created_at
        FROM plate
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(PlatelabError::NotFound { entity: "plate", id })
}

pub async fn list_plates(pool: &SqlitePool) -> Result<Vec<DbPlate>, PlatelabError> {
    let rows = sqlx::query_as::<_, DbPlate>(
        r#"
        SELECT id, label, well_count, description, created_at
        FROM plate
        ORDER BY created_at, id
        "#,
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Deletes the plate together with its mappings, growth rows and readings.
pub async fn delete_plate(pool: &SqlitePool, id: i64) -> Result<(), PlatelabError> {
    let res = sqlx::query("DELETE FROM plate WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    if res.rows_affected() == 0 {
        return Err(PlatelabError::NotFound { entity: "plate", id });
    }
    Ok(())
}

/// Checks `well` against the plate's format when the plate exists. A missing
/// plate is left to the foreign key so the caller sees a constraint error.
async fn check_well_on_plate(
    pool: &SqlitePool,
    plate_id: i64,
    well: &Well,
) -> Result<(), PlatelabError> {
    let well_count: Option<i64> = sqlx::query_scalar("SELECT well_count FROM plate WHERE id = ?")
        .bind(plate_id)
        .fetch_optional(pool)
        .await?;
    match well_count.and_then(PlateFormat::from_well_count) {
        Some(format) if !format.contains(well) => Err(PlatelabError::InvalidInput(format!(
            "well {well} is outside the {}-well layout of plate {plate_id}",
            format.well_count()
        ))),
        _ => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Plate / reagent mappings
// ---------------------------------------------------------------------------

pub async fn add_plate_reagent(
    pool: &SqlitePool,
    c: PlateReagentCreate,
) -> Result<DbPlateReagentMap, PlatelabError> {
    if !c.quantity.is_finite() || c.quantity < 0.0 {
        return Err(PlatelabError::InvalidInput(format!(
            "quantity {} must be a non-negative number",
            c.quantity
        )));
    }
    check_well_on_plate(pool, c.plate_id, &c.well).await?;

    let row = sqlx::query_as::<_, DbPlateReagentMap>(
        r#"
        INSERT INTO plate_reagent_map (plate_id, row_id, column_id, reagent_id, quantity)
        VALUES (?, ?, ?, ?, ?)
        RETURNING id, plate_id, row_id, column_id, reagent_id, quantity
        "#,
    )
    .bind(c.plate_id)
    .bind(c.well.row_id())
    .bind(i64::from(c.well.column()))
    .bind(c.reagent_id)
    .bind(c.quantity)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

pub async fn list_plate_reagents(
    pool: &SqlitePool,
    plate_id: i64,
) -> Result<Vec<DbPlateReagentMap>, PlatelabError> {
    let rows = sqlx::query_as::<_, DbPlateReagentMap>(
        r#"
        SELECT id, plate_id, row_id, column_id, reagent_id, quantity
        FROM plate_reagent_map
        WHERE plate_id = ?
        ORDER BY row_id, column_id, id
        "#,
    )
    .bind(plate_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Mappings whose plate or reagent row is missing. Empty while foreign keys are enforced.
pub async fn orphan_mappings(pool: &SqlitePool) -> Result<Vec<DbPlateReagentMap>, PlatelabError> {
    let rows = sqlx::query_as::<_, DbPlateReagentMap>(
        r#"
        SELECT m.id, m.plate_id, m.row_id, m.column_id, m.reagent_id, m.quantity
        FROM plate_reagent_map m
        LEFT JOIN plate p ON p.id = m.plate_id
        LEFT JOIN reagent r ON r.id = m.reagent_id
        WHERE p.id IS NULL OR r.id IS NULL
        ORDER BY m.id
        "#,
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Cell growth
// ---------------------------------------------------------------------------

pub async fn add_cell_growth(
    pool: &SqlitePool,
    c: CellGrowthCreate,
) -> Result<DbCellGrowth, PlatelabError> {
    if c.time_index < 0 {
        return Err(PlatelabError::InvalidInput(format!(
            "time index {} must not be negative",
            c.time_index
        )));
    }
    if !c.cell_density.is_finite() {
        return Err(PlatelabError::InvalidInput(
            "cell density must be a finite number".to_string(),
        ));
    }
    check_well_on_plate(pool, c.plate_id, &c.well).await?;

    let row = sqlx::query_as::<_, DbCellGrowth>(
        r#"
        INSERT INTO cell_growth (plate_id, row_id, column_id, time_index, cell_density, measured_at)
        VALUES (?, ?, ?, ?, ?, ?)
        RETURNING id, plate_id, row_id, column_id, time_index, cell_density, measured_at
        "#,
    )
    .bind(c.plate_id)
    .bind(c.well.row_id())
    .bind(i64::from(c.well.column()))
    .bind(c.time_index)
    .bind(c.cell_density)
    .bind(c.measured_at.unwrap_or_else(Utc::now))
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// Growth rows for one plate as an ascending time series.
pub async fn list_cell_growth(
    pool: &SqlitePool,
    plate_id: i64,
) -> Result<Vec<DbCellGrowth>, PlatelabError> {
    let rows = sqlx::query_as::<_, DbCellGrowth>(
        r#"
        SELECT id, plate_id, row_id, column_id, time_index, cell_density, measured_at
        FROM cell_growth
        WHERE plate_id = ?
        ORDER BY time_index ASC, id ASC
        "#,
    )
    .bind(plate_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Absorbance readings
// ---------------------------------------------------------------------------

/// Stores one plate-reader export in a single transaction, creating the
/// plate (96-well) if `label` is new. Nothing is written if any row fails.
pub async fn store_absorbance(
    pool: &SqlitePool,
    label: &str,
    readings: Vec<AbsorbanceCreate>,
) -> Result<(DbPlate, u64), PlatelabError> {
    let mut tx = pool.begin().await?;
    sqlx::query(
        r#"
        INSERT INTO plate (label, well_count, created_at)
        VALUES (?, ?, ?)
        ON CONFLICT(label) DO NOTHING
        "#,
    )
    .bind(label)
    .bind(DEFAULT_WELL_COUNT)
    .bind(Utc::now())
    .execute(&mut *tx)
    .await?;

    let plate = sqlx::query_as::<_, DbPlate>(
        r#"
        SELECT id, label, well_count, description, created_at
        FROM plate
        WHERE label = ?
        "#,
    )
    .bind(label)
    .fetch_one(&mut *tx)
    .await?;

    let mut inserted = 0u64;
    for r in readings {
        if !r.value.is_finite() {
            return Err(PlatelabError::InvalidInput(format!(
                "absorbance at {} t={} is not a finite number",
                r.well, r.seconds_time_sample
            )));
        }
        let res = sqlx::query(
            r#"
            INSERT INTO absorbance_reading (plate_id, row_id, column_id, seconds_time_sample, value)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(plate.id)
        .bind(r.well.row_id())
        .bind(i64::from(r.well.column()))
        .bind(r.seconds_time_sample)
        .bind(r.value)
        .execute(&mut *tx)
        .await?;
        inserted += res.rows_affected();
    }
    tx.commit().await?;
    Ok((plate, inserted))
}

pub async fn list_absorbance(
    pool: &SqlitePool,
    plate_id: i64,
) -> Result<Vec<DbAbsorbanceReading>, PlatelabError> {
    let rows = sqlx::query_as::<_, DbAbsorbanceReading>(
        r#"
        SELECT id, plate_id, row_id, column_id, seconds_time_sample, value
        FROM absorbance_reading
        WHERE plate_id = ?
        ORDER BY seconds_time_sample, row_id, column_id
        "#,
    )
    .bind(plate_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Experiments
// ---------------------------------------------------------------------------

/// Stores an experiment sheet in one transaction. Re-storing a number updates
/// its parameters and replaces its reagent amounts. Lines naming an unknown
/// reagent are left out and reported.
pub async fn store_experiment(
    pool: &SqlitePool,
    c: ExperimentCreate,
) -> Result<StoredExperiment, PlatelabError> {
    if c.number <= 0 {
        return Err(PlatelabError::InvalidInput(format!(
            "experiment number {} must be positive",
            c.number
        )));
    }
    if !c.cell_concentration.is_finite() || !c.dilution.is_finite() {
        return Err(PlatelabError::InvalidInput(format!(
            "experiment {} has a non-finite cell concentration or dilution",
            c.number
        )));
    }
    if let Some(bad) = c.values.iter().find(|v| !v.value.is_finite() || v.value < 0.0) {
        return Err(PlatelabError::InvalidInput(format!(
            "reagent {:?} has invalid amount {}",
            bad.reagent_name, bad.value
        )));
    }

    let mut tx = pool.begin().await?;
    let experiment = sqlx::query_as::<_, DbExperiment>(
        r#"
        INSERT INTO experiment (number, cell_concentration, dilution, created_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(number) DO UPDATE SET
            cell_concentration = excluded.cell_concentration,
            dilution = excluded.dilution
        RETURNING id, number, cell_concentration, dilution, created_at
        "#,
    )
    .bind(c.number)
    .bind(c.cell_concentration)
    .bind(c.dilution)
    .bind(Utc::now())
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query("DELETE FROM reagent_value WHERE experiment_id = ?")
        .bind(experiment.id)
        .execute(&mut *tx)
        .await?;

    let mut inserted = 0u64;
    let mut unknown_reagents = Vec::new();
    for v in c.values {
        let name = v.reagent_name.trim();
        let reagent_id: Option<i64> = sqlx::query_scalar("SELECT id FROM reagent WHERE name = ?")
            .bind(name)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(reagent_id) = reagent_id else {
            unknown_reagents.push(name.to_string());
            continue;
        };
        let res = sqlx::query(
            r#"
            INSERT INTO reagent_value (experiment_id, reagent_id, value, unit)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(experiment.id)
        .bind(reagent_id)
        .bind(v.value)
        .bind(v.unit.trim())
        .execute(&mut *tx)
        .await?;
        inserted += res.rows_affected();
    }
    tx.commit().await?;

    debug!(
        number = experiment.number,
        inserted,
        unknown = unknown_reagents.len(),
        "Experiment stored"
    );
    Ok(StoredExperiment {
        experiment,
        inserted,
        unknown_reagents,
    })
}

pub async fn get_experiment(pool: &SqlitePool, id: i64) -> Result<DbExperiment, PlatelabError> {
    sqlx::query_as::<_, DbExperiment>(
        r#"
        SELECT id, number, cell_concentration, dilution, created_at
        FROM experiment
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(PlatelabError::NotFound {
        entity: "experiment",
        id,
    })
}

pub async fn list_experiments(pool: &SqlitePool) -> Result<Vec<DbExperiment>, PlatelabError> {
    let rows = sqlx::query_as::<_, DbExperiment>(
        r#"
        SELECT id, number, cell_concentration, dilution, created_at
        FROM experiment
        ORDER BY number
        "#,
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Assigns an experiment to a plate column. The column must exist on the
/// plate's layout; a missing plate or experiment is left to the foreign keys.
pub async fn map_plate_experiment(
    pool: &SqlitePool,
    c: PlateExperimentCreate,
) -> Result<DbPlateExperimentMap, PlatelabError> {
    let well_count: Option<i64> = sqlx::query_scalar("SELECT well_count FROM plate WHERE id = ?")
        .bind(c.plate_id)
        .fetch_optional(pool)
        .await?;
    let columns = well_count
        .and_then(PlateFormat::from_well_count)
        .unwrap_or(PlateFormat::Wells384)
        .dimensions()
        .1;
    let columns = i64::from(columns);
    if c.column_id < 1 || c.column_id > columns {
        return Err(PlatelabError::InvalidInput(format!(
            "column {} is outside 1..={columns} on plate {}",
            c.column_id, c.plate_id
        )));
    }

    let row = sqlx::query_as::<_, DbPlateExperimentMap>(
        r#"
        INSERT INTO plate_experiment_map (plate_id, column_id, experiment_id)
        VALUES (?, ?, ?)
        RETURNING id, plate_id, column_id, experiment_id
        "#,
    )
    .bind(c.plate_id)
    .bind(c.column_id)
    .bind(c.experiment_id)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

pub async fn list_plate_experiments(
    pool: &SqlitePool,
    plate_id: i64,
) -> Result<Vec<DbPlateExperimentMap>, PlatelabError> {
    let rows = sqlx::query_as::<_, DbPlateExperimentMap>(
        r#"
        SELECT id, plate_id, column_id, experiment_id
        FROM plate_experiment_map
        WHERE plate_id = ?
        ORDER BY column_id
        "#,
    )
    .bind(plate_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Cost
// ---------------------------------------------------------------------------

/// Joined plate × mapping × reagent rows, optionally for a single plate.
pub async fn plate_cost_rows(
    pool: &SqlitePool,
    plate_id: Option<i64>,
) -> Result<Vec<PlateCostRow>, PlatelabError> {
    let rows = sqlx::query_as::<_, PlateCostRow>(
        r#"
        SELECT
            p.id AS plate_id,
            p.label AS plate_label,
            p.created_at AS plate_created_at,
            r.id AS reagent_id,
            r.name AS reagent_name,
            r.unit AS unit,
            m.quantity AS quantity,
            r.unit_cost AS unit_cost
        FROM plate p
        LEFT JOIN plate_reagent_map m ON m.plate_id = p.id
        LEFT JOIN reagent r ON r.id = m.reagent_id
        WHERE ?1 IS NULL OR p.id = ?1
        ORDER BY p.created_at, p.id, m.id
        "#,
    )
    .bind(plate_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// An experiment's reagent amounts joined with each reagent's unit cost, in sheet order.
pub async fn experiment_cost_rows(
    pool: &SqlitePool,
    experiment_id: i64,
) -> Result<Vec<ExperimentCostRow>, PlatelabError> {
    let rows = sqlx::query_as::<_, ExperimentCostRow>(
        r#"
        SELECT
            v.id AS reagent_value_id,
            r.id AS reagent_id,
            r.name AS reagent_name,
            v.unit AS unit,
            v.value AS value,
            r.unit_cost AS unit_cost
        FROM reagent_value v
        JOIN reagent r ON r.id = v.reagent_id
        WHERE v.experiment_id = ?
        ORDER BY v.id
        "#,
    )
    .bind(experiment_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
