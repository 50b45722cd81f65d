//! Versioned, reversible schema migrations.
//!
//! Scripts live in `migrations/` as `<version>_<name>.up.sql` / `.down.sql`
//! pairs and are embedded at compile time. Applied versions (with checksums)
//! are recorded in `_sqlx_migrations`; an applied script whose checksum no
//! longer matches the embedded one aborts the run.

use crate::error::PlatelabError;
use serde::Serialize;
use sqlx::SqlitePool;
use sqlx::migrate::Migrator;
use std::collections::HashSet;
use tracing::info;

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

const VERSION_TABLE: &str = "_sqlx_migrations";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationStatus {
    pub version: i64,
    pub description: String,
    pub applied: bool,
}

/// One `sqlite_master` entry: `(type, name, sql)`.
pub type SchemaObject = (String, String, Option<String>);

/// Applies every pending migration, oldest first.
pub async fn upgrade(pool: &SqlitePool) -> Result<Option<i64>, PlatelabError> {
    let before = current_version(pool).await?;
    MIGRATOR.run(pool).await?;
    let after = current_version(pool).await?;
    if before == after {
        info!(version = ?after, "Schema already up to date");
    } else {
        info!(from = ?before, to = ?after, "Schema upgraded");
    }
    Ok(after)
}

/// Reverts every applied migration newer than `target`; `0` empties the schema.
pub async fn downgrade(pool: &SqlitePool, target: i64) -> Result<Option<i64>, PlatelabError> {
    if target < 0 {
        return Err(PlatelabError::InvalidInput(format!(
            "downgrade target {target} is negative"
        )));
    }
    let before = current_version(pool).await?;
    MIGRATOR.undo(pool, target).await?;
    let after = current_version(pool).await?;
    info!(from = ?before, to = ?after, target, "Schema downgraded");
    Ok(after)
}

/// Highest successfully applied version, or `None` on a fresh database.
pub async fn current_version(pool: &SqlitePool) -> Result<Option<i64>, PlatelabError> {
    if !version_table_exists(pool).await? {
        return Ok(None);
    }
    let version: Option<i64> =
        sqlx::query_scalar("SELECT MAX(version) FROM _sqlx_migrations WHERE success = 1")
            .fetch_one(pool)
            .await?;
    Ok(version)
}

/// Every embedded migration with its applied flag, in version order.
pub async fn status(pool: &SqlitePool) -> Result<Vec<MigrationStatus>, PlatelabError> {
    let applied: HashSet<i64> = if version_table_exists(pool).await? {
        sqlx::query_scalar("SELECT version FROM _sqlx_migrations WHERE success = 1")
            .fetch_all(pool)
            .await?
            .into_iter()
            .collect()
    } else {
        HashSet::new()
    };

    let mut out: Vec<MigrationStatus> = MIGRATOR
        .iter()
        .filter(|m| !m.migration_type.is_down_migration())
        .map(|m| MigrationStatus {
            version: m.version,
            description: m.description.to_string(),
            applied: applied.contains(&m.version),
        })
        .collect();
    out.sort_by_key(|m| m.version);
    Ok(out)
}

/// Application schema objects (tables, indexes), excluding SQLite internals
/// and the version table. Used to compare schemas across migration runs.
pub async fn schema_snapshot(pool: &SqlitePool) -> Result<Vec<SchemaObject>, PlatelabError> {
    let rows = sqlx::query_as::<_, SchemaObject>(
        r#"
        SELECT type, name, sql
        FROM sqlite_master
        WHERE name NOT LIKE 'sqlite_%' AND name != ?
        ORDER BY type, name
        "#,
    )
    .bind(VERSION_TABLE)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

async fn version_table_exists(pool: &SqlitePool) -> Result<bool, PlatelabError> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?")
            .bind(VERSION_TABLE)
            .fetch_one(pool)
            .await?;
    Ok(count > 0)
}
