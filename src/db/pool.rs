use crate::error::PlatelabError;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use std::{str::FromStr, time::Duration};

/// Opens (creating if needed) the SQLite file behind `database_url`.
///
/// Foreign keys are switched on for every pooled connection; referential
/// integrity between plates, reagents and their mappings depends on it.
pub async fn connect(database_url: &str) -> Result<SqlitePool, PlatelabError> {
    let connect_opts = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5))
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal);

    let pool = SqlitePoolOptions::new()
        .connect_with(connect_opts)
        .await?;
    Ok(pool)
}
