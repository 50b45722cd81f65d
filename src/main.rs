use clap::{Parser, Subcommand};
use mimalloc::MiMalloc;
use platelab::config::{Config, DEFAULT_CONFIG_FILE};
use platelab::db::{self, migrate};
use platelab::{PlatelabError, ingest, server};
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::{net::TcpListener, signal};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

const DEFAULT_SEED_CSV: &str = "data/default_reagents.csv";

#[derive(Debug, Parser)]
#[command(name = "platelab", version, about = "Plate, reagent and cell growth tracking")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the dashboard HTTP server (default).
    Serve,
    /// Inspect or move the schema version.
    Migrate {
        #[command(subcommand)]
        action: MigrateAction,
    },
    /// Import a reagent list, updating reagents that already exist by name.
    Seed {
        /// Defaults to `data.seed_csv`, then `data/default_reagents.csv`.
        path: Option<PathBuf>,
    },
    /// Load plate-reader exports or experiment cost sheets.
    Ingest {
        #[command(subcommand)]
        kind: IngestKind,
    },
}

#[derive(Debug, Subcommand)]
enum IngestKind {
    /// Absorbance exports (`plate_<n>.csv`) from a file or directory.
    Absorbance { path: PathBuf },
    /// Experiment cost sheets (`... exp <n>.csv`) from a file or directory.
    Experiment { path: PathBuf },
}

#[derive(Debug, Subcommand)]
enum MigrateAction {
    /// Apply all pending migrations.
    Up,
    /// Revert applied migrations newer than `target` (0 reverts everything).
    Down { target: i64 },
    /// List migrations and whether each is applied.
    Status,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.basic.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_level(true)
                .with_target(false),
        )
        .init();

    info!(
        config = %cli.config.display(),
        database_url = %cfg.basic.database_url,
        loglevel = %cfg.basic.loglevel,
        listen_addr = %cfg.basic.listen_addr,
        listen_port = cfg.basic.listen_port,
        auto_migrate = cfg.data.auto_migrate
    );

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(&cfg).await?,
        Command::Migrate { action } => run_migrate(&cfg, action).await?,
        Command::Seed { path } => {
            let handle = db::spawn(&cfg.basic.database_url, cfg.data.auto_migrate).await?;
            let path = path.unwrap_or_else(|| seed_path(&cfg));
            let result = ingest::import_seed_file(&handle, &path).await;
            handle.shutdown().await?;
            let report = result?;
            println!(
                "{}: {} inserted, {} updated, {} skipped",
                path.display(),
                report.inserted,
                report.updated,
                report.skipped.len()
            );
        }
        Command::Ingest { kind } => {
            let handle = db::spawn(&cfg.basic.database_url, cfg.data.auto_migrate).await?;
            let result = run_ingest(&handle, kind).await;
            handle.shutdown().await?;
            result?;
        }
    }
    Ok(())
}

async fn run_ingest(handle: &db::DbActorHandle, kind: IngestKind) -> Result<(), PlatelabError> {
    let failed = match kind {
        IngestKind::Absorbance { path } => {
            let summary = ingest::ingest_path(handle, &path).await?;
            for file in &summary.files {
                println!(
                    "{} -> {}: {} readings",
                    file.path.display(),
                    file.plate.label,
                    file.inserted
                );
            }
            summary.failed
        }
        IngestKind::Experiment { path } => {
            let summary = ingest::ingest_experiment_path(handle, &path).await?;
            for file in &summary.files {
                let stored = &file.stored;
                println!(
                    "{} -> experiment {}: {} reagent amounts, {} unknown reagents",
                    file.path.display(),
                    stored.experiment.number,
                    stored.inserted,
                    stored.unknown_reagents.len()
                );
            }
            summary.failed
        }
    };

    for (file, reason) in &failed {
        println!("{} failed: {reason}", file.display());
    }
    if failed.is_empty() {
        Ok(())
    } else {
        Err(PlatelabError::Ingest(format!(
            "{} file(s) could not be ingested",
            failed.len()
        )))
    }
}

fn seed_path(cfg: &Config) -> PathBuf {
    cfg.data
        .seed_csv
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SEED_CSV))
}

async fn serve(cfg: &Config) -> Result<(), Box<dyn std::error::Error>> {
    // Migration failures abort start-up here.
    let handle = db::spawn(&cfg.basic.database_url, cfg.data.auto_migrate).await?;

    if cfg.data.seed_on_start {
        let path = seed_path(cfg);
        if path.is_file() {
            if let Err(e) = ingest::import_seed_file(&handle, &path).await {
                handle.shutdown().await?;
                return Err(e.into());
            }
        } else {
            warn!(path = %path.display(), "seed_on_start is set but the seed file is missing");
        }
    }

    let state = server::LabState::new(handle.clone());
    let app = server::lab_router(state);

    let addr = SocketAddr::from((cfg.basic.listen_addr, cfg.basic.listen_port));
    let listener = TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    handle.shutdown().await?;
    info!("Server has shut down gracefully.");
    Ok(())
}

async fn run_migrate(cfg: &Config, action: MigrateAction) -> Result<(), PlatelabError> {
    let pool = db::pool::connect(&cfg.basic.database_url).await?;
    match action {
        MigrateAction::Up => {
            let version = migrate::upgrade(&pool).await?;
            println!("schema version: {}", format_version(version));
        }
        MigrateAction::Down { target } => {
            let version = migrate::downgrade(&pool, target).await?;
            println!("schema version: {}", format_version(version));
        }
        MigrateAction::Status => {
            for m in migrate::status(&pool).await? {
                let mark = if m.applied { "applied" } else { "pending" };
                println!("{:>14}  {:<8} {}", m.version, mark, m.description);
            }
        }
    }
    pool.close().await;
    Ok(())
}

fn format_version(version: Option<i64>) -> String {
    version.map_or_else(|| "none".to_string(), |v| v.to_string())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => { info!("Ctrl+C received, shutting down") },
        _ = terminate => { info!("SIGTERM received, shutting down") },
    }
}
