use anyhow::Result;
use clap::Parser;
use std::io::BufRead;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;
use vmidle::cli::{Cli, Command};
use vmidle::*;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

/// Rows per transaction when importing snapshots.
const IMPORT_BATCH: usize = 500;

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let command = cli.command();
    tracing::info!(?command, "starting {}", version::banner());

    let app_config = Arc::new(match &cli.config {
        Some(path) => config::AppConfig::load_from_path(path)?,
        None => config::AppConfig::load()?,
    });
    let repo = Arc::new(
        snapshot_repo::SnapshotRepo::connect(
            &app_config.database.path,
            app_config.database.max_pool_size,
        )
        .await?,
    );
    repo.init().await?;

    match command {
        Command::Analyze => analyze(repo, app_config).await,
        Command::Dump => dump(repo, app_config).await,
        Command::Info => info(&repo).await,
        Command::Import { file } => import(&repo, &file).await,
        Command::Prune => prune(&repo, &app_config).await,
    }
}

async fn resolve_window(
    repo: &snapshot_repo::SnapshotRepo,
    app_config: &config::AppConfig,
) -> Result<models::TimeWindow> {
    let bounds = repo.time_bounds().await?;
    let window = batch::resolve_window(app_config, bounds, chrono::Utc::now())?;
    tracing::info!(
        start = %window.start,
        end = %window.end,
        level = %app_config.analysis.level,
        "analysis window"
    );
    Ok(window)
}

async fn analyze(
    repo: Arc<snapshot_repo::SnapshotRepo>,
    app_config: Arc<config::AppConfig>,
) -> Result<()> {
    let window = resolve_window(&repo, &app_config).await?;
    let evaluations = batch::run(repo, app_config.clone(), window).await?;
    let report = report::build(evaluations.into_values(), &app_config.output);
    let rendered = report::render(&report, &app_config.analysis, &app_config.output)?;
    report::write_output(&app_config.output.path, app_config.output.overwrite, &rendered)
}

async fn dump(
    repo: Arc<snapshot_repo::SnapshotRepo>,
    app_config: Arc<config::AppConfig>,
) -> Result<()> {
    let window = resolve_window(&repo, &app_config).await?;
    let series = batch::reconstruct_all(repo, app_config.clone(), window).await?;
    let rendered = report::render_series(&series, &app_config.output)?;
    report::write_output(&app_config.output.path, app_config.output.overwrite, &rendered)
}

async fn info(repo: &snapshot_repo::SnapshotRepo) -> Result<()> {
    let vms = repo.list_vms().await?;
    println!("{}", version::banner());
    println!("Information about the data available:");
    match repo.time_bounds().await? {
        Some((first, last)) => {
            println!("  - first entry: {}", first.to_rfc3339());
            println!("  - last entry: {}", last.to_rfc3339());
        }
        None => println!("  - no entries"),
    }
    println!("  - available vms: {}", vms.len());
    for vm in vms {
        println!("      {}", vm);
    }
    Ok(())
}

async fn import(repo: &snapshot_repo::SnapshotRepo, path: &Path) -> Result<()> {
    let file = std::fs::File::open(path)
        .map_err(|e| anyhow::anyhow!("opening {}: {}", path.display(), e))?;
    let mut batch = Vec::with_capacity(IMPORT_BATCH);
    let mut imported = 0usize;
    let mut rejected = 0usize;

    for (n, line) in std::io::BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match snapshot_repo::RawSnapshot::from_json_line(&line) {
            Ok(s) => batch.push(s),
            Err(e) => {
                tracing::warn!(line = n + 1, error = %e, "rejecting import line");
                rejected += 1;
            }
        }
        if batch.len() >= IMPORT_BATCH {
            repo.save_snapshots(&batch).await?;
            imported += batch.len();
            batch.clear();
        }
    }
    repo.save_snapshots(&batch).await?;
    imported += batch.len();
    tracing::info!(imported, rejected, "import complete");
    Ok(())
}

async fn prune(repo: &snapshot_repo::SnapshotRepo, app_config: &config::AppConfig) -> Result<()> {
    let Some(days) = app_config.database.retention_days else {
        tracing::info!("database.retention_days not set; nothing to prune");
        return Ok(());
    };
    let cutoff = chrono::Utc::now() - chrono::Duration::days(days as i64);
    let removed = repo.prune_before(cutoff).await?;
    repo.vacuum().await?;
    tracing::info!(removed, cutoff = %cutoff, "prune complete");
    Ok(())
}
