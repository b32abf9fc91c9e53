use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use hostwatch::{
    api::{ApiConfig, ApiState, spawn_api_server},
    cache::SnapshotCache,
    config::{Config, StoreConfig, read_config_file},
    scanner::Scanner,
    scheduler::SchedulerHandle,
    source::SysinfoSource,
    store::{MemoryStore, SqliteStore, TimeSeriesStore},
};
use tracing::{debug, error, info, level_filters::LevelFilter, trace};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Config file
    #[arg(short)]
    file: Option<String>,
}

fn init() {
    dotenv::dotenv().ok();

    let filter = filter::Targets::new().with_targets(vec![
        ("hostwatch", LevelFilter::DEBUG),
        ("hostwatchd", LevelFilter::DEBUG),
    ]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init();
    let args = Args::parse();
    trace!("started with args: {args:?}");

    let config = match &args.file {
        Some(path) => read_config_file(path)?,
        None => Config::default(),
    };

    let store_config = config.store.clone().unwrap_or_default();
    let store: Arc<dyn TimeSeriesStore> = match &store_config {
        StoreConfig::Memory => {
            info!("using in-memory sample store");
            Arc::new(MemoryStore::new())
        }
        StoreConfig::Sqlite { path, .. } => Arc::new(SqliteStore::new(path).await?),
    };

    let cache = SnapshotCache::new();
    let scanner = Scanner::new(Arc::new(SysinfoSource::new()));
    let scheduler = SchedulerHandle::spawn(scanner, store.clone(), cache.clone());

    scheduler.start(Duration::from_secs(config.interval)).await?;
    info!("scheduler ticking every {}s", config.interval);

    if let StoreConfig::Sqlite { retention_days, .. } = store_config {
        spawn_retention_cleanup(store.clone(), retention_days);
    }

    let api_config = match config.api {
        Some(settings) => ApiConfig {
            bind_addr: settings.bind,
            ..ApiConfig::default()
        },
        None => ApiConfig::default(),
    };
    let state = ApiState::new(cache, store.clone(), scheduler.clone());
    spawn_api_server(api_config, state).await?;

    tokio::signal::ctrl_c().await?;
    info!("shutting down");

    scheduler.stop().await?;
    scheduler.shutdown().await?;
    store.close().await?;

    Ok(())
}

/// Daily retention pass. Pruning lives outside the store's write path; a
/// failed pass is logged and retried on the next interval.
fn spawn_retention_cleanup(store: Arc<dyn TimeSeriesStore>, retention_days: u32) {
    debug!("retention cleanup enabled: {retention_days} days");

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(24 * 60 * 60));

        loop {
            ticker.tick().await;

            let cutoff = chrono::Utc::now() - chrono::Duration::days(retention_days as i64);
            match store.prune_before(cutoff).await {
                Ok(deleted) if deleted > 0 => {
                    info!("retention cleanup deleted {deleted} samples");
                }
                Ok(_) => trace!("retention cleanup: nothing to delete"),
                Err(e) => error!("retention cleanup failed: {e}"),
            }
        }
    });
}
