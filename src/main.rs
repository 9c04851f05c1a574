//! Binary entry point: resolve configuration, route logs to a file so they do
//! not tear the alternate screen, open the collection, and run the TUI.
use std::fs::{self, OpenOptions};

use anyhow::{Context, Result};
use book_tracker::{run_app, App, BookStore, Config, MemoryStorage, SqliteStorage};
use env_logger::{Env, Target};
use log::info;

fn main() -> Result<()> {
    let config = Config::from_env().context("failed to resolve configuration")?;
    init_logging(&config)?;
    info!("starting with data directory {}", config.data_dir.display());

    let store = open_store(&config);
    let mut app = App::new(store, config.recent_limit);
    run_app(&mut app)
}

fn init_logging(config: &Config) -> Result<()> {
    fs::create_dir_all(&config.data_dir).with_context(|| {
        format!("failed to create data directory {}", config.data_dir.display())
    })?;
    let log_path = config.log_path();
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("failed to open log file {}", log_path.display()))?;

    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .target(Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}

/// An unusable SQLite file downgrades the session to memory-only storage
/// instead of refusing to start. The cause is shown as a start-up warning.
fn open_store(config: &Config) -> BookStore {
    if config.ephemeral {
        info!("ephemeral mode: collection is kept in memory only");
        return BookStore::open(MemoryStorage::new(), config.storage_key.clone());
    }

    match SqliteStorage::open(&config.data_dir) {
        Ok(storage) => {
            info!("collection stored in {}", storage.path().display());
            BookStore::open(storage, config.storage_key.clone())
        }
        Err(err) => {
            BookStore::open_fallback(MemoryStorage::new(), config.storage_key.clone(), err)
        }
    }
}
