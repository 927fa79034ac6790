use std::path::Path;

use bonus_engine::{
    events::{EventHandlers, EventHooks},
    traits::LedgerDatabase,
    SqliteDatabase,
};
use log::*;
use tokio_util::sync::CancellationToken;

use crate::{accrual_worker::start_accrual_worker, config::ServerConfig, errors::ServerError};

const EVENT_BUFFER_SIZE: usize = 25;

/// Opens the ledger database, starts the accrual worker and waits for Ctrl-C. On shutdown the worker is allowed to
/// finish the order it is working on before the database is closed.
pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    ensure_database_dir(&config.database_url)?;
    let mut db = SqliteDatabase::new_with_url(&config.database_url, config.max_db_connections)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    if config.run_migrations {
        db.migrate().await?;
    } else {
        info!("🚀️ Skipping database migrations");
    }

    let hooks = resolution_hooks();
    let handlers = EventHandlers::new(EVENT_BUFFER_SIZE, hooks);
    let producers = handlers.producers();
    let mut handler_tasks = handlers.start_handlers();

    let shutdown = CancellationToken::new();
    let worker = start_accrual_worker(db.clone(), &config.accrual, producers, shutdown.clone())?;
    info!("🚀️ Bonus points ledger is running. Press Ctrl-C to stop");

    tokio::signal::ctrl_c().await?;
    info!("🚀️ Shutdown requested");
    shutdown.cancel();
    if let Some(handle) = worker {
        if let Err(e) = handle.await {
            error!("🚀️ The accrual worker did not shut down cleanly. {e}");
        }
    }
    // The worker owned the last event producers, so the handlers finish once their queues are empty.
    while let Some(res) = handler_tasks.join_next().await {
        if let Err(e) = res {
            warn!("🚀️ An event handler did not shut down cleanly. {e}");
        }
    }
    db.close().await;
    info!("🚀️ Database closed");
    Ok(())
}

fn resolution_hooks() -> EventHooks {
    let mut hooks = EventHooks::default();
    hooks.on_order_resolved(|ev| async move {
        info!("📬️ Order {} for user #{} resolved as {}", ev.order.order_number, ev.order.user_id, ev.status());
    });
    hooks
}

/// SQLite will not create missing directories, so make sure the parent of a file-backed database exists.
fn ensure_database_dir(url: &str) -> Result<(), ServerError> {
    let Some(path) = database_file_path(url) else {
        return Ok(());
    };
    match Path::new(path).parent() {
        Some(dir) if !dir.as_os_str().is_empty() && !dir.exists() => {
            info!("🚀️ Creating database directory {}", dir.display());
            std::fs::create_dir_all(dir)?;
            Ok(())
        },
        _ => Ok(()),
    }
}

fn database_file_path(url: &str) -> Option<&str> {
    let path = url.strip_prefix("sqlite://").or_else(|| url.strip_prefix("sqlite:"))?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() || path.starts_with(":memory:") {
        None
    } else {
        Some(path)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn file_paths_are_extracted_from_urls() {
        assert_eq!(database_file_path("sqlite://data/bonus_ledger.db"), Some("data/bonus_ledger.db"));
        assert_eq!(database_file_path("sqlite:///tmp/ledger.db?mode=rwc"), Some("/tmp/ledger.db"));
        assert_eq!(database_file_path("sqlite:ledger.db"), Some("ledger.db"));
        assert_eq!(database_file_path("sqlite::memory:"), None);
        assert_eq!(database_file_path("postgres://localhost/ledger"), None);
    }

    #[test]
    fn missing_database_directory_is_created() {
        let dir = std::env::temp_dir().join(format!("bpl_server_dir_{}", rand::random::<u64>()));
        let url = format!("sqlite://{}/ledger.db", dir.display());
        assert!(!dir.exists());
        ensure_database_dir(&url).expect("directory should be created");
        assert!(dir.exists());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
