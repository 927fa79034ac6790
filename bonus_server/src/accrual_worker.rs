use bonus_engine::{
    accrual::{AccrualHttpClient, AccrualPoller},
    events::EventProducers,
    SqliteDatabase,
};
use log::*;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{config::AccrualConfig, errors::ServerError};

/// Starts the accrual poller on its own task. The task runs until `shutdown` is cancelled.
///
/// Returns `Ok(None)` if no accrual system address has been configured, in which case orders are accepted but never
/// reconciled.
pub fn start_accrual_worker(
    db: SqliteDatabase,
    config: &AccrualConfig,
    producers: EventProducers,
    shutdown: CancellationToken,
) -> Result<Option<JoinHandle<()>>, ServerError> {
    let Some(address) = config.system_address.as_deref() else {
        warn!("🕰️ No accrual system is configured. The accrual poller will not be started");
        return Ok(None);
    };
    let poller_config = config.poller_config();
    let client = AccrualHttpClient::new(address, poller_config.request_timeout)?;
    info!("🕰️ Reconciling orders against the accrual system at {}", client.base_url());
    let poller = AccrualPoller::new(db, client, poller_config, shutdown).with_producers(producers);
    Ok(Some(tokio::spawn(poller.run())))
}
