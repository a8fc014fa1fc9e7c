use crate::errors::MarketSyncError;
use crate::logging;
use crate::sync::MarketSynchronizer;

pub async fn orders(
    synchronizer: &MarketSynchronizer,
    region_id: i32,
    items: &[i32],
) -> Result<(), MarketSyncError> {
    let report = synchronizer.sync_orders(region_id, items).await;
    logging::stdoutln(report)?;
    Ok(())
}
