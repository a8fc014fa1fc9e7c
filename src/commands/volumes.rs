use chrono::NaiveDate;

use crate::commands::VolumesStdout;
use crate::errors::MarketSyncError;
use crate::logging;
use crate::sync::aggregation::SalesVolumes;
use crate::sync::MarketSynchronizer;

pub async fn volumes(
    synchronizer: &MarketSynchronizer,
    region_id: i32,
    items: &[i32],
    as_of: NaiveDate,
) -> Result<(), MarketSyncError> {
    let volumes = load_volumes(synchronizer, region_id, items, as_of).await?;
    logging::stdoutln(VolumesStdout::new(volumes))?;
    Ok(())
}

pub(crate) async fn load_volumes(
    synchronizer: &MarketSynchronizer,
    region_id: i32,
    items: &[i32],
    as_of: NaiveDate,
) -> Result<Vec<SalesVolumes>, MarketSyncError> {
    let mut volumes = Vec::with_capacity(items.len());
    for item_id in items {
        volumes.push(synchronizer.sales_volumes(region_id, *item_id, as_of).await?);
    }
    Ok(volumes)
}
