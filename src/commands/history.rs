use chrono::NaiveDate;
use colored::ColoredString;
use serde::Serialize;

use crate::commands::volumes::load_volumes;
use crate::commands::VolumesStdout;
use crate::errors::MarketSyncError;
use crate::logging::{self, Message, Stdout, Verbosity};
use crate::sync::{MarketSynchronizer, RunReport};

/// Synchronizes history, then reports sales volumes of every item whose history is usable.
pub async fn history(
    synchronizer: &MarketSynchronizer,
    region_id: i32,
    items: &[i32],
    as_of: NaiveDate,
) -> Result<(), MarketSyncError> {
    let report = synchronizer.sync_history(region_id, items).await;
    let mut fresh: Vec<i32> = report
        .succeeded
        .iter()
        .chain(report.skipped_by_cache.iter())
        .copied()
        .collect();
    fresh.sort_unstable();
    let volumes = load_volumes(synchronizer, region_id, &fresh, as_of).await?;
    logging::stdoutln(HistoryStdout {
        report,
        volumes: VolumesStdout::new(volumes),
    })?;
    Ok(())
}

#[derive(Serialize)]
pub struct HistoryStdout {
    report: RunReport,
    #[serde(flatten)]
    volumes: VolumesStdout,
}

impl Message for HistoryStdout {
    fn standard(&self, verbosity: Verbosity) -> ColoredString {
        let volumes = self.volumes.standard(verbosity);
        if volumes.is_empty() {
            return self.report.standard(verbosity);
        }
        ColoredString::from(format!("{}\n\n{}", self.report.standard(verbosity), volumes).as_str())
    }
}

impl Stdout for HistoryStdout {}
