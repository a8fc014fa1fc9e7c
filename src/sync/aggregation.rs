use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

use crate::dates::NaivePeriod;
use crate::store::{self, MarketStore, PersistenceError};

pub const SHORT_WINDOW_DAYS: u32 = 30;
pub const LONG_WINDOW_DAYS: u32 = 60;

#[derive(Debug, Error)]
pub enum AggregationError {
    #[error("a rolling average needs a window of at least one day")]
    EmptyWindow,
    #[error("{window_days} days before {as_of} is out of the supported date range")]
    WindowOutOfRange { as_of: NaiveDate, window_days: u32 },
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// Average daily volume over the `window_days` days before `as_of`.
///
/// The total is divided by the window length, not by the number of stored days: a day without
/// history counts as a day without sales.
pub fn rolling_average_volume(
    store: &MarketStore,
    item_id: i32,
    region_id: i32,
    as_of: NaiveDate,
    window_days: u32,
) -> Result<f64, AggregationError> {
    if window_days == 0 {
        return Err(AggregationError::EmptyWindow);
    }
    let period = NaivePeriod::trailing(as_of, window_days).ok_or(
        AggregationError::WindowOutOfRange {
            as_of,
            window_days,
        },
    )?;
    let volume = store.read(|conn| {
        store::history::volume_since(conn, item_id, region_id, period.start())
    })?;
    Ok(volume as f64 / f64::from(window_days))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalesVolumes {
    pub item_id: i32,
    pub region_id: i32,
    pub as_of: NaiveDate,
    /// Most recent day of stored history, if any.
    pub latest_date: Option<NaiveDate>,
    pub average_30_days: f64,
    pub average_60_days: f64,
}

pub fn sales_volumes(
    store: &MarketStore,
    item_id: i32,
    region_id: i32,
    as_of: NaiveDate,
) -> Result<SalesVolumes, AggregationError> {
    Ok(SalesVolumes {
        item_id,
        region_id,
        as_of,
        latest_date: store.read(|conn| store::history::latest_date(conn, item_id, region_id))?,
        average_30_days: rolling_average_volume(
            store,
            item_id,
            region_id,
            as_of,
            SHORT_WINDOW_DAYS,
        )?,
        average_60_days: rolling_average_volume(
            store,
            item_id,
            region_id,
            as_of,
            LONG_WINDOW_DAYS,
        )?,
    })
}
