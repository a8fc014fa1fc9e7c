use chrono::NaiveDate;

use crate::api::HistoryEntry;

use super::MalformedRecordError;

pub static HISTORY_DATE_FORMAT: &str = "%Y-%m-%d";

/// Trading activity of one item in one region for one day. Never rewritten once stored.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRecord {
    pub item_id: i32,
    pub region_id: i32,
    pub date: NaiveDate,
    pub volume: i64,
    pub average_price: f64,
}

impl HistoryRecord {
    pub fn parse(
        region_id: i32,
        item_id: i32,
        entry: &HistoryEntry,
    ) -> Result<Self, MalformedRecordError> {
        let date = NaiveDate::parse_from_str(&entry.date, HISTORY_DATE_FORMAT).map_err(
            |source| MalformedRecordError::InvalidHistoryDate {
                item_id,
                date: entry.date.clone(),
                source,
            },
        )?;
        if entry.volume < 0 {
            return Err(MalformedRecordError::InvalidHistoryEntry {
                item_id,
                date,
                reason: format!("negative volume {}", entry.volume),
            });
        }
        if !entry.average.is_finite() || entry.average < 0.0 {
            return Err(MalformedRecordError::InvalidHistoryEntry {
                item_id,
                date,
                reason: format!("average price {} is not valid", entry.average),
            });
        }
        Ok(Self {
            item_id,
            region_id,
            date,
            volume: entry.volume,
            average_price: entry.average,
        })
    }
}
