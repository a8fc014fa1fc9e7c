use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::model::history::HistoryRecord;

use super::{query_error, PersistenceError};

fn from_row(row: &Row) -> rusqlite::Result<HistoryRecord> {
    Ok(HistoryRecord {
        item_id: row.get(0)?,
        region_id: row.get(1)?,
        date: row.get(2)?,
        volume: row.get(3)?,
        average_price: row.get(4)?,
    })
}

pub fn find(
    conn: &Connection,
    item_id: i32,
    region_id: i32,
    date: NaiveDate,
) -> Result<Option<HistoryRecord>, PersistenceError> {
    conn.query_row(
        "SELECT type_id, region_id, date, volume, average_price FROM market_history
         WHERE type_id = ?1 AND region_id = ?2 AND date = ?3",
        params![item_id, region_id, date],
        from_row,
    )
    .optional()
    .map_err(query_error("find history"))
}

pub fn insert_all(conn: &Connection, records: &[HistoryRecord]) -> Result<(), PersistenceError> {
    if records.is_empty() {
        return Ok(());
    }
    let mut statement = conn
        .prepare_cached(
            "INSERT INTO market_history (type_id, region_id, date, volume, average_price)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .map_err(query_error("prepare history insertion"))?;
    for record in records {
        statement
            .execute(params![
                record.item_id,
                record.region_id,
                record.date,
                record.volume,
                record.average_price,
            ])
            .map_err(query_error("insert history"))?;
    }
    Ok(())
}

/// Total volume traded on `since` and every later day.
pub fn volume_since(
    conn: &Connection,
    item_id: i32,
    region_id: i32,
    since: NaiveDate,
) -> Result<i64, PersistenceError> {
    conn.query_row(
        "SELECT COALESCE(SUM(volume), 0) FROM market_history
         WHERE type_id = ?1 AND region_id = ?2 AND date >= ?3",
        params![item_id, region_id, since],
        |row| row.get(0),
    )
    .map_err(query_error("sum history volumes"))
}

pub fn for_item(
    conn: &Connection,
    item_id: i32,
    region_id: i32,
) -> Result<Vec<HistoryRecord>, PersistenceError> {
    let mut statement = conn
        .prepare(
            "SELECT type_id, region_id, date, volume, average_price FROM market_history
             WHERE type_id = ?1 AND region_id = ?2 ORDER BY date",
        )
        .map_err(query_error("prepare history listing"))?;
    let records = statement
        .query_map(params![item_id, region_id], from_row)
        .map_err(query_error("list history"))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(query_error("read history"))?;
    Ok(records)
}

pub fn latest_date(
    conn: &Connection,
    item_id: i32,
    region_id: i32,
) -> Result<Option<NaiveDate>, PersistenceError> {
    conn.query_row(
        "SELECT MAX(date) FROM market_history WHERE type_id = ?1 AND region_id = ?2",
        params![item_id, region_id],
        |row| row.get(0),
    )
    .map_err(query_error("find latest history date"))
}

pub fn count(conn: &Connection) -> Result<usize, PersistenceError> {
    conn.query_row("SELECT COUNT(*) FROM market_history", [], |row| {
        row.get::<_, i64>(0)
    })
    .map(|count| count as usize)
    .map_err(query_error("count history"))
}
