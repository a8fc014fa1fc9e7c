use rusqlite::{Connection, Result};

/// Creates tables and indexes when missing. Safe to run on every start.
pub fn create_tables(conn: &Connection) -> Result<()> {
    // order_id is the remote identity: one row per order, ever.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS market_orders (
            order_id INTEGER PRIMARY KEY NOT NULL,
            type_id INTEGER NOT NULL,
            region_id INTEGER NOT NULL,
            price REAL NOT NULL,
            volume_remain INTEGER NOT NULL,
            volume_total INTEGER NOT NULL,
            is_buy_order INTEGER NOT NULL,
            issued TEXT NOT NULL,
            last_updated TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS market_history (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            type_id INTEGER NOT NULL,
            region_id INTEGER NOT NULL,
            date TEXT NOT NULL,
            volume INTEGER NOT NULL,
            average_price REAL NOT NULL,
            UNIQUE (type_id, region_id, date)
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_orders_item ON market_orders(type_id, region_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_history_item_date
         ON market_history(type_id, region_id, date)",
        [],
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_tables_twice() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        create_tables(&conn).unwrap();
    }

    #[test]
    fn test_history_unique_constraint() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        let insert = "INSERT INTO market_history (type_id, region_id, date, volume, average_price)
                      VALUES (1201, 10000002, '2024-01-01', 3, 4.0)";
        conn.execute(insert, []).unwrap();
        assert!(conn.execute(insert, []).is_err());
    }
}
