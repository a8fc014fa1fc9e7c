use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::model::orders::LiveOrder;

use super::{query_error, PersistenceError};

static ORDER_COLUMNS: &str = "order_id, type_id, region_id, price, volume_remain, volume_total, \
                              is_buy_order, issued, last_updated";

fn from_row(row: &Row) -> rusqlite::Result<LiveOrder> {
    Ok(LiveOrder {
        order_id: row.get(0)?,
        item_id: row.get(1)?,
        region_id: row.get(2)?,
        price: row.get(3)?,
        volume_remaining: row.get(4)?,
        volume_total: row.get(5)?,
        is_buy_order: row.get(6)?,
        issued_at: row.get(7)?,
        last_synced_at: row.get(8)?,
    })
}

pub fn find(conn: &Connection, order_id: i64) -> Result<Option<LiveOrder>, PersistenceError> {
    conn.query_row(
        &format!("SELECT {} FROM market_orders WHERE order_id = ?1", ORDER_COLUMNS),
        params![order_id],
        from_row,
    )
    .optional()
    .map_err(query_error("find order"))
}

pub fn insert_all(conn: &Connection, orders: &[LiveOrder]) -> Result<(), PersistenceError> {
    if orders.is_empty() {
        return Ok(());
    }
    let mut statement = conn
        .prepare_cached(&format!(
            "INSERT INTO market_orders ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            ORDER_COLUMNS
        ))
        .map_err(query_error("prepare order insertion"))?;
    for order in orders {
        statement
            .execute(params![
                order.order_id,
                order.item_id,
                order.region_id,
                order.price,
                order.volume_remaining,
                order.volume_total,
                order.is_buy_order,
                order.issued_at,
                order.last_synced_at,
            ])
            .map_err(query_error("insert order"))?;
    }
    Ok(())
}

pub fn update(conn: &Connection, order: &LiveOrder) -> Result<(), PersistenceError> {
    conn.execute(
        "UPDATE market_orders
         SET price = ?2, volume_remain = ?3, volume_total = ?4, is_buy_order = ?5,
             issued = ?6, last_updated = ?7
         WHERE order_id = ?1",
        params![
            order.order_id,
            order.price,
            order.volume_remaining,
            order.volume_total,
            order.is_buy_order,
            order.issued_at,
            order.last_synced_at,
        ],
    )
    .map_err(query_error("update order"))?;
    Ok(())
}

pub fn for_item(
    conn: &Connection,
    region_id: i32,
    item_id: i32,
) -> Result<Vec<LiveOrder>, PersistenceError> {
    let mut statement = conn
        .prepare(&format!(
            "SELECT {} FROM market_orders WHERE region_id = ?1 AND type_id = ?2 ORDER BY order_id",
            ORDER_COLUMNS
        ))
        .map_err(query_error("prepare orders listing"))?;
    let orders = statement
        .query_map(params![region_id, item_id], from_row)
        .map_err(query_error("list orders"))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(query_error("read orders"))?;
    Ok(orders)
}

pub fn count(conn: &Connection) -> Result<usize, PersistenceError> {
    conn.query_row("SELECT COUNT(*) FROM market_orders", [], |row| {
        row.get::<_, i64>(0)
    })
    .map(|count| count as usize)
    .map_err(query_error("count orders"))
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use crate::store::MarketStore;

    use super::*;

    fn order(order_id: i64) -> LiveOrder {
        LiveOrder {
            order_id,
            item_id: 1201,
            region_id: 10000002,
            price: 12.5,
            volume_remaining: 5,
            volume_total: 10,
            is_buy_order: true,
            issued_at: Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
            last_synced_at: Utc.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_insert_find_update() {
        let store = MarketStore::open_in_memory().unwrap();
        store
            .transaction(|tx| insert_all(tx, &[order(1), order(2)]))
            .unwrap();

        let found = store.read(|conn| find(conn, 1)).unwrap();
        assert_eq!(found, Some(order(1)));
        assert_eq!(store.read(|conn| find(conn, 3)).unwrap(), None);

        let mut changed = order(2);
        changed.price = 13.0;
        store.transaction(|tx| update(tx, &changed)).unwrap();
        assert_eq!(store.read(|conn| find(conn, 2)).unwrap(), Some(changed));
        assert_eq!(store.read(count).unwrap(), 2);
    }

    #[test]
    fn test_duplicate_order_id_is_rejected() {
        let store = MarketStore::open_in_memory().unwrap();
        store.transaction(|tx| insert_all(tx, &[order(1)])).unwrap();
        let res = store.transaction(|tx| insert_all(tx, &[order(2), order(1)]));
        assert!(res.is_err());
        // the whole batch is rolled back, order 2 included
        assert_eq!(store.read(count).unwrap(), 1);
    }

    #[test]
    fn test_for_item() {
        let store = MarketStore::open_in_memory().unwrap();
        let mut other_item = order(3);
        other_item.item_id = 1202;
        store
            .transaction(|tx| insert_all(tx, &[order(2), order(1), other_item.clone()]))
            .unwrap();
        let orders = store.read(|conn| for_item(conn, 10000002, 1201)).unwrap();
        assert_eq!(orders, vec![order(1), order(2)]);
    }
}
