use chrono::NaiveDateTime;
use log::debug;
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, named_params};

use crate::db::StoreResult;
use crate::request::Request;

/// A request persisted after failing while offline.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRequest {
    pub id: i64,
    pub key: String,
    pub request: Request,
    pub created_at: NaiveDateTime,
}

/// Persists `request` under its fingerprint.
///
/// Saving a request whose fingerprint is already stored replaces the payload
/// but keeps the original position in the replay order.
pub fn save_offline_request(conn: &Connection, request: &Request) -> StoreResult<()> {
    let key = request.key();
    let payload = serde_json::to_string(request)?;

    debug!(
        key = key.as_str(),
        method = request.method().as_str();
        "DB: Saving offline request"
    );

    conn.execute(
        r#"
        INSERT INTO offline_requests (key, method, resource, payload, created_at, updated_at)
        VALUES (:key, :method, :resource, :payload, datetime('now'), datetime('now'))
        ON CONFLICT(key) DO UPDATE SET
            method = excluded.method,
            resource = excluded.resource,
            payload = excluded.payload,
            updated_at = excluded.updated_at
        "#,
        named_params! {
            ":key": key,
            ":method": request.method().as_str(),
            ":resource": request.resource(),
            ":payload": payload,
        },
    )?;

    Ok(())
}

/// Returns every stored request in the order they were first persisted.
pub fn fetch_offline_requests(conn: &Connection) -> StoreResult<Vec<StoredRequest>> {
    let mut stmt = conn.prepare_cached(
        r#"
        SELECT id, key, payload, created_at
        FROM offline_requests
        ORDER BY id ASC
        "#,
    )?;

    let rows = stmt.query_map([], map_stored_request)?;

    let mut items = Vec::new();
    for row in rows {
        items.push(row?);
    }

    Ok(items)
}

pub fn get_offline_request(conn: &Connection, key: &str) -> StoreResult<Option<StoredRequest>> {
    let item = conn
        .query_row(
            "SELECT id, key, payload, created_at FROM offline_requests WHERE key = :key",
            named_params! { ":key": key },
            map_stored_request,
        )
        .optional()?;

    Ok(item)
}

pub fn delete_offline_request(conn: &Connection, key: &str) -> StoreResult<usize> {
    debug!(key = key; "DB: Removing offline request");

    let count = conn.execute(
        "DELETE FROM offline_requests WHERE key = :key",
        named_params! { ":key": key },
    )?;
    Ok(count)
}

pub fn count_offline_requests(conn: &Connection) -> StoreResult<i64> {
    let count = conn.query_row("SELECT COUNT(*) FROM offline_requests", [], |r| r.get(0))?;
    Ok(count)
}

pub fn clear_offline_requests(conn: &Connection) -> StoreResult<usize> {
    let count = conn.execute("DELETE FROM offline_requests", [])?;
    Ok(count)
}

fn map_stored_request(row: &Row<'_>) -> rusqlite::Result<StoredRequest> {
    let payload: String = row.get(2)?;
    let request = serde_json::from_str(&payload)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?;

    Ok(StoredRequest {
        id: row.get(0)?,
        key: row.get(1)?,
        request,
        created_at: row.get(3)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;
    use crate::request::StorePolicy;
    use tempfile::tempdir;

    #[test]
    fn test_offline_request_lifecycle() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let pool = init_db(temp_dir.path().join("offline.db")).expect("Failed to init DB");
        let conn = pool.get().expect("Failed to get connection");

        let first = Request::post("/orders")
            .parameter("amount", 10)
            .store_policy(StorePolicy::Offline);
        let second = Request::delete("/orders/7").store_policy(StorePolicy::Offline);

        save_offline_request(&conn, &first).unwrap();
        save_offline_request(&conn, &second).unwrap();

        let items = fetch_offline_requests(&conn).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].request, first);
        assert_eq!(items[0].key, first.key());
        assert_eq!(items[1].request, second);

        // Saving again replaces in place and keeps the replay order
        let updated = first.clone().header("X-Retry", "1");
        save_offline_request(&conn, &updated).unwrap();

        let items = fetch_offline_requests(&conn).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].request, updated);
        assert_eq!(count_offline_requests(&conn).unwrap(), 2);

        assert_eq!(delete_offline_request(&conn, &second.key()).unwrap(), 1);
        assert!(get_offline_request(&conn, &second.key()).unwrap().is_none());
        assert!(get_offline_request(&conn, &first.key()).unwrap().is_some());

        assert_eq!(clear_offline_requests(&conn).unwrap(), 1);
        assert_eq!(count_offline_requests(&conn).unwrap(), 0);
    }

    #[test]
    fn test_stored_requests_survive_reopening_the_database() {
        let temp_dir = tempdir().unwrap();
        let db_path = temp_dir.path().join("offline.db");
        let request = Request::put("/profile").parameter("name", "Ada");

        {
            let pool = init_db(&db_path).unwrap();
            save_offline_request(&pool.get().unwrap(), &request).unwrap();
        }

        let pool = init_db(&db_path).unwrap();
        let stored = get_offline_request(&pool.get().unwrap(), &request.key()).unwrap().unwrap();
        assert_eq!(stored.request, request);
    }

    #[test]
    fn test_corrupt_payload_is_reported() {
        let temp_dir = tempdir().unwrap();
        let pool = init_db(temp_dir.path().join("offline.db")).unwrap();
        let conn = pool.get().unwrap();

        conn.execute(
            "INSERT INTO offline_requests (key, method, resource, payload) VALUES ('k', 'GET', '/', 'not json')",
            [],
        )
        .unwrap();

        assert!(fetch_offline_requests(&conn).is_err());
    }
}
