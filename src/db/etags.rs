use log::debug;
use rusqlite::{Connection, OptionalExtension, named_params};

use crate::db::StoreResult;

/// Inserts or overwrites the ETag token stored under `key`.
pub fn upsert_etag(conn: &Connection, key: &str, token: &str) -> StoreResult<()> {
    debug!(key = key; "DB: Saving ETag");

    conn.execute(
        r#"
        INSERT INTO etags (key, token, updated_at)
        VALUES (:key, :token, datetime('now'))
        ON CONFLICT(key) DO UPDATE SET
            token = excluded.token,
            updated_at = excluded.updated_at
        "#,
        named_params! {
            ":key": key,
            ":token": token,
        },
    )?;

    Ok(())
}

pub fn get_etag(conn: &Connection, key: &str) -> StoreResult<Option<String>> {
    let token = conn
        .query_row(
            "SELECT token FROM etags WHERE key = :key",
            named_params! { ":key": key },
            |row| row.get(0),
        )
        .optional()?;

    Ok(token)
}

pub fn delete_etag(conn: &Connection, key: &str) -> StoreResult<usize> {
    let count = conn.execute("DELETE FROM etags WHERE key = :key", named_params! { ":key": key })?;
    Ok(count)
}

/// Removes every stored ETag. Returns the number of rows deleted.
pub fn clear_etags(conn: &Connection) -> StoreResult<usize> {
    let count = conn.execute("DELETE FROM etags", [])?;
    Ok(count)
}
