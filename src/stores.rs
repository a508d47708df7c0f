//! Async services over the durable SQLite stores.
//!
//! [`EtagStore`] and [`OfflineRequestStore`] are cheap to clone handles over a
//! shared [`SqlitePool`]. Every call is a point read or point write that is
//! committed before the returned future completes, so nothing is lost if the
//! process exits without a shutdown hook. The blocking SQLite work runs on
//! Tokio's blocking pool.

use crate::db::{self, SqlitePool, StoreResult, StoredRequest};
use crate::request::Request;

async fn with_conn<T, F>(pool: &SqlitePool, f: F) -> StoreResult<T>
where
    T: Send + 'static,
    F: FnOnce(&rusqlite::Connection) -> StoreResult<T> + Send + 'static,
{
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || {
        let conn = pool.get()?;
        f(&conn)
    })
    .await?
}

/// Freshness tokens keyed by [`Request::etag_key`].
#[derive(Clone)]
pub struct EtagStore {
    pool: SqlitePool,
}

impl EtagStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let key = key.to_string();
        with_conn(&self.pool, move |conn| db::get_etag(conn, &key)).await
    }

    pub async fn add(&self, key: &str, token: &str) -> StoreResult<()> {
        let key = key.to_string();
        let token = token.to_string();
        with_conn(&self.pool, move |conn| db::upsert_etag(conn, &key, &token)).await
    }

    pub async fn remove(&self, key: &str) -> StoreResult<bool> {
        let key = key.to_string();
        let count = with_conn(&self.pool, move |conn| db::delete_etag(conn, &key)).await?;
        Ok(count > 0)
    }

    pub async fn clear(&self) -> StoreResult<usize> {
        with_conn(&self.pool, db::clear_etags).await
    }
}

/// Requests waiting to be replayed, keyed by [`Request::key`].
#[derive(Clone)]
pub struct OfflineRequestStore {
    pool: SqlitePool,
}

impl OfflineRequestStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn save(&self, request: &Request) -> StoreResult<()> {
        let request = request.clone();
        with_conn(&self.pool, move |conn| db::save_offline_request(conn, &request)).await
    }

    /// Snapshot of the store in replay order.
    pub async fn all(&self) -> StoreResult<Vec<StoredRequest>> {
        with_conn(&self.pool, db::fetch_offline_requests).await
    }

    pub async fn get(&self, key: &str) -> StoreResult<Option<StoredRequest>> {
        let key = key.to_string();
        with_conn(&self.pool, move |conn| db::get_offline_request(conn, &key)).await
    }

    pub async fn contains(&self, key: &str) -> StoreResult<bool> {
        Ok(self.get(key).await?.is_some())
    }

    pub async fn remove(&self, key: &str) -> StoreResult<bool> {
        let key = key.to_string();
        let count = with_conn(&self.pool, move |conn| db::delete_offline_request(conn, &key)).await?;
        Ok(count > 0)
    }

    pub async fn len(&self) -> StoreResult<usize> {
        let count = with_conn(&self.pool, db::count_offline_requests).await?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    pub async fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len().await? == 0)
    }

    pub async fn clear(&self) -> StoreResult<usize> {
        with_conn(&self.pool, db::clear_offline_requests).await
    }
}
