//! SQLite persistence for the ETag store and the offline request store.
//!
//! Both stores share one database file. Connections come from an `r2d2`
//! pool and the schema is brought up to date from the embedded
//! `migrations/` directory every time the database is opened.
//!
//! Functions in this module are synchronous and take a plain
//! [`rusqlite::Connection`]; async callers go through the service wrappers in
//! [`crate::stores`], which move the work onto the blocking thread pool.

use std::fs;
use std::path::Path;
use std::time::Duration;

use include_dir::{Dir, include_dir};
use log::debug;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite_migration::Migrations;

mod error;
pub use error::{StoreError, StoreResult};

mod etags;
pub use etags::{clear_etags, delete_etag, get_etag, upsert_etag};

mod offline_requests;
pub use offline_requests::{
    StoredRequest,
    clear_offline_requests,
    count_offline_requests,
    delete_offline_request,
    fetch_offline_requests,
    get_offline_request,
    save_offline_request,
};

pub type SqlitePool = r2d2::Pool<SqliteConnectionManager>;

const POOL_SIZE: u32 = 8;
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

static MIGRATIONS_DIR: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/migrations");

/// Opens (creating if needed) the database at `db_path` and runs pending migrations.
pub fn init_db(db_path: impl AsRef<Path>) -> StoreResult<SqlitePool> {
    let path = db_path.as_ref();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    let manager = SqliteConnectionManager::file(path).with_init(|conn| conn.busy_timeout(BUSY_TIMEOUT));
    let pool = r2d2::Pool::builder().max_size(POOL_SIZE).build(manager)?;

    let migrations = Migrations::from_directory(&MIGRATIONS_DIR)?;
    let mut conn = pool.get()?;
    migrations.to_latest(&mut conn)?;

    debug!(path:% = path.display(); "Database ready");
    Ok(pool)
}
