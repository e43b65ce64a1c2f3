pub mod migrations;

use crate::store::StoreError;

use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// rusqlite is synchronous; async callers go through `spawn_blocking`.
pub type DbPool = Arc<Mutex<Connection>>;

/// Open (or create) the database file, enable WAL and foreign keys, and
/// bring the schema up to date.
pub fn init_db(path: &Path) -> Result<DbPool, StoreError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    let mut conn = Connection::open(path)?;
    let journal_mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    migrations::migrations().to_latest(&mut conn)?;

    tracing::info!(path = %path.display(), journal_mode = %journal_mode, "database initialized");

    Ok(Arc::new(Mutex::new(conn)))
}

pub fn init_in_memory() -> Result<DbPool, StoreError> {
    let mut conn = Connection::open_in_memory()?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    migrations::migrations().to_latest(&mut conn)?;
    Ok(Arc::new(Mutex::new(conn)))
}
