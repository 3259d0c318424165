//! SQLite storage for cleaned tables.
//!
//! Connections are explicitly constructed, passed to whatever needs them, and
//! explicitly closed. Tables follow rebuild-from-scratch semantics: every
//! pipeline run drops and recreates its tables, so the database always
//! reflects the latest cleaned inputs.

use anyhow::{Context, Result, anyhow};
use rusqlite::Connection;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Handle to an open SQLite database.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Opens (creating if necessary) a database file.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("opening database {}", path.display()))?;
        let store = Self { conn };
        store.bootstrap()?;
        info!(path = %path.display(), "database opened");
        Ok(store)
    }

    /// Opens an in-memory database, used by tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.bootstrap()?;
        Ok(store)
    }

    fn bootstrap(&self) -> Result<()> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        self.conn.busy_timeout(Duration::from_secs(5))?;
        Ok(())
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Drops and recreates a table from its DDL body (everything between the
    /// parentheses of CREATE TABLE).
    pub fn recreate_table(&self, name: &str, columns_ddl: &str) -> Result<()> {
        self.conn
            .execute_batch(&format!("DROP TABLE IF EXISTS {name};"))?;
        self.conn
            .execute_batch(&format!("CREATE TABLE {name} ({columns_ddl});"))?;
        debug!(table = name, "table recreated");
        Ok(())
    }

    pub fn create_index(&self, index: &str, table: &str, column: &str) -> Result<()> {
        self.conn.execute_batch(&format!(
            "CREATE INDEX IF NOT EXISTS {index} ON {table}({column});"
        ))?;
        Ok(())
    }

    pub fn count(&self, table: &str) -> Result<i64> {
        let count = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                row.get(0)
            })?;
        Ok(count)
    }

    /// Closes the connection, surfacing any final commit error.
    pub fn close(self) -> Result<()> {
        self.conn
            .close()
            .map_err(|(_, e)| anyhow!("closing database: {e}"))
    }
}
