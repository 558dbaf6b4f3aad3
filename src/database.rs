use std::path::Path;
use std::sync::Mutex;

use indexmap::IndexMap;
use rusqlite::{params, Connection};

use crate::config;
use crate::error::AppError;
use crate::registry::ServerConfig;

/// SQLite store for the authoritative server list.
///
/// The connection sits behind a `Mutex`: all UI work is single-threaded and
/// only spawned connection-test tasks run concurrently, and those never
/// touch the database.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open the database at its default location under the platform data dir.
    pub fn init() -> Result<Self, AppError> {
        let path = config::data_dir()?.join("servers.db");
        Self::open(&path)
    }

    pub fn open(path: &Path) -> Result<Self, AppError> {
        let conn = Connection::open(path)?;
        Self::migrate(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn migrate(conn: &Connection) -> Result<(), AppError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS mcp_servers (
                id         TEXT PRIMARY KEY,
                url        TEXT NOT NULL,
                api_key    TEXT,
                enabled    INTEGER NOT NULL DEFAULT 1,
                created_at INTEGER NOT NULL
            );",
        )?;
        Ok(())
    }

    /// All servers in registration order.
    pub fn list_servers(&self) -> Result<IndexMap<String, ServerConfig>, AppError> {
        let conn = self.conn.lock().expect("database mutex poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, url, api_key, enabled FROM mcp_servers ORDER BY created_at, rowid",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(ServerConfig {
                id: row.get(0)?,
                url: row.get(1)?,
                api_key: row.get(2)?,
                enabled: row.get::<_, i64>(3)? != 0,
            })
        })?;

        let mut servers = IndexMap::new();
        for row in rows {
            let server = row?;
            servers.insert(server.id.clone(), server);
        }
        Ok(servers)
    }

    /// Insert a new server or update an existing one in place.
    ///
    /// `created_at` is only set on insert, so upserting an existing id keeps
    /// its position in the registration order.
    pub fn upsert_server(&self, server: &ServerConfig) -> Result<(), AppError> {
        let conn = self.conn.lock().expect("database mutex poisoned");
        conn.execute(
            "INSERT INTO mcp_servers (id, url, api_key, enabled, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET
                 url = excluded.url,
                 api_key = excluded.api_key,
                 enabled = excluded.enabled",
            params![
                server.id,
                server.url,
                server.api_key,
                server.enabled as i64,
                chrono::Utc::now().timestamp(),
            ],
        )?;
        Ok(())
    }

    pub fn set_server_status(&self, id: &str, enabled: bool) -> Result<(), AppError> {
        let conn = self.conn.lock().expect("database mutex poisoned");
        conn.execute(
            "UPDATE mcp_servers SET enabled = ?1 WHERE id = ?2",
            params![enabled as i64, id],
        )?;
        Ok(())
    }

    pub fn remove_server(&self, id: &str) -> Result<(), AppError> {
        let conn = self.conn.lock().expect("database mutex poisoned");
        conn.execute("DELETE FROM mcp_servers WHERE id = ?1", params![id])?;
        Ok(())
    }
}
