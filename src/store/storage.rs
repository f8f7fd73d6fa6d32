//! Whole-value persistence for the workout history.
//!
//! The history is stored as one JSON array under a single key, so every save
//! rewrites it entirely. Two backends are available: a JSON document on disk
//! and a SQLite key/value table.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Mutex,
};

use anyhow::{anyhow, bail, Context, Result};
use log::{info, warn};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::{Map, Value};

use crate::models::WorkoutSession;

pub const HISTORY_KEY: &str = "sessions";

/// Minimal string key/value store. Values are JSON text.
pub trait KeyValueBackend: Send + Sync {
    fn read(&self, key: &str) -> Result<Option<String>>;
    fn write(&self, key: &str, value: &str) -> Result<()>;
}

/// A JSON object on disk; each key maps to an embedded JSON value.
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed to create storage directory {}", parent.display())
            })?;
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_document(&self) -> Result<Map<String, Value>> {
        if !self.path.exists() {
            return Ok(Map::new());
        }
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("{} is not a JSON object", self.path.display()))
    }
}

impl KeyValueBackend for JsonFileBackend {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let document = self.read_document()?;
        document
            .get(key)
            .map(|value| serde_json::to_string(value).map_err(anyhow::Error::from))
            .transpose()
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        // Other keys survive even if the existing document is unreadable.
        let mut document = self.read_document().unwrap_or_else(|err| {
            warn!("Discarding unreadable store document: {err:#}");
            Map::new()
        });
        let value: Value =
            serde_json::from_str(value).context("value for JSON store must be valid JSON")?;
        document.insert(key.to_string(), value);

        let serialized = serde_json::to_string_pretty(&document)?;
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, serialized)
            .with_context(|| format!("failed to write {}", tmp_path.display()))?;
        fs::rename(&tmp_path, &self.path)
            .with_context(|| format!("failed to replace {}", self.path.display()))
    }
}

const SCHEMA_VERSION: i32 = 1;

const SCHEMA_V1: &str = "
CREATE TABLE IF NOT EXISTS kv_store (
    key        TEXT PRIMARY KEY NOT NULL,
    value      TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
";

/// SQLite-backed key/value table.
pub struct SqliteBackend {
    conn: Mutex<Connection>,
}

impl SqliteBackend {
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed to create database directory {}", parent.display())
            })?;
        }

        let conn = Connection::open(db_path).context("failed to open SQLite database")?;
        let backend = Self::from_connection(conn)?;
        info!("History database initialized at {}", db_path.display());
        Ok(backend)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
            warn!("Failed to enable WAL mode: {err}");
        }
        ensure_schema(&conn).context("failed to prepare history database")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn with_conn<T>(&self, task: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let guard = self
            .conn
            .lock()
            .map_err(|_| anyhow!("database connection mutex poisoned"))?;
        task(&guard)
    }
}

impl KeyValueBackend for SqliteBackend {
    fn read(&self, key: &str) -> Result<Option<String>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT value FROM kv_store WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .with_context(|| format!("failed to read key {key}"))
        })
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO kv_store (key, value, updated_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET
                     value = excluded.value,
                     updated_at = excluded.updated_at",
                params![key, value, chrono::Utc::now().to_rfc3339()],
            )
            .with_context(|| format!("failed to write key {key}"))?;
            Ok(())
        })
    }
}

/// Creates the table on a fresh database and refuses files written by a
/// newer schema.
fn ensure_schema(conn: &Connection) -> Result<()> {
    let version: i32 = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .context("failed to read user_version pragma")?;

    match version {
        SCHEMA_VERSION => Ok(()),
        0 => {
            conn.execute_batch(SCHEMA_V1)
                .context("failed to create kv_store table")?;
            conn.pragma_update(None, "user_version", SCHEMA_VERSION)
                .context("failed to update user_version pragma")?;
            info!("Created history schema v{}", SCHEMA_VERSION);
            Ok(())
        }
        other => bail!(
            "history database has schema v{other}, this build understands v{SCHEMA_VERSION}"
        ),
    }
}

/// Serializes the history under [`HISTORY_KEY`].
pub struct HistoryRepository {
    backend: Box<dyn KeyValueBackend>,
}

impl HistoryRepository {
    pub fn new(backend: Box<dyn KeyValueBackend>) -> Self {
        Self { backend }
    }

    /// Missing or unreadable data yields an empty history.
    pub fn load(&self) -> Vec<WorkoutSession> {
        let raw = match self.backend.read(HISTORY_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(err) => {
                warn!("Failed to read workout history, starting empty: {err:#}");
                return Vec::new();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(sessions) => sessions,
            Err(err) => {
                warn!("Stored workout history is corrupt, starting empty: {err}");
                Vec::new()
            }
        }
    }

    pub fn save(&self, sessions: &[WorkoutSession]) -> Result<()> {
        let serialized = serde_json::to_string(sessions)?;
        self.backend.write(HISTORY_KEY, &serialized)
    }
}
