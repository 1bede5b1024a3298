//! Database schema definitions

use rusqlite::Connection;
use tracing::info;

use super::StoreError;

/// Current schema version for migrations
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<(), StoreError> {
    let current_version = schema_version(conn)?;

    if current_version == 0 {
        info!("Creating new database schema v{}", SCHEMA_VERSION);
        conn.execute_batch(PIPELINE_SCHEMA)?;
        conn.execute_batch(INDEXES_SCHEMA)?;
        set_schema_version(conn, SCHEMA_VERSION)?;
    } else if current_version < SCHEMA_VERSION {
        info!("Migrating schema from v{} to v{}", current_version, SCHEMA_VERSION);
        set_schema_version(conn, SCHEMA_VERSION)?;
    } else {
        info!("Database schema is up to date (v{})", current_version);
    }

    Ok(())
}

/// Current schema version (0 if not initialized)
pub fn schema_version(conn: &Connection) -> Result<i32, StoreError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)",
        [],
    )?;

    match conn.query_row("SELECT version FROM schema_version LIMIT 1", [], |row| row.get(0)) {
        Ok(version) => Ok(version),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(0),
        Err(e) => Err(e.into()),
    }
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<(), StoreError> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// Timestamps are fixed-width RFC 3339 UTC text so range filters can compare
/// them lexicographically.
const PIPELINE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS ventures (
    id TEXT PRIMARY KEY NOT NULL,
    name TEXT NOT NULL,
    sector TEXT NOT NULL,
    stage TEXT NOT NULL DEFAULT 'intake',
    location TEXT,
    funding_raised REAL NOT NULL DEFAULT 0,
    team_size INTEGER NOT NULL DEFAULT 0,

    -- Lists and maps as JSON
    founder_types_json TEXT NOT NULL DEFAULT '[]',
    inclusion_focus TEXT NOT NULL DEFAULT '',
    operational_readiness_json TEXT NOT NULL DEFAULT '{}',
    capital_readiness_json TEXT NOT NULL DEFAULT '{}',

    -- Cached aggregates, rewritten by recalculation
    derived_json TEXT NOT NULL DEFAULT '{}',
    calculated_at TEXT,

    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS gedsi_metrics (
    id TEXT PRIMARY KEY NOT NULL,
    venture_id TEXT NOT NULL,
    code TEXT NOT NULL,
    name TEXT NOT NULL,
    category TEXT NOT NULL,
    target_value REAL NOT NULL DEFAULT 0,
    current_value REAL NOT NULL DEFAULT 0,
    unit TEXT NOT NULL DEFAULT 'people',
    status TEXT NOT NULL DEFAULT 'not_started',
    due_date TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,

    FOREIGN KEY (venture_id) REFERENCES ventures(id) ON DELETE CASCADE
);

-- Append-only; venture_id is kept even if the venture goes away
CREATE TABLE IF NOT EXISTS activities (
    id TEXT PRIMARY KEY NOT NULL,
    venture_id TEXT,
    user_id TEXT,
    activity_type TEXT NOT NULL,
    title TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    metadata_json TEXT NOT NULL DEFAULT 'null',
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY NOT NULL,
    email TEXT NOT NULL,
    name TEXT NOT NULL,
    role TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS workflows (
    id TEXT PRIMARY KEY NOT NULL,
    name TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS workflow_runs (
    id TEXT PRIMARY KEY NOT NULL,
    workflow_id TEXT NOT NULL,
    status TEXT NOT NULL,
    started_at TEXT NOT NULL,
    finished_at TEXT
);
"#;

const INDEXES_SCHEMA: &str = r#"
CREATE INDEX IF NOT EXISTS idx_ventures_created ON ventures(created_at);
CREATE INDEX IF NOT EXISTS idx_metrics_venture ON gedsi_metrics(venture_id);
CREATE INDEX IF NOT EXISTS idx_metrics_created ON gedsi_metrics(created_at);
CREATE INDEX IF NOT EXISTS idx_activities_venture ON activities(venture_id);
CREATE INDEX IF NOT EXISTS idx_activities_created ON activities(created_at);
CREATE INDEX IF NOT EXISTS idx_users_created ON users(created_at);
CREATE INDEX IF NOT EXISTS idx_runs_started ON workflow_runs(started_at);
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_schema_is_repeatable() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();
        assert_eq!(schema_version(&conn).unwrap(), SCHEMA_VERSION);

        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN \
                 ('ventures', 'gedsi_metrics', 'activities', 'users', 'workflows', 'workflow_runs')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 6);
    }
}
