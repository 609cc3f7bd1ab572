//! SQLite schema for exported walk histories

/// SQL schema for the export database
pub const SCHEMA_SQL: &str = r#"
-- One row per exported walk
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    start_url TEXT NOT NULL,
    started_at TEXT NOT NULL,
    finished_at TEXT NOT NULL,
    config_hash TEXT NOT NULL,
    termination TEXT NOT NULL,
    termination_detail TEXT NOT NULL,
    max_steps INTEGER NOT NULL,
    restart_range TEXT
);

-- Step history
CREATE TABLE IF NOT EXISTS steps (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id INTEGER NOT NULL REFERENCES runs(id),
    step INTEGER NOT NULL,
    url TEXT NOT NULL,
    domain TEXT NOT NULL,
    timestamp TEXT NOT NULL,
    title TEXT,
    links_discovered INTEGER NOT NULL,
    links_found INTEGER NOT NULL,
    selected_link TEXT,
    action_performed INTEGER NOT NULL,
    restart_occurred INTEGER NOT NULL,
    instrumentation_ready INTEGER NOT NULL,
    detected_tags TEXT NOT NULL,
    cookies TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_steps_run ON steps(run_id);
CREATE INDEX IF NOT EXISTS idx_steps_domain ON steps(domain);

-- Action attempts
CREATE TABLE IF NOT EXISTS actions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id INTEGER NOT NULL REFERENCES runs(id),
    step INTEGER NOT NULL,
    timestamp TEXT NOT NULL,
    url TEXT NOT NULL,
    action_name TEXT NOT NULL,
    description TEXT NOT NULL,
    success INTEGER NOT NULL,
    inputs_total INTEGER NOT NULL,
    inputs_successful INTEGER NOT NULL,
    click_attempted INTEGER NOT NULL,
    click_successful INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_actions_run ON actions(run_id);

-- Session resets
CREATE TABLE IF NOT EXISTS restarts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id INTEGER NOT NULL REFERENCES runs(id),
    step INTEGER NOT NULL,
    timestamp TEXT NOT NULL,
    restart_count INTEGER NOT NULL,
    visited_urls_before INTEGER NOT NULL,
    success INTEGER NOT NULL,
    next_restart_step INTEGER,
    error TEXT
);

CREATE INDEX IF NOT EXISTS idx_restarts_run ON restarts(run_id);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();

        initialize_schema(&conn).unwrap();
        let result = initialize_schema(&conn);

        assert!(result.is_ok());
    }

    #[test]
    fn test_tables_exist_after_init() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();

        for table in ["runs", "steps", "actions", "restarts"] {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                    [table],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "Table {} should exist", table);
        }
    }
}
