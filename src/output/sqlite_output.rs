//! SQLite export of walk histories
//!
//! Each exported report becomes one `runs` row plus its step, action and
//! restart rows, written in a single transaction.

use crate::history::CrawlReport;
use crate::output::schema::initialize_schema;
use crate::output::traits::{OutputHandler, OutputResult, RunContext};
use rusqlite::{params, Connection};
use std::path::Path;

/// SQLite-based output handler
pub struct SqliteOutputHandler {
    conn: Connection,
}

impl SqliteOutputHandler {
    /// Opens (or creates) an export database
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteOutputHandler)` - Database ready for export
    /// * `Err(OutputError)` - Failed to open the database
    pub fn new(path: &Path) -> OutputResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
        ",
        )?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> OutputResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Writes a report and returns its run id
    pub fn export(&self, report: &CrawlReport, context: &RunContext) -> OutputResult<i64> {
        let tx = self.conn.unchecked_transaction()?;

        tx.execute(
            "INSERT INTO runs (start_url, started_at, finished_at, config_hash, termination,
                               termination_detail, max_steps, restart_range)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                report.start_url,
                report.started_at.to_rfc3339(),
                report.finished_at.to_rfc3339(),
                context.config_hash,
                report.termination.as_str(),
                report.termination.to_string(),
                context.max_steps,
                context.restart_range,
            ],
        )?;
        let run_id = tx.last_insert_rowid();

        {
            let mut stmt = tx.prepare(
                "INSERT INTO steps (run_id, step, url, domain, timestamp, title, links_discovered,
                                    links_found, selected_link, action_performed, restart_occurred,
                                    instrumentation_ready, detected_tags, cookies)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            )?;
            for entry in &report.steps {
                let cookies = entry
                    .cookies
                    .iter()
                    .map(|(name, value)| format!("{}={}", name, value))
                    .collect::<Vec<_>>()
                    .join("; ");
                stmt.execute(params![
                    run_id,
                    entry.step,
                    entry.url,
                    entry.domain,
                    entry.timestamp.to_rfc3339(),
                    entry.title,
                    entry.links_discovered as i64,
                    entry.links_found as i64,
                    entry.selected_link,
                    entry.action_performed,
                    entry.restart_occurred,
                    entry.instrumentation_ready,
                    entry.detected_tags.join(","),
                    cookies,
                ])?;
            }

            let mut stmt = tx.prepare(
                "INSERT INTO actions (run_id, step, timestamp, url, action_name, description, success,
                                      inputs_total, inputs_successful, click_attempted, click_successful)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            )?;
            for action in &report.actions {
                stmt.execute(params![
                    run_id,
                    action.step,
                    action.timestamp.to_rfc3339(),
                    action.url,
                    action.action_name,
                    action.description,
                    action.success,
                    action.inputs_total as i64,
                    action.inputs_successful as i64,
                    action.click_attempted,
                    action.click_successful,
                ])?;
            }

            let mut stmt = tx.prepare(
                "INSERT INTO restarts (run_id, step, timestamp, restart_count, visited_urls_before,
                                       success, next_restart_step, error)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            for restart in &report.restarts {
                stmt.execute(params![
                    run_id,
                    restart.step,
                    restart.timestamp.to_rfc3339(),
                    restart.restart_count,
                    restart.visited_urls_before as i64,
                    restart.success,
                    restart.next_restart_step,
                    restart.error,
                ])?;
            }
        }

        tx.commit()?;

        tracing::info!(
            "Exported run {} ({} steps, {} actions, {} restarts)",
            run_id,
            report.steps.len(),
            report.actions.len(),
            report.restarts.len()
        );
        Ok(run_id)
    }
}

impl OutputHandler for SqliteOutputHandler {
    fn write_report(&self, report: &CrawlReport, context: &RunContext) -> OutputResult<()> {
        self.export(report, context).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::{HistoryEntry, RestartHistoryEntry, Termination};
    use chrono::Utc;

    fn report() -> CrawlReport {
        let entry = HistoryEntry {
            step: 1,
            url: "https://example.com/".to_string(),
            timestamp: Utc::now(),
            links_discovered: 4,
            links_found: 2,
            selected_link: Some("https://example.com/a".to_string()),
            domain: "example.com".to_string(),
            action_performed: false,
            restart_occurred: false,
            instrumentation_ready: true,
            detected_tags: vec!["Google Tag Manager".to_string(), "Facebook Pixel".to_string()],
            title: Some("Home".to_string()),
            cookies: vec![("_ga".to_string(), "GA1".to_string())],
        };

        CrawlReport {
            start_url: "https://example.com/".to_string(),
            termination: Termination::DeadEnd {
                step: 2,
                url: "https://example.com/a".to_string(),
            },
            started_at: Utc::now(),
            finished_at: Utc::now(),
            steps: vec![entry],
            actions: Vec::new(),
            restarts: vec![RestartHistoryEntry {
                step: 2,
                timestamp: Utc::now(),
                restart_count: 1,
                visited_urls_before: 1,
                success: true,
                next_restart_step: None,
                error: None,
            }],
        }
    }

    fn context() -> RunContext {
        RunContext {
            config_hash: "deadbeef".to_string(),
            max_steps: 5,
            ..Default::default()
        }
    }

    #[test]
    fn test_export_writes_all_tables() {
        let handler = SqliteOutputHandler::new_in_memory().unwrap();
        let run_id = handler.export(&report(), &context()).unwrap();

        let (hash, termination): (String, String) = handler
            .conn
            .query_row(
                "SELECT config_hash, termination FROM runs WHERE id = ?1",
                [run_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(hash, "deadbeef");
        assert_eq!(termination, "dead_end");

        let (tags, cookies, ready): (String, String, bool) = handler
            .conn
            .query_row(
                "SELECT detected_tags, cookies, instrumentation_ready FROM steps WHERE run_id = ?1",
                [run_id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .unwrap();
        assert_eq!(tags, "Google Tag Manager,Facebook Pixel");
        assert_eq!(cookies, "_ga=GA1");
        assert!(ready);

        let restarts: i64 = handler
            .conn
            .query_row("SELECT COUNT(*) FROM restarts WHERE run_id = ?1", [run_id], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(restarts, 1);
    }

    #[test]
    fn test_each_export_is_a_new_run() {
        let handler = SqliteOutputHandler::new_in_memory().unwrap();
        let first = handler.export(&report(), &context()).unwrap();
        let second = handler.export(&report(), &context()).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("walks.db");

        SqliteOutputHandler::new(&path)
            .unwrap()
            .write_report(&report(), &context())
            .unwrap();

        assert!(path.exists());
    }
}
