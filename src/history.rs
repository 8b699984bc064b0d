use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Local, SecondsFormat, TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use tracing::debug;

use crate::error::SubmitError;
use crate::result::{ResultSink, Submission, TestType};

/// A result row as read back from the history database.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredResult {
    pub id: i64,
    pub test_id: String,
    pub test_type: String,
    pub difficulty: String,
    pub wpm: u32,
    pub accuracy: u32,
    pub error_count: u32,
    pub time_taken_secs: u32,
    pub characters_typed: u32,
    pub completed_at: DateTime<Local>,
}

/// `completed_at` as stored: fixed-width UTC, so text order is time order
/// whatever offset the result was recorded under.
fn timestamp_key<Tz: TimeZone>(at: &DateTime<Tz>) -> String {
    at.with_timezone(&Utc).to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// SQLite-backed result history.
#[derive(Debug)]
pub struct SqliteResultStore {
    conn: Connection,
}

impl SqliteResultStore {
    /// Open (creating if needed) the database at `path`.
    pub fn open(path: &Path) -> Result<Self, SubmitError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, SubmitError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, SubmitError> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS test_results (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                test_id TEXT NOT NULL,
                test_type TEXT NOT NULL,
                difficulty TEXT NOT NULL,
                wpm INTEGER NOT NULL,
                accuracy INTEGER NOT NULL,
                error_count INTEGER NOT NULL,
                time_taken_secs INTEGER NOT NULL,
                characters_typed INTEGER NOT NULL,
                completed_at TEXT NOT NULL
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_test_results_completed ON test_results(completed_at)",
            [],
        )?;

        Ok(Self { conn })
    }

    /// Most recent results first.
    pub fn recent(&self, limit: usize) -> Result<Vec<StoredResult>, SubmitError> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, test_id, test_type, difficulty, wpm, accuracy, error_count,
                   time_taken_secs, characters_typed, completed_at
            FROM test_results
            ORDER BY completed_at DESC, id DESC
            LIMIT ?1
            "#,
        )?;

        let rows = stmt.query_map(params![limit as i64], |row| {
            let completed_at: String = row.get(9)?;
            let completed_at = DateTime::parse_from_rfc3339(&completed_at)
                .map(|dt| dt.with_timezone(&Local))
                .map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        9,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })?;
            Ok(StoredResult {
                id: row.get(0)?,
                test_id: row.get(1)?,
                test_type: row.get(2)?,
                difficulty: row.get(3)?,
                wpm: row.get(4)?,
                accuracy: row.get(5)?,
                error_count: row.get(6)?,
                time_taken_secs: row.get(7)?,
                characters_typed: row.get(8)?,
                completed_at,
            })
        })?;

        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Highest wpm recorded, optionally for one test type only.
    pub fn personal_best(&self, test_type: Option<TestType>) -> Result<Option<u32>, SubmitError> {
        let best = match test_type {
            Some(t) => self
                .conn
                .query_row(
                    "SELECT MAX(wpm) FROM test_results WHERE test_type = ?1",
                    params![t.to_string()],
                    |row| row.get::<_, Option<u32>>(0),
                )
                .optional()?,
            None => self
                .conn
                .query_row("SELECT MAX(wpm) FROM test_results", [], |row| {
                    row.get::<_, Option<u32>>(0)
                })
                .optional()?,
        };
        Ok(best.flatten())
    }

    pub fn count(&self) -> Result<usize, SubmitError> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM test_results", [], |row| row.get(0))?;
        Ok(n as usize)
    }

    /// Write every stored result as CSV, oldest first.
    pub fn export_csv<W: Write>(&self, writer: W) -> Result<usize, SubmitError> {
        let mut rows = self.recent(usize::MAX >> 1)?;
        rows.reverse();
        let mut wtr = csv::Writer::from_writer(writer);
        for row in &rows {
            wtr.serialize(row)?;
        }
        wtr.flush()?;
        Ok(rows.len())
    }
}

impl ResultSink for SqliteResultStore {
    fn submit(&mut self, submission: &Submission) -> Result<(), SubmitError> {
        let r = &submission.result;
        self.conn.execute(
            r#"
            INSERT INTO test_results
            (test_id, test_type, difficulty, wpm, accuracy, error_count,
             time_taken_secs, characters_typed, completed_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                r.test_id,
                submission.test_type.to_string(),
                submission.difficulty.to_string(),
                r.wpm,
                r.accuracy,
                r.error_count as i64,
                r.time_taken_secs,
                r.characters_typed as i64,
                timestamp_key(&submission.completed_at),
            ],
        )?;
        debug!(test_id = %r.test_id, "result stored");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::{Difficulty, ResultMetadata, TestResult};
    use chrono::{Duration, FixedOffset};
    use tempfile::tempdir;

    fn submission(wpm: u32, test_type: TestType, minutes_ago: i64) -> Submission {
        Submission {
            result: TestResult {
                wpm,
                accuracy: 95,
                error_count: 1,
                time_taken_secs: 60,
                characters_typed: 300,
                test_id: format!("id-{wpm}"),
            },
            test_type,
            difficulty: Difficulty::Medium,
            completed_at: Local::now() - Duration::minutes(minutes_ago),
        }
    }

    #[test]
    fn empty_store() {
        let store = SqliteResultStore::open_in_memory().unwrap();
        assert!(store.recent(10).unwrap().is_empty());
        assert_eq!(store.personal_best(None).unwrap(), None);
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn stores_and_reads_back_newest_first() {
        let mut store = SqliteResultStore::open_in_memory().unwrap();
        store.submit(&submission(40, TestType::Premade, 10)).unwrap();
        store.submit(&submission(55, TestType::WordList, 1)).unwrap();

        let recent = store.recent(10).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].wpm, 55);
        assert_eq!(recent[0].test_type, "wordlist");
        assert_eq!(recent[1].test_id, "id-40");
        assert_eq!(recent[1].difficulty, "medium");

        assert_eq!(store.recent(1).unwrap().len(), 1);
    }

    #[test]
    fn timestamps_sort_by_instant_across_offset_changes() {
        // clocks go back: 01:50 at -04:00 happens before 01:10 at -05:00
        let before = FixedOffset::west_opt(4 * 3600)
            .unwrap()
            .with_ymd_and_hms(2024, 11, 3, 1, 50, 0)
            .unwrap();
        let after = FixedOffset::west_opt(5 * 3600)
            .unwrap()
            .with_ymd_and_hms(2024, 11, 3, 1, 10, 0)
            .unwrap();
        assert!(before.to_rfc3339() > after.to_rfc3339());
        assert!(timestamp_key(&before) < timestamp_key(&after));

        let mut store = SqliteResultStore::open_in_memory().unwrap();
        let mut late = submission(60, TestType::Premade, 0);
        late.completed_at = after.with_timezone(&Local);
        let mut early = submission(40, TestType::Premade, 0);
        early.completed_at = before.with_timezone(&Local);
        store.submit(&late).unwrap();
        store.submit(&early).unwrap();

        let recent = store.recent(10).unwrap();
        assert_eq!(recent[0].wpm, 60);
        assert_eq!(recent[1].wpm, 40);
        assert_eq!(recent[1].completed_at, before);
    }

    #[test]
    fn personal_best_by_type() {
        let mut store = SqliteResultStore::open_in_memory().unwrap();
        store.submit(&submission(40, TestType::Premade, 3)).unwrap();
        store.submit(&submission(70, TestType::Generated, 2)).unwrap();
        store.submit(&submission(50, TestType::Premade, 1)).unwrap();

        assert_eq!(store.personal_best(None).unwrap(), Some(70));
        assert_eq!(store.personal_best(Some(TestType::Premade)).unwrap(), Some(50));
        assert_eq!(store.personal_best(Some(TestType::Custom)).unwrap(), None);
    }

    #[test]
    fn persists_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("results.db");
        {
            let mut store = SqliteResultStore::open(&path).unwrap();
            store.submit(&submission(33, TestType::Custom, 0)).unwrap();
        }
        let store = SqliteResultStore::open(&path).unwrap();
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn exports_csv_oldest_first() {
        let mut store = SqliteResultStore::open_in_memory().unwrap();
        store.submit(&submission(40, TestType::Premade, 10)).unwrap();
        store.submit(&submission(60, TestType::Premade, 1)).unwrap();

        let mut out = Vec::new();
        assert_eq!(store.export_csv(&mut out).unwrap(), 2);
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("id,test_id,test_type,difficulty,wpm"));
        assert!(lines[1].contains("id-40"));
        assert!(lines[2].contains("id-60"));
    }

    #[test]
    fn works_as_controller_sink() {
        use crate::key::{Key, KeyStroke};
        use crate::lifecycle::TestController;
        use crate::segmenter::TargetText;

        let mut c = TestController::new(
            TargetText::from_words(["hi"]).unwrap(),
            30,
            ResultMetadata {
                test_id: "ctl".into(),
                test_type: TestType::Custom,
                difficulty: Difficulty::Easy,
            },
            SqliteResultStore::open_in_memory().unwrap(),
        );
        c.handle_key(KeyStroke::plain(Key::Enter));
        for k in KeyStroke::typed("hi ") {
            c.handle_key(k);
        }
        let stored = c.sink().recent(5).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].test_id, "ctl");
    }
}
