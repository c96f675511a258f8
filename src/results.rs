use crate::error::SinkError;
use crate::identity::UserId;
use crate::metrics::{ErrorRecord, Metrics};
use chrono::{DateTime, Local, SecondsFormat, Utc};
use rusqlite::{params, Connection};
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use tracing::debug;

/// Number of typo pairs reported in a user summary
pub const TOP_TYPOS: usize = 5;

/// Everything stored about one finished practice session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    pub user_id: UserId,
    pub content_id: String,
    pub speed: u32,
    pub accuracy: f64,
    pub error_count: usize,
    pub errors: Vec<ErrorRecord>,
    pub finished_at: DateTime<Local>,
}

impl SessionRecord {
    pub fn new(
        user_id: UserId,
        content_id: impl Into<String>,
        metrics: &Metrics,
        finished_at: DateTime<Local>,
    ) -> Self {
        Self {
            user_id,
            content_id: content_id.into(),
            speed: metrics.speed,
            accuracy: metrics.accuracy,
            error_count: metrics.error_count,
            errors: metrics.errors.clone(),
            finished_at,
        }
    }
}

/// Durable destination for finished sessions
pub trait ResultsSink {
    fn submit_result(&mut self, record: &SessionRecord) -> Result<(), SinkError>;
}

/// How often one expected character was mistyped as another
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypoCount {
    pub expected: char,
    /// `None` when the character was skipped entirely
    pub actual: Option<char>,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserSummary {
    pub total_practices: i64,
    pub avg_speed: f64,
    pub avg_accuracy: f64,
    pub top_typos: Vec<TypoCount>,
}

/// One row of a user's practice history
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionRow {
    pub id: i64,
    pub content_id: String,
    pub speed: u32,
    pub accuracy: f64,
    pub error_count: i64,
    pub finished_at: DateTime<Local>,
}

/// A message left by a user about the app or its texts
#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackRow {
    pub id: i64,
    pub user_id: UserId,
    pub message: String,
    pub created_at: DateTime<Local>,
}

// fixed-width UTC text keeps lexical order equal to time order
fn utc_timestamp<Tz: chrono::TimeZone>(at: &DateTime<Tz>) -> String {
    at.with_timezone(&Utc).to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn local_timestamp(idx: usize, text: &str) -> rusqlite::Result<DateTime<Local>> {
    DateTime::parse_from_rfc3339(text)
        .map(|at| at.with_timezone(&Local))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e)))
}

/// SQLite-backed results storage
#[derive(Debug)]
pub struct SqliteResultsStore {
    conn: Connection,
}

impl SqliteResultsStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SinkError> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path.as_ref())?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self, SinkError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, SinkError> {
        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS practice_sessions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                content_id TEXT NOT NULL,
                speed INTEGER NOT NULL,
                accuracy REAL NOT NULL,
                error_count INTEGER NOT NULL,
                finished_at TEXT NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE TABLE IF NOT EXISTS session_errors (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id INTEGER NOT NULL REFERENCES practice_sessions(id) ON DELETE CASCADE,
                position INTEGER NOT NULL,
                expected TEXT NOT NULL,
                actual TEXT
            );

            CREATE TABLE IF NOT EXISTS feedback (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                message TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_practice_sessions_user ON practice_sessions(user_id);
            CREATE INDEX IF NOT EXISTS idx_session_errors_session ON session_errors(session_id);
            "#,
        )?;

        Ok(Self { conn })
    }

    pub fn user_summary(&self, user_id: &UserId) -> Result<UserSummary, SinkError> {
        let (total_practices, avg_speed, avg_accuracy): (i64, Option<f64>, Option<f64>) =
            self.conn.query_row(
                "SELECT COUNT(*), AVG(speed), AVG(accuracy) FROM practice_sessions WHERE user_id = ?1",
                [user_id.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )?;

        Ok(UserSummary {
            total_practices,
            avg_speed: avg_speed.unwrap_or(0.0),
            avg_accuracy: avg_accuracy.unwrap_or(0.0),
            top_typos: self.top_typos(user_id, TOP_TYPOS)?,
        })
    }

    /// Most frequent (expected, actual) mistakes across all of a user's sessions
    pub fn top_typos(&self, user_id: &UserId, limit: usize) -> Result<Vec<TypoCount>, SinkError> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT e.expected, e.actual, COUNT(*) AS n
            FROM session_errors e
            JOIN practice_sessions s ON s.id = e.session_id
            WHERE s.user_id = ?1
            GROUP BY e.expected, e.actual
            ORDER BY n DESC, e.expected ASC
            LIMIT ?2
            "#,
        )?;

        let rows = stmt.query_map(params![user_id.as_str(), limit as i64], |row| {
            let expected: String = row.get(0)?;
            let actual: Option<String> = row.get(1)?;
            Ok(TypoCount {
                expected: expected.chars().next().unwrap_or('\0'),
                actual: actual.and_then(|a| a.chars().next()),
                count: row.get(2)?,
            })
        })?;

        let mut typos = Vec::new();
        for typo in rows {
            typos.push(typo?);
        }
        Ok(typos)
    }

    /// Newest sessions first
    pub fn recent_sessions(&self, user_id: &UserId, limit: usize) -> Result<Vec<SessionRow>, SinkError> {
        self.query_sessions(user_id, limit as i64)
    }

    // a negative limit means no limit in SQLite
    fn query_sessions(&self, user_id: &UserId, limit: i64) -> Result<Vec<SessionRow>, SinkError> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, content_id, speed, accuracy, error_count, finished_at
            FROM practice_sessions
            WHERE user_id = ?1
            ORDER BY finished_at DESC, id DESC
            LIMIT ?2
            "#,
        )?;

        let rows = stmt.query_map(params![user_id.as_str(), limit], |row| {
            let finished_at: String = row.get(5)?;
            let finished_at = local_timestamp(5, &finished_at)?;

            Ok(SessionRow {
                id: row.get(0)?,
                content_id: row.get(1)?,
                speed: row.get(2)?,
                accuracy: row.get(3)?,
                error_count: row.get(4)?,
                finished_at,
            })
        })?;

        let mut sessions = Vec::new();
        for session in rows {
            sessions.push(session?);
        }
        Ok(sessions)
    }

    pub fn errors_for_session(&self, session_id: i64) -> Result<Vec<ErrorRecord>, SinkError> {
        let mut stmt = self.conn.prepare(
            "SELECT position, expected, actual FROM session_errors WHERE session_id = ?1 ORDER BY position",
        )?;

        let rows = stmt.query_map([session_id], |row| {
            let position: i64 = row.get(0)?;
            let expected: String = row.get(1)?;
            let actual: Option<String> = row.get(2)?;
            Ok(ErrorRecord {
                position: position as usize,
                expected: expected.chars().next().unwrap_or('\0'),
                actual: actual.and_then(|a| a.chars().next()),
            })
        })?;

        let mut errors = Vec::new();
        for error in rows {
            errors.push(error?);
        }
        Ok(errors)
    }

    pub fn session_count(&self, user_id: &UserId) -> Result<i64, SinkError> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM practice_sessions WHERE user_id = ?1",
            [user_id.as_str()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Stores a trimmed, non-blank feedback message and returns its row id
    pub fn submit_feedback(&mut self, user_id: &UserId, message: &str) -> Result<i64, SinkError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(SinkError::BlankFeedback);
        }

        self.conn.execute(
            "INSERT INTO feedback (user_id, message, created_at) VALUES (?1, ?2, ?3)",
            params![user_id.as_str(), message, utc_timestamp(&Utc::now())],
        )?;
        let id = self.conn.last_insert_rowid();
        debug!(id, user = %user_id, "stored feedback");
        Ok(id)
    }

    /// Newest first
    pub fn feedback_for(&self, user_id: &UserId) -> Result<Vec<FeedbackRow>, SinkError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, message, created_at FROM feedback WHERE user_id = ?1 ORDER BY created_at DESC, id DESC",
        )?;

        let rows = stmt.query_map([user_id.as_str()], |row| {
            let created_at: String = row.get(2)?;
            Ok(FeedbackRow {
                id: row.get(0)?,
                user_id: user_id.clone(),
                message: row.get(1)?,
                created_at: local_timestamp(2, &created_at)?,
            })
        })?;

        let mut feedback = Vec::new();
        for entry in rows {
            feedback.push(entry?);
        }
        Ok(feedback)
    }

    /// Writes the user's whole history as CSV, returning the number of rows
    pub fn export_csv<W: Write>(&self, user_id: &UserId, writer: W) -> Result<usize, SinkError> {
        let sessions = self.query_sessions(user_id, -1)?;
        let mut wtr = csv::Writer::from_writer(writer);
        for session in &sessions {
            wtr.serialize(session)?;
        }
        wtr.flush()?;
        Ok(sessions.len())
    }
}

impl ResultsSink for SqliteResultsStore {
    fn submit_result(&mut self, record: &SessionRecord) -> Result<(), SinkError> {
        let tx = self.conn.transaction()?;

        tx.execute(
            r#"
            INSERT INTO practice_sessions
            (user_id, content_id, speed, accuracy, error_count, finished_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                record.user_id.as_str(),
                record.content_id,
                record.speed,
                record.accuracy,
                record.error_count as i64,
                utc_timestamp(&record.finished_at),
            ],
        )?;
        let session_id = tx.last_insert_rowid();

        for error in &record.errors {
            tx.execute(
                "INSERT INTO session_errors (session_id, position, expected, actual) VALUES (?1, ?2, ?3, ?4)",
                params![
                    session_id,
                    error.position as i64,
                    error.expected.to_string(),
                    error.actual.map(|c| c.to_string()),
                ],
            )?;
        }

        tx.commit()?;
        debug!(session_id, errors = record.errors.len(), "stored practice result");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::compute_str;
    use assert_matches::assert_matches;
    use chrono::Duration as ChronoDuration;
    use std::time::Duration;
    use tempfile::tempdir;

    fn user(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    fn record(user_id: &str, content: &str, reference: &str, typed: &str) -> SessionRecord {
        let metrics = compute_str(reference, typed, Duration::from_secs(60));
        SessionRecord::new(user(user_id), content, &metrics, Local::now())
    }

    #[test]
    fn test_summary_for_unknown_user_is_empty() {
        let store = SqliteResultsStore::open_in_memory().unwrap();

        let summary = store.user_summary(&user("ghost")).unwrap();
        assert_eq!(summary.total_practices, 0);
        assert_eq!(summary.avg_speed, 0.0);
        assert_eq!(summary.avg_accuracy, 0.0);
        assert!(summary.top_typos.is_empty());
    }

    #[test]
    fn test_submit_and_summarize() {
        let mut store = SqliteResultsStore::open_in_memory().unwrap();

        store.submit_result(&record("neo", "a", "cat", "cat")).unwrap();
        store.submit_result(&record("neo", "b", "cat", "cax")).unwrap();
        store.submit_result(&record("smith", "a", "cat", "xxx")).unwrap();

        let summary = store.user_summary(&user("neo")).unwrap();
        assert_eq!(summary.total_practices, 2);
        assert_eq!(summary.avg_speed, 2.5);
        assert!((summary.avg_accuracy - (100.0 + 66.7) / 2.0).abs() < 1e-9);
        assert_eq!(
            summary.top_typos,
            vec![TypoCount {
                expected: 't',
                actual: Some('x'),
                count: 1,
            }]
        );
    }

    #[test]
    fn test_top_typos_ordering_and_skipped_chars() {
        let mut store = SqliteResultsStore::open_in_memory().unwrap();

        store.submit_result(&record("neo", "a", "tttt", "tyty")).unwrap();
        store.submit_result(&record("neo", "a", "abc", "a")).unwrap();
        store.submit_result(&record("neo", "a", "tt", "yt")).unwrap();

        let typos = store.top_typos(&user("neo"), TOP_TYPOS).unwrap();
        assert_eq!(typos[0].expected, 't');
        assert_eq!(typos[0].actual, Some('y'));
        assert_eq!(typos[0].count, 3);
        assert!(typos.contains(&TypoCount {
            expected: 'b',
            actual: None,
            count: 1,
        }));
        assert_eq!(typos.len(), 3);

        let limited = store.top_typos(&user("neo"), 1).unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[test]
    fn test_errors_are_stored_in_position_order() {
        let mut store = SqliteResultsStore::open_in_memory().unwrap();
        let rec = record("neo", "a", "hello", "hxllq");
        store.submit_result(&rec).unwrap();

        let sessions = store.recent_sessions(&user("neo"), 10).unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].error_count, 2);

        let errors = store.errors_for_session(sessions[0].id).unwrap();
        assert_eq!(errors, rec.errors);
    }

    #[test]
    fn test_recent_sessions_newest_first() {
        let mut store = SqliteResultsStore::open_in_memory().unwrap();
        let mut older = record("neo", "old", "a", "a");
        older.finished_at = Local::now() - ChronoDuration::hours(1);
        let newer = record("neo", "new", "a", "a");

        store.submit_result(&older).unwrap();
        store.submit_result(&newer).unwrap();

        let sessions = store.recent_sessions(&user("neo"), 10).unwrap();
        assert_eq!(sessions[0].content_id, "new");
        assert_eq!(sessions[1].content_id, "old");

        let one = store.recent_sessions(&user("neo"), 1).unwrap();
        assert_eq!(one.len(), 1);
        assert_eq!(store.session_count(&user("neo")).unwrap(), 2);
    }

    #[test]
    fn test_finished_at_is_stored_as_utc() {
        let mut store = SqliteResultsStore::open_in_memory().unwrap();
        let rec = record("neo", "a", "a", "a");
        store.submit_result(&rec).unwrap();

        let stored: String = store
            .conn
            .query_row("SELECT finished_at FROM practice_sessions", [], |row| row.get(0))
            .unwrap();
        assert!(stored.ends_with('Z'));
        assert_eq!(stored, utc_timestamp(&rec.finished_at));

        let sessions = store.recent_sessions(&user("neo"), 1).unwrap();
        assert_eq!(
            sessions[0].finished_at.timestamp_micros(),
            rec.finished_at.timestamp_micros()
        );
    }

    #[test]
    fn test_history_order_follows_instants_not_offsets() {
        use chrono::{FixedOffset, TimeZone};

        // 10:30 at +09:00 is earlier than 03:00 at +00:00 even though it sorts later as local text
        let east = FixedOffset::east_opt(9 * 3600).unwrap();
        let earlier = east.with_ymd_and_hms(2024, 3, 9, 10, 30, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2024, 3, 9, 3, 0, 0).unwrap();

        let mut store = SqliteResultsStore::open_in_memory().unwrap();
        let mut first = record("neo", "earlier", "a", "a");
        first.finished_at = earlier.with_timezone(&Local);
        let mut second = record("neo", "later", "a", "a");
        second.finished_at = later.with_timezone(&Local);

        store.submit_result(&second).unwrap();
        store.submit_result(&first).unwrap();

        let sessions = store.recent_sessions(&user("neo"), 10).unwrap();
        assert_eq!(sessions[0].content_id, "later");
        assert_eq!(sessions[1].content_id, "earlier");
    }

    #[test]
    fn test_feedback_roundtrip() {
        let mut store = SqliteResultsStore::open_in_memory().unwrap();

        let id = store.submit_feedback(&user("neo"), "  more Hangul texts please \n").unwrap();
        store.submit_feedback(&user("smith"), "no").unwrap();

        let entries = store.feedback_for(&user("neo")).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, id);
        assert_eq!(entries[0].message, "more Hangul texts please");
        assert_eq!(entries[0].user_id, user("neo"));
    }

    #[test]
    fn test_blank_feedback_is_rejected() {
        let mut store = SqliteResultsStore::open_in_memory().unwrap();

        assert_matches!(store.submit_feedback(&user("neo"), " \t "), Err(SinkError::BlankFeedback));
        assert!(store.feedback_for(&user("neo")).unwrap().is_empty());
    }

    #[test]
    fn test_export_csv() {
        let mut store = SqliteResultsStore::open_in_memory().unwrap();
        store.submit_result(&record("neo", "proverb-01", "cat", "cat")).unwrap();
        store.submit_result(&record("neo", "proverb-02", "cat", "cut")).unwrap();

        let mut out = Vec::new();
        let rows = store.export_csv(&user("neo"), &mut out).unwrap();
        assert_eq!(rows, 2);

        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "id,content_id,speed,accuracy,error_count,finished_at"
        );
        assert_eq!(text.lines().count(), 3);
        assert!(text.contains("proverb-02"));
    }

    #[test]
    fn test_open_creates_file_and_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state").join("results.db");

        {
            let mut store = SqliteResultsStore::open(&path).unwrap();
            store.submit_result(&record("neo", "a", "ab", "ab")).unwrap();
        }

        let store = SqliteResultsStore::open(&path).unwrap();
        assert_eq!(store.session_count(&user("neo")).unwrap(), 1);
    }
}
