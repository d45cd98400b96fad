//! Storage layer for the collector.
//!
//! Persists received focus sessions using `rusqlite`.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! Share it across request handlers behind a `Mutex<Database>`.
//!
//! # Schema
//!
//! Session bounds (`open_time`, `close_time`) and `active_duration` are stored as
//! INTEGER milliseconds exactly as reported by the tracker. `received_at` is TEXT
//! in ISO 8601 (`2024-01-15T10:30:00.000Z`) so it sorts chronologically.
//!
//! A report carries either a `domain` or a `url`; the other column is NULL.

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use ft_core::{ReportTarget, SessionReport};
use rusqlite::{Connection, OptionalExtension, Row, params};
use thiserror::Error;

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// A stored row has neither a domain nor a URL.
    #[error("session {id} has no domain or url")]
    MissingTarget { id: i64 },
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

/// A stored focus session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub id: i64,
    pub tab_id: i64,
    pub target: ReportTarget,
    pub open_time: i64,
    pub close_time: i64,
    pub active_duration: i64,
    pub received_at: String,
}

impl SessionRecord {
    /// The domain or URL the session is attributed to.
    pub fn site(&self) -> &str {
        self.target.as_str()
    }
}

/// Total focus time for one domain (or URL).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteUsage {
    pub site: String,
    pub total_ms: i64,
}

const SESSION_COLUMNS: &str =
    "id, tab_id, domain, url, open_time, close_time, active_duration, received_at";

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS sessions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                tab_id INTEGER NOT NULL,
                domain TEXT,
                url TEXT,
                open_time INTEGER NOT NULL,
                close_time INTEGER NOT NULL,
                active_duration INTEGER NOT NULL,
                received_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_sessions_close_time ON sessions(close_time);
            CREATE INDEX IF NOT EXISTS idx_sessions_domain ON sessions(domain);
            ",
        )?;
        Ok(())
    }

    /// Stores a received report, returning its row id.
    pub fn insert_report(
        &mut self,
        report: &SessionReport,
        received_at: DateTime<Utc>,
    ) -> Result<i64, DbError> {
        let (domain, url) = match &report.target {
            ReportTarget::Domain(domain) => (Some(domain.as_str()), None),
            ReportTarget::Url(url) => (None, Some(url.as_str())),
        };
        self.conn.execute(
            "
            INSERT INTO sessions
            (tab_id, domain, url, open_time, close_time, active_duration, received_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ",
            params![
                report.tab_id.get(),
                domain,
                url,
                report.open_time,
                report.close_time,
                report.active_duration,
                format_timestamp(received_at),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Lists sessions whose `close_time` falls in `[start_ms, end_ms)`,
    /// ordered by close time.
    pub fn sessions_closed_between(
        &self,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<Vec<SessionRecord>, DbError> {
        if end_ms <= start_ms {
            return Ok(Vec::new());
        }
        let mut stmt = self.conn.prepare(&format!(
            "
            SELECT {SESSION_COLUMNS}
            FROM sessions
            WHERE close_time >= ? AND close_time < ?
            ORDER BY close_time ASC, id ASC
            "
        ))?;
        let rows = stmt.query_map([start_ms, end_ms], read_row)?;
        let mut sessions = Vec::new();
        for row in rows {
            sessions.push(into_record(row?)?);
        }
        Ok(sessions)
    }

    /// Sums focus time per site for sessions closed in `[start_ms, end_ms)`,
    /// most used first.
    ///
    /// Totals saturate at `i64::MAX` instead of failing.
    pub fn site_usage_between(&self, start_ms: i64, end_ms: i64) -> Result<Vec<SiteUsage>, DbError> {
        if end_ms <= start_ms {
            return Ok(Vec::new());
        }
        let mut stmt = self.conn.prepare(
            "
            SELECT COALESCE(domain, url) AS site, TOTAL(active_duration) AS total
            FROM sessions
            WHERE close_time >= ? AND close_time < ?
            GROUP BY site
            ORDER BY total DESC, site ASC
            ",
        )?;
        let rows = stmt.query_map([start_ms, end_ms], |row| {
            Ok(SiteUsage {
                site: row.get::<_, Option<String>>(0)?.unwrap_or_default(),
                total_ms: saturating_ms(row.get(1)?),
            })
        })?;
        let mut usage = Vec::new();
        for row in rows {
            usage.push(row?);
        }
        Ok(usage)
    }

    /// Total number of stored sessions.
    pub fn session_count(&self) -> Result<usize, DbError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    /// The most recently closed session, if any.
    pub fn last_session(&self) -> Result<Option<SessionRecord>, DbError> {
        let row = self
            .conn
            .query_row(
                &format!(
                    "SELECT {SESSION_COLUMNS} FROM sessions ORDER BY close_time DESC, id DESC LIMIT 1"
                ),
                [],
                read_row,
            )
            .optional()?;
        row.map(into_record).transpose()
    }
}

/// `TOTAL()` sums as a float so it cannot overflow; `as` saturates.
#[allow(clippy::cast_possible_truncation)]
const fn saturating_ms(total: f64) -> i64 {
    total as i64
}

/// Raw column values before the domain/url pair is resolved.
struct RawSession {
    id: i64,
    tab_id: i64,
    domain: Option<String>,
    url: Option<String>,
    open_time: i64,
    close_time: i64,
    active_duration: i64,
    received_at: String,
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<RawSession> {
    Ok(RawSession {
        id: row.get(0)?,
        tab_id: row.get(1)?,
        domain: row.get(2)?,
        url: row.get(3)?,
        open_time: row.get(4)?,
        close_time: row.get(5)?,
        active_duration: row.get(6)?,
        received_at: row.get(7)?,
    })
}

fn into_record(raw: RawSession) -> Result<SessionRecord, DbError> {
    let target = match (raw.domain, raw.url) {
        (Some(domain), _) => ReportTarget::Domain(domain),
        (None, Some(url)) => ReportTarget::Url(url),
        (None, None) => return Err(DbError::MissingTarget { id: raw.id }),
    };
    Ok(SessionRecord {
        id: raw.id,
        tab_id: raw.tab_id,
        target,
        open_time: raw.open_time,
        close_time: raw.close_time,
        active_duration: raw.active_duration,
        received_at: raw.received_at,
    })
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}
