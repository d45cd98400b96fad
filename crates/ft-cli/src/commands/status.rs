//! Status command for showing what the collector has stored.

use std::io::Write;
use std::path::Path;

use anyhow::Result;
use chrono::{DateTime, Local};

use ft_db::Database;

use super::report::format_duration;

pub fn run<W: Write>(writer: &mut W, db: &Database, database_path: &Path) -> Result<()> {
    let count = db.session_count()?;

    writeln!(writer, "Focus tracker status")?;
    writeln!(writer, "Database: {}", database_path.display())?;

    let Some(last) = db.last_session()? else {
        writeln!(writer, "No sessions recorded.")?;
        return Ok(());
    };

    let closed = DateTime::from_timestamp_millis(last.close_time).map_or_else(
        || last.close_time.to_string(),
        |dt| dt.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string(),
    );
    writeln!(writer, "Sessions: {count}")?;
    writeln!(
        writer,
        "Last session: {} ({}, closed {closed})",
        last.site(),
        format_duration(last.active_duration)
    )?;

    Ok(())
}
