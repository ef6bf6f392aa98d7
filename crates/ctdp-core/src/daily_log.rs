//! Daily log of completed sessions.
//!
//! Every completion produces a [`DailyLogRecord`]. Where it goes is up to a
//! [`LogSink`]; the bundled [`MarkdownDailyLog`] appends one checklist line
//! per session to a dated markdown note:
//!
//! ```text
//! - [x] 09:00 - 10:00 🎯 **Deep Work** (⏰ Booked: 08:45, ⏸️ Exceptions: Bathroom)
//! ```

use std::fmt::Display;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, FixedOffset, Local, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What the log sink receives when a session completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyLogRecord {
    pub task_name: String,
    pub session_start: DateTime<Utc>,
    pub session_end: DateTime<Utc>,
    /// Original booking time; `None` when the session started directly.
    pub booking_start: Option<DateTime<Utc>>,
    /// Precedent names in order of use, duplicates kept.
    pub precedents_used: Vec<String>,
}

impl DailyLogRecord {
    /// Render the checklist line with times shown in `tz`.
    pub fn render_line<Tz: TimeZone>(&self, tz: &Tz) -> String
    where
        Tz::Offset: Display,
    {
        let hm = |at: DateTime<Utc>| at.with_timezone(tz).format("%H:%M").to_string();
        let booked = self.booking_start.map_or_else(|| "Direct".to_string(), hm);
        let exceptions = if self.precedents_used.is_empty() {
            String::new()
        } else {
            format!(", ⏸️ Exceptions: {}", self.precedents_used.join(", "))
        };
        format!(
            "- [x] {} - {} 🎯 **{}** (⏰ Booked: {}{})",
            hm(self.session_start),
            hm(self.session_end),
            self.task_name,
            booked,
            exceptions
        )
    }
}

#[derive(Error, Debug)]
pub enum LogSinkError {
    #[error("Failed to write daily log {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid daily log date format '{0}'")]
    InvalidDateFormat(String),
}

/// Receives completion records. Failures are reported, never fatal.
pub trait LogSink {
    fn append(&self, record: &DailyLogRecord) -> Result<(), LogSinkError>;
}

/// Discards every record.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullLogSink;

impl LogSink for NullLogSink {
    fn append(&self, _record: &DailyLogRecord) -> Result<(), LogSinkError> {
        Ok(())
    }
}

/// Appends log lines to `<folder>/<date>.md`.
#[derive(Debug, Clone)]
pub struct MarkdownDailyLog {
    folder: PathBuf,
    date_format: String,
    /// Fixed offset for rendering; local time when unset.
    offset: Option<FixedOffset>,
}

impl MarkdownDailyLog {
    pub fn new(folder: impl Into<PathBuf>, date_format: impl Into<String>) -> Self {
        Self {
            folder: folder.into(),
            date_format: date_format.into(),
            offset: None,
        }
    }

    /// Render in a fixed offset instead of the local timezone.
    pub fn with_offset(mut self, offset: FixedOffset) -> Self {
        self.offset = Some(offset);
        self
    }

    /// File that a record completed at `at` is appended to.
    ///
    /// # Errors
    /// Returns [`LogSinkError::InvalidDateFormat`] when the configured format
    /// contains an unknown specifier.
    pub fn note_path(&self, at: DateTime<Utc>) -> Result<PathBuf, LogSinkError> {
        let items: Vec<Item<'_>> = StrftimeItems::new(&self.date_format).collect();
        if self.date_format.trim().is_empty() || items.iter().any(|i| matches!(i, Item::Error)) {
            return Err(LogSinkError::InvalidDateFormat(self.date_format.clone()));
        }
        let name = match self.offset {
            Some(offset) => at.with_timezone(&offset).format_with_items(items.into_iter()),
            None => at
                .with_timezone(&Local)
                .fixed_offset()
                .format_with_items(items.into_iter()),
        }
        .to_string();
        let file_name = if name.ends_with(".md") {
            name
        } else {
            format!("{name}.md")
        };
        Ok(self.folder.join(file_name))
    }

    fn line(&self, record: &DailyLogRecord) -> String {
        match self.offset {
            Some(offset) => record.render_line(&offset),
            None => record.render_line(&Local),
        }
    }
}

impl LogSink for MarkdownDailyLog {
    fn append(&self, record: &DailyLogRecord) -> Result<(), LogSinkError> {
        let path = self.note_path(record.session_end)?;
        append_line(&path, &self.line(record)).map_err(|source| LogSinkError::Io {
            path: path.clone(),
            source,
        })?;
        tracing::info!(path = %path.display(), task = %record.task_name, "daily log appended");
        Ok(())
    }
}

/// Append `line`, starting on a fresh line if the file doesn't end with one.
fn append_line(path: &Path, line: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let needs_newline = match fs::read(path) {
        Ok(existing) => !existing.is_empty() && !existing.ends_with(b"\n"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
        Err(e) => return Err(e),
    };
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    if needs_newline {
        file.write_all(b"\n")?;
    }
    file.write_all(line.as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 6, h, m, 0).unwrap()
    }

    fn record() -> DailyLogRecord {
        DailyLogRecord {
            task_name: "Deep Work".into(),
            session_start: at(9, 0),
            session_end: at(10, 0),
            booking_start: Some(at(8, 45)),
            precedents_used: vec!["Bathroom".into()],
        }
    }

    #[test]
    fn renders_full_line() {
        assert_eq!(
            record().render_line(&Utc),
            "- [x] 09:00 - 10:00 🎯 **Deep Work** (⏰ Booked: 08:45, ⏸️ Exceptions: Bathroom)"
        );
    }

    #[test]
    fn renders_direct_start_without_exceptions() {
        let mut r = record();
        r.booking_start = None;
        r.precedents_used.clear();
        assert_eq!(
            r.render_line(&Utc),
            "- [x] 09:00 - 10:00 🎯 **Deep Work** (⏰ Booked: Direct)"
        );
    }

    #[test]
    fn joins_repeated_precedents() {
        let mut r = record();
        r.precedents_used = vec!["Bathroom".into(), "Phone".into(), "Bathroom".into()];
        assert!(r
            .render_line(&Utc)
            .ends_with("⏸️ Exceptions: Bathroom, Phone, Bathroom)"));
    }

    #[test]
    fn renders_in_given_offset() {
        let tokyo = FixedOffset::east_opt(9 * 3600).unwrap();
        assert!(record().render_line(&tokyo).starts_with("- [x] 18:00 - 19:00"));
    }

    #[test]
    fn markdown_sink_creates_folder_and_appends() {
        let dir = TempDir::new().unwrap();
        let sink = MarkdownDailyLog::new(dir.path().join("Journal/Daily"), "%Y-%m-%d")
            .with_offset(FixedOffset::east_opt(0).unwrap());
        sink.append(&record()).unwrap();
        sink.append(&record()).unwrap();

        let path = dir.path().join("Journal/Daily/2024-05-06.md");
        let content = fs::read_to_string(path).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(content.lines().all(|l| l.starts_with("- [x] 09:00")));
    }

    #[test]
    fn markdown_sink_starts_new_line_after_unterminated_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("2024-05-06.md");
        fs::write(&path, "# Monday").unwrap();
        let sink = MarkdownDailyLog::new(dir.path(), "%Y-%m-%d")
            .with_offset(FixedOffset::east_opt(0).unwrap());
        sink.append(&record()).unwrap();
        let content = fs::read_to_string(path).unwrap();
        assert!(content.starts_with("# Monday\n- [x] 09:00"));
    }

    #[test]
    fn keeps_explicit_md_extension() {
        let sink = MarkdownDailyLog::new("/notes", "%Y-%m-%d.md")
            .with_offset(FixedOffset::east_opt(0).unwrap());
        assert_eq!(
            sink.note_path(at(10, 0)).unwrap(),
            PathBuf::from("/notes/2024-05-06.md")
        );
    }

    #[test]
    fn rejects_bad_date_format() {
        let sink = MarkdownDailyLog::new("/notes", "%Q");
        assert!(matches!(
            sink.note_path(at(10, 0)),
            Err(LogSinkError::InvalidDateFormat(_))
        ));
    }
}
