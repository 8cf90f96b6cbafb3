//! Ordered, leveled operator log. Every engine action lands here in
//! chronological order so backup/delete pairs are visibly sequenced for
//! audit. Lines are echoed to stdout (unless the caller wants JSON-only
//! output) and forwarded to the diagnostic `tracing` log.

use chrono::{DateTime, Local};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Level {
    Info,
    Warn,
    Error,
    Success,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Success => "SUCCESS",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub level: Level,
    pub message: String,
}

pub struct RunLog {
    entries: Vec<LogEntry>,
    echo: bool,
}

impl RunLog {
    pub fn new(echo: bool) -> Self {
        Self {
            entries: Vec::new(),
            echo,
        }
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Messages at a given level, for tests and the summary.
    pub fn messages_at(&self, level: Level) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.level == level)
            .map(|e| e.message.as_str())
            .collect()
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(Level::Info, message.into());
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.push(Level::Warn, message.into());
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(Level::Error, message.into());
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.push(Level::Success, message.into());
    }

    fn push(&mut self, level: Level, message: String) {
        match level {
            Level::Info | Level::Success => tracing::info!("{}", message),
            Level::Warn => tracing::warn!("{}", message),
            Level::Error => tracing::error!("{}", message),
        }
        let entry = LogEntry {
            timestamp: Local::now(),
            level,
            message,
        };
        if self.echo {
            println!(
                "{} [{}] {}",
                entry.timestamp.format("%H:%M:%S"),
                entry.level.as_str(),
                entry.message
            );
        }
        self.entries.push(entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_keep_chronological_order_and_level() {
        let mut log = RunLog::new(false);
        log.info("first");
        log.warn("second");
        log.success("third");

        let levels: Vec<Level> = log.entries().iter().map(|e| e.level).collect();
        assert_eq!(levels, vec![Level::Info, Level::Warn, Level::Success]);
        assert_eq!(log.messages_at(Level::Warn), vec!["second"]);
    }
}
