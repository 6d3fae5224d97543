//! Filtered, lazily-read views over the audit trail.

use crate::error::{LoggerError, LoggerResult};
use crate::record::{AuditRecord, Severity};
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::PathBuf;
use tracing::warn;

/// Conjunctive record filter.
///
/// Each populated criterion must hold. List criteria (event types,
/// severities, providers) match when the record's value is any of the listed
/// ones. The time range is inclusive at both ends.
///
/// ```ignore
/// let failures = AuditQuery::new()
///     .event_types(["task.created", "task.completed"])
///     .severity(Severity::Error)
///     .correlation_id("task-42")
///     .limit(20);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditQuery {
    event_types: Vec<String>,
    severities: Vec<Severity>,
    providers: Vec<String>,
    correlation_id: Option<String>,
    hook_name: Option<String>,
    success: Option<bool>,
    since: Option<DateTime<Utc>>,
    until: Option<DateTime<Utc>>,
    limit: Option<usize>,
}

impl AuditQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_types.push(event_type.into());
        self
    }

    pub fn event_types<I, S>(mut self, event_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.event_types
            .extend(event_types.into_iter().map(Into::into));
        self
    }

    pub fn severity(mut self, severity: Severity) -> Self {
        self.severities.push(severity);
        self
    }

    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.providers.push(provider.into());
        self
    }

    /// Matches the event id, task id or spec id.
    pub fn correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    pub fn hook_name(mut self, hook_name: impl Into<String>) -> Self {
        self.hook_name = Some(hook_name.into());
        self
    }

    pub fn success(mut self, success: bool) -> Self {
        self.success = Some(success);
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    pub fn between(self, since: DateTime<Utc>, until: DateTime<Utc>) -> Self {
        self.since(since).until(until)
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn max_results(&self) -> Option<usize> {
        self.limit
    }

    pub fn matches(&self, record: &AuditRecord) -> bool {
        if !self.event_types.is_empty() && !self.event_types.contains(&record.event_type) {
            return false;
        }
        if !self.severities.is_empty() && !self.severities.contains(&record.severity) {
            return false;
        }
        if !self.providers.is_empty()
            && !record
                .provider
                .as_ref()
                .is_some_and(|p| self.providers.contains(p))
        {
            return false;
        }
        if let Some(id) = &self.correlation_id {
            if !record.correlates_with(id) {
                return false;
            }
        }
        if let Some(hook_name) = &self.hook_name {
            if &record.hook_name != hook_name {
                return false;
            }
        }
        if let Some(success) = self.success {
            if record.success != success {
                return false;
            }
        }
        if let Some(since) = self.since {
            if record.timestamp < since {
                return false;
            }
        }
        if let Some(until) = self.until {
            if record.timestamp > until {
                return false;
            }
        }
        true
    }

    /// Cheap textual pre-check on a raw line before JSON parsing.
    ///
    /// Only rejects lines that certainly cannot match; records are written
    /// with compact `serde_json`, so a plain event type appears verbatim as
    /// `"event_type":"<value>"`.
    fn may_match_line(&self, line: &str) -> bool {
        if self.event_types.is_empty() {
            return true;
        }
        if self.event_types.iter().any(|t| !is_plain(t)) {
            return true;
        }
        self.event_types
            .iter()
            .any(|t| line.contains(&format!("\"event_type\":\"{t}\"")))
    }
}

fn is_plain(value: &str) -> bool {
    value
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-' | b':' | b'/'))
}

/// Lazy iterator over matching records.
///
/// Every file is opened up front under a shared lock, so rotation that
/// happens while iterating cannot skip or repeat records. One line is held in
/// memory at a time. Unparseable lines (e.g. a torn final line after a crash)
/// are skipped with a warning.
pub struct AuditRecords {
    files: VecDeque<(PathBuf, File)>,
    current: Option<(PathBuf, Lines<BufReader<File>>)>,
    query: AuditQuery,
    remaining: Option<usize>,
}

impl AuditRecords {
    pub(crate) fn new(files: Vec<(PathBuf, File)>, query: AuditQuery) -> Self {
        let remaining = query.max_results();
        Self {
            files: files.into(),
            current: None,
            query,
            remaining,
        }
    }

    /// Drain into a `Vec`, stopping at the first I/O error.
    pub fn collect_records(self) -> LoggerResult<Vec<AuditRecord>> {
        self.collect()
    }
}

impl Iterator for AuditRecords {
    type Item = LoggerResult<AuditRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == Some(0) {
            return None;
        }

        loop {
            if self.current.is_none() {
                let (path, file) = self.files.pop_front()?;
                self.current = Some((path, BufReader::new(file).lines()));
            }

            let (path, lines) = self.current.as_mut()?;
            let line = match lines.next() {
                None => {
                    self.current = None;
                    continue;
                }
                Some(Err(e)) => {
                    let err = LoggerError::io(path.clone(), e);
                    self.current = None;
                    return Some(Err(err));
                }
                Some(Ok(line)) => line,
            };

            if line.trim().is_empty() || !self.query.may_match_line(&line) {
                continue;
            }

            match serde_json::from_str::<AuditRecord>(&line) {
                Ok(record) if self.query.matches(&record) => {
                    if let Some(remaining) = self.remaining.as_mut() {
                        *remaining -= 1;
                    }
                    return Some(Ok(record));
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping malformed audit line");
                }
            }
        }
    }
}
