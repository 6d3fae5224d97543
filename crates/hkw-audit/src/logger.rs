use crate::error::{LoggerError, LoggerResult};
use crate::query::{AuditQuery, AuditRecords};
use crate::record::AuditRecord;
use crate::report::{render_narrative, render_report};
use crate::stats::AuditStats;
use std::collections::VecDeque;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

/// Machine-readable line records.
pub const RECORDS_FILE: &str = "hooks.jsonl";
/// Human-readable narrative written alongside every record.
pub const REPORT_FILE: &str = "hooks.log";
const LOCK_FILE: &str = ".audit.lock";
const RECENT_FAILURES_IN_REPORT: usize = 10;

/// Size- and count-bounded rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationPolicy {
    /// The primary records file is rotated by the first write after it
    /// exceeds this many bytes.
    pub max_bytes: u64,
    /// Backups kept (`hooks.jsonl.1` newest .. `hooks.jsonl.N` oldest).
    pub max_backups: usize,
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self {
            max_bytes: 10 * 1024 * 1024,
            max_backups: 5,
        }
    }
}

/// Append-only audit store for one log directory.
///
/// Construct once and share (`Arc<AuditLogger>`); writes are serialized by an
/// in-process mutex plus an advisory file lock so concurrent processes
/// appending to the same directory never interleave partial lines.
#[derive(Debug)]
pub struct AuditLogger {
    log_dir: PathBuf,
    policy: RotationPolicy,
    write_lock: Mutex<()>,
}

impl AuditLogger {
    /// No I/O happens until the first write.
    pub fn new(log_dir: impl Into<PathBuf>, policy: RotationPolicy) -> Self {
        Self {
            log_dir: log_dir.into(),
            policy,
            write_lock: Mutex::new(()),
        }
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    pub fn policy(&self) -> RotationPolicy {
        self.policy
    }

    pub fn records_path(&self) -> PathBuf {
        self.log_dir.join(RECORDS_FILE)
    }

    pub fn report_path(&self) -> PathBuf {
        self.log_dir.join(REPORT_FILE)
    }

    /// Append one record to both files.
    pub fn log(&self, record: &AuditRecord) -> LoggerResult<()> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');
        let narrative = render_narrative(record);

        self.with_write_lock(|| {
            if self.rotate_if_needed()? {
                debug!(dir = %self.log_dir.display(), "Rotated audit log");
            }
            let records_path = self.records_path();
            let report_path = self.report_path();
            let mut records = open_append(&records_path).map_err(|e| LoggerError::io(&records_path, e))?;
            let mut report = open_append(&report_path).map_err(|e| LoggerError::io(&report_path, e))?;

            let before = records
                .metadata()
                .map_err(|e| LoggerError::io(&records_path, e))?
                .len();
            if let Err(e) = write_flushed(&mut records, &line) {
                truncate_to(&records, &records_path, before);
                return Err(LoggerError::io(&records_path, e));
            }
            if let Err(e) = write_flushed(&mut report, narrative.as_bytes()) {
                truncate_to(&records, &records_path, before);
                return Err(LoggerError::io(&report_path, e));
            }
            Ok(())
        })
    }

    /// Stream records matching `query`, oldest first.
    ///
    /// The file set is snapshotted under a shared lock; records appended
    /// after that are only seen if they land in the snapshotted primary.
    pub fn query(&self, query: &AuditQuery) -> LoggerResult<AuditRecords> {
        if !self.log_dir.is_dir() {
            return Ok(AuditRecords::new(Vec::new(), query.clone()));
        }
        let files = self.with_read_lock(|| {
            let mut files = Vec::new();
            for path in self.read_order()? {
                match File::open(&path) {
                    Ok(file) => files.push((path, file)),
                    Err(e) if e.kind() == ErrorKind::NotFound => {}
                    Err(e) => return Err(LoggerError::io(path, e)),
                }
            }
            Ok(files)
        })?;
        Ok(AuditRecords::new(files, query.clone()))
    }

    pub fn stats(&self) -> LoggerResult<AuditStats> {
        let mut stats = AuditStats::default();
        for record in self.query(&AuditQuery::new())? {
            stats.record(&record?);
        }
        Ok(stats)
    }

    /// Markdown summary: totals, per-hook table and the latest failures.
    pub fn report(&self) -> LoggerResult<String> {
        let mut stats = AuditStats::default();
        let mut recent_failures = VecDeque::with_capacity(RECENT_FAILURES_IN_REPORT);
        for record in self.query(&AuditQuery::new())? {
            let record = record?;
            stats.record(&record);
            if !record.success {
                if recent_failures.len() == RECENT_FAILURES_IN_REPORT {
                    recent_failures.pop_front();
                }
                recent_failures.push_back(record);
            }
        }
        let recent: Vec<_> = recent_failures.into_iter().rev().collect();
        Ok(render_report(&stats, &recent))
    }

    /// Delete both log files and every backup.
    pub fn clear(&self) -> LoggerResult<()> {
        self.with_write_lock(|| {
            for path in [self.records_path(), self.report_path()] {
                remove_if_exists(&path)?;
            }
            for (path, _) in self.numbered_backups(RECORDS_FILE)? {
                remove_if_exists(&path)?;
            }
            for (path, _) in self.numbered_backups(REPORT_FILE)? {
                remove_if_exists(&path)?;
            }
            Ok(())
        })
    }

    /// Existing record backups, newest (`.1`) first.
    pub fn backups(&self) -> LoggerResult<Vec<PathBuf>> {
        Ok(self
            .numbered_backups(RECORDS_FILE)?
            .into_iter()
            .map(|(path, _)| path)
            .collect())
    }

    fn with_write_lock<T>(&self, f: impl FnOnce() -> LoggerResult<T>) -> LoggerResult<T> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| LoggerError::Lock("audit writer mutex poisoned".to_string()))?;

        fs::create_dir_all(&self.log_dir).map_err(|e| LoggerError::io(&self.log_dir, e))?;
        let (lock_path, lock_file) = self.open_lock_file()?;
        let mut lock = fd_lock::RwLock::new(lock_file);
        let _file_guard = lock
            .write()
            .map_err(|e| LoggerError::Lock(format!("{}: {e}", lock_path.display())))?;

        f()
    }

    /// Shared with other readers, excluded from writers and rotation.
    fn with_read_lock<T>(&self, f: impl FnOnce() -> LoggerResult<T>) -> LoggerResult<T> {
        let (lock_path, lock_file) = self.open_lock_file()?;
        let lock = fd_lock::RwLock::new(lock_file);
        let _file_guard = lock
            .read()
            .map_err(|e| LoggerError::Lock(format!("{}: {e}", lock_path.display())))?;

        f()
    }

    fn open_lock_file(&self) -> LoggerResult<(PathBuf, File)> {
        let lock_path = self.log_dir.join(LOCK_FILE);
        let lock_file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| LoggerError::io(&lock_path, e))?;
        Ok((lock_path, lock_file))
    }

    fn rotate_if_needed(&self) -> LoggerResult<bool> {
        let records = self.records_path();
        let size = match fs::metadata(&records) {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(LoggerError::io(&records, e)),
        };
        if size <= self.policy.max_bytes {
            return Ok(false);
        }
        self.rotate_file(RECORDS_FILE)?;
        self.rotate_file(REPORT_FILE)?;
        Ok(true)
    }

    fn rotate_file(&self, name: &str) -> LoggerResult<()> {
        let primary = self.log_dir.join(name);
        let keep = self.policy.max_backups;

        if keep == 0 {
            remove_if_exists(&primary)?;
        } else {
            remove_if_exists(&backup_path(&primary, keep))?;
            for n in (1..keep).rev() {
                let from = backup_path(&primary, n);
                if from.exists() {
                    let to = backup_path(&primary, n + 1);
                    fs::rename(&from, &to).map_err(|e| LoggerError::io(&from, e))?;
                }
            }
            if primary.exists() {
                let to = backup_path(&primary, 1);
                fs::rename(&primary, &to).map_err(|e| LoggerError::io(&primary, e))?;
            }
        }

        // Backups left over from a larger retention setting.
        for (path, n) in self.numbered_backups(name)? {
            if n > keep {
                remove_if_exists(&path)?;
            }
        }
        Ok(())
    }

    /// `(path, n)` for every `{name}.{n}` in the log directory, sorted by `n`.
    fn numbered_backups(&self, name: &str) -> LoggerResult<Vec<(PathBuf, usize)>> {
        let entries = match fs::read_dir(&self.log_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(LoggerError::io(&self.log_dir, e)),
        };
        let prefix = format!("{name}.");
        let mut backups = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| LoggerError::io(&self.log_dir, e))?;
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            if let Some(n) = file_name
                .strip_prefix(&prefix)
                .and_then(|suffix| suffix.parse::<usize>().ok())
            {
                backups.push((entry.path(), n));
            }
        }
        backups.sort_by_key(|(_, n)| *n);
        Ok(backups)
    }

    /// Oldest backup first, primary file last.
    fn read_order(&self) -> LoggerResult<Vec<PathBuf>> {
        let mut files: Vec<PathBuf> = self
            .numbered_backups(RECORDS_FILE)?
            .into_iter()
            .rev()
            .map(|(path, _)| path)
            .collect();
        files.push(self.records_path());
        Ok(files)
    }
}

fn backup_path(primary: &Path, n: usize) -> PathBuf {
    let mut path = primary.as_os_str().to_owned();
    path.push(format!(".{n}"));
    PathBuf::from(path)
}

/// One `write_all` on an `O_APPEND` handle per record.
fn write_flushed(file: &mut File, bytes: &[u8]) -> std::io::Result<()> {
    file.write_all(bytes)?;
    file.flush()
}

/// Drop a record line whose narrative could not be written, so the two files
/// never disagree. Runs under the write lock.
fn truncate_to(file: &File, path: &Path, len: u64) {
    if let Err(e) = file.set_len(len) {
        warn!(path = %path.display(), error = %e, "Failed to roll back partial audit record");
    }
}

fn open_append(path: &Path) -> std::io::Result<File> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(0o600)) {
            warn!(path = %path.display(), error = %e, "Failed to restrict audit log permissions");
        }
    }
    Ok(file)
}

fn remove_if_exists(path: &Path) -> LoggerResult<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(LoggerError::io(path, e)),
    }
}

#[cfg(test)]
#[path = "logger_tests.rs"]
mod tests;
