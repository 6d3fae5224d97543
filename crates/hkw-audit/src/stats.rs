use crate::record::{AuditRecord, RecordCategory};
use chrono::{DateTime, Utc};
use hkw_core::HookOutcome;
use serde::Serialize;
use std::collections::BTreeMap;

/// Provider bucket for records written without a provider tag.
pub const UNTAGGED_PROVIDER: &str = "untagged";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HookTally {
    pub runs: u64,
    pub failures: u64,
    pub total_duration_ms: u64,
}

impl HookTally {
    pub fn average_duration_ms(&self) -> u64 {
        self.total_duration_ms.checked_div(self.runs).unwrap_or(0)
    }
}

/// Aggregate counts over the whole audit trail.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuditStats {
    pub total: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub timed_out: u64,
    pub by_category: BTreeMap<RecordCategory, u64>,
    pub by_provider: BTreeMap<String, u64>,
    pub by_event_type: BTreeMap<String, u64>,
    pub by_hook: BTreeMap<String, HookTally>,
    pub total_duration_ms: u64,
    pub first_timestamp: Option<DateTime<Utc>>,
    pub last_timestamp: Option<DateTime<Utc>>,
}

impl AuditStats {
    pub fn record(&mut self, record: &AuditRecord) {
        self.total += 1;
        if record.success {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
        if record.status == HookOutcome::TimedOut {
            self.timed_out += 1;
        }

        *self.by_category.entry(record.category).or_default() += 1;
        let provider = record.provider.as_deref().unwrap_or(UNTAGGED_PROVIDER);
        *self.by_provider.entry(provider.to_string()).or_default() += 1;
        *self
            .by_event_type
            .entry(record.event_type.clone())
            .or_default() += 1;

        let tally = self.by_hook.entry(record.hook_name.clone()).or_default();
        tally.runs += 1;
        tally.total_duration_ms += record.duration_ms;
        if !record.success {
            tally.failures += 1;
        }

        self.total_duration_ms += record.duration_ms;
        self.first_timestamp = Some(match self.first_timestamp {
            Some(first) => first.min(record.timestamp),
            None => record.timestamp,
        });
        self.last_timestamp = Some(match self.last_timestamp {
            Some(last) => last.max(record.timestamp),
            None => record.timestamp,
        });
    }

    pub fn category(&self, category: RecordCategory) -> u64 {
        self.by_category.get(&category).copied().unwrap_or(0)
    }

    /// Fraction of successful records, `0.0` for an empty trail.
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.succeeded as f64 / self.total as f64
        }
    }
}

impl<'a> FromIterator<&'a AuditRecord> for AuditStats {
    fn from_iter<I: IntoIterator<Item = &'a AuditRecord>>(iter: I) -> Self {
        let mut stats = Self::default();
        for record in iter {
            stats.record(record);
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Severity;
    use chrono::Duration;
    use ulid::Ulid;

    fn record(hook: &str, status: HookOutcome, provider: Option<&str>) -> AuditRecord {
        let success = status == HookOutcome::Succeeded;
        AuditRecord {
            timestamp: Utc::now(),
            event_id: Ulid::new(),
            event_type: "task.created".to_string(),
            hook_name: hook.to_string(),
            success,
            exit_code: success.then_some(0),
            duration_ms: 10,
            status,
            severity: if success { Severity::Info } else { Severity::Error },
            category: match status {
                HookOutcome::TimedOut => RecordCategory::Timeout,
                HookOutcome::Failed => RecordCategory::Failure,
                _ => RecordCategory::Success,
            },
            provider: provider.map(str::to_string),
            task_id: None,
            spec_id: None,
            error: None,
            stdout_excerpt: None,
            stderr_excerpt: None,
        }
    }

    #[test]
    fn test_empty_stats() {
        let stats = AuditStats::default();
        assert_eq!(stats.total, 0);
        assert_eq!(stats.success_rate(), 0.0);
        assert_eq!(stats.first_timestamp, None);
    }

    #[test]
    fn test_counts_by_category_and_provider() {
        let records = vec![
            record("lint", HookOutcome::Succeeded, Some("ci")),
            record("lint", HookOutcome::Failed, Some("ci")),
            record("slow", HookOutcome::TimedOut, None),
            record("vcs", HookOutcome::Failed, Some("git")),
        ];
        let stats: AuditStats = records.iter().collect();

        assert_eq!(stats.total, 4);
        assert_eq!(stats.succeeded, 1);
        assert_eq!(stats.failed, 3);
        assert_eq!(stats.timed_out, 1);
        assert_eq!(stats.category(RecordCategory::Success), 1);
        assert_eq!(stats.category(RecordCategory::Failure), 2);
        assert_eq!(stats.category(RecordCategory::Timeout), 1);
        assert_eq!(stats.by_provider.get("ci"), Some(&2));
        assert_eq!(stats.by_provider.get("git"), Some(&1));
        assert_eq!(stats.by_provider.get(UNTAGGED_PROVIDER), Some(&1));
        assert_eq!(stats.by_event_type.get("task.created"), Some(&4));
        assert_eq!(stats.total_duration_ms, 40);

        let lint = &stats.by_hook["lint"];
        assert_eq!(lint.runs, 2);
        assert_eq!(lint.failures, 1);
        assert_eq!(lint.average_duration_ms(), 10);
        assert_eq!(stats.success_rate(), 0.25);
    }

    #[test]
    fn test_timestamp_bounds() {
        let mut early = record("a", HookOutcome::Succeeded, None);
        early.timestamp = Utc::now() - Duration::hours(1);
        let late = record("a", HookOutcome::Succeeded, None);

        let stats: AuditStats = [&late, &early].into_iter().collect();
        assert_eq!(stats.first_timestamp, Some(early.timestamp));
        assert_eq!(stats.last_timestamp, Some(late.timestamp));
    }

    #[test]
    fn test_stats_serialize_category_keys() {
        let stats: AuditStats = [&record("a", HookOutcome::Succeeded, None)]
            .into_iter()
            .collect();
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["by_category"]["success"], 1);
    }
}
