//! Human-readable renderings of the audit trail.

use crate::record::AuditRecord;
use crate::stats::AuditStats;
use chrono::SecondsFormat;
use std::fmt::Write;

/// Narrative block appended to `hooks.log` for each record.
///
/// ```text
/// [2026-03-01T10:00:00Z] ERROR implement.completed :: quality-check-strict FAILED (exit 1, 12 ms)
///   task: task-42
///   error: Hook 'quality-check-strict' exited with code 1
///   stdout: checking 14 files
///   stderr: lint failed
/// ```
pub fn render_narrative(record: &AuditRecord) -> String {
    let mut out = String::new();
    let exit = record
        .exit_code
        .map_or_else(|| "no exit code".to_string(), |code| format!("exit {code}"));
    let _ = writeln!(
        out,
        "[{}] {} {} :: {} {} ({exit}, {} ms)",
        record.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
        record.severity.as_str().to_uppercase(),
        record.event_type,
        record.hook_name,
        record.status.as_str().to_uppercase(),
        record.duration_ms,
    );
    if let Some(provider) = &record.provider {
        let _ = writeln!(out, "  provider: {provider}");
    }
    if let Some(task_id) = &record.task_id {
        let _ = writeln!(out, "  task: {task_id}");
    }
    if let Some(spec_id) = &record.spec_id {
        let _ = writeln!(out, "  spec: {spec_id}");
    }
    if let Some(error) = &record.error {
        let _ = writeln!(out, "  error: {error}");
    }
    if let Some(stdout) = &record.stdout_excerpt {
        let _ = writeln!(out, "  stdout: {}", indent_continuation(stdout.trim_end()));
    }
    if let Some(stderr) = &record.stderr_excerpt {
        let _ = writeln!(out, "  stderr: {}", indent_continuation(stderr.trim_end()));
    }
    out
}

fn indent_continuation(text: &str) -> String {
    text.replace('\n', "\n          ")
}

/// Markdown summary of the whole trail.
///
/// `recent_failures` is expected newest first.
pub fn render_report(stats: &AuditStats, recent_failures: &[AuditRecord]) -> String {
    let mut out = String::from("# Hook Audit Report\n\n");

    if stats.total == 0 {
        out.push_str("No hook executions recorded.\n");
        return out;
    }

    let _ = writeln!(out, "- Executions: {}", stats.total);
    let _ = writeln!(
        out,
        "- Succeeded: {} ({:.1}%)",
        stats.succeeded,
        stats.success_rate() * 100.0
    );
    let _ = writeln!(out, "- Failed: {}", stats.failed);
    let _ = writeln!(out, "- Timed out: {}", stats.timed_out);
    if let (Some(first), Some(last)) = (stats.first_timestamp, stats.last_timestamp) {
        let _ = writeln!(
            out,
            "- Window: {} .. {}",
            first.to_rfc3339_opts(SecondsFormat::Secs, true),
            last.to_rfc3339_opts(SecondsFormat::Secs, true)
        );
    }

    out.push_str("\n## By category\n\n");
    for (category, count) in &stats.by_category {
        let _ = writeln!(out, "- {category}: {count}");
    }

    out.push_str("\n## By provider\n\n");
    for (provider, count) in &stats.by_provider {
        let _ = writeln!(out, "- {provider}: {count}");
    }

    out.push_str("\n## Hooks\n\n| Hook | Runs | Failures | Avg ms |\n|---|---:|---:|---:|\n");
    for (hook, tally) in &stats.by_hook {
        let _ = writeln!(
            out,
            "| {hook} | {} | {} | {} |",
            tally.runs,
            tally.failures,
            tally.average_duration_ms()
        );
    }

    if !recent_failures.is_empty() {
        out.push_str("\n## Recent failures\n\n");
        for record in recent_failures {
            let _ = writeln!(
                out,
                "- {} `{}` on `{}`: {}",
                record.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
                record.hook_name,
                record.event_type,
                record.error.as_deref().unwrap_or("failed")
            );
        }
    }

    out
}
