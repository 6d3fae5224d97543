use anyhow::Result;
use hkw_audit::report::render_narrative;
use hkw_audit::{AuditLogger, AuditQuery, AuditStats, RotationPolicy};

use crate::cli::{AuditCommands, OutputFormat};
use crate::project::Project;

pub(crate) fn handle_audit(project: &Project, command: AuditCommands, format: OutputFormat) -> Result<()> {
    let logger = AuditLogger::new(
        &project.paths.log_dir,
        RotationPolicy {
            max_bytes: project.settings.audit.max_bytes,
            max_backups: project.settings.audit.max_backups,
        },
    );

    match command {
        AuditCommands::Query {
            event_types,
            hook,
            severity,
            provider,
            correlation_id,
            succeeded,
            failed,
            since,
            until,
            limit,
        } => {
            let mut query = AuditQuery::new().event_types(event_types);
            if let Some(hook) = hook {
                query = query.hook_name(hook);
            }
            if let Some(severity) = severity {
                query = query.severity(severity);
            }
            if let Some(provider) = provider {
                query = query.provider(provider);
            }
            if let Some(id) = correlation_id {
                query = query.correlation_id(id);
            }
            if succeeded {
                query = query.success(true);
            } else if failed {
                query = query.success(false);
            }
            if let Some(since) = since {
                query = query.since(since);
            }
            if let Some(until) = until {
                query = query.until(until);
            }
            if let Some(limit) = limit {
                query = query.limit(limit);
            }
            handle_query(&logger, &query, format)
        }
        AuditCommands::Stats => {
            let stats = logger.stats()?;
            match format {
                OutputFormat::Text => print!("{}", render_stats(&stats)),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&stats)?),
            }
            Ok(())
        }
        AuditCommands::Report => {
            let report = logger.report()?;
            match format {
                OutputFormat::Text => print!("{report}"),
                OutputFormat::Json => {
                    println!("{}", serde_json::json!({ "report": report }));
                }
            }
            Ok(())
        }
        AuditCommands::Clear => {
            logger.clear()?;
            if format == OutputFormat::Text {
                println!("Cleared audit trail in {}", logger.log_dir().display());
            }
            Ok(())
        }
    }
}

fn handle_query(logger: &AuditLogger, query: &AuditQuery, format: OutputFormat) -> Result<()> {
    let records = logger.query(query)?;
    match format {
        OutputFormat::Text => {
            let mut shown = 0usize;
            for record in records {
                print!("{}", render_narrative(&record?));
                shown += 1;
            }
            if shown == 0 {
                println!("No matching audit records.");
            }
        }
        OutputFormat::Json => {
            // One record per line, like hooks.jsonl itself.
            for record in records {
                println!("{}", serde_json::to_string(&record?)?);
            }
        }
    }
    Ok(())
}

fn render_stats(stats: &AuditStats) -> String {
    if stats.total == 0 {
        return "No hook executions recorded.\n".to_string();
    }
    let mut out = format!(
        "executions: {}\nsucceeded:  {} ({:.1}%)\nfailed:     {}\ntimed out:  {}\n",
        stats.total,
        stats.succeeded,
        stats.success_rate() * 100.0,
        stats.failed,
        stats.timed_out
    );
    if let (Some(first), Some(last)) = (stats.first_timestamp, stats.last_timestamp) {
        out.push_str(&format!("window:     {} .. {}\n", first.to_rfc3339(), last.to_rfc3339()));
    }
    out.push_str("by event type:\n");
    for (event_type, count) in &stats.by_event_type {
        out.push_str(&format!("  {event_type}: {count}\n"));
    }
    out.push_str("by hook:\n");
    for (hook, tally) in &stats.by_hook {
        out.push_str(&format!(
            "  {hook}: {} run(s), {} failure(s), avg {} ms\n",
            tally.runs,
            tally.failures,
            tally.average_duration_ms()
        ));
    }
    out
}
