use anyhow::Result;
use hkw_core::{Event, ExecutionResult, HookOutcome};
use hkw_hooks::{EmissionQueue, HookEngine, ExecutionSummary};
use std::sync::Arc;

use crate::cli::OutputFormat;
use crate::project::Project;

pub(crate) struct EmitArgs {
    pub event_type: String,
    pub task_id: Option<String>,
    pub spec_id: Option<String>,
    pub context: Vec<(String, String)>,
    pub dry_run: bool,
    pub background: bool,
}

impl EmitArgs {
    fn event(&self) -> Event {
        let mut event = Event::new(self.event_type.trim());
        if let Some(task_id) = &self.task_id {
            event = event.with_task_id(task_id);
        }
        if let Some(spec_id) = &self.spec_id {
            event = event.with_spec_id(spec_id);
        }
        for (key, value) in &self.context {
            event = event.with_context(key, value);
        }
        event
    }
}

/// Returns the process exit code: 1 when a `stop` hook aborted the event.
pub(crate) fn handle_emit(project: &Project, args: EmitArgs, format: OutputFormat) -> Result<i32> {
    let engine = HookEngine::from_settings(project.root(), &project.settings)?;
    let event = args.event();

    let summary = if args.background {
        let queue = EmissionQueue::new(Arc::new(engine))?;
        let pending = if args.dry_run {
            queue.submit_dry_run(event)
        } else {
            queue.submit(event)
        };
        if format == OutputFormat::Text {
            eprintln!("Queued {}", pending.event_type());
        }
        pending.wait()?
    } else {
        engine.emit_with(&event, args.dry_run)?
    };

    match format {
        OutputFormat::Text => print!("{}", render_summary(&summary)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
    }
    Ok(summary.exit_code())
}

fn render_summary(summary: &ExecutionSummary) -> String {
    let event = &summary.event;
    let mut out = format!("{} ({})", event.event_type, event.id);
    if summary.dry_run {
        out.push_str(" [dry run]");
    }
    out.push('\n');

    if summary.matched.is_empty() {
        out.push_str("  no hooks matched\n");
        return out;
    }
    for result in &summary.results {
        out.push_str(&render_result(result));
    }
    if let Some(hook) = &summary.aborted_by {
        out.push_str(&format!("  aborted by '{hook}'"));
        if !summary.skipped.is_empty() {
            out.push_str(&format!("; skipped: {}", summary.skipped.join(", ")));
        }
        out.push('\n');
    }
    if !summary.dry_run {
        out.push_str(&format!(
            "  {} succeeded, {} failed ({} timed out)\n",
            summary.succeeded(),
            summary.failed(),
            summary.timed_out()
        ));
    }
    out
}

fn render_result(result: &ExecutionResult) -> String {
    let label = match result.outcome {
        HookOutcome::Succeeded => "ok",
        HookOutcome::Failed => "FAILED",
        HookOutcome::TimedOut => "TIMEOUT",
        HookOutcome::Skipped => "would run",
    };
    let mut line = format!("  {label:<9} {}", result.hook_name);
    match result.outcome {
        HookOutcome::Skipped => {
            let action = result.stdout.trim_start_matches("[dry-run] would execute ");
            line.push_str(&format!(": {action}"));
        }
        _ => {
            line.push_str(&format!(" ({} ms)", result.duration_ms));
            if let Some(error) = &result.error {
                line.push_str(&format!(": {error}"));
            }
        }
    }
    line.push('\n');
    line
}
