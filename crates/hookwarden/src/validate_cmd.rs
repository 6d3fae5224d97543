use anyhow::Result;
use hkw_config::global_hooks_path;
use hkw_hooks::validate_config;
use serde_json::json;

use crate::cli::OutputFormat;
use crate::project::Project;

/// Returns 0 when the configuration is valid, 1 otherwise.
pub(crate) fn handle_validate(project: &Project, format: OutputFormat) -> Result<i32> {
    let global = global_hooks_path();
    let hooks_file = project.paths.hooks_file.display().to_string();

    match validate_config(&project.paths, global.as_deref()) {
        Ok(hooks) => {
            match format {
                OutputFormat::Text => {
                    println!("{hooks_file}: {} hook(s) OK", hooks.len());
                    for hook in hooks.hooks() {
                        let events: Vec<String> = hook.events.iter().map(ToString::to_string).collect();
                        let state = if hook.enabled { "" } else { " (disabled)" };
                        println!(
                            "  {} [{}] {} {}{state}",
                            hook.name,
                            events.join(", "),
                            hook.fail_mode.as_str(),
                            hook.action
                        );
                    }
                }
                OutputFormat::Json => {
                    let hooks: Vec<_> = hooks
                        .hooks()
                        .iter()
                        .map(|hook| {
                            json!({
                                "name": hook.name,
                                "events": hook.events.iter().map(ToString::to_string).collect::<Vec<_>>(),
                                "action": hook.action.to_string(),
                                "timeout_secs": hook.timeout.as_secs(),
                                "fail_mode": hook.fail_mode.as_str(),
                                "enabled": hook.enabled,
                            })
                        })
                        .collect();
                    let doc = json!({ "valid": true, "hooks_file": hooks_file, "hooks": hooks });
                    println!("{}", serde_json::to_string_pretty(&doc)?);
                }
            }
            Ok(0)
        }
        Err(report) => {
            match format {
                OutputFormat::Text => println!("{hooks_file}: {report}"),
                OutputFormat::Json => {
                    let problems: Vec<_> = report
                        .errors
                        .iter()
                        .map(|e| json!({ "hook": e.hook_name(), "message": e.to_string() }))
                        .collect();
                    let doc = json!({ "valid": false, "hooks_file": hooks_file, "problems": problems });
                    println!("{}", serde_json::to_string_pretty(&doc)?);
                }
            }
            Ok(1)
        }
    }
}
