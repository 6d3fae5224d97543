use anyhow::Result;
use clap::Parser;

mod attest_cmd;
mod audit_cmds;
mod cli;
mod emit_cmd;
mod logging;
mod project;
mod validate_cmd;

use cli::{Cli, Commands};
use emit_cmd::EmitArgs;
use project::Project;

fn main() {
    let code = match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:#}");
            exit_code_for(&err)
        }
    };
    std::process::exit(code);
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let output_format = cli.format;

    let trace_file = logging::init();

    let project = Project::load(cli.project_root.as_deref(), cli.settings.as_deref())?;
    // Flushes the diagnostic file on exit.
    let _trace_guard = if cli.trace_log {
        Some(trace_file.attach(&project.paths.log_dir)?)
    } else {
        None
    };

    match cli.command {
        Commands::Emit {
            event_type,
            task_id,
            spec_id,
            context,
            dry_run,
            background,
        } => emit_cmd::handle_emit(
            &project,
            EmitArgs {
                event_type,
                task_id,
                spec_id,
                context,
                dry_run,
                background,
            },
            output_format,
        ),
        Commands::Validate => validate_cmd::handle_validate(&project, output_format),
        Commands::Audit { cmd } => {
            audit_cmds::handle_audit(&project, cmd, output_format)?;
            Ok(0)
        }
        Commands::Attest {
            operation,
            subjects,
            files,
        } => {
            attest_cmd::handle_attest(&project, &operation, subjects, files, output_format)?;
            Ok(0)
        }
    }
}

/// 1 for configuration and input problems, 2 for audit and I/O failures.
fn exit_code_for(err: &anyhow::Error) -> i32 {
    if let Some(engine) = err.downcast_ref::<hkw_hooks::EngineError>() {
        return engine.exit_code();
    }
    if err.downcast_ref::<hkw_core::ValidationReport>().is_some() {
        return 1;
    }
    let io_like = err.chain().any(|cause| {
        cause.is::<hkw_audit::LoggerError>()
            || cause.is::<std::io::Error>()
            || cause.downcast_ref::<hkw_attest::AttestError>().is_some_and(|e| {
                matches!(
                    e,
                    hkw_attest::AttestError::Io { .. } | hkw_attest::AttestError::Json { .. }
                )
            })
    });
    if io_like { 2 } else { 1 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn test_exit_codes() {
        let config = anyhow::Error::new(hkw_hooks::EngineError::Config(
            hkw_core::ConfigError::DuplicateName("x".to_string()).into(),
        ));
        assert_eq!(exit_code_for(&config), 1);

        let logger = anyhow::Error::new(hkw_hooks::EngineError::Logger(
            hkw_audit::LoggerError::Lock("held".to_string()),
        ));
        assert_eq!(exit_code_for(&logger), 2);

        let attest = anyhow::Error::new(hkw_attest::AttestError::EmptyOperation);
        assert_eq!(exit_code_for(&attest), 1);

        let io = anyhow::Error::new(hkw_attest::AttestError::Io {
            path: "x".into(),
            source: std::io::Error::other("denied"),
        })
        .context("Failed to hash subject 'x'");
        assert_eq!(exit_code_for(&io), 2);

        assert_eq!(exit_code_for(&anyhow!("bad settings")), 1);
    }
}
