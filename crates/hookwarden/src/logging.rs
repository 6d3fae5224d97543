//! Engine diagnostics. Separate from the audit trail, which is never
//! written through `tracing`.

use anyhow::{Context, Result};
use chrono::Utc;
use std::path::{Path, PathBuf};
use tracing::Subscriber;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, reload};

/// Create a diagnostic log writer in `{log_dir}/engine-{timestamp}.log`.
///
/// The guard must outlive every write; dropping it flushes the file.
pub fn create_trace_log_writer(log_dir: &Path) -> Result<(NonBlocking, WorkerGuard, PathBuf)> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory: {}", log_dir.display()))?;

    let file_name = format!("engine-{}.log", Utc::now().format("%Y%m%d-%H%M%S"));
    let path = log_dir.join(&file_name);
    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    Ok((non_blocking, guard, path))
}

type FileLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Slot for the diagnostic file, filled once the log directory is known.
pub struct TraceFile {
    handle: reload::Handle<Option<FileLayer>, Registry>,
}

impl TraceFile {
    /// Start copying diagnostics to a new file under `log_dir`. Events
    /// emitted before this call only went to stderr.
    pub fn attach(&self, log_dir: &Path) -> Result<WorkerGuard> {
        let (writer, guard, path) = create_trace_log_writer(log_dir)?;
        let layer: FileLayer = Box::new(fmt::layer().with_ansi(false).with_writer(writer));
        self.handle
            .reload(Some(layer))
            .context("Failed to attach engine trace log")?;
        tracing::debug!(path = %path.display(), "Engine trace log enabled");
        Ok(guard)
    }
}

fn build() -> (impl Subscriber + Send + Sync + 'static, TraceFile) {
    let (file_layer, handle) = reload::Layer::new(None::<FileLayer>);
    let subscriber = tracing_subscriber::registry()
        .with(file_layer)
        .with(EnvFilter::from_default_env())
        .with(fmt::layer().with_writer(std::io::stderr));
    (subscriber, TraceFile { handle })
}

/// Install the global subscriber, writing to stderr. Filtering follows
/// `RUST_LOG`. Call before anything that may log, including settings load.
pub fn init() -> TraceFile {
    let (subscriber, trace_file) = build();
    subscriber.try_init().ok();
    trace_file
}
