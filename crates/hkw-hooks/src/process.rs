//! Child process plumbing: process groups, tree termination, output capture.

use std::io::{ErrorKind, Read};
use std::process::{Child, Command};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::warn;

/// How often an idle reader rechecks its stop flag.
const IDLE_POLL: Duration = Duration::from_millis(10);
/// Time a stopped reader gets to notice the flag before it is detached.
const STOP_WAIT: Duration = Duration::from_millis(250);

/// Put the child in its own process group so a timeout can kill the whole
/// tree, not just the shell (which would orphan its children).
pub(crate) fn isolate_process_group(cmd: &mut Command) {
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }
    #[cfg(not(unix))]
    let _ = cmd;
}

/// Kill `child` and, where the platform allows, every process in its group,
/// then reap it.
///
/// On Unix the child must have been spawned with [`isolate_process_group`].
/// Descendants that moved to a different process group or session escape.
/// Elsewhere only the direct child is killed.
pub fn terminate_process_tree(child: &mut Child) {
    #[cfg(unix)]
    {
        // The hook leads its own group, so its pid is the group id.
        let pgid = child.id() as libc::pid_t;
        // SAFETY: plain syscall on an integer id; no memory is shared.
        let rc = unsafe { libc::kill(-pgid, libc::SIGKILL) };
        if rc != 0 {
            // No such group; fall back to the child alone.
            let _ = child.kill();
        }
    }
    #[cfg(not(unix))]
    {
        let _ = child.kill();
    }
    let _ = child.wait();
}

/// A readable pipe end a capture thread can drain.
#[cfg(unix)]
pub(crate) trait Pipe: Read + std::os::fd::AsRawFd + Send + 'static {}
#[cfg(unix)]
impl<T: Read + std::os::fd::AsRawFd + Send + 'static> Pipe for T {}

#[cfg(not(unix))]
pub(crate) trait Pipe: Read + Send + 'static {}
#[cfg(not(unix))]
impl<T: Read + Send + 'static> Pipe for T {}

/// Switch the pipe to non-blocking reads so its reader can be stopped.
/// Returns `false` where that is not possible; such a reader can only be
/// detached.
fn make_stoppable(pipe: &impl Pipe) -> bool {
    #[cfg(unix)]
    {
        let fd = pipe.as_raw_fd();
        // SAFETY: fcntl on a descriptor owned by `pipe` for this call.
        let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
        // SAFETY: as above; only the O_NONBLOCK bit changes.
        flags >= 0 && unsafe { libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) } == 0
    }
    #[cfg(not(unix))]
    {
        let _ = pipe;
        false
    }
}

/// A pipe drained by a background thread into a shared buffer.
///
/// The buffer stays readable however the thread ends, so output written
/// before a kill is kept.
pub(crate) struct OutputCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
    stop: Arc<AtomicBool>,
    reader: Option<JoinHandle<()>>,
}

impl OutputCapture {
    pub(crate) fn spawn<R: Pipe>(source: Option<R>, name: &str) -> Self {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let stop = Arc::new(AtomicBool::new(false));
        let reader = source.and_then(|source| {
            if !make_stoppable(&source) {
                warn!(pipe = name, "Could not make output pipe non-blocking; a stuck reader will be detached");
            }
            let sink = Arc::clone(&buffer);
            let stop = Arc::clone(&stop);
            std::thread::Builder::new()
                .name(format!("hkw-capture-{name}"))
                .spawn(move || drain(source, &sink, &stop))
                .map_err(|e| warn!(pipe = name, error = %e, "Failed to spawn output reader"))
                .ok()
        });
        Self {
            buffer,
            stop,
            reader,
        }
    }

    /// Wait until `deadline` for the pipe to close, then return what was
    /// captured and whether the pipe reached EOF.
    ///
    /// A reader still running at the deadline (a detached descendant is
    /// holding the pipe) is told to stop and joined, so no thread outlives
    /// the hook.
    pub(crate) fn finish(mut self, deadline: Instant) -> (String, bool) {
        let mut complete = true;
        if let Some(reader) = self.reader.take() {
            wait_finished(&reader, deadline);
            if !reader.is_finished() {
                complete = false;
                self.stop.store(true, Ordering::Release);
                wait_finished(&reader, Instant::now() + STOP_WAIT);
            }
            if reader.is_finished() {
                let _ = reader.join();
            } else {
                warn!("Output reader did not stop; detaching it");
            }
        }
        let text = match self.buffer.lock() {
            Ok(buf) => String::from_utf8_lossy(&buf).into_owned(),
            Err(poisoned) => String::from_utf8_lossy(&poisoned.into_inner()).into_owned(),
        };
        (text, complete)
    }
}

fn wait_finished(reader: &JoinHandle<()>, deadline: Instant) {
    while !reader.is_finished() && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(5));
    }
}

fn drain(mut source: impl Read, sink: &Mutex<Vec<u8>>, stop: &AtomicBool) {
    let mut chunk = [0u8; 8192];
    while !stop.load(Ordering::Acquire) {
        match source.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => match sink.lock() {
                Ok(mut buf) => buf.extend_from_slice(&chunk[..n]),
                Err(_) => break,
            },
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) if e.kind() == ErrorKind::WouldBlock => std::thread::sleep(IDLE_POLL),
            Err(_) => break,
        }
    }
}
