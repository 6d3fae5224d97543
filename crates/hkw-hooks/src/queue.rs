//! Non-blocking emission through a single background worker.

use crate::engine::HookEngine;
use crate::error::EngineError;
use crate::summary::ExecutionSummary;
use hkw_core::Event;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread::JoinHandle;
use tracing::{debug, warn};

type Reply = Result<ExecutionSummary, EngineError>;

struct Job {
    event: Event,
    dry_run: bool,
    reply: Sender<Reply>,
}

/// Hands events to a worker thread so the caller is not blocked on hook
/// processes or disk I/O.
///
/// Events are processed one at a time; each event's hooks run in order and
/// are fully recorded before its [`PendingEmission`] resolves. Dropping the
/// queue processes everything already submitted, then joins the worker.
pub struct EmissionQueue {
    sender: Option<Sender<Job>>,
    worker: Option<JoinHandle<()>>,
}

impl EmissionQueue {
    pub fn new(engine: Arc<HookEngine>) -> std::io::Result<Self> {
        let (sender, receiver) = mpsc::channel::<Job>();
        let worker = std::thread::Builder::new()
            .name("hkw-emit".to_string())
            .spawn(move || {
                for job in receiver {
                    let reply = engine.emit_with(&job.event, job.dry_run);
                    if job.reply.send(reply).is_err() {
                        debug!(event_type = %job.event.event_type, "Emission handle dropped before completion");
                    }
                }
            })?;
        Ok(Self {
            sender: Some(sender),
            worker: Some(worker),
        })
    }

    pub fn submit(&self, event: Event) -> PendingEmission {
        self.enqueue(event, false)
    }

    pub fn submit_dry_run(&self, event: Event) -> PendingEmission {
        self.enqueue(event, true)
    }

    fn enqueue(&self, event: Event, dry_run: bool) -> PendingEmission {
        let (reply, receiver) = mpsc::channel();
        let event_type = event.event_type.clone();
        if let Some(sender) = &self.sender {
            // A send error drops `reply`, which `wait` reports as WorkerGone.
            let _ = sender.send(Job {
                event,
                dry_run,
                reply,
            });
        }
        PendingEmission {
            event_type,
            receiver,
        }
    }
}

impl Drop for EmissionQueue {
    fn drop(&mut self) {
        // Closing the channel ends the worker loop after the backlog.
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("Emission worker panicked");
            }
        }
    }
}

/// Handle to one submitted event.
pub struct PendingEmission {
    event_type: String,
    receiver: Receiver<Reply>,
}

impl PendingEmission {
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// Block until the event has been fully processed.
    pub fn wait(self) -> Result<ExecutionSummary, EngineError> {
        self.receiver
            .recv()
            .unwrap_or(Err(EngineError::WorkerGone {
                event_type: self.event_type,
            }))
    }

    /// `None` while the event is still queued or running.
    pub fn try_result(&self) -> Option<Result<ExecutionSummary, EngineError>> {
        match self.receiver.try_recv() {
            Ok(reply) => Some(reply),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(EngineError::WorkerGone {
                event_type: self.event_type.clone(),
            })),
        }
    }
}
