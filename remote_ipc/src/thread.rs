//! Dedicated-thread transport
//!
//! A [`ServiceThread`] owns a stub and a worker thread. Submitters talk to it
//! through a [`ThreadHandle`]: each transaction is queued on a bounded
//! channel together with a call id, and the submitter waits on a reply
//! channel registered under that id. Replies therefore always reach the
//! caller that sent the request, however many threads share the handle.
//!
//! When the service stops, for any reason, every waiting caller receives
//! `DeadObject` and death recipients fire once.

use crate::{
    DeathRecipient, DeathRegistry, IpcConfig, RemoteError, RemoteHandle, Transactable,
    TransportError,
};
use core_types::{HandleId, TransactionCode, TransactionFlags};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, SyncSender, TrySendError};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, trace, warn};

type Reply = Result<Vec<u8>, RemoteError>;

/// Pause between submit attempts while the queue is full
const QUEUE_FULL_BACKOFF: Duration = Duration::from_millis(1);

enum Command {
    Transact {
        call_id: u64,
        code: TransactionCode,
        data: Vec<u8>,
        flags: TransactionFlags,
    },
    Stop,
}

struct Shared {
    id: HandleId,
    alive: AtomicBool,
    deaths: DeathRegistry,
    next_call: AtomicU64,
    pending: Mutex<HashMap<u64, Sender<Reply>>>,
}

impl Shared {
    /// Registers a waiter, unless the service is already gone
    fn register(&self, call_id: u64) -> Result<Receiver<Reply>, RemoteError> {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if !self.alive.load(Ordering::SeqCst) {
            return Err(TransportError::DeadObject.into());
        }
        let (tx, rx) = mpsc::channel();
        pending.insert(call_id, tx);
        Ok(rx)
    }

    fn take_waiter(&self, call_id: u64) -> Option<Sender<Reply>> {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&call_id)
    }

    /// Marks the service dead and fails every waiting call
    fn invalidate(&self) {
        let waiters = {
            let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
            self.alive.store(false, Ordering::SeqCst);
            std::mem::take(&mut *pending)
        };
        if !waiters.is_empty() {
            debug!(handle = %self.id, waiting = waiters.len(), "failing pending calls");
        }
        for (_, waiter) in waiters {
            let _ = waiter.send(Err(TransportError::DeadObject.into()));
        }
        self.deaths.mark_dead(self.id);
    }
}

/// Invalidates the shared state when the service loop ends, even by panic
struct ExitGuard(Arc<Shared>);

impl Drop for ExitGuard {
    fn drop(&mut self) {
        if thread::panicking() {
            warn!(handle = %self.0.id, "service thread panicked");
        }
        self.0.invalidate();
    }
}

fn run(target: Arc<dyn Transactable>, shared: Arc<Shared>, commands: Receiver<Command>) {
    let _guard = ExitGuard(shared.clone());
    debug!(handle = %shared.id, descriptor = %target.descriptor(), "service thread started");

    for command in commands {
        if !shared.alive.load(Ordering::SeqCst) {
            break;
        }
        match command {
            Command::Transact {
                call_id,
                code,
                data,
                flags,
            } => {
                trace!(handle = %shared.id, %code, call_id, "serving transaction");
                let result = target.on_transact(code, &data, flags);
                if flags.is_oneway() {
                    if let Err(err) = result {
                        warn!(
                            handle = %shared.id,
                            %code,
                            error = %err,
                            "oneway transaction failed"
                        );
                    }
                    continue;
                }
                if let Some(waiter) = shared.take_waiter(call_id) {
                    let _ = waiter.send(result);
                }
            }
            Command::Stop => break,
        }
    }

    debug!(handle = %shared.id, "service thread stopped");
}

/// Submission side of a [`ServiceThread`]
pub struct ThreadHandle {
    shared: Arc<Shared>,
    commands: SyncSender<Command>,
}

impl ThreadHandle {
    /// Marks the service dead and asks the worker to exit, without waiting
    fn stop(&self) {
        self.shared.invalidate();
        // A full queue is fine: the worker checks liveness per command.
        let _ = self.commands.try_send(Command::Stop);
    }

    /// Queues a command, waiting while the queue is full
    ///
    /// Fails with `DeadObject` once the service stops, including while
    /// waiting for room.
    fn submit(&self, mut command: Command) -> Result<(), RemoteError> {
        loop {
            if !self.shared.alive.load(Ordering::SeqCst) {
                return Err(TransportError::DeadObject.into());
            }
            match self.commands.try_send(command) {
                Ok(()) => return Ok(()),
                Err(TrySendError::Full(returned)) => {
                    command = returned;
                    thread::sleep(QUEUE_FULL_BACKOFF);
                }
                Err(TrySendError::Disconnected(_)) => {
                    return Err(TransportError::DeadObject.into());
                }
            }
        }
    }
}

impl RemoteHandle for ThreadHandle {
    fn handle_id(&self) -> HandleId {
        self.shared.id
    }

    fn transact(
        &self,
        code: TransactionCode,
        data: &[u8],
        flags: TransactionFlags,
    ) -> Result<Vec<u8>, RemoteError> {
        let call_id = self.shared.next_call.fetch_add(1, Ordering::Relaxed);
        let command = Command::Transact {
            call_id,
            code,
            data: data.to_vec(),
            flags,
        };

        if flags.is_oneway() {
            self.submit(command)?;
            return Ok(Vec::new());
        }

        let reply = self.shared.register(call_id)?;
        if let Err(err) = self.submit(command) {
            self.shared.take_waiter(call_id);
            return Err(err);
        }
        reply
            .recv()
            .unwrap_or_else(|_| Err(TransportError::DeadObject.into()))
    }

    fn is_alive(&self) -> bool {
        self.shared.alive.load(Ordering::SeqCst)
    }

    fn link_to_death(&self, recipient: Arc<dyn DeathRecipient>) -> Result<(), RemoteError> {
        self.shared.deaths.link(recipient)
    }

    fn unlink_to_death(&self, recipient: &Arc<dyn DeathRecipient>) -> bool {
        self.shared.deaths.unlink(recipient)
    }
}

impl fmt::Debug for ThreadHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadHandle")
            .field("id", &self.shared.id)
            .field("alive", &self.is_alive())
            .finish()
    }
}

/// A stub hosted on its own thread
///
/// Dropping the service stops it without joining; [`shutdown`](Self::shutdown)
/// also waits for the worker to exit.
pub struct ServiceThread {
    handle: Arc<ThreadHandle>,
    worker: Option<JoinHandle<()>>,
}

impl ServiceThread {
    /// Starts a worker thread serving `target`
    pub fn spawn(
        target: Arc<dyn Transactable>,
        config: &IpcConfig,
    ) -> Result<Self, TransportError> {
        let shared = Arc::new(Shared {
            id: HandleId::new(),
            alive: AtomicBool::new(true),
            deaths: DeathRegistry::new(),
            next_call: AtomicU64::new(0),
            pending: Mutex::new(HashMap::new()),
        });
        let (commands, receiver) = mpsc::sync_channel(config.service_queue_depth);

        let worker_shared = shared.clone();
        let worker = thread::Builder::new()
            .name(config.thread_name.clone())
            .spawn(move || run(target, worker_shared, receiver))
            .map_err(|err| TransportError::Failed(err.to_string()))?;

        Ok(Self {
            handle: Arc::new(ThreadHandle { shared, commands }),
            worker: Some(worker),
        })
    }

    /// Handle for submitting transactions; clone it freely
    pub fn handle(&self) -> Arc<ThreadHandle> {
        self.handle.clone()
    }

    pub fn handle_id(&self) -> HandleId {
        self.handle.shared.id
    }

    /// Stops the service without waiting for the worker
    ///
    /// Calls blocked on a reply fail with `DeadObject` right away, even if
    /// the worker is stuck inside the implementation.
    pub fn stop(&self) {
        self.handle.stop();
    }

    /// Stops the service and waits for the worker to exit
    pub fn shutdown(mut self) {
        self.handle.stop();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!(handle = %self.handle_id(), "service thread exited by panic");
            }
        }
    }
}

impl Drop for ServiceThread {
    fn drop(&mut self) {
        if self.worker.is_some() {
            self.handle.stop();
        }
    }
}

impl fmt::Debug for ServiceThread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceThread")
            .field("handle", &self.handle)
            .field("joined", &self.worker.is_none())
            .finish()
    }
}
