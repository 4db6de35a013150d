//! Resilience Test Utilities
//!
//! This crate provides shared utilities for resilience and integration tests.
//!
//! ## Test Philosophy
//!
//! - **Safety under faults**: every call returns, and returns the right kind
//!   of error, whatever the transport or the service does
//! - **Deterministic failures**: all injected faults are reproducible via
//!   `FaultPlan`
//! - **No buffer leaks**: scratch parcels are released exactly once on every
//!   path
//! - **No cross-talk**: concurrent callers each get their own reply

use core_types::HandleId;
use remote_ipc::{DeathRecipient, IpcConfig, RemoteError, ServiceThread};
use services_book_manager::{Book, BookManager, BookManagerStub, BookStore};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};

/// Bootstrap helper for tests
///
/// Hosts a book store holding `books` on its own service thread.
pub fn test_bootstrap(books: Vec<Book>) -> (Arc<BookStore>, ServiceThread) {
    let store = Arc::new(BookStore::with_books(books));
    let service = host(store.clone(), &IpcConfig::default());
    (store, service)
}

/// Hosts any book manager on a service thread
pub fn host(service: Arc<dyn BookManager>, config: &IpcConfig) -> ServiceThread {
    let stub = BookManagerStub::new(service).expect("Failed to build book manager stub");
    ServiceThread::spawn(Arc::new(stub), config).expect("Failed to spawn service thread")
}

/// `n` distinct books with ids `1..=n`
pub fn sample_books(n: i32) -> Vec<Book> {
    (1..=n)
        .map(|id| Book::new(id, format!("Book {}", id)))
        .collect()
}

/// Death recipient that counts notifications
#[derive(Debug, Default)]
pub struct DeathCounter {
    deaths: AtomicUsize,
    last: Mutex<Option<HandleId>>,
}

impl DeathCounter {
    pub fn count(&self) -> usize {
        self.deaths.load(Ordering::SeqCst)
    }

    pub fn last_handle(&self) -> Option<HandleId> {
        *self.last.lock().expect("death counter lock poisoned")
    }
}

impl DeathRecipient for DeathCounter {
    fn binder_died(&self, handle: HandleId) {
        self.deaths.fetch_add(1, Ordering::SeqCst);
        *self.last.lock().expect("death counter lock poisoned") = Some(handle);
    }
}

/// Book manager that blocks inside `get_books` until released
///
/// Used to hold a call in flight while the service is stopped.
pub struct StuckBookManager {
    entered: Mutex<Sender<()>>,
    release: Mutex<Receiver<()>>,
}

/// Test-side controls for a [`StuckBookManager`]
pub struct StuckControls {
    entered: Receiver<()>,
    release: Sender<()>,
}

impl StuckBookManager {
    pub fn new() -> (Arc<Self>, StuckControls) {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let manager = Arc::new(Self {
            entered: Mutex::new(entered_tx),
            release: Mutex::new(release_rx),
        });
        let controls = StuckControls {
            entered: entered_rx,
            release: release_tx,
        };
        (manager, controls)
    }
}

impl StuckControls {
    /// Blocks until a call is inside the implementation
    pub fn wait_entered(&self) {
        self.entered
            .recv()
            .expect("stuck book manager dropped before a call arrived");
    }

    /// Lets the call inside the implementation finish
    pub fn release(&self) {
        let _ = self.release.send(());
    }
}

impl BookManager for StuckBookManager {
    fn get_books(&self) -> Result<Vec<Book>, RemoteError> {
        let _ = self.entered.lock().expect("entered lock poisoned").send(());
        let _ = self.release.lock().expect("release lock poisoned").recv();
        Ok(Vec::new())
    }

    fn add_book(&self, _book: Option<Book>) -> Result<(), RemoteError> {
        Ok(())
    }
}
