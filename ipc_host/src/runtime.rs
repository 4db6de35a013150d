//! # Host Runtime
//!
//! Hosts the book manager and runs client threads against it.

use core_types::HandleId;
use ipc::PoolStats;
use remote_ipc::{
    ConfigError, DeathRecipient, IpcConfig, ProtocolError, Proxy, RemoteError, RemoteHandle,
    ServiceThread, StubStats, TransportError,
};
use services_book_manager::{
    Book, BookManager, BookManagerProxy, BookManagerStub, BookStore, ERROR_DUPLICATE_BOOK,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Host runtime error types
#[derive(Debug, Error)]
pub enum HostRuntimeError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Remote call failed: {0}")]
    Remote(#[from] RemoteError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Client thread {0} panicked")]
    ClientPanicked(usize),
}

/// Host runtime configuration
#[derive(Debug, Clone)]
pub struct HostRuntimeConfig {
    /// Transport and pool settings
    pub ipc: IpcConfig,
    /// Books each client adds
    pub books_per_client: usize,
    /// Concurrent client threads
    pub clients: usize,
}

impl Default for HostRuntimeConfig {
    fn default() -> Self {
        Self {
            ipc: IpcConfig::default(),
            books_per_client: 3,
            clients: 2,
        }
    }
}

/// What a run did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostReport {
    /// Books listed after every client finished, in store order
    pub books: Vec<Book>,
    /// Duplicate adds the service refused
    pub duplicate_rejections: usize,
    /// Client-side parcel pool counters
    pub pool: PoolStats,
    /// Stub dispatch counters
    pub stub: StubStats,
    /// Whether the death notification arrived on shutdown
    pub service_died: bool,
}

#[derive(Default)]
struct ShutdownFlag(AtomicBool);

impl DeathRecipient for ShutdownFlag {
    fn binder_died(&self, handle: HandleId) {
        info!(%handle, "book manager died");
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Host runtime
pub struct HostRuntime {
    config: HostRuntimeConfig,
    stub: Arc<BookManagerStub>,
    service: ServiceThread,
    death: Arc<ShutdownFlag>,
}

impl HostRuntime {
    /// Validates the config and starts the service thread
    pub fn new(config: HostRuntimeConfig) -> Result<Self, HostRuntimeError> {
        config.ipc.validate()?;
        if config.clients == 0 {
            return Err(HostRuntimeError::InvalidArgument(
                "at least one client is required".to_string(),
            ));
        }
        // Ids are i32 on the wire
        let per_client = config.books_per_client.max(1);
        let total = config.clients.saturating_mul(per_client);
        if i32::try_from(total).is_err() {
            return Err(HostRuntimeError::InvalidArgument(format!(
                "{} books do not fit in i32 ids",
                total
            )));
        }

        let store: Arc<dyn BookManager> = Arc::new(BookStore::new());
        let pool = config.ipc.parcel_pool();
        let stub = Arc::new(BookManagerStub::new(store)?.with_pool(pool));
        let service = ServiceThread::spawn(stub.clone(), &config.ipc)?;

        let death = Arc::new(ShutdownFlag::default());
        service.handle().link_to_death(death.clone())?;
        info!(
            handle = %service.handle_id(),
            clients = config.clients,
            books_per_client = config.books_per_client,
            "book manager hosted"
        );

        Ok(Self {
            config,
            stub,
            service,
            death,
        })
    }

    /// Runs every client to completion, then shuts the service down
    pub fn run(self) -> Result<HostReport, HostRuntimeError> {
        let pool = self.config.ipc.parcel_pool();
        let per_client = self.config.books_per_client;

        let clients: Vec<_> = (0..self.config.clients)
            .map(|client| {
                let proxy = BookManagerProxy::with_pool(self.service.handle(), pool.clone());
                thread::spawn(move || run_client(&proxy, client, per_client))
            })
            .collect();

        let mut duplicate_rejections = 0;
        let mut first_error = None;
        for (client, worker) in clients.into_iter().enumerate() {
            match worker.join() {
                Ok(Ok(rejected)) => duplicate_rejections += rejected,
                Ok(Err(err)) => {
                    warn!(client, error = %err, "client failed");
                    if first_error.is_none() {
                        first_error = Some(HostRuntimeError::from(err));
                    }
                }
                Err(_) => {
                    if first_error.is_none() {
                        first_error = Some(HostRuntimeError::ClientPanicked(client));
                    }
                }
            }
        }
        if let Some(err) = first_error {
            self.service.shutdown();
            return Err(err);
        }

        let proxy = BookManagerProxy::with_pool(self.service.handle(), pool.clone());
        debug!(descriptor = %proxy.interface_descriptor(), "listing books");
        let books = proxy.get_books()?;
        drop(proxy);

        let stub = self.stub.stats();
        self.service.shutdown();

        Ok(HostReport {
            books,
            duplicate_rejections,
            pool: pool.stats(),
            stub,
            service_died: self.death.0.load(Ordering::SeqCst),
        })
    }
}

/// Adds this client's books, a null book and one duplicate
///
/// Returns how many adds were refused as duplicates.
fn run_client(
    proxy: &BookManagerProxy,
    client: usize,
    per_client: usize,
) -> Result<usize, RemoteError> {
    let base = client * per_client;
    for i in 0..per_client {
        let id = (base + i) as i32;
        let book = Book::new(id, format!("Client {} book {}", client, i));
        proxy.add_book(Some(book))?;
    }
    proxy.add_book(None)?;

    if per_client == 0 {
        return Ok(0);
    }
    match proxy.add_book(Some(Book::new(base as i32, "duplicate"))) {
        Ok(()) => Ok(0),
        Err(err) => {
            let code = err.status().map(|s| s.service_specific_error());
            if code == Some(ERROR_DUPLICATE_BOOK) {
                debug!(client, "duplicate refused");
                Ok(1)
            } else {
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_zero_clients() {
        let config = HostRuntimeConfig {
            clients: 0,
            ..HostRuntimeConfig::default()
        };
        assert!(matches!(
            HostRuntime::new(config),
            Err(HostRuntimeError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_rejects_invalid_ipc_config() {
        let config = HostRuntimeConfig {
            ipc: IpcConfig {
                service_queue_depth: 0,
                ..IpcConfig::default()
            },
            ..HostRuntimeConfig::default()
        };
        assert!(matches!(
            HostRuntime::new(config),
            Err(HostRuntimeError::Config(ConfigError::Invalid(_)))
        ));
    }

    #[test]
    fn test_default_run() {
        let report = HostRuntime::new(HostRuntimeConfig::default())
            .unwrap()
            .run()
            .unwrap();

        assert_eq!(report.books.len(), 6);
        assert_eq!(report.duplicate_rejections, 2);
        assert_eq!(report.pool.outstanding(), 0);
        assert!(report.service_died);
    }
}
