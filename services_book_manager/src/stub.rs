//! Server side of the book manager interface

use crate::{Book, BookManager, DESCRIPTOR, TRANSACTION_ADD_BOOK, TRANSACTION_GET_BOOKS};
use core_types::{InterfaceDescriptor, TransactionCode, TransactionFlags};
use ipc::{ParcelPool, VersionPolicy};
use remote_ipc::{ProtocolError, RemoteError, Stub, StubStats, Transactable, TransactionTable};
use std::sync::{Arc, OnceLock};

/// Dispatch table shared by every book manager stub
pub fn transaction_table() -> Result<Arc<TransactionTable<dyn BookManager>>, ProtocolError> {
    static TABLE: OnceLock<Arc<TransactionTable<dyn BookManager>>> = OnceLock::new();
    if let Some(table) = TABLE.get() {
        return Ok(table.clone());
    }
    let table = Arc::new(
        TransactionTable::<dyn BookManager>::builder(DESCRIPTOR)
            .method(
                TRANSACTION_GET_BOOKS,
                "getBooks",
                |service, (): ()| service.get_books(),
            )
            .method(
                TRANSACTION_ADD_BOOK,
                "addBook",
                |service, book: Option<Book>| service.add_book(book),
            )
            .build()?,
    );
    Ok(TABLE.get_or_init(|| table).clone())
}

/// Serves any [`BookManager`] implementation to remote callers
#[derive(Debug)]
pub struct BookManagerStub {
    inner: Stub<dyn BookManager>,
}

impl BookManagerStub {
    pub fn new(service: Arc<dyn BookManager>) -> Result<Self, ProtocolError> {
        Ok(Self {
            inner: Stub::new(transaction_table()?, service),
        })
    }

    pub fn with_policy(mut self, policy: VersionPolicy) -> Self {
        self.inner = self.inner.with_policy(policy);
        self
    }

    pub fn with_pool(mut self, pool: Arc<ParcelPool>) -> Self {
        self.inner = self.inner.with_pool(pool);
        self
    }

    pub fn stats(&self) -> StubStats {
        self.inner.stats()
    }

    pub fn service(&self) -> &Arc<dyn BookManager> {
        self.inner.service()
    }
}

impl Transactable for BookManagerStub {
    fn descriptor(&self) -> InterfaceDescriptor {
        self.inner.descriptor()
    }

    fn on_transact(
        &self,
        code: TransactionCode,
        data: &[u8],
        flags: TransactionFlags,
    ) -> Result<Vec<u8>, RemoteError> {
        self.inner.on_transact(code, data, flags)
    }
}
