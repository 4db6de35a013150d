//! Client side of the book manager interface

use crate::{Book, BookManager, DESCRIPTOR, TRANSACTION_ADD_BOOK, TRANSACTION_GET_BOOKS};
use core_types::InterfaceDescriptor;
use ipc::ParcelPool;
use remote_ipc::{Proxy, ProxyCore, RemoteError, RemoteHandle};
use std::sync::Arc;

/// Implements [`BookManager`] by calling a remote book manager
#[derive(Debug, Clone)]
pub struct BookManagerProxy {
    core: ProxyCore,
}

impl BookManagerProxy {
    pub fn new(handle: Arc<dyn RemoteHandle>) -> Self {
        Self {
            core: ProxyCore::new(handle, DESCRIPTOR),
        }
    }

    pub fn with_pool(handle: Arc<dyn RemoteHandle>, pool: Arc<ParcelPool>) -> Self {
        Self {
            core: ProxyCore::with_pool(handle, DESCRIPTOR, pool),
        }
    }

    pub fn pool(&self) -> &Arc<ParcelPool> {
        self.core.pool()
    }
}

impl BookManager for BookManagerProxy {
    fn get_books(&self) -> Result<Vec<Book>, RemoteError> {
        self.core.call(TRANSACTION_GET_BOOKS, |_| Ok(()))
    }

    fn add_book(&self, book: Option<Book>) -> Result<(), RemoteError> {
        let book = book.as_ref();
        self.core
            .call(TRANSACTION_ADD_BOOK, |data| data.write_nullable(book))
    }
}

impl Proxy for BookManagerProxy {
    fn interface_descriptor(&self) -> InterfaceDescriptor {
        self.core.interface_descriptor()
    }

    fn as_handle(&self) -> &Arc<dyn RemoteHandle> {
        self.core.as_handle()
    }
}
