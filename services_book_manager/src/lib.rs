//! # Book Manager Service
//!
//! A small remote interface exposing a shared list of books. It is the
//! reference user of `remote_ipc`: the same [`BookManager`] trait is
//! implemented by the real [`BookStore`] and by [`BookManagerProxy`], so
//! callers cannot tell a local store from a remote one.
//!
//! ## Philosophy
//!
//! - **One trait, both sides**: the proxy and the implementation agree on
//!   the interface at compile time
//! - **Fixed wire contract**: the descriptor and codes below never change
//!   for this interface version
//!
//! ## Transactions
//!
//! ```text
//! GET_BOOKS  request: [token]                   reply: [exception][list<Book>]
//! ADD_BOOK   request: [token][flag][Book if 1]  reply: [exception]
//! ```

pub mod book;
pub mod proxy;
pub mod store;
pub mod stub;

pub use book::Book;
pub use proxy::BookManagerProxy;
pub use store::BookStore;
pub use stub::BookManagerStub;

use core_types::{InterfaceDescriptor, TransactionCode};
use remote_ipc::RemoteError;

/// Interface token written at the head of every request
pub const DESCRIPTOR: InterfaceDescriptor =
    InterfaceDescriptor::new("parcel_ipc.books.IBookManager");

/// `get_books()`
pub const TRANSACTION_GET_BOOKS: TransactionCode = TransactionCode::FIRST_CALL;

/// `add_book(book)`
pub const TRANSACTION_ADD_BOOK: TransactionCode = TransactionCode::nth_call(1);

/// Service-specific error: a book with the same id is already stored
pub const ERROR_DUPLICATE_BOOK: i32 = 1;

/// The book manager interface
pub trait BookManager: Send + Sync {
    /// All stored books, in insertion order
    fn get_books(&self) -> Result<Vec<Book>, RemoteError>;

    /// Stores a book; `None` is accepted and ignored
    fn add_book(&self, book: Option<Book>) -> Result<(), RemoteError>;
}
