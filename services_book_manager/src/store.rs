//! In-memory book manager implementation

use crate::{Book, BookManager, ERROR_DUPLICATE_BOOK};
use ipc::Status;
use remote_ipc::RemoteError;
use std::sync::{Mutex, PoisonError};
use tracing::debug;

/// Ordered, mutex-guarded list of books
#[derive(Debug, Default)]
pub struct BookStore {
    books: Mutex<Vec<Book>>,
}

impl BookStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding `books`, in order
    pub fn with_books(books: impl IntoIterator<Item = Book>) -> Self {
        Self {
            books: Mutex::new(books.into_iter().collect()),
        }
    }

    pub fn len(&self) -> usize {
        self.books
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BookManager for BookStore {
    fn get_books(&self) -> Result<Vec<Book>, RemoteError> {
        Ok(self
            .books
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn add_book(&self, book: Option<Book>) -> Result<(), RemoteError> {
        let Some(book) = book else {
            debug!("ignoring null book");
            return Ok(());
        };
        if book.name.is_empty() {
            let status = Status::illegal_argument(format!("book {} has no name", book.id));
            return Err(status.into());
        }

        let mut books = self.books.lock().unwrap_or_else(PoisonError::into_inner);
        if books.iter().any(|b| b.id == book.id) {
            return Err(Status::service_specific(
                ERROR_DUPLICATE_BOOK,
                format!("book {} already exists", book.id),
            )
            .into());
        }
        debug!(id = book.id, name = %book.name, "adding book");
        books.push(book);
        Ok(())
    }
}
