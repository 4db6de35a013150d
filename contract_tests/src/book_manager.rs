//! Book manager contract tests
//!
//! These tests define the stable wire contract for the book manager.

use core_types::InterfaceDescriptor;
use ipc::SchemaVersion;

// ===== Contract Version =====
pub const BOOK_MANAGER_CODEC_VERSION: SchemaVersion = SchemaVersion::new(1, 0);

// ===== Interface Descriptor =====
pub const BOOK_MANAGER_DESCRIPTOR: InterfaceDescriptor =
    InterfaceDescriptor::new("parcel_ipc.books.IBookManager");

// ===== Transaction Codes =====
pub const CODE_GET_BOOKS: u32 = 1;
pub const CODE_ADD_BOOK: u32 = 2;

// ===== Contract Tests =====
