//! Codec contract tests
//!
//! These tests pin the primitive layouts and the reply exception header that
//! every interface builds on.

use ipc::ExceptionCode;

// ===== Exception Codes =====
// These values are shared with every peer and MUST NOT CHANGE
pub const EXCEPTION_CODES: [(ExceptionCode, i32); 8] = [
    (ExceptionCode::Security, -1),
    (ExceptionCode::BadParcelable, -2),
    (ExceptionCode::IllegalArgument, -3),
    (ExceptionCode::NullPointer, -4),
    (ExceptionCode::IllegalState, -5),
    (ExceptionCode::UnsupportedOperation, -7),
    (ExceptionCode::ServiceSpecific, -8),
    (ExceptionCode::TransactionFailed, -129),
];
