//! Submission subsystem.
//!
//! # Data Flow
//! ```text
//! boundary adapter
//!     → RawSubmission (text fields + file, spooled to disk in chunks)
//!     → validator.rs (per-field checks, all errors collected)
//!     → ValidatedSubmission | FieldErrors
//! ```
//!
//! # Design Decisions
//! - Validation is pure: no I/O, the file is only checked for presence
//! - A ValidatedSubmission cannot be built outside this module
//! - ETA date and time are independently optional

pub mod spool;
pub mod types;
pub mod validator;

pub use spool::{SpooledUpload, Spooler, DEFAULT_CHUNK_SIZE};
pub use types::{
    fields, ErrorCode, FieldError, FieldErrors, FileUpload, RawSubmission, ValidatedSubmission,
};
pub use validator::validate;
