//! HTTP boundary subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, limits, request ID, tracing)
//!     → upload.rs (multipart → RawSubmission, file left streaming)
//!     → RelayOrchestrator (current config snapshot)
//!     → response.rs (RelayOutcome → status + body)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;
pub mod upload;

pub use request::X_REQUEST_ID;
pub use server::{AppState, HttpServer};
pub use upload::{read_submission, UploadError};
