//! Relay subsystem.
//!
//! # Data Flow
//! ```text
//! RawSubmission
//!     → orchestrator.rs (validate, resolve client from current config)
//!     → ApiClient::send_data
//!     → streaming.rs (reuse or create the spool file → multipart POST)
//!     → RelayResponse
//!     → RelayOutcome (Completed | Rejected | TransportFailure)
//! ```
//!
//! # Design Decisions
//! - Validation must fully succeed before any transport attempt
//! - Non-success downstream statuses count as transport failures
//! - No retries: one submission, one attempt

pub mod orchestrator;
pub mod streaming;

pub use orchestrator::{RelayOrchestrator, RelayOutcome};
pub use streaming::{RelaySettings, StreamingRelay};
