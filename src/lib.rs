//! Upload relay library.
//!
//! Validates multipart form submissions and streams the uploaded file to a
//! pluggable downstream API client with bounded memory.

// Core subsystems
pub mod client;
pub mod config;
pub mod http;
pub mod relay;
pub mod submission;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use client::{ApiClient, ClientResolver};
pub use config::schema::RelayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use relay::{RelayOrchestrator, RelayOutcome, StreamingRelay};
pub use submission::{validate, RawSubmission, ValidatedSubmission};
