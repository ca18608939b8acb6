//! Tubely API Library
//!
//! HTTP surface of the ingestion service: authentication, upload handlers,
//! the JSON error envelope and application setup.

mod api_doc;
pub mod constants;
mod handlers;
pub mod setup;
mod telemetry;

// Public modules
pub mod auth;
pub mod error;
pub mod state;

// Re-exports
pub use error::{ErrorResponse, HttpAppError};
pub use state::AppState;
