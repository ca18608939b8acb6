//! Upload ingestion

mod orchestrator;
mod policy;

pub use orchestrator::{IngestionOrchestrator, UploadRequest};
pub use policy::{normalize_content_type, IngestPolicy};
