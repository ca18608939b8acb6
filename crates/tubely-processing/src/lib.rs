//! Tubely media processing
//!
//! Everything between an accepted upload stream and a committed locator:
//! local staging, `ffprobe`/`ffmpeg` tooling, orientation classification and
//! the [`IngestionOrchestrator`] that sequences them.

pub mod error;
pub mod ingest;
pub mod staging;
pub mod test_helpers;
pub mod video;

pub use error::ProcessingError;
pub use ingest::{normalize_content_type, IngestPolicy, IngestionOrchestrator, UploadRequest};
pub use staging::{StagedFile, StagingError, TempStagingStore};
pub use video::{classify, fast_start_path, FfmpegToolkit, MediaToolkit};
