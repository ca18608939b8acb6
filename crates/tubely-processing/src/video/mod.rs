//! Video inspection, classification and fast-start remuxing

pub mod orientation;
pub mod probe;
pub mod toolkit;

pub use orientation::classify;
pub use probe::parse_probe_output;
pub use toolkit::{fast_start_path, FfmpegToolkit, MediaToolkit};
