//! Scriptable stand-in for the ffmpeg toolkit

use crate::error::ProcessingError;
use crate::video::{fast_start_path, MediaToolkit};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tubely_core::models::Geometry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProbeBehavior {
    Report(Geometry),
    Fail,
    NoStream,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RemuxBehavior {
    Copy,
    Fail,
    /// Writes part of the output and never finishes.
    Stall,
}

/// Reports a fixed geometry and "remuxes" by copying the input.
pub struct FakeToolkit {
    probe: ProbeBehavior,
    remux: RemuxBehavior,
    probes: AtomicUsize,
    remuxes: AtomicUsize,
    seen: Mutex<Vec<PathBuf>>,
}

impl FakeToolkit {
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_behavior(
            ProbeBehavior::Report(Geometry::new(width, height)),
            RemuxBehavior::Copy,
        )
    }

    /// Probe exits nonzero, like ffprobe on a truncated file.
    pub fn failing_probe() -> Self {
        Self::with_behavior(ProbeBehavior::Fail, RemuxBehavior::Copy)
    }

    /// Probe succeeds but finds no video stream.
    pub fn without_video_stream() -> Self {
        Self::with_behavior(ProbeBehavior::NoStream, RemuxBehavior::Copy)
    }

    pub fn failing_remux(width: u32, height: u32) -> Self {
        Self::with_behavior(
            ProbeBehavior::Report(Geometry::new(width, height)),
            RemuxBehavior::Fail,
        )
    }

    /// Remux starts writing its output and then hangs, like ffmpeg on a
    /// huge file when the request goes away.
    pub fn stalling_remux(width: u32, height: u32) -> Self {
        Self::with_behavior(
            ProbeBehavior::Report(Geometry::new(width, height)),
            RemuxBehavior::Stall,
        )
    }

    fn with_behavior(probe: ProbeBehavior, remux: RemuxBehavior) -> Self {
        Self {
            probe,
            remux,
            probes: AtomicUsize::new(0),
            remuxes: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    pub fn remux_count(&self) -> usize {
        self.remuxes.load(Ordering::SeqCst)
    }

    /// Every path handed to the toolkit, inputs and outputs.
    pub fn seen_paths(&self) -> Vec<PathBuf> {
        self.seen.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn record(&self, path: &Path) {
        self.seen
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(path.to_path_buf());
    }
}

#[async_trait]
impl MediaToolkit for FakeToolkit {
    async fn probe(&self, path: &Path) -> Result<Geometry, ProcessingError> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        self.record(path);

        match self.probe {
            ProbeBehavior::Report(geometry) => Ok(geometry),
            ProbeBehavior::Fail => Err(ProcessingError::ToolFailed {
                tool: "ffprobe",
                status: "exit status: 1".to_string(),
                stderr: "Invalid data found when processing input".to_string(),
            }),
            ProbeBehavior::NoStream => Err(ProcessingError::MalformedMedia(
                "no video stream found".to_string(),
            )),
        }
    }

    async fn remux_fast_start(&self, input: &Path) -> Result<PathBuf, ProcessingError> {
        self.remuxes.fetch_add(1, Ordering::SeqCst);
        let output = fast_start_path(input);
        self.record(&output);

        match self.remux {
            RemuxBehavior::Fail => Err(ProcessingError::ToolFailed {
                tool: "ffmpeg",
                status: "exit status: 1".to_string(),
                stderr: "moov atom not found".to_string(),
            }),
            RemuxBehavior::Stall => {
                tokio::fs::write(&output, b"partial")
                    .await
                    .map_err(|source| ProcessingError::Spawn {
                        tool: "ffmpeg",
                        source,
                    })?;
                std::future::pending().await
            }
            RemuxBehavior::Copy => {
                tokio::fs::copy(input, &output)
                    .await
                    .map_err(|source| ProcessingError::Spawn {
                        tool: "ffmpeg",
                        source,
                    })?;
                Ok(output)
            }
        }
    }
}
