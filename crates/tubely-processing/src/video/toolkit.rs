//! External media tools
//!
//! `ffprobe` and `ffmpeg` are run as child processes with a deadline. The
//! children are spawned with `kill_on_drop`, so a cancelled request or an
//! expired deadline also terminates the process.

use crate::error::ProcessingError;
use crate::video::probe::parse_probe_output;
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;
use tubely_core::models::Geometry;
use tubely_core::IngestConfig;

const STDERR_EXCERPT_BYTES: usize = 2048;

/// Inspection and container rewriting of staged videos.
#[async_trait]
pub trait MediaToolkit: Send + Sync {
    /// Dimensions of the first video stream.
    async fn probe(&self, path: &Path) -> Result<Geometry, ProcessingError>;

    /// Rewrite `input` with the `moov` atom up front and return the new file,
    /// always at [`fast_start_path`]. The input is left untouched.
    async fn remux_fast_start(&self, input: &Path) -> Result<PathBuf, ProcessingError>;
}

/// `<input>.processing`
pub fn fast_start_path(input: &Path) -> PathBuf {
    let mut derived = input.as_os_str().to_owned();
    derived.push(".processing");
    PathBuf::from(derived)
}

/// [`MediaToolkit`] backed by the ffmpeg binaries.
#[derive(Debug, Clone)]
pub struct FfmpegToolkit {
    ffmpeg_path: String,
    ffprobe_path: String,
    timeout: Duration,
}

impl FfmpegToolkit {
    pub fn new(ffmpeg_path: String, ffprobe_path: String, timeout: Duration) -> Self {
        Self {
            ffmpeg_path,
            ffprobe_path,
            timeout,
        }
    }

    pub fn from_config(config: &IngestConfig) -> Self {
        Self::new(
            config.ffmpeg_path.clone(),
            config.ffprobe_path.clone(),
            Duration::from_secs(config.process_timeout_secs),
        )
    }

    async fn run(
        &self,
        tool: &'static str,
        program: &str,
        args: Vec<OsString>,
    ) -> Result<Output, ProcessingError> {
        let child = Command::new(program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ProcessingError::Spawn { tool, source })?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|source| ProcessingError::Spawn { tool, source })?,
            Err(_) => {
                return Err(ProcessingError::TimedOut {
                    tool,
                    secs: self.timeout.as_secs(),
                })
            }
        };

        if !output.status.success() {
            return Err(ProcessingError::ToolFailed {
                tool,
                status: output.status.to_string(),
                stderr: stderr_excerpt(&output.stderr),
            });
        }

        Ok(output)
    }
}

fn stderr_excerpt(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let text = text.trim();
    if text.len() <= STDERR_EXCERPT_BYTES {
        return text.to_string();
    }
    let mut end = STDERR_EXCERPT_BYTES;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}

#[async_trait]
impl MediaToolkit for FfmpegToolkit {
    #[tracing::instrument(skip(self), fields(
        process.executable.name = "ffprobe",
        process.executable.path = %self.ffprobe_path,
        ffmpeg.operation = "probe"
    ))]
    async fn probe(&self, path: &Path) -> Result<Geometry, ProcessingError> {
        let start = std::time::Instant::now();

        let mut args: Vec<OsString> = [
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_streams",
            "-select_streams",
            "v:0",
        ]
        .iter()
        .map(OsString::from)
        .collect();
        args.push(path.as_os_str().to_owned());

        let output = self.run("ffprobe", &self.ffprobe_path, args).await?;
        let geometry = parse_probe_output(&output.stdout)?;

        tracing::info!(
            duration_ms = start.elapsed().as_millis() as u64,
            width = geometry.width,
            height = geometry.height,
            "Video probe completed"
        );

        Ok(geometry)
    }

    #[tracing::instrument(skip(self), fields(
        process.executable.name = "ffmpeg",
        process.executable.path = %self.ffmpeg_path,
        ffmpeg.operation = "faststart"
    ))]
    async fn remux_fast_start(&self, input: &Path) -> Result<PathBuf, ProcessingError> {
        let start = std::time::Instant::now();
        let output_path = fast_start_path(input);

        let args: Vec<OsString> = vec![
            "-y".into(),
            "-i".into(),
            input.as_os_str().to_owned(),
            "-c".into(),
            "copy".into(),
            "-movflags".into(),
            "faststart".into(),
            "-f".into(),
            "mp4".into(),
            output_path.as_os_str().to_owned(),
        ];

        if let Err(err) = self.run("ffmpeg", &self.ffmpeg_path, args).await {
            match tokio::fs::remove_file(&output_path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!(
                    path = %output_path.display(),
                    error = %e,
                    "Failed to remove partial fast-start output"
                ),
            }
            return Err(err);
        }

        tracing::info!(
            duration_ms = start.elapsed().as_millis() as u64,
            output = %output_path.display(),
            "Fast-start remux completed"
        );

        Ok(output_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fast_start_path_appends_suffix() {
        assert_eq!(
            fast_start_path(Path::new("/tmp/tubely-upload-abc.mp4")),
            PathBuf::from("/tmp/tubely-upload-abc.mp4.processing")
        );
    }

    #[test]
    fn test_stderr_excerpt_truncates() {
        let long = "e".repeat(STDERR_EXCERPT_BYTES + 10);
        let excerpt = stderr_excerpt(long.as_bytes());
        assert!(excerpt.ends_with("..."));
        assert_eq!(excerpt.len(), STDERR_EXCERPT_BYTES + 3);
        assert_eq!(stderr_excerpt(b"  short\n"), "short");
    }

    #[tokio::test]
    async fn test_missing_binary_is_spawn_error() {
        let toolkit = FfmpegToolkit::new(
            "/nonexistent/ffmpeg".to_string(),
            "/nonexistent/ffprobe".to_string(),
            Duration::from_secs(5),
        );
        let err = toolkit
            .probe(Path::new("/tmp/does-not-matter.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessingError::Spawn { tool: "ffprobe", .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_is_tool_failure_and_cleans_output() {
        let dir = tempfile::TempDir::new().unwrap();
        let input = dir.path().join("in.mp4");
        std::fs::write(&input, b"not a video").unwrap();
        // leftover partial output from the failed run must not survive
        std::fs::write(fast_start_path(&input), b"partial").unwrap();

        let toolkit = FfmpegToolkit::new(
            "false".to_string(),
            "false".to_string(),
            Duration::from_secs(5),
        );
        let err = toolkit.remux_fast_start(&input).await.unwrap_err();

        assert!(matches!(err, ProcessingError::ToolFailed { tool: "ffmpeg", .. }));
        assert!(!fast_start_path(&input).exists());
        assert!(input.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_deadline_kills_remux_and_cleans_output() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::TempDir::new().unwrap();
        let script = dir.path().join("slow-ffmpeg");
        std::fs::write(
            &script,
            "#!/bin/sh\nfor last; do :; done\necho partial > \"$last\"\nexec sleep 30\n",
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        let input = dir.path().join("in.mp4");
        std::fs::write(&input, b"not a video").unwrap();

        let toolkit = FfmpegToolkit::new(
            script.to_string_lossy().into_owned(),
            "false".to_string(),
            Duration::from_secs(1),
        );

        let start = std::time::Instant::now();
        let mut result = toolkit.remux_fast_start(&input).await;
        // A script written moments ago can still be busy (ETXTBSY) if another
        // test forked while it was open.
        for _ in 0..5 {
            let busy = matches!(
                &result,
                Err(ProcessingError::Spawn { source, .. }) if source.raw_os_error() == Some(26)
            );
            if !busy {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
            result = toolkit.remux_fast_start(&input).await;
        }

        let err = result.unwrap_err();
        assert!(matches!(
            err,
            ProcessingError::TimedOut {
                tool: "ffmpeg",
                secs: 1
            }
        ));
        assert!(start.elapsed() < Duration::from_secs(10));
        assert!(!fast_start_path(&input).exists());
        assert!(input.exists());
    }
}
