//! Temp staging store
//!
//! An upload is spooled to a uniquely named local file before anything else
//! looks at it. The file belongs to exactly one pipeline run and is removed on
//! every exit path: explicitly through [`StagedFile::release`], or on drop as a
//! last resort.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tubely_core::AppError;

const COPY_BUFFER_BYTES: usize = 64 * 1024;

#[derive(Debug, Error)]
pub enum StagingError {
    #[error("upload exceeds the maximum size of {limit} bytes")]
    TooLarge { limit: u64 },

    #[error("failed to read upload stream: {0}")]
    Read(#[source] io::Error),

    #[error("staging I/O error: {0}")]
    Io(#[from] io::Error),
}

impl From<StagingError> for AppError {
    fn from(err: StagingError) -> Self {
        match err {
            StagingError::TooLarge { limit } => AppError::PayloadTooLarge(format!(
                "File exceeds the maximum size of {} bytes",
                limit
            )),
            StagingError::Read(e) => {
                AppError::InvalidInput(format!("Failed to read upload: {}", e))
            }
            StagingError::Io(e) => AppError::Internal(format!("Failed to stage upload: {}", e)),
        }
    }
}

/// Local file holding the bytes of an in-flight upload.
#[derive(Debug)]
pub struct StagedFile {
    path: PathBuf,
    released: bool,
}

impl StagedFile {
    /// Take ownership of an existing file; it is removed when released or dropped.
    pub fn adopt(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            released: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Reopen the staged bytes from the start.
    pub async fn open(&self) -> io::Result<tokio::fs::File> {
        tokio::fs::File::open(&self.path).await
    }

    pub async fn size_bytes(&self) -> io::Result<u64> {
        Ok(tokio::fs::metadata(&self.path).await?.len())
    }

    /// Remove the file. Calling this again does nothing.
    pub async fn release(&mut self) -> io::Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;

        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if !self.released {
            if let Err(e) = std::fs::remove_file(&self.path) {
                if e.kind() != io::ErrorKind::NotFound {
                    tracing::warn!(
                        path = %self.path.display(),
                        error = %e,
                        "Failed to remove staged file on drop"
                    );
                }
            }
        }
    }
}

/// Creates staged files in one directory.
#[derive(Debug, Clone)]
pub struct TempStagingStore {
    dir: PathBuf,
}

impl TempStagingStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Spool `reader` into a new staged file, reading at most `max_bytes`.
    ///
    /// Reading past the limit aborts with [`StagingError::TooLarge`]; the
    /// partial file is removed before returning on any failure.
    pub async fn stage<R>(
        &self,
        mut reader: R,
        suffix: &str,
        max_bytes: u64,
    ) -> Result<StagedFile, StagingError>
    where
        R: AsyncRead + Unpin + Send,
    {
        tokio::fs::create_dir_all(&self.dir).await?;

        let (std_file, path) = tempfile::Builder::new()
            .prefix("tubely-upload-")
            .suffix(suffix)
            .tempfile_in(&self.dir)?
            .keep()
            .map_err(|e| StagingError::Io(e.error))?;

        let mut staged = StagedFile::adopt(path);
        let mut file = tokio::fs::File::from_std(std_file);

        match copy_bounded(&mut reader, &mut file, max_bytes).await {
            Ok(size) => {
                tracing::debug!(
                    path = %staged.path().display(),
                    size_bytes = size,
                    "Upload staged"
                );
                Ok(staged)
            }
            Err(err) => {
                drop(file);
                if let Err(e) = staged.release().await {
                    tracing::warn!(error = %e, "Failed to remove partial staged file");
                }
                Err(err)
            }
        }
    }
}

async fn copy_bounded<R>(
    reader: &mut R,
    file: &mut tokio::fs::File,
    max_bytes: u64,
) -> Result<u64, StagingError>
where
    R: AsyncRead + Unpin + Send,
{
    let mut buf = vec![0u8; COPY_BUFFER_BYTES];
    let mut written: u64 = 0;

    loop {
        let n = reader.read(&mut buf).await.map_err(StagingError::Read)?;
        if n == 0 {
            break;
        }

        written += n as u64;
        if written > max_bytes {
            return Err(StagingError::TooLarge { limit: max_bytes });
        }

        file.write_all(&buf[..n]).await?;
    }

    file.flush().await?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tempfile::TempDir;
    use tokio::io::ReadBuf;

    fn dir_entries(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    /// Yields some bytes, then fails like a dropped client connection.
    struct BrokenReader {
        sent: bool,
    }

    impl AsyncRead for BrokenReader {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            if self.sent {
                Poll::Ready(Err(io::Error::new(
                    io::ErrorKind::ConnectionReset,
                    "client went away",
                )))
            } else {
                self.sent = true;
                buf.put_slice(b"partial");
                Poll::Ready(Ok(()))
            }
        }
    }

    #[tokio::test]
    async fn test_stage_writes_bytes_and_is_reopenable() {
        let dir = TempDir::new().unwrap();
        let store = TempStagingStore::new(dir.path());

        let staged = store.stage(&b"hello video"[..], ".mp4", 1024).await.unwrap();

        assert!(staged.path().starts_with(dir.path()));
        assert!(staged
            .path()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .ends_with(".mp4"));
        assert_eq!(staged.size_bytes().await.unwrap(), 11);

        let mut contents = String::new();
        staged
            .open()
            .await
            .unwrap()
            .read_to_string(&mut contents)
            .await
            .unwrap();
        assert_eq!(contents, "hello video");
    }

    #[tokio::test]
    async fn test_staged_names_are_unique() {
        let dir = TempDir::new().unwrap();
        let store = TempStagingStore::new(dir.path());

        let a = store.stage(&b"a"[..], ".png", 16).await.unwrap();
        let b = store.stage(&b"b"[..], ".png", 16).await.unwrap();
        assert_ne!(a.path(), b.path());
    }

    #[tokio::test]
    async fn test_limit_is_inclusive() {
        let dir = TempDir::new().unwrap();
        let store = TempStagingStore::new(dir.path());

        assert!(store.stage(&[0u8; 8][..], ".bin", 8).await.is_ok());
    }

    #[tokio::test]
    async fn test_oversized_upload_rejected_and_removed() {
        let dir = TempDir::new().unwrap();
        let store = TempStagingStore::new(dir.path());

        let err = store.stage(&[0u8; 9][..], ".bin", 8).await.unwrap_err();

        assert!(matches!(err, StagingError::TooLarge { limit: 8 }));
        assert!(matches!(AppError::from(err), AppError::PayloadTooLarge(_)));
        assert_eq!(dir_entries(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_read_failure_is_invalid_input_and_removed() {
        let dir = TempDir::new().unwrap();
        let store = TempStagingStore::new(dir.path());

        let err = store
            .stage(BrokenReader { sent: false }, ".mp4", 1024)
            .await
            .unwrap_err();

        assert!(matches!(err, StagingError::Read(_)));
        assert!(matches!(AppError::from(err), AppError::InvalidInput(_)));
        assert_eq!(dir_entries(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_release_twice_is_noop() {
        let dir = TempDir::new().unwrap();
        let store = TempStagingStore::new(dir.path());
        let mut staged = store.stage(&b"x"[..], ".mp4", 16).await.unwrap();
        let path = staged.path().to_path_buf();

        staged.release().await.unwrap();
        assert!(!path.exists());

        // A second release must not touch whatever now lives at the path.
        std::fs::write(&path, b"someone else").unwrap();
        staged.release().await.unwrap();
        assert!(path.exists());
        assert!(staged.is_released());
        drop(staged);
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_drop_removes_unreleased_file() {
        let dir = TempDir::new().unwrap();
        let store = TempStagingStore::new(dir.path());
        let staged = store.stage(&b"x"[..], ".png", 16).await.unwrap();
        let path = staged.path().to_path_buf();

        drop(staged);
        assert!(!path.exists());
    }
}
