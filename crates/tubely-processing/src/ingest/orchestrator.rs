//! Ingestion orchestration: stage → probe/classify → remux → upload → update record.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::io::AsyncRead;
use tubely_core::models::{AssetKind, OrientationClass, Video};
use tubely_core::AppError;
use tubely_db::VideoRepository;
use tubely_storage::keys::extension_for;
use tubely_storage::{build_object_key, generate_asset_id, Storage};
use uuid::Uuid;

use super::policy::{normalize_content_type, IngestPolicy};
use crate::staging::{StagedFile, TempStagingStore};
use crate::video::{classify, fast_start_path, MediaToolkit};

/// One upload as handed over by the HTTP layer.
pub struct UploadRequest<R> {
    pub kind: AssetKind,
    /// Declared media type, parameters allowed
    pub content_type: String,
    pub body: R,
}

/// Runs a single upload through the pipeline.
///
/// Steps are strictly sequential and nothing is shared between runs; two
/// concurrent uploads for the same record both complete and the later
/// `update_video` wins.
pub struct IngestionOrchestrator {
    repository: Arc<dyn VideoRepository>,
    storage: Arc<dyn Storage>,
    toolkit: Arc<dyn MediaToolkit>,
    staging: TempStagingStore,
    policy: IngestPolicy,
}

impl IngestionOrchestrator {
    pub fn new(
        repository: Arc<dyn VideoRepository>,
        storage: Arc<dyn Storage>,
        toolkit: Arc<dyn MediaToolkit>,
        staging: TempStagingStore,
        policy: IngestPolicy,
    ) -> Self {
        Self {
            repository,
            storage,
            toolkit,
            staging,
            policy,
        }
    }

    /// Ingest `request` for the record `video_id` on behalf of `owner` and
    /// return the updated record.
    ///
    /// Ownership and content type are checked before the body is read. Staged
    /// files are released on every exit path, and the record's locator only
    /// changes after the object is stored.
    #[tracing::instrument(skip(self, request), fields(video_id = %video_id, kind = %request.kind))]
    pub async fn ingest<R>(
        &self,
        owner: Uuid,
        video_id: Uuid,
        request: UploadRequest<R>,
    ) -> Result<Video, AppError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let mut video = self
            .repository
            .get_video(video_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Video {} not found", video_id)))?;

        if !video.is_owned_by(owner) {
            tracing::debug!(owner = %owner, "Upload rejected: not the video owner");
            return Err(AppError::Unauthorized(
                "You do not own this video".to_string(),
            ));
        }

        let content_type = normalize_content_type(&request.content_type);
        if !self.policy.accepts(request.kind, &content_type) {
            return Err(AppError::InvalidInput(format!(
                "Unsupported content type '{}' for {}; allowed: {}",
                content_type,
                request.kind,
                self.policy.allowed_content_types(request.kind).join(", ")
            )));
        }

        let mut staged: Vec<StagedFile> = Vec::with_capacity(2);
        let result = self
            .run(&mut video, request.kind, &content_type, request.body, &mut staged)
            .await;

        for file in staged.iter_mut() {
            if let Err(e) = file.release().await {
                tracing::warn!(
                    path = %file.path().display(),
                    error = %e,
                    "Failed to release staged file"
                );
            }
        }

        result.map(|()| video)
    }

    async fn run<R>(
        &self,
        video: &mut Video,
        kind: AssetKind,
        content_type: &str,
        body: R,
        staged: &mut Vec<StagedFile>,
    ) -> Result<(), AppError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let suffix = format!(".{}", extension_for(content_type)?);
        let original = self
            .staging
            .stage(body, &suffix, self.policy.max_bytes(kind))
            .await?;
        let original_path = original.path().to_path_buf();
        staged.push(original);

        let (upload_path, orientation) = if kind.needs_transcode() {
            let (path, orientation) = self.prepare_video(original_path, staged).await?;
            (path, Some(orientation))
        } else {
            (original_path, None)
        };

        let key = build_object_key(content_type, &generate_asset_id(), orientation)?;
        let url = self
            .storage
            .put_file(key.as_str(), &upload_path, content_type)
            .await?;

        video.set_locator(kind, url.clone());

        if let Err(err) = self.repository.update_video(video).await {
            tracing::error!(
                video_id = %video.id,
                key = %key,
                error = %err,
                "Record update failed, removing uploaded object"
            );
            if let Err(e) = self.storage.delete(key.as_str()).await {
                tracing::warn!(key = %key, error = %e, "Failed to remove orphaned object");
            }
            return Err(err);
        }

        tracing::info!(
            video_id = %video.id,
            key = %key,
            url = %url,
            "Upload ingested"
        );

        Ok(())
    }

    /// Probe, classify and remux a staged video. The remuxed file is pushed
    /// onto `staged` before the remux starts so the caller releases it too.
    async fn prepare_video(
        &self,
        source: PathBuf,
        staged: &mut Vec<StagedFile>,
    ) -> Result<(PathBuf, OrientationClass), AppError> {
        let geometry = self.toolkit.probe(&source).await?;
        let orientation = classify(geometry, self.policy.orientation_tolerance_px);
        tracing::debug!(
            geometry = %geometry,
            orientation = %orientation,
            ratio = orientation.ratio_label(),
            "Video classified"
        );

        // Owned before ffmpeg starts writing, so a dropped request still
        // removes the partial output.
        let expected = fast_start_path(&source);
        staged.push(StagedFile::adopt(expected.clone()));

        let derived_path = self.toolkit.remux_fast_start(&source).await?;
        if derived_path != expected {
            staged.push(StagedFile::adopt(derived_path.clone()));
        }

        Ok((derived_path, orientation))
    }
}
