use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tubely_core::models::Video;
use tubely_core::AppError;
use uuid::Uuid;

use super::video::VideoRepository;

/// Process-local store with the same last-writer-wins semantics as Postgres.
#[derive(Clone, Default)]
pub struct InMemoryVideoRepository {
    videos: Arc<RwLock<HashMap<Uuid, Video>>>,
    updates: Arc<RwLock<Vec<Uuid>>>,
}

impl InMemoryVideoRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, video: Video) {
        self.videos.write().await.insert(video.id, video);
    }

    /// Record ids in the order `update_video` calls reached the store.
    pub async fn update_log(&self) -> Vec<Uuid> {
        self.updates.read().await.clone()
    }
}

#[async_trait]
impl VideoRepository for InMemoryVideoRepository {
    async fn get_video(&self, id: Uuid) -> Result<Option<Video>, AppError> {
        Ok(self.videos.read().await.get(&id).cloned())
    }

    async fn update_video(&self, video: &Video) -> Result<(), AppError> {
        let mut videos = self.videos.write().await;
        match videos.get_mut(&video.id) {
            Some(existing) => {
                *existing = video.clone();
                self.updates.write().await.push(video.id);
                Ok(())
            }
            None => Err(AppError::NotFound(format!("Video {} not found", video.id))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tubely_core::models::AssetKind;

    #[tokio::test]
    async fn test_get_missing_video() {
        let repo = InMemoryVideoRepository::new();
        assert!(repo.get_video(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_overwrites_record() {
        let repo = InMemoryVideoRepository::new();
        let mut video = Video::new(Uuid::new_v4(), "boots");
        repo.insert(video.clone()).await;

        video.set_locator(AssetKind::Thumbnail, "http://localhost/a.png".to_string());
        repo.update_video(&video).await.unwrap();

        let stored = repo.get_video(video.id).await.unwrap().unwrap();
        assert_eq!(stored.thumbnail_url.as_deref(), Some("http://localhost/a.png"));
        assert_eq!(repo.update_log().await, vec![video.id]);
    }

    #[tokio::test]
    async fn test_update_unknown_video_is_not_found() {
        let repo = InMemoryVideoRepository::new();
        let video = Video::new(Uuid::new_v4(), "ghost");
        let err = repo.update_video(&video).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
