use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::media::AssetKind;

/// Video record owned by the metadata store.
///
/// The ingestion pipeline only reads it to check ownership and writes back
/// one of the locator fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Video {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
    pub video_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Video {
    pub fn new(user_id: Uuid, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            title: title.into(),
            description: None,
            thumbnail_url: None,
            video_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.user_id == user_id
    }

    pub fn locator(&self, kind: AssetKind) -> Option<&str> {
        match kind {
            AssetKind::Thumbnail => self.thumbnail_url.as_deref(),
            AssetKind::Video => self.video_url.as_deref(),
        }
    }

    /// Point the locator for `kind` at `url` and bump `updated_at`.
    pub fn set_locator(&mut self, kind: AssetKind, url: String) {
        match kind {
            AssetKind::Thumbnail => self.thumbnail_url = Some(url),
            AssetKind::Video => self.video_url = Some(url),
        }
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VideoResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
    pub video_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Video> for VideoResponse {
    fn from(video: Video) -> Self {
        Self {
            id: video.id,
            user_id: video.user_id,
            title: video.title,
            description: video.description,
            thumbnail_url: video.thumbnail_url,
            video_url: video.video_url,
            created_at: video.created_at,
            updated_at: video.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_locator_touches_only_target_field() {
        let mut video = Video::new(Uuid::new_v4(), "boots");
        let before = video.updated_at;

        video.set_locator(AssetKind::Video, "https://cdn.example.com/a.mp4".to_string());

        assert_eq!(
            video.locator(AssetKind::Video),
            Some("https://cdn.example.com/a.mp4")
        );
        assert_eq!(video.locator(AssetKind::Thumbnail), None);
        assert!(video.updated_at >= before);
    }

    #[test]
    fn test_ownership() {
        let owner = Uuid::new_v4();
        let video = Video::new(owner, "boots");
        assert!(video.is_owned_by(owner));
        assert!(!video.is_owned_by(Uuid::new_v4()));
    }
}
