use tubely_core::models::AssetKind;
use tubely_core::IngestConfig;

/// Per-kind acceptance rules: allowed content types and byte ceilings.
#[derive(Debug, Clone)]
pub struct IngestPolicy {
    pub max_video_bytes: u64,
    pub max_thumbnail_bytes: u64,
    pub video_content_types: Vec<String>,
    pub thumbnail_content_types: Vec<String>,
    pub orientation_tolerance_px: u32,
}

impl IngestPolicy {
    pub fn from_config(config: &IngestConfig) -> Self {
        Self {
            max_video_bytes: config.max_video_size_bytes,
            max_thumbnail_bytes: config.max_thumbnail_size_bytes,
            video_content_types: config.video_allowed_content_types.clone(),
            thumbnail_content_types: config.thumbnail_allowed_content_types.clone(),
            orientation_tolerance_px: config.orientation_tolerance_px,
        }
    }

    pub fn max_bytes(&self, kind: AssetKind) -> u64 {
        match kind {
            AssetKind::Thumbnail => self.max_thumbnail_bytes,
            AssetKind::Video => self.max_video_bytes,
        }
    }

    pub fn allowed_content_types(&self, kind: AssetKind) -> &[String] {
        match kind {
            AssetKind::Thumbnail => &self.thumbnail_content_types,
            AssetKind::Video => &self.video_content_types,
        }
    }

    /// `content_type` must already be normalized.
    pub fn accepts(&self, kind: AssetKind, content_type: &str) -> bool {
        self.allowed_content_types(kind)
            .iter()
            .any(|allowed| allowed == content_type)
    }
}

impl Default for IngestPolicy {
    fn default() -> Self {
        Self {
            max_video_bytes: 1 << 30,
            max_thumbnail_bytes: 10 << 20,
            video_content_types: vec!["video/mp4".to_string()],
            thumbnail_content_types: vec!["image/jpeg".to_string(), "image/png".to_string()],
            orientation_tolerance_px: 0,
        }
    }
}

/// Media type without parameters, lowercased: `Video/MP4; codecs=avc1` -> `video/mp4`.
pub fn normalize_content_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase()
}
