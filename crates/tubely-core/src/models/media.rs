//! Media classification types shared by the ingestion pipeline.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use utoipa::ToSchema;

/// Which locator of a video record an upload targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Thumbnail,
    Video,
}

impl AssetKind {
    /// Multipart field carrying the file for this kind.
    pub fn form_field(&self) -> &'static str {
        match self {
            AssetKind::Thumbnail => "thumbnail",
            AssetKind::Video => "video",
        }
    }

    /// Only videos go through probing and fast-start remuxing.
    pub fn needs_transcode(&self) -> bool {
        matches!(self, AssetKind::Video)
    }
}

impl Display for AssetKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.form_field())
    }
}

/// Pixel dimensions of the first video stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Geometry {
    pub width: u32,
    pub height: u32,
}

impl Geometry {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Display for Geometry {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Coarse aspect bucket used to namespace video objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum OrientationClass {
    /// 16:9
    Landscape,
    /// 9:16
    Portrait,
    Other,
}

impl OrientationClass {
    /// Directory-like key prefix for objects in this bucket.
    pub fn as_prefix(&self) -> &'static str {
        match self {
            OrientationClass::Landscape => "landscape",
            OrientationClass::Portrait => "portrait",
            OrientationClass::Other => "other",
        }
    }

    /// Aspect label as reported to clients and logs.
    pub fn ratio_label(&self) -> &'static str {
        match self {
            OrientationClass::Landscape => "16:9",
            OrientationClass::Portrait => "9:16",
            OrientationClass::Other => "other",
        }
    }
}

impl Display for OrientationClass {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_prefix())
    }
}
