//! Object key generation.
//!
//! Key format: `{orientation}/{id}.{ext}` when an orientation is known,
//! `{id}.{ext}` otherwise. The id is drawn fresh for every upload so a new
//! upload for the same record never overwrites or collides with an earlier one.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use std::fmt::{Display, Formatter, Result as FmtResult};
use thiserror::Error;
use tubely_core::models::OrientationClass;
use tubely_core::AppError;

const ASSET_ID_BYTES: usize = 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("content type has no subtype: {0}")]
    MissingSubtype(String),

    #[error("invalid asset id: {0}")]
    InvalidId(String),
}

impl From<KeyError> for AppError {
    fn from(err: KeyError) -> Self {
        AppError::InvalidInput(err.to_string())
    }
}

/// Destination of an object, relative to the backend's root.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectKey(String);

impl ObjectKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ObjectKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for ObjectKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.0)
    }
}

/// 32 random bytes, URL-safe base64 without padding (43 characters).
pub fn generate_asset_id() -> String {
    let bytes: [u8; ASSET_ID_BYTES] = rand::random();
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Extension for a MIME type: the subtype without parameters, e.g. `video/mp4` -> `mp4`.
pub fn extension_for(content_type: &str) -> Result<String, KeyError> {
    let essence = content_type.split(';').next().unwrap_or("").trim();
    let subtype = essence
        .split_once('/')
        .map(|(_, subtype)| subtype.trim())
        .unwrap_or("");

    if subtype.is_empty()
        || !subtype
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.' || c == '+')
    {
        return Err(KeyError::MissingSubtype(content_type.to_string()));
    }

    Ok(subtype.to_ascii_lowercase())
}

/// Build the object key for an upload.
pub fn build_object_key(
    content_type: &str,
    asset_id: &str,
    orientation: Option<OrientationClass>,
) -> Result<ObjectKey, KeyError> {
    if asset_id.is_empty() || asset_id.contains('/') || asset_id.contains("..") {
        return Err(KeyError::InvalidId(asset_id.to_string()));
    }

    let extension = extension_for(content_type)?;
    let filename = format!("{}.{}", asset_id, extension);

    Ok(match orientation {
        Some(class) => ObjectKey(format!("{}/{}", class.as_prefix(), filename)),
        None => ObjectKey(filename),
    })
}

/// Join an optional backend prefix and a key.
pub(crate) fn with_prefix(prefix: Option<&str>, key: &str) -> String {
    match prefix {
        Some(prefix) if !prefix.is_empty() => format!("{}/{}", prefix.trim_matches('/'), key),
        _ => key.to_string(),
    }
}

/// Reject keys that could escape a backend root.
pub(crate) fn validate_key(key: &str) -> Result<(), KeyError> {
    if key.is_empty() || key.contains("..") || key.starts_with('/') || key.contains('\\') {
        return Err(KeyError::InvalidId(key.to_string()));
    }
    Ok(())
}
