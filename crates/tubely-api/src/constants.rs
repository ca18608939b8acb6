//! API constants

/// API base path prefix
pub const API_PREFIX: &str = "/api";

/// Headroom on top of the largest upload ceiling for multipart framing.
pub const MULTIPART_OVERHEAD_BYTES: u64 = 1024 * 1024;
