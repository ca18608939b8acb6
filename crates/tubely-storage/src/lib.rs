//! Tubely Storage Library
//!
//! Durable object storage for finalized uploads: the [`Storage`] trait, an S3
//! backend and a local filesystem backend.
//!
//! # Object key format
//!
//! Keys are built by the [`keys`] module from a fresh random identifier and the
//! media subtype:
//!
//! - **Videos**: `{orientation}/{id}.{ext}`, e.g. `landscape/Zx3...Q.mp4`
//! - **Thumbnails**: `{id}.{ext}`, e.g. `Zx3...Q.png`
//!
//! A backend may place every key under a configured prefix; the prefix is part
//! of the stored object's path and of its public URL. Keys must not contain
//! `..` or a leading `/`.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
pub use keys::{build_object_key, generate_asset_id, KeyError, ObjectKey};
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::{S3Location, S3Storage};
pub use traits::{Storage, StorageError, StorageResult};
pub use tubely_core::StorageBackend;
