pub mod media;
pub mod video;

pub use media::{AssetKind, Geometry, OrientationClass};
pub use video::{Video, VideoResponse};
