use tubely_core::models::{Geometry, OrientationClass};

/// Bucket a frame size into an orientation.
///
/// Uses integer truncation: `width * 16 / 9 == height` is portrait, otherwise
/// `height * 16 / 9 == width` is landscape, anything else is `Other`. A nonzero
/// `tolerance_px` widens both tests to `|lhs - rhs| <= tolerance_px`.
pub fn classify(geometry: Geometry, tolerance_px: u32) -> OrientationClass {
    let width = u64::from(geometry.width);
    let height = u64::from(geometry.height);
    let tolerance = u64::from(tolerance_px);

    if (width * 16 / 9).abs_diff(height) <= tolerance {
        OrientationClass::Portrait
    } else if (height * 16 / 9).abs_diff(width) <= tolerance {
        OrientationClass::Landscape
    } else {
        OrientationClass::Other
    }
}
