use crate::error::ProcessingError;
use tubely_core::models::Geometry;

/// Geometry of the first stream in `ffprobe -print_format json -show_streams` output.
pub fn parse_probe_output(stdout: &[u8]) -> Result<Geometry, ProcessingError> {
    let probe_data: serde_json::Value = serde_json::from_slice(stdout)
        .map_err(|e| ProcessingError::UnparseableOutput(e.to_string()))?;

    let stream = probe_data["streams"]
        .get(0)
        .ok_or_else(|| ProcessingError::MalformedMedia("no video stream found".to_string()))?;

    let width = dimension(stream, "width")?;
    let height = dimension(stream, "height")?;

    Ok(Geometry::new(width, height))
}

fn dimension(stream: &serde_json::Value, field: &str) -> Result<u32, ProcessingError> {
    stream[field]
        .as_u64()
        .filter(|value| *value > 0)
        .and_then(|value| u32::try_from(value).ok())
        .ok_or_else(|| ProcessingError::MalformedMedia(format!("stream has no usable {}", field)))
}
