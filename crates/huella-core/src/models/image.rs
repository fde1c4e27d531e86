//! Image payloads flowing through the pipeline.

/// A raw upload as received from the caller. Request-scoped; discarded
/// after transformation or on validation failure.
#[derive(Debug, Clone)]
pub struct RawImage {
    pub data: Vec<u8>,
    pub content_type: String,
}

impl RawImage {
    pub fn new(data: Vec<u8>, content_type: impl Into<String>) -> Self {
        Self {
            data,
            content_type: content_type.into(),
        }
    }
}

/// The normalized output of the image codec: a full-size JPEG and a
/// thumbnail JPEG, both opaque RGB, derived from the same
/// orientation-corrected source so their aspect ratios match.
#[derive(Debug, Clone)]
pub struct TransformedImage {
    pub full: Vec<u8>,
    pub thumbnail: Vec<u8>,
    /// Dimensions of the full-size encoding after any downscale.
    pub width: u32,
    pub height: u32,
}
