//! Image codec: decode, orient, flatten, resize, thumbnail, encode.
//!
//! Raw uploads come in as arbitrary raster formats with arbitrary color
//! modes and EXIF rotations; everything leaves this module as a pair of
//! opaque-RGB JPEGs (full-size + thumbnail) derived from the same
//! orientation-corrected source. Output is deterministic for a given
//! input and configuration.

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, GenericImageView, Rgb, RgbImage};
use std::io::Cursor;
use thiserror::Error;

use huella_core::models::TransformedImage;

use crate::orientation::ImageOrientation;

/// Codec failures. All of these abort the submission that triggered them.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("image too large: {actual_bytes} bytes (limit {limit_bytes})")]
    Oversize {
        actual_bytes: usize,
        limit_bytes: usize,
    },

    #[error("unsupported image format")]
    UnsupportedFormat,

    #[error("corrupt image data: {0}")]
    Corrupt(String),

    #[error("failed to encode image: {0}")]
    Encode(String),
}

/// Normalizes raw uploads into [`TransformedImage`] pairs.
///
/// Configuration-only and read-only after construction; safe to share
/// across concurrent submissions.
#[derive(Clone, Debug)]
pub struct ImageCodec {
    max_size_bytes: usize,
    max_dimension: u32,
    thumbnail_dimension: u32,
    jpeg_quality: u8,
}

impl ImageCodec {
    pub fn new(
        max_size_bytes: usize,
        max_dimension: u32,
        thumbnail_dimension: u32,
        jpeg_quality: u8,
    ) -> Self {
        Self {
            max_size_bytes,
            max_dimension,
            thumbnail_dimension,
            jpeg_quality,
        }
    }

    pub fn from_config(config: &huella_core::Config) -> Self {
        Self::new(
            config.max_image_size_bytes,
            config.max_image_dimension,
            config.thumbnail_dimension,
            config.jpeg_quality,
        )
    }

    /// Check that `data` is within the size ceiling and decodes as a
    /// supported raster format, without producing any output.
    pub fn validate(&self, data: &[u8]) -> Result<(), CodecError> {
        self.check_size(data)?;
        self.decode(data)?;
        Ok(())
    }

    /// Transform a raw upload into a full-size + thumbnail JPEG pair.
    ///
    /// CPU-bound; callers on an async runtime should wrap this in
    /// `tokio::task::spawn_blocking`.
    pub fn transform(&self, data: &[u8]) -> Result<TransformedImage, CodecError> {
        self.check_size(data)?;

        let img = self.decode(data)?;
        let img = ImageOrientation::apply_exif_orientation(img, data);
        let rgb = flatten_to_rgb(img);

        let full = downscale_to_fit(rgb, self.max_dimension);
        let thumbnail = downscale_to_fit(full.clone(), self.thumbnail_dimension);

        let (width, height) = full.dimensions();
        let full_bytes = self.encode_jpeg(&full)?;
        let thumb_bytes = self.encode_jpeg(&thumbnail)?;

        tracing::debug!(
            width = width,
            height = height,
            full_bytes = full_bytes.len(),
            thumbnail_bytes = thumb_bytes.len(),
            "Image transformed"
        );

        Ok(TransformedImage {
            full: full_bytes,
            thumbnail: thumb_bytes,
            width,
            height,
        })
    }

    fn check_size(&self, data: &[u8]) -> Result<(), CodecError> {
        if data.len() > self.max_size_bytes {
            return Err(CodecError::Oversize {
                actual_bytes: data.len(),
                limit_bytes: self.max_size_bytes,
            });
        }
        Ok(())
    }

    fn decode(&self, data: &[u8]) -> Result<DynamicImage, CodecError> {
        let reader = image::ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|e| CodecError::Corrupt(e.to_string()))?;
        if reader.format().is_none() {
            return Err(CodecError::UnsupportedFormat);
        }
        reader
            .decode()
            .map_err(|e| CodecError::Corrupt(e.to_string()))
    }

    fn encode_jpeg(&self, img: &RgbImage) -> Result<Vec<u8>, CodecError> {
        let mut buffer = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(Cursor::new(&mut buffer), self.jpeg_quality);
        encoder
            .encode_image(img)
            .map_err(|e| CodecError::Encode(e.to_string()))?;
        Ok(buffer)
    }
}

/// Flatten any alpha or palette color mode to opaque RGB by compositing
/// onto a white background.
fn flatten_to_rgb(img: DynamicImage) -> RgbImage {
    match img {
        DynamicImage::ImageRgb8(rgb) => rgb,
        other => {
            let rgba = other.to_rgba8();
            let (width, height) = rgba.dimensions();
            let mut out = RgbImage::new(width, height);
            for (x, y, pixel) in rgba.enumerate_pixels() {
                let alpha = pixel[3] as u32;
                let blend = |c: u8| -> u8 {
                    ((c as u32 * alpha + 255 * (255 - alpha)) / 255) as u8
                };
                out.put_pixel(x, y, Rgb([blend(pixel[0]), blend(pixel[1]), blend(pixel[2])]));
            }
            out
        }
    }
}

/// Downscale so the longest side is at most `max_dimension`, preserving
/// aspect ratio with Lanczos resampling. Images already within the bound
/// are returned unchanged (never upscaled).
fn downscale_to_fit(img: RgbImage, max_dimension: u32) -> RgbImage {
    let (width, height) = img.dimensions();
    if width.max(height) <= max_dimension {
        return img;
    }
    DynamicImage::ImageRgb8(img)
        .resize(
            max_dimension,
            max_dimension,
            image::imageops::FilterType::Lanczos3,
        )
        .to_rgb8()
}
