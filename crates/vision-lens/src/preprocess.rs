//! Image loading, bounded downscaling and JPEG re-encoding.

use std::io::Cursor;
use std::path::Path;

use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};

use crate::types::{ImageArtifact, ImageProfile, VisionError, VisionResult};

/// Read an image from disk and prepare it for inline transport.
///
/// The file read is async; decode, resize and encode run on the blocking pool
/// so the caller's runtime keeps serving other requests. Nothing is cached:
/// every call re-reads and re-encodes.
pub async fn prepare_file(path: &Path, profile: ImageProfile) -> VisionResult<ImageArtifact> {
    let bytes = tokio::fs::read(path).await.map_err(|source| VisionError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    tokio::task::spawn_blocking(move || prepare_bytes(&bytes, &profile))
        .await
        .map_err(|e| VisionError::Task(e.to_string()))?
}

/// Decode `bytes`, bound the dimensions to the profile and re-encode as JPEG.
pub fn prepare_bytes(bytes: &[u8], profile: &ImageProfile) -> VisionResult<ImageArtifact> {
    let img = image::load_from_memory(bytes)?;
    let (original_width, original_height) = img.dimensions();
    let (width, height) =
        target_dimensions(original_width, original_height, profile.max_dimension);

    let resized = if (width, height) != (original_width, original_height) {
        tracing::debug!("Downscaling {original_width}x{original_height} to {width}x{height}");
        img.resize_exact(width, height, FilterType::Lanczos3)
    } else {
        img
    };

    let encoded = encode_jpeg(&resized, profile.quality)?;
    let base64 = base64::engine::general_purpose::STANDARD.encode(&encoded);

    Ok(ImageArtifact {
        source_bytes: bytes.len(),
        original_width,
        original_height,
        width,
        height,
        encoded,
        base64,
    })
}

/// Scale `(width, height)` so the longer side equals `max_dimension`,
/// preserving aspect ratio. Images already within bounds are unchanged.
pub fn target_dimensions(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    let longest = width.max(height);
    if longest <= max_dimension || max_dimension == 0 {
        return (width, height);
    }

    let scale = |side: u32| -> u32 {
        let scaled = (u64::from(side) * u64::from(max_dimension) + u64::from(longest) / 2)
            / u64::from(longest);
        (scaled as u32).clamp(1, max_dimension)
    };

    if width >= height {
        (max_dimension, scale(height))
    } else {
        (scale(width), max_dimension)
    }
}

/// Encode as baseline JPEG. Alpha is dropped since JPEG cannot carry it.
pub fn encode_jpeg(img: &DynamicImage, quality: u8) -> VisionResult<Vec<u8>> {
    let rgb = img.to_rgb8();
    let mut buf = Vec::new();
    let mut cursor = Cursor::new(&mut buf);
    let encoder = JpegEncoder::new_with_quality(&mut cursor, quality);
    rgb.write_with_encoder(encoder)?;
    Ok(buf)
}
