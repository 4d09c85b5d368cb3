//! Core data types for image preparation and vision inference.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Smallest JPEG quality accepted by [`ImageProfile`].
pub const MIN_QUALITY: u8 = 1;

/// Largest JPEG quality accepted by [`ImageProfile`].
pub const MAX_QUALITY: u8 = 100;

/// Size/quality bound applied to every image before it is sent upstream.
///
/// The longer side of an image is scaled down to `max_dimension` when it
/// exceeds it; the result is always re-encoded as JPEG at `quality`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageProfile {
    pub max_dimension: u32,
    pub quality: u8,
}

impl ImageProfile {
    /// Small payloads: 400px, quality 60.
    pub const fn compact() -> Self {
        Self {
            max_dimension: 400,
            quality: 60,
        }
    }

    /// Detail-preserving payloads: 1024px, quality 85.
    pub const fn high_fidelity() -> Self {
        Self {
            max_dimension: 1024,
            quality: 85,
        }
    }

    /// Build a profile, rejecting a zero dimension and clamping quality into 1..=100.
    pub fn new(max_dimension: u32, quality: u8) -> VisionResult<Self> {
        if max_dimension == 0 {
            return Err(VisionError::InvalidInput(
                "max dimension must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            max_dimension,
            quality: quality.clamp(MIN_QUALITY, MAX_QUALITY),
        })
    }

    /// Look up a named preset (`compact`, `high-fidelity`).
    pub fn named(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().replace('_', "-").as_str() {
            "compact" => Some(Self::compact()),
            "high-fidelity" | "hifi" => Some(Self::high_fidelity()),
            _ => None,
        }
    }
}

impl Default for ImageProfile {
    fn default() -> Self {
        Self::high_fidelity()
    }
}

/// A prepared image, owned by the single call that produced it.
#[derive(Debug, Clone)]
pub struct ImageArtifact {
    /// Size of the file as read from disk.
    pub source_bytes: usize,
    pub original_width: u32,
    pub original_height: u32,
    /// Dimensions after any downscaling.
    pub width: u32,
    pub height: u32,
    /// Re-encoded JPEG bytes.
    pub encoded: Vec<u8>,
    /// `encoded`, base64 (standard alphabet, padded).
    pub base64: String,
}

impl ImageArtifact {
    pub const MIME_TYPE: &'static str = "image/jpeg";

    /// Inline `data:` URI for the encoded image.
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", Self::MIME_TYPE, self.base64)
    }

    /// Whether preprocessing changed the image dimensions.
    pub fn was_resized(&self) -> bool {
        self.width != self.original_width || self.height != self.original_height
    }
}

/// Errors that can occur while preparing an image or querying the model.
#[derive(thiserror::Error, Debug)]
pub enum VisionError {
    #[error("Failed to read image {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("HTTP request to vision API failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("vision API returned {status} {reason}: {body}")]
    Status {
        status: u16,
        reason: String,
        body: String,
    },

    #[error("Malformed vision API response: {0}")]
    InvalidResponse(String),

    #[error("Background task failed: {0}")]
    Task(String),
}

/// Convenience result type.
pub type VisionResult<T> = Result<T, VisionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_profiles() {
        assert_eq!(ImageProfile::named("compact"), Some(ImageProfile::compact()));
        assert_eq!(
            ImageProfile::named("High_Fidelity"),
            Some(ImageProfile::high_fidelity())
        );
        assert_eq!(ImageProfile::named("huge"), None);
        assert_eq!(ImageProfile::default(), ImageProfile::high_fidelity());
    }

    #[test]
    fn test_profile_bounds() {
        assert!(ImageProfile::new(0, 80).is_err());
        assert_eq!(ImageProfile::new(512, 0).unwrap().quality, MIN_QUALITY);
        assert_eq!(ImageProfile::new(512, 200).unwrap().quality, MAX_QUALITY);
    }

    #[test]
    fn test_status_error_message_carries_body() {
        let err = VisionError::Status {
            status: 401,
            reason: "Unauthorized".to_string(),
            body: "{\"error\":\"bad key\"}".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("401 Unauthorized"));
        assert!(msg.contains("bad key"));
    }
}
