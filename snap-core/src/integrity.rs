//! Integrity: final assembly checks (declared size, JPEG marker, decode) and photo digest.

use std::fmt;

use image::{GenericImageView, ImageFormat};
use sha2::{Digest, Sha256};

use crate::config::Config;

/// JPEG start-of-image marker followed by the first segment's marker byte.
pub const JPEG_MARKER: [u8; 3] = [0xFF, 0xD8, 0xFF];

/// SHA-256 of the assembled photo.
pub fn hash_photo(bytes: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hasher.finalize().into()
}

/// `Some(true|false)` for buffers of at least three bytes, `None` when too short to tell.
pub fn has_jpeg_marker(bytes: &[u8]) -> Option<bool> {
    bytes.get(..JPEG_MARKER.len()).map(|head| head == JPEG_MARKER)
}

/// Non-fatal findings of the final checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssemblyWarning {
    SizeMismatch { expected: u64, received: u64 },
    MissingMarker { header: [u8; 3] },
}

impl fmt::Display for AssemblyWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssemblyWarning::SizeMismatch { expected, received } => {
                write!(f, "expected {expected} bytes but received {received}")
            }
            AssemblyWarning::MissingMarker { header } => write!(
                f,
                "invalid JPEG header {:02X} {:02X} {:02X}",
                header[0], header[1], header[2]
            ),
        }
    }
}

/// Why a transfer produced no photo.
#[derive(Debug, thiserror::Error)]
pub enum AssemblyError {
    #[error("decode failed")]
    DecodeFailed(#[source] image::ImageError),
    #[error("size mismatch: expected {expected} bytes, received {received}")]
    SizeMismatch { expected: u64, received: u64 },
    #[error("missing JPEG start-of-image marker")]
    MissingMarker,
    #[error("photo exceeds {limit} bytes")]
    TooLarge { limit: u64 },
}

/// A verified photo. Produced once per successful transfer; the receiver keeps no copy.
#[derive(Debug, Clone)]
pub struct AssembledPhoto {
    bytes: Vec<u8>,
    width: u32,
    height: u32,
    format: Option<ImageFormat>,
    digest: [u8; 32],
}

impl AssembledPhoto {
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn format(&self) -> Option<ImageFormat> {
        self.format
    }

    /// MIME type for uploading, falling back to JPEG (what the camera sends).
    pub fn mime_type(&self) -> &'static str {
        match self.format {
            Some(ImageFormat::Png) => "image/png",
            _ => "image/jpeg",
        }
    }

    /// File extension matching `mime_type`.
    pub fn extension(&self) -> &'static str {
        match self.format {
            Some(ImageFormat::Png) => "png",
            _ => "jpg",
        }
    }

    pub fn digest(&self) -> [u8; 32] {
        self.digest
    }

    pub fn digest_hex(&self) -> String {
        self.digest.iter().map(|b| format!("{b:02x}")).collect()
    }
}

/// Result of assembling one transfer. Warnings are reported on success and failure alike.
#[derive(Debug)]
pub struct Assembly {
    pub result: Result<AssembledPhoto, AssemblyError>,
    pub warnings: Vec<AssemblyWarning>,
}

/// Run the final checks over the concatenated chunks and decode the image.
pub fn assemble(bytes: Vec<u8>, expected_size: u64, config: &Config) -> Assembly {
    let mut warnings = Vec::new();
    let received = bytes.len() as u64;

    if expected_size > 0 && received != expected_size {
        tracing::warn!(
            event = "photo_size_mismatch",
            expected = expected_size,
            received
        );
        warnings.push(AssemblyWarning::SizeMismatch {
            expected: expected_size,
            received,
        });
        if config.strict_size {
            return Assembly {
                result: Err(AssemblyError::SizeMismatch {
                    expected: expected_size,
                    received,
                }),
                warnings,
            };
        }
    }

    if has_jpeg_marker(&bytes) == Some(false) {
        let header = [bytes[0], bytes[1], bytes[2]];
        tracing::warn!(
            event = "photo_header_invalid",
            header = format!("{:02X} {:02X} {:02X}", header[0], header[1], header[2])
        );
        warnings.push(AssemblyWarning::MissingMarker { header });
        if config.strict_marker {
            return Assembly {
                result: Err(AssemblyError::MissingMarker),
                warnings,
            };
        }
    }

    let result = match image::load_from_memory(&bytes) {
        Ok(img) => {
            let (width, height) = img.dimensions();
            Ok(AssembledPhoto {
                format: image::guess_format(&bytes).ok(),
                digest: hash_photo(&bytes),
                bytes,
                width,
                height,
            })
        }
        Err(e) => {
            tracing::warn!(event = "photo_decode_failed", error = %e, bytes = received);
            Err(AssemblyError::DecodeFailed(e))
        }
    };
    Assembly { result, warnings }
}
