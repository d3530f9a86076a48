//! High-level image operations.
//!
//! These functions combine calculations with backend execution.
//! They take configuration, compute parameters, and call the backend.

use super::backend::{BackendError, ImageBackend};
use super::calculations::bounded_dimensions;
use super::params::{CompressParams, EncodeParams};

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// File extension of every compressed upload.
pub const OUTPUT_EXTENSION: &str = "avif";

/// Media type of every compressed upload.
pub const OUTPUT_CONTENT_TYPE: &str = "image/avif";

/// An upload after compression, ready for the object store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl CompressedImage {
    pub fn extension(&self) -> &'static str {
        OUTPUT_EXTENSION
    }

    pub fn content_type(&self) -> &'static str {
        OUTPUT_CONTENT_TYPE
    }
}

/// Plan the encode for a source of the given size without executing it.
///
/// Useful for testing parameter generation.
pub fn plan_compress<'a>(
    source: &'a [u8],
    original_dims: (u32, u32),
    params: &CompressParams,
) -> EncodeParams<'a> {
    let (width, height) = bounded_dimensions(original_dims, params.max_edge);
    EncodeParams {
        source,
        width,
        height,
        quality: params.quality,
        speed: params.speed,
    }
}

/// Compress a raw upload: decode, bound the long edge, re-encode.
///
/// Fails with [`BackendError::Decode`] when the input isn't a decodable image.
pub fn compress(
    backend: &impl ImageBackend,
    source: &[u8],
    params: &CompressParams,
) -> Result<CompressedImage> {
    let dims = backend.identify(source)?;
    let plan = plan_compress(source, (dims.width, dims.height), params);
    let bytes = backend.encode(&plan)?;

    tracing::debug!(
        from = %format!("{}x{}", dims.width, dims.height),
        to = %format!("{}x{}", plan.width, plan.height),
        bytes = bytes.len(),
        "compressed upload"
    );

    Ok(CompressedImage {
        bytes,
        width: plan.width,
        height: plan.height,
    })
}
