//! Image compression for uploads: pure Rust, statically linked.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `ImageReader::into_dimensions`, `avif-parse` for AVIF |
//! | **Downscale** | `resize_exact` + Lanczos3, long edge bounded to 1200px |
//! | **Encode → AVIF** | rav1e encoder at quality 80 |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: High-level functions combining calculations + backend

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use calculations::{aspect_drift, bounded_dimensions};
pub use operations::{
    CompressedImage, OUTPUT_CONTENT_TYPE, OUTPUT_EXTENSION, compress, plan_compress,
};
pub use params::{CompressParams, EncodeParams, Quality, Speed};
pub use rust_backend::{RustBackend, identify_avif};
