//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the high-level [`operations`](super::operations) module
//! (which decides the output size) and the [`backend`](super::backend)
//! (which does the actual pixel work). This separation allows swapping backends
//! (e.g. for testing with a mock) without changing operation logic.
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality (1–100, default 80). Clamped on construction.
//! - [`Speed`]: rav1e encoder speed (1–10, default 8). Clamped on construction.
//! - [`CompressParams`]: Bound on the long edge plus quality and speed for an upload.
//! - [`EncodeParams`]: Full specification for one encode: source bytes, target size, quality.

/// Quality setting for lossy image encoding (1-100).
///
/// Uploads use 80, i.e. 0.8 on a 0–1 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(80)
    }
}

/// AVIF encoder speed (1 = slowest/best, 10 = fastest).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Speed(pub u8);

impl Speed {
    pub fn new(value: u8) -> Self {
        Self(value.clamp(1, 10))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Speed {
    fn default() -> Self {
        Self(8)
    }
}

/// Settings applied to every uploaded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressParams {
    /// Longest allowed edge in pixels after downscaling.
    pub max_edge: u32,
    pub quality: Quality,
    pub speed: Speed,
}

impl Default for CompressParams {
    fn default() -> Self {
        Self {
            max_edge: 1200,
            quality: Quality::default(),
            speed: Speed::default(),
        }
    }
}

/// Parameters for a single decode → resize → encode pass.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeParams<'a> {
    pub source: &'a [u8],
    pub width: u32,
    pub height: u32,
    pub quality: Quality,
    pub speed: Speed,
}
