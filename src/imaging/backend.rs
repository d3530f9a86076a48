//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the two operations every backend must
//! support: identify and encode. Uploads arrive as in-memory blobs, so both
//! operate on byte slices rather than paths.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), pure Rust and statically
//! linked into the binary.

use super::params::EncodeParams;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Could not decode image: {0}")]
    Decode(String),
    #[error("Encoding failed: {0}")]
    Encode(String),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Trait for image processing backends.
///
/// `Send + Sync` because the pipeline runs compression on the blocking pool.
pub trait ImageBackend: Send + Sync {
    /// Decode enough of the image to report its pixel dimensions.
    fn identify(&self, source: &[u8]) -> Result<Dimensions, BackendError>;

    /// Decode, resize to exactly `width`×`height`, and encode.
    fn encode(&self, params: &EncodeParams<'_>) -> Result<Vec<u8>, BackendError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Mock backend that records operations without executing them.
    /// Uses Mutex (not RefCell) so it is Sync and can cross into the blocking pool.
    #[derive(Default)]
    pub struct MockBackend {
        pub identify_results: Mutex<Vec<Dimensions>>,
        pub fail_decode: bool,
        pub operations: Mutex<Vec<RecordedOp>>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedOp {
        Identify(usize),
        Encode {
            source_len: usize,
            width: u32,
            height: u32,
            quality: u32,
        },
    }

    impl MockBackend {
        pub fn new() -> Self {
            Self::default()
        }

        /// Every identify returns `dims` (results are consumed last-first when
        /// several are queued, falling back to `dims` when the queue runs dry).
        pub fn with_dimensions(dims: Vec<Dimensions>) -> Self {
            Self {
                identify_results: Mutex::new(dims),
                ..Self::default()
            }
        }

        /// A backend that cannot decode anything.
        pub fn undecodable() -> Self {
            Self {
                fail_decode: true,
                ..Self::default()
            }
        }

        pub fn get_operations(&self) -> Vec<RecordedOp> {
            self.operations.lock().unwrap().clone()
        }
    }

    impl ImageBackend for MockBackend {
        fn identify(&self, source: &[u8]) -> Result<Dimensions, BackendError> {
            self.operations
                .lock()
                .unwrap()
                .push(RecordedOp::Identify(source.len()));

            if self.fail_decode {
                return Err(BackendError::Decode("mock cannot decode".to_string()));
            }

            let mut results = self.identify_results.lock().unwrap();
            Ok(match results.len() {
                0 => Dimensions {
                    width: 640,
                    height: 480,
                },
                1 => results[0],
                _ => results.pop().unwrap(),
            })
        }

        fn encode(&self, params: &EncodeParams<'_>) -> Result<Vec<u8>, BackendError> {
            self.operations.lock().unwrap().push(RecordedOp::Encode {
                source_len: params.source.len(),
                width: params.width,
                height: params.height,
                quality: params.quality.value(),
            });
            Ok(format!("avif:{}x{}", params.width, params.height).into_bytes())
        }
    }

    #[test]
    fn mock_records_identify() {
        let backend = MockBackend::with_dimensions(vec![Dimensions {
            width: 800,
            height: 600,
        }]);

        let result = backend.identify(b"jpeg bytes").unwrap();
        assert_eq!(result.width, 800);
        assert_eq!(result.height, 600);

        let ops = backend.get_operations();
        assert_eq!(ops, vec![RecordedOp::Identify(10)]);
    }

    #[test]
    fn mock_records_encode() {
        let backend = MockBackend::new();

        let bytes = backend
            .encode(&EncodeParams {
                source: b"raw",
                width: 800,
                height: 600,
                quality: super::super::params::Quality::new(80),
                speed: super::super::params::Speed::default(),
            })
            .unwrap();

        assert_eq!(bytes, b"avif:800x600");
        let ops = backend.get_operations();
        assert_eq!(ops.len(), 1);
        assert!(matches!(
            &ops[0],
            RecordedOp::Encode {
                width: 800,
                height: 600,
                quality: 80,
                ..
            }
        ));
    }

    #[test]
    fn undecodable_mock_fails_identify() {
        let backend = MockBackend::undecodable();
        assert!(matches!(
            backend.identify(b"???"),
            Err(BackendError::Decode(_))
        ));
    }
}
