//! Multi-touch gesture handling for the image viewer.
//!
//! | Piece | Role |
//! |---|---|
//! | [`Transform`] | Scale + pan with the unity-recenters invariant |
//! | [`engine`] | Pure transitions and the [`GestureEngine`] a view drives |
//! | [`replay`] | JSON gesture scripts, for the CLI and for reproducing bug reports |

pub mod engine;
pub mod replay;
mod transform;

pub use engine::{GestureEngine, GestureEvent, GestureSession, GestureSettings, TouchPoint, step};
pub use transform::{DEFAULT_MAX_SCALE, MIN_SCALE, Transform};
