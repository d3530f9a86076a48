//! # Tablón
//!
//! The core of a touch-driven community bulletin board. Neighbours browse
//! image notices grouped into a few fixed categories, pinch and double-tap to
//! read them, and admins post or take down images.
//!
//! # Architecture: Two Independent Cores
//!
//! ```text
//! touch input ─▶ gesture engine ─▶ Transform { scale, pan }      (sync, pure)
//!
//! picked file ─▶ compress ─▶ object store ─▶ metadata index ─▶ board
//!                (blocking)   (blob first)    (row second)     (swap sequence)
//! ```
//!
//! The gesture engine is synchronous and never blocks: it runs entirely inside
//! input dispatch. The pipeline is asynchronous, with a suspension point at
//! every round trip, but runs on a single-threaded loop so board updates are
//! run-to-completion.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`gesture`] | Pinch-zoom, pan, and double-tap state machine producing a clamped [`gesture::Transform`] |
//! | [`imaging`] | Decode, bound the long edge to 1200px, re-encode as AVIF |
//! | [`storage`] | Object store and metadata index traits, with filesystem, SQLite, and in-memory implementations |
//! | [`board`] | Categories and their image sequences, the upload flag, error notices, fetch tickets |
//! | [`pipeline`] | Upload, batch upload, remove, and initial fetch against the stores |
//! | [`session`] | Persisted admin flag and theme; the access level handed to the pipeline |
//! | [`config`] | `config.toml` loading, merging over stock defaults, and validation |
//! | [`types`] | Records shared by the board, the pipeline, and the stores |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Blob First, Row Second
//!
//! There is no transaction spanning the object store and the metadata index.
//! Uploads store the blob before inserting the row, and removals delete the
//! blob before the row. A crash in between leaves at most an orphaned blob,
//! never a row that points at nothing.
//!
//! ## Whole-Sequence Replacement
//!
//! A category's image sequence is never edited in place. Each successful
//! operation builds the next sequence from the current one and swaps it in by
//! category id, so a failed operation has nothing to undo.
//!
//! ## AVIF-Only Output
//!
//! Every stored image is AVIF, encoded by `rav1e` through the `image` crate.
//! One modern format keeps the object store uniform and the binary free of
//! system image libraries.

pub mod board;
pub mod config;
pub mod gesture;
pub mod imaging;
pub mod output;
pub mod pipeline;
pub mod session;
pub mod storage;
pub mod types;
