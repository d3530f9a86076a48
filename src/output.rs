//! CLI output formatting.
//!
//! # Output Format
//!
//! ## Board
//!
//! ```text
//! 001 🌾 Campo (2 images)
//!     #12 2026-10-18 09:30  http://localhost:8080/media/campo/4f1c….avif
//!     #9  2026-10-17 18:02  http://localhost:8080/media/campo/a0d2….avif
//! 002 🎉 Eventos (0 images)
//! ```
//!
//! ## Upload progress
//!
//! ```text
//! tractor.jpg → campo
//!     compressing
//!     uploading
//!     saving
//!     visible as #13
//! Uploaded 1 image
//! ```
//!
//! ## Gesture replay
//!
//! ```text
//! 001 start  scale 1.00  pan (0.0, 0.0)
//! 002 move   scale 2.00  pan (0.0, 0.0)
//! ```
//!
//! # Architecture
//!
//! Each output has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects.

use crate::board::Board;
use crate::gesture::Transform;
use crate::gesture::replay::ScriptStep;
use crate::pipeline::{BatchReport, UploadEvent, UploadStage};
use crate::session::SessionPrefs;
use crate::types::ImageRecord;

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

/// ```text
/// #12 2026-10-18 09:30  http://…/campo/4f1c.avif
/// ```
fn record_line(record: &ImageRecord) -> String {
    format!(
        "{:<4}{}  {}",
        format!("#{}", record.id),
        record.created_at.format("%Y-%m-%d %H:%M"),
        record.url
    )
}

// ============================================================================
// Board
// ============================================================================

/// Format every category with its images, newest first, followed by the
/// current notice if one is showing.
pub fn format_board(board: &Board) -> Vec<String> {
    let mut lines = Vec::new();
    for (i, category) in board.categories().iter().enumerate() {
        let label = if category.icon.is_empty() {
            category.name.clone()
        } else {
            format!("{} {}", category.icon, category.name)
        };
        lines.push(format!(
            "{} {} ({})",
            format_index(i + 1),
            label,
            plural(category.images.len(), "image")
        ));
        for record in &category.images {
            lines.push(format!("{}{}", indent(1), record_line(record)));
        }
    }
    if let Some(notice) = board.notice() {
        lines.push(String::new());
        lines.push(format!("Notice: {notice}"));
    }
    lines
}

pub fn print_board(board: &Board) {
    for line in format_board(board) {
        println!("{}", line);
    }
}

// ============================================================================
// Upload progress
// ============================================================================

/// Format a single upload stage transition as display lines.
pub fn format_upload_event(event: &UploadEvent) -> Vec<String> {
    let line = match &event.stage {
        UploadStage::Selected => return vec![format!("{} → {}", event.file, event.category)],
        UploadStage::Compressing => "compressing".to_string(),
        UploadStage::Uploading => "uploading".to_string(),
        UploadStage::PersistingMetadata => "saving".to_string(),
        UploadStage::Visible { id, .. } => format!("visible as #{id}"),
        UploadStage::Failed { reason } => format!("failed: {reason}"),
    };
    vec![format!("{}{}", indent(1), line)]
}

pub fn format_batch_report(report: &BatchReport) -> Vec<String> {
    let mut summary = format!("Uploaded {}", plural(report.uploaded.len(), "image"));
    if !report.failed.is_empty() {
        summary.push_str(&format!(", {} failed", report.failed.len()));
    }
    let mut lines = vec![summary];
    for failure in &report.failed {
        lines.push(format!("{}{}: {}", indent(1), failure.file, failure.error));
    }
    lines
}

pub fn print_batch_report(report: &BatchReport) {
    for line in format_batch_report(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Gesture replay
// ============================================================================

fn step_label(step: &ScriptStep) -> &'static str {
    match step {
        ScriptStep::Start { .. } => "start",
        ScriptStep::Move { .. } => "move",
        ScriptStep::End => "end",
        ScriptStep::Tap { .. } => "tap",
    }
}

/// Format the transform reached after each script step.
pub fn format_replay(steps: &[ScriptStep], transforms: &[Transform]) -> Vec<String> {
    steps
        .iter()
        .zip(transforms)
        .enumerate()
        .map(|(i, (step, transform))| {
            let pan = transform.pan();
            format!(
                "{} {:<6} scale {:.2}  pan ({:.1}, {:.1})",
                format_index(i + 1),
                step_label(step),
                transform.scale(),
                pan.x,
                pan.y
            )
        })
        .collect()
}

pub fn print_replay(steps: &[ScriptStep], transforms: &[Transform]) {
    for line in format_replay(steps, transforms) {
        println!("{}", line);
    }
}

// ============================================================================
// Session
// ============================================================================

pub fn format_session(prefs: &SessionPrefs) -> Vec<String> {
    vec![
        format!("Mode: {}", if prefs.admin { "editor" } else { "viewer" }),
        format!("Theme: {}", prefs.theme),
    ]
}

pub fn print_session(prefs: &SessionPrefs) {
    for line in format_session(prefs) {
        println!("{}", line);
    }
}
