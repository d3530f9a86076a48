//! Board configuration module.
//!
//! Handles loading, validating, and merging `config.toml`. Stock defaults are
//! the base layer; a user `config.toml` in the config directory overrides
//! just the keys it names.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [compression]
//! max_edge = 1200           # Long edge of stored images, in pixels
//! quality = 80              # AVIF quality (1-100)
//! speed = 8                 # Encoder speed (1 = slowest/best, 10 = fastest)
//!
//! [gestures]
//! max_scale = 5.0           # Pinch zoom ceiling (floor is always 1)
//! double_tap_scale = 2.5    # Zoom level a double tap jumps to
//! double_tap_window_ms = 300
//!
//! [notices]
//! ttl_secs = 4              # How long an error notice stays up
//!
//! [storage]
//! root = "media"            # Object store directory
//! public_base_url = "http://localhost:8080/media"
//! database = "tablon.db"    # Metadata index
//!
//! [session]
//! prefs_path = "session.json"
//! passcode = ""             # Empty disables signing in
//!
//! [[categories]]
//! id = "campo"
//! name = "Campo"
//! icon = "🌾"
//! color = "green"
//! gradient = "from-lime-400 to-green-600"
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse. Tables merge key by key; arrays replace. Listing
//! any `[[categories]]` therefore replaces the whole stock category set.
//!
//! Relative paths in `[storage]` and `[session]` are resolved against the
//! config directory.
//!
//! Unknown keys are rejected to catch typos early.

use crate::gesture::GestureSettings;
use crate::imaging::{CompressParams, Quality, Speed};
use crate::types::Category;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Board configuration loaded from `config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BoardConfig {
    /// Upload compression (long-edge bound, AVIF quality).
    pub compression: CompressionConfig,
    /// Zoom limits and double-tap timing.
    pub gestures: GesturesConfig,
    /// Error notice lifetime.
    pub notices: NoticesConfig,
    /// Where blobs and the metadata index live.
    pub storage: StorageConfig,
    /// Session prefs file and sign-in passcode.
    pub session: SessionConfig,
    /// The fixed category set, in display order.
    pub categories: Vec<CategoryConfig>,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            compression: CompressionConfig::default(),
            gestures: GesturesConfig::default(),
            notices: NoticesConfig::default(),
            storage: StorageConfig::default(),
            session: SessionConfig::default(),
            categories: default_categories(),
        }
    }
}

impl BoardConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let c = &self.compression;
        if !(1..=100).contains(&c.quality) {
            return Err(ConfigError::Validation(
                "compression.quality must be 1-100".into(),
            ));
        }
        if !(1..=10).contains(&c.speed) {
            return Err(ConfigError::Validation(
                "compression.speed must be 1-10".into(),
            ));
        }
        if c.max_edge == 0 {
            return Err(ConfigError::Validation(
                "compression.max_edge must be non-zero".into(),
            ));
        }

        let g = &self.gestures;
        if !g.max_scale.is_finite() || g.max_scale <= 1.0 {
            return Err(ConfigError::Validation(
                "gestures.max_scale must be greater than 1".into(),
            ));
        }
        if !(g.double_tap_scale > 1.0 && g.double_tap_scale <= g.max_scale) {
            return Err(ConfigError::Validation(
                "gestures.double_tap_scale must be greater than 1 and at most max_scale".into(),
            ));
        }
        if g.double_tap_window_ms == 0 {
            return Err(ConfigError::Validation(
                "gestures.double_tap_window_ms must be non-zero".into(),
            ));
        }

        if self.notices.ttl_secs == 0 {
            return Err(ConfigError::Validation(
                "notices.ttl_secs must be non-zero".into(),
            ));
        }

        if self.categories.is_empty() {
            return Err(ConfigError::Validation(
                "at least one category is required".into(),
            ));
        }
        let mut seen = HashSet::new();
        for category in &self.categories {
            if category.id.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "category ids must not be empty".into(),
                ));
            }
            if !seen.insert(category.id.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate category id '{}'",
                    category.id
                )));
            }
        }
        Ok(())
    }

    /// The board's categories, all with empty image sequences.
    pub fn board_categories(&self) -> Vec<Category> {
        self.categories
            .iter()
            .map(|c| Category::new(&c.id, &c.name, &c.icon, &c.color, &c.gradient))
            .collect()
    }
}

/// Upload compression settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompressionConfig {
    /// Bound on the longer edge of stored images, in pixels.
    pub max_edge: u32,
    /// AVIF encoding quality (1 = worst, 100 = best).
    pub quality: u32,
    /// rav1e speed preset (1 = slowest, 10 = fastest).
    pub speed: u8,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            max_edge: 1200,
            quality: 80,
            speed: 8,
        }
    }
}

impl CompressionConfig {
    pub fn params(&self) -> CompressParams {
        CompressParams {
            max_edge: self.max_edge,
            quality: Quality::new(self.quality),
            speed: Speed::new(self.speed),
        }
    }
}

/// Gesture engine tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GesturesConfig {
    pub max_scale: f64,
    pub double_tap_scale: f64,
    pub double_tap_window_ms: u64,
}

impl Default for GesturesConfig {
    fn default() -> Self {
        Self {
            max_scale: 5.0,
            double_tap_scale: 2.5,
            double_tap_window_ms: 300,
        }
    }
}

impl GesturesConfig {
    pub fn settings(&self) -> GestureSettings {
        GestureSettings {
            max_scale: self.max_scale,
            double_tap_scale: self.double_tap_scale,
            double_tap_window: Duration::from_millis(self.double_tap_window_ms),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NoticesConfig {
    pub ttl_secs: u64,
}

impl Default for NoticesConfig {
    fn default() -> Self {
        Self { ttl_secs: 4 }
    }
}

impl NoticesConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Object store and metadata index locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// Directory holding stored blobs.
    pub root: String,
    /// URL prefix under which `root` is served.
    pub public_base_url: String,
    /// SQLite database file.
    pub database: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: "media".to_string(),
            public_base_url: "http://localhost:8080/media".to_string(),
            database: "tablon.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    pub prefs_path: String,
    /// Placeholder sign-in passcode. Empty disables signing in.
    pub passcode: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            prefs_path: "session.json".to_string(),
            passcode: String::new(),
        }
    }
}

/// One `[[categories]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CategoryConfig {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub gradient: String,
}

impl CategoryConfig {
    fn new(id: &str, name: &str, icon: &str, color: &str, gradient: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            icon: icon.to_string(),
            color: color.to_string(),
            gradient: gradient.to_string(),
        }
    }
}

fn default_categories() -> Vec<CategoryConfig> {
    vec![
        CategoryConfig::new("campo", "Campo", "🌾", "green", "from-lime-400 to-green-600"),
        CategoryConfig::new("eventos", "Eventos", "🎉", "violet", "from-fuchsia-400 to-violet-600"),
        CategoryConfig::new("avisos", "Avisos", "📢", "amber", "from-yellow-400 to-amber-600"),
        CategoryConfig::new("comunidad", "Comunidad", "🤝", "sky", "from-cyan-400 to-sky-600"),
    ]
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(BoardConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay (arrays included) replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `config.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if there is no `config.toml` in the directory.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join("config.toml");
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<BoardConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: BoardConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `config.toml` in the given directory.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(dir: &Path) -> Result<BoardConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(dir)?;
    let config = resolve_config(base, overlay)?;
    tracing::debug!(
        dir = %dir.display(),
        categories = config.categories.len(),
        "config loaded"
    );
    Ok(config)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Tablón Configuration
# ====================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Only the keys you list override the defaults.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Upload compression
# ---------------------------------------------------------------------------
[compression]
# Longer edge of stored images, in pixels. Smaller images are not upscaled.
max_edge = 1200

# AVIF encoding quality (1 = worst, 100 = best).
quality = 80

# Encoder speed preset (1 = slowest/smallest, 10 = fastest).
speed = 8

# ---------------------------------------------------------------------------
# Gestures
# ---------------------------------------------------------------------------
[gestures]
# Pinch zoom ceiling. The floor is always 1 (fit to screen).
max_scale = 5.0

# Zoom level a double tap on an unzoomed image jumps to.
double_tap_scale = 2.5

# Two taps closer together than this count as a double tap.
double_tap_window_ms = 300

# ---------------------------------------------------------------------------
# Notices
# ---------------------------------------------------------------------------
[notices]
# Seconds an error notice stays visible. Load failures stay until reload.
ttl_secs = 4

# ---------------------------------------------------------------------------
# Storage (relative paths resolve against the config directory)
# ---------------------------------------------------------------------------
[storage]
# Directory holding uploaded images.
root = "media"

# URL prefix under which the storage root is served.
public_base_url = "http://localhost:8080/media"

# SQLite file indexing uploaded images.
database = "tablon.db"

# ---------------------------------------------------------------------------
# Session
# ---------------------------------------------------------------------------
[session]
# Where the admin flag and theme are remembered.
prefs_path = "session.json"

# Passcode for `tablon login`. Leave empty to keep the board read-only.
passcode = ""

# ---------------------------------------------------------------------------
# Categories (listing any replaces the whole set)
# ---------------------------------------------------------------------------
[[categories]]
id = "campo"
name = "Campo"
icon = "🌾"
color = "green"
gradient = "from-lime-400 to-green-600"

[[categories]]
id = "eventos"
name = "Eventos"
icon = "🎉"
color = "violet"
gradient = "from-fuchsia-400 to-violet-600"

[[categories]]
id = "avisos"
name = "Avisos"
icon = "📢"
color = "amber"
gradient = "from-yellow-400 to-amber-600"

[[categories]]
id = "comunidad"
name = "Comunidad"
icon = "🤝"
color = "sky"
gradient = "from-cyan-400 to-sky-600"
"##
}
