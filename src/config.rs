//! Service configuration.
//!
//! Handles loading, validating, and layering `showroom.toml`. Values resolve
//! in three layers, each overriding the one before:
//!
//! 1. stock defaults ([`AppConfig::default`])
//! 2. `showroom.toml` in the config directory, if present
//! 3. environment variables (see below)
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [images]
//! max_width = 1920          # Bounding box for stored uploads
//! max_height = 1440
//! quality = 92              # Lossy encode quality (1-100)
//! format = "jpeg"           # "jpeg" or "avif"
//! max_upload_mb = 15        # Per-file size limit
//! max_per_vehicle = 12      # Photo slots per vehicle
//!
//! [thumbnails]
//! width = 600
//! height = 450
//! quality = 85
//!
//! [cleaning]
//! crop_top = 0              # Pixels trimmed from each edge before resizing
//! crop_bottom = 60
//! crop_left = 0
//! crop_right = 0
//! full = [1920, 1440]
//! display = [1200, 900]
//! thumb = [300, 225]
//! quality_full = 92
//! quality_display = 88
//! quality_thumb = 80
//! derivatives = true
//! fetch_timeout_secs = 30   # Per-download limit for http(s) sources
//!
//! [import]
//! max_csv_mb = 5
//! preview_rows = 20
//! stock_prefix = "CMA"
//! ```
//!
//! ## Environment Overrides
//!
//! | Variable | Key |
//! |----------|-----|
//! | `IMAGE_MAX_WIDTH` | `images.max_width` |
//! | `IMAGE_MAX_HEIGHT` | `images.max_height` |
//! | `MAX_UPLOAD_MB` | `images.max_upload_mb` |
//! | `IMAGE_QUALITY` | `images.quality` |
//! | `THUMBNAIL_QUALITY` | `thumbnails.quality` |
//! | `CROP_TOP_PIXELS` | `cleaning.crop_top` |
//! | `CROP_BOTTOM_PIXELS` | `cleaning.crop_bottom` |
//! | `IMAGE_QUALITY_FULL` | `cleaning.quality_full` |
//! | `IMAGE_QUALITY_DISPLAY` | `cleaning.quality_display` |
//! | `IMAGE_QUALITY_THUMB` | `cleaning.quality_thumb` |
//!
//! Unknown keys in the file are rejected to catch typos early.

use crate::images::UploadConfig;
use crate::imaging::{
    BoxSize, CleanParams, CropMargins, OutputFormat, Quality, RenderParams, ThumbnailParams,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// File name looked up inside the config directory.
pub const CONFIG_FILE: &str = "showroom.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Upload processing and per-vehicle limits.
    pub images: ImagesConfig,
    pub thumbnails: ThumbnailsConfig,
    /// Branding removal and derivative sizes.
    pub cleaning: CleaningConfig,
    /// CSV import limits.
    pub import: ImportConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImagesConfig {
    pub max_width: u32,
    pub max_height: u32,
    pub quality: u32,
    pub format: OutputFormat,
    pub max_upload_mb: u32,
    pub max_per_vehicle: usize,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            max_width: 1920,
            max_height: 1440,
            quality: 92,
            format: OutputFormat::Jpeg,
            max_upload_mb: 15,
            max_per_vehicle: 12,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThumbnailsConfig {
    pub width: u32,
    pub height: u32,
    pub quality: u32,
}

impl Default for ThumbnailsConfig {
    fn default() -> Self {
        Self {
            width: 600,
            height: 450,
            quality: 85,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CleaningConfig {
    pub crop_top: u32,
    pub crop_bottom: u32,
    pub crop_left: u32,
    pub crop_right: u32,
    /// `[width, height]` bounding boxes.
    pub full: [u32; 2],
    pub display: [u32; 2],
    pub thumb: [u32; 2],
    pub quality_full: u32,
    pub quality_display: u32,
    pub quality_thumb: u32,
    /// Also produce `full`, `display` and `thumb` renditions.
    pub derivatives: bool,
    /// Limit for each remote source download, in seconds.
    pub fetch_timeout_secs: u64,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            crop_top: 0,
            crop_bottom: 60,
            crop_left: 0,
            crop_right: 0,
            full: [1920, 1440],
            display: [1200, 900],
            thumb: [300, 225],
            quality_full: 92,
            quality_display: 88,
            quality_thumb: 80,
            derivatives: true,
            fetch_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImportConfig {
    pub max_csv_mb: u32,
    /// How many accepted rows the preview lists.
    pub preview_rows: usize,
    /// Prefix for generated stock numbers.
    pub stock_prefix: String,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            max_csv_mb: 5,
            preview_rows: 20,
            stock_prefix: "CMA".to_string(),
        }
    }
}

fn check_quality(key: &str, value: u32) -> Result<(), ConfigError> {
    if !(1..=100).contains(&value) {
        return Err(ConfigError::Validation(format!("{key} must be 1-100")));
    }
    Ok(())
}

fn check_box(key: &str, [w, h]: [u32; 2]) -> Result<(), ConfigError> {
    if w == 0 || h == 0 {
        return Err(ConfigError::Validation(format!(
            "{key} dimensions must be non-zero"
        )));
    }
    Ok(())
}

fn check_at_least_one(key: &str, value: usize) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::Validation(format!("{key} must be at least 1")));
    }
    Ok(())
}

fn size(dims: [u32; 2]) -> BoxSize {
    BoxSize::new(dims[0], dims[1])
}

impl AppConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_quality("images.quality", self.images.quality)?;
        check_quality("thumbnails.quality", self.thumbnails.quality)?;
        check_quality("cleaning.quality_full", self.cleaning.quality_full)?;
        check_quality("cleaning.quality_display", self.cleaning.quality_display)?;
        check_quality("cleaning.quality_thumb", self.cleaning.quality_thumb)?;

        check_box("images", [self.images.max_width, self.images.max_height])?;
        check_box("thumbnails", [self.thumbnails.width, self.thumbnails.height])?;
        check_box("cleaning.full", self.cleaning.full)?;
        check_box("cleaning.display", self.cleaning.display)?;
        check_box("cleaning.thumb", self.cleaning.thumb)?;

        check_at_least_one("images.max_per_vehicle", self.images.max_per_vehicle)?;
        check_at_least_one("images.max_upload_mb", self.images.max_upload_mb as usize)?;
        check_at_least_one("import.preview_rows", self.import.preview_rows)?;
        check_at_least_one("import.max_csv_mb", self.import.max_csv_mb as usize)?;
        check_at_least_one(
            "cleaning.fetch_timeout_secs",
            self.cleaning.fetch_timeout_secs as usize,
        )?;
        Ok(())
    }

    /// Parameters for the upload pipeline.
    pub fn upload_config(&self) -> UploadConfig {
        UploadConfig {
            render: RenderParams {
                bounds: BoxSize::new(self.images.max_width, self.images.max_height),
                format: self.images.format,
                quality: Quality::new(self.images.quality),
            },
            thumbnail: ThumbnailParams {
                size: BoxSize::new(self.thumbnails.width, self.thumbnails.height),
                format: self.images.format,
                quality: Quality::new(self.thumbnails.quality),
            },
            max_upload_mb: self.images.max_upload_mb,
            max_per_vehicle: self.images.max_per_vehicle,
        }
    }

    /// Parameters for branding removal.
    pub fn clean_params(&self) -> CleanParams {
        let c = &self.cleaning;
        CleanParams {
            margins: CropMargins {
                top: c.crop_top,
                bottom: c.crop_bottom,
                left: c.crop_left,
                right: c.crop_right,
            },
            full: size(c.full),
            display: size(c.display),
            thumb: size(c.thumb),
            quality_full: Quality::new(c.quality_full),
            quality_display: Quality::new(c.quality_display),
            quality_thumb: Quality::new(c.quality_thumb),
            format: self.images.format,
            derivatives: c.derivatives,
        }
    }

    /// Per-request timeout for fetching remote cleaning sources.
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.cleaning.fetch_timeout_secs)
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Environment variable → `(section, key)` it overrides.
pub const ENV_OVERRIDES: &[(&str, &str, &str)] = &[
    ("IMAGE_MAX_WIDTH", "images", "max_width"),
    ("IMAGE_MAX_HEIGHT", "images", "max_height"),
    ("MAX_UPLOAD_MB", "images", "max_upload_mb"),
    ("IMAGE_QUALITY", "images", "quality"),
    ("THUMBNAIL_QUALITY", "thumbnails", "quality"),
    ("CROP_TOP_PIXELS", "cleaning", "crop_top"),
    ("CROP_BOTTOM_PIXELS", "cleaning", "crop_bottom"),
    ("IMAGE_QUALITY_FULL", "cleaning", "quality_full"),
    ("IMAGE_QUALITY_DISPLAY", "cleaning", "quality_display"),
    ("IMAGE_QUALITY_THUMB", "cleaning", "quality_thumb"),
];

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the base layer user overrides are merged on top of.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(AppConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
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

/// Build a sparse TOML table from whichever override variables `lookup` knows.
pub fn env_overlay(lookup: impl Fn(&str) -> Option<String>) -> Result<toml::Value, ConfigError> {
    let mut root = toml::Table::new();
    for (var, section, key) in ENV_OVERRIDES {
        let Some(raw) = lookup(var) else { continue };
        let value: i64 = raw.trim().parse().map_err(|_| {
            ConfigError::Validation(format!("{var} must be a non-negative integer, got '{raw}'"))
        })?;
        if value < 0 {
            return Err(ConfigError::Validation(format!(
                "{var} must be a non-negative integer, got '{raw}'"
            )));
        }
        if let toml::Value::Table(t) = root
            .entry(section.to_string())
            .or_insert(toml::Value::Table(toml::Table::new()))
        {
            t.insert(key.to_string(), toml::Value::Integer(value));
        }
    }
    Ok(toml::Value::Table(root))
}

/// Load `showroom.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join(CONFIG_FILE);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Layer the overlays onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    file: Option<toml::Value>,
    env: toml::Value,
) -> Result<AppConfig, ConfigError> {
    let merged = match file {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: AppConfig = merge_toml(merged, env).try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `showroom.toml` in `dir` plus the process environment.
pub fn load_config(dir: &Path) -> Result<AppConfig, ConfigError> {
    load_config_with(dir, |var| std::env::var(var).ok())
}

/// [`load_config`] with an injectable environment lookup.
pub fn load_config_with(
    dir: &Path,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<AppConfig, ConfigError> {
    resolve_config(stock_defaults_value()?, load_raw_config(dir)?, env_overlay(lookup)?)
}

/// Returns a fully-commented stock `showroom.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Showroom Configuration
# ======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Environment variables override this file:
#   IMAGE_MAX_WIDTH, IMAGE_MAX_HEIGHT, MAX_UPLOAD_MB, IMAGE_QUALITY,
#   THUMBNAIL_QUALITY, CROP_TOP_PIXELS, CROP_BOTTOM_PIXELS,
#   IMAGE_QUALITY_FULL, IMAGE_QUALITY_DISPLAY, IMAGE_QUALITY_THUMB
#
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Uploaded photos
# ---------------------------------------------------------------------------
[images]
# Stored uploads are scaled down (never up) to fit this box.
max_width = 1920
max_height = 1440

# Lossy encoding quality (1 = worst, 100 = best).
quality = 92

# Output encoding: "jpeg" or "avif".
format = "jpeg"

# Largest accepted upload, in megabytes.
max_upload_mb = 15

# Photo slots per vehicle. Batches that would overflow are rejected whole.
max_per_vehicle = 12

# ---------------------------------------------------------------------------
# Thumbnails
# ---------------------------------------------------------------------------
[thumbnails]
# Thumbnails fit within this box, aspect ratio preserved.
width = 600
height = 450
quality = 85

# ---------------------------------------------------------------------------
# Branding removal
# ---------------------------------------------------------------------------
[cleaning]
# Pixels trimmed from each edge. Each axis is capped at 20% of the image.
crop_top = 0
crop_bottom = 60
crop_left = 0
crop_right = 0

# Bounding boxes as [width, height].
full = [1920, 1440]
display = [1200, 900]
# Thumbnails are center-cropped to exactly this size.
thumb = [300, 225]

quality_full = 92
quality_display = 88
quality_thumb = 80

# Produce full/display/thumb renditions alongside the cleaned image.
derivatives = true

# Seconds allowed for downloading each http(s) source photo.
fetch_timeout_secs = 30

# ---------------------------------------------------------------------------
# CSV import
# ---------------------------------------------------------------------------
[import]
# Largest accepted CSV file, in megabytes.
max_csv_mb = 5

# Accepted rows listed in the preview.
preview_rows = 20

# Prefix for generated stock numbers (followed by six hex characters).
stock_prefix = "CMA"
"##
}
