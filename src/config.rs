//! Editor configuration.
//!
//! Every field has a default, so a missing file or a partial file is fine:
//!
//! ```toml
//! export_dir = "exports"
//!
//! [layout]
//! x_range = [100.0, 800.0]
//! y_range = [100.0, 500.0]
//! palette = ["#FF4136", "#2ECC40"]
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// Where and how new nodes are placed on the canvas.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Horizontal range `[min, max]` for random placement.
    pub x_range: [f64; 2],
    /// Vertical range `[min, max]` for random placement.
    pub y_range: [f64; 2],
    /// Colours assigned at random to new nodes.
    pub palette: Vec<String>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            x_range: [100.0, 800.0],
            y_range: [100.0, 500.0],
            palette: ["#FF4136", "#2ECC40", "#0074D9", "#FF851B", "#B10DC9"]
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }
}

impl LayoutConfig {
    /// Check that both ranges are finite and non-empty and that the palette has a colour.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidRange`] or [`ConfigError::EmptyPalette`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (axis, [min, max]) in [("x_range", self.x_range), ("y_range", self.y_range)] {
            if !(min.is_finite() && max.is_finite() && min < max) {
                return Err(ConfigError::InvalidRange { axis, min, max });
            }
        }
        if self.palette.is_empty() {
            return Err(ConfigError::EmptyPalette);
        }
        Ok(())
    }
}

/// Top-level configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Node placement settings.
    pub layout: LayoutConfig,
    /// Directory that receives exported snapshots.
    pub export_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            layout: LayoutConfig::default(),
            export_dir: PathBuf::from("."),
        }
    }
}

impl Config {
    /// Parse and validate a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for invalid TOML and the errors of
    /// [`LayoutConfig::validate`] for unusable values. `origin` is only used in
    /// error messages.
    pub fn from_toml(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;
        config.layout.validate()?;
        Ok(config)
    }

    /// Load the configuration at `path`, or the defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when an existing file cannot be read, and the
    /// errors of [`Config::from_toml`] otherwise.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(text) => {
                tracing::debug!(path = %path.display(), "loading configuration");
                Self::from_toml(&text, path)
            }
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no configuration file; using defaults");
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}
