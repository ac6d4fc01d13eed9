use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_WORLD_WIDTH: i32 = 100;
pub const DEFAULT_WORLD_HEIGHT: i32 = 100;
pub const DEFAULT_CELL_WIDTH: i32 = 10;
pub const DEFAULT_CELL_HEIGHT: i32 = 10;

/// Grid configuration: world extent and nominal cell size, in world units.
///
/// A zero field means "unset" and resolves to its default. Missing fields in a
/// config file deserialize to the defaults as well.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub world_width: i32,
    pub world_height: i32,
    pub cell_width: i32,
    pub cell_height: i32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            world_width: DEFAULT_WORLD_WIDTH,
            world_height: DEFAULT_WORLD_HEIGHT,
            cell_width: DEFAULT_CELL_WIDTH,
            cell_height: DEFAULT_CELL_HEIGHT,
        }
    }
}

impl GridConfig {
    pub fn with_world_size(self, width: i32, height: i32) -> Self {
        Self {
            world_width: width,
            world_height: height,
            ..self
        }
    }

    pub fn with_cell_size(self, width: i32, height: i32) -> Self {
        Self {
            cell_width: width,
            cell_height: height,
            ..self
        }
    }

    /// Replace unset (zero) fields with defaults and reject negative ones.
    ///
    /// Also rejects layouts whose cell count, point table, or cell extents do
    /// not fit in `i32`.
    pub fn resolve(self) -> Result<Self, ConfigError> {
        let config = Self {
            world_width: resolve_field("world_width", self.world_width, DEFAULT_WORLD_WIDTH)?,
            world_height: resolve_field("world_height", self.world_height, DEFAULT_WORLD_HEIGHT)?,
            cell_width: resolve_field("cell_width", self.cell_width, DEFAULT_CELL_WIDTH)?,
            cell_height: resolve_field("cell_height", self.cell_height, DEFAULT_CELL_HEIGHT)?,
        };
        let (count_x, count_y) = (config.cell_count_x(), config.cell_count_y());
        fits("cell_width * cell_height", config.cell_width.checked_mul(config.cell_height))?;
        fits("cell_count_x * cell_width", count_x.checked_mul(config.cell_width))?;
        fits("cell_count_y * cell_height", count_y.checked_mul(config.cell_height))?;
        fits("cell_count_x * cell_count_y", count_x.checked_mul(count_y))?;
        Ok(config)
    }

    pub fn from_yaml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(s)?)
    }

    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(s)?)
    }

    /// Load a config file, picking the format from its extension.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let config = match ext.as_str() {
            "yaml" | "yml" => Self::from_yaml_str(&text)?,
            "json" => Self::from_json_str(&text)?,
            other => return Err(ConfigError::UnsupportedFormat(other.to_string())),
        };
        tracing::debug!(path = %path.display(), ?config, "loaded grid config");
        Ok(config)
    }

    /// Number of cells along X: `ceil(world_width / cell_width)`, with unset
    /// fields taken at their defaults. Zero for negative sizes.
    pub fn cell_count_x(&self) -> i32 {
        ceil_div(
            or_default(self.world_width, DEFAULT_WORLD_WIDTH),
            or_default(self.cell_width, DEFAULT_CELL_WIDTH),
        )
    }

    /// Number of cells along Y: `ceil(world_height / cell_height)`, with unset
    /// fields taken at their defaults. Zero for negative sizes.
    pub fn cell_count_y(&self) -> i32 {
        ceil_div(
            or_default(self.world_height, DEFAULT_WORLD_HEIGHT),
            or_default(self.cell_height, DEFAULT_CELL_HEIGHT),
        )
    }
}

fn resolve_field(field: &'static str, value: i32, default: i32) -> Result<i32, ConfigError> {
    match value {
        0 => Ok(default),
        v if v < 0 => Err(ConfigError::Invalid { field, value }),
        v => Ok(v),
    }
}

fn fits(what: &'static str, product: Option<i32>) -> Result<(), ConfigError> {
    product.map(|_| ()).ok_or(ConfigError::TooLarge(what))
}

fn or_default(value: i32, default: i32) -> i32 {
    if value == 0 { default } else { value }
}

fn ceil_div(a: i32, b: i32) -> i32 {
    if a <= 0 || b <= 0 {
        return 0;
    }
    let q = a / b;
    if a % b != 0 { q + 1 } else { q }
}
