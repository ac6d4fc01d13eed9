//! Fixed-grid spatial index for "who is near this point" queries.
//!
//! # Invariants
//! - Every world coordinate in `[0, width) x [0, height)` maps to exactly one cell.
//! - The cell array is built once; cells are never added, removed or resized.
//! - Each cell serializes its own membership changes; there is no cross-cell lock.
//!
//! # Concurrency
//! Different cells can be used from different threads without coordination.
//! A multi-cell scan is not a transaction: an entity re-homed by another
//! thread mid-scan may be visited twice, once, or not at all.

mod cell;
mod config;
mod error;
mod grid;
mod view;

pub use cell::{Cell, CellBounds};
pub use config::{
    DEFAULT_CELL_HEIGHT, DEFAULT_CELL_WIDTH, DEFAULT_WORLD_HEIGHT, DEFAULT_WORLD_WIDTH, GridConfig,
};
pub use error::{ConfigError, GridError};
pub use grid::{DEFAULT_RADIUS, WorldGrid};
pub use view::{AreaOfInterest, ViewDelta, ViewStats};

pub use gridspace_common::{Entity, EntityId, Point, WorldPoint};

pub fn crate_info() -> &'static str {
    "gridspace-grid v0.1.0"
}
