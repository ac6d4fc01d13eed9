use gridspace_common::{Point, WorldPoint};

use crate::cell::{Cell, CellBounds};
use crate::config::GridConfig;
use crate::error::GridError;

/// Radius used by [`WorldGrid::range_entities`] when the caller passes `<= 0`.
pub const DEFAULT_RADIUS: i32 = 1;

/// Half-width of the strips emitted by [`WorldGrid::cell_span`], in cells.
const SPAN_STRIP_RANGE: i32 = 1;

/// Fixed-size grid partitioning of a rectangular world.
///
/// The world occupies `[0, width) x [0, height)`. It is cut into
/// `ceil(width / cell_width) x ceil(height / cell_height)` cells laid out in
/// row-major order. The cell array is built once and never resized, so shared
/// references to the grid can be handed to many threads; each cell guards its
/// own membership.
///
/// The grid does not know which cell an entity lives in. Callers resolve a
/// cell for a coordinate and add or remove entities on it directly, and
/// re-home entities themselves when they cross a cell boundary.
#[derive(Debug)]
pub struct WorldGrid<E, P = WorldPoint> {
    config: GridConfig,
    cell_count_x: i32,
    cell_count_y: i32,
    cells: Vec<Cell<E, P>>,
}

impl<E, P> WorldGrid<E, P> {
    /// Build a grid, resolving unset fields of `config` to their defaults.
    pub fn new(config: GridConfig) -> Result<Self, GridError> {
        let config = config.resolve()?;
        let cell_count_x = config.cell_count_x();
        let cell_count_y = config.cell_count_y();

        let mut cells = Vec::with_capacity((cell_count_x * cell_count_y) as usize);
        for y in 0..cell_count_y {
            for x in 0..cell_count_x {
                let id = (x + y * cell_count_x) as usize;
                let bounds = CellBounds {
                    min_x: x * config.cell_width,
                    max_x: ((x + 1) * config.cell_width - 1).min(config.world_width - 1),
                    min_y: y * config.cell_height,
                    max_y: ((y + 1) * config.cell_height - 1).min(config.world_height - 1),
                };
                cells.push(Cell::new(
                    id,
                    x,
                    y,
                    config.cell_width,
                    config.cell_height,
                    bounds,
                ));
            }
        }

        tracing::debug!(
            world_width = config.world_width,
            world_height = config.world_height,
            cell_count_x,
            cell_count_y,
            "world grid built"
        );

        Ok(Self {
            config,
            cell_count_x,
            cell_count_y,
            cells,
        })
    }

    /// The resolved configuration this grid was built with.
    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    pub fn width(&self) -> i32 {
        self.config.world_width
    }

    pub fn height(&self) -> i32 {
        self.config.world_height
    }

    pub fn cell_width(&self) -> i32 {
        self.config.cell_width
    }

    pub fn cell_height(&self) -> i32 {
        self.config.cell_height
    }

    pub fn cell_count_x(&self) -> i32 {
        self.cell_count_x
    }

    pub fn cell_count_y(&self) -> i32 {
        self.cell_count_y
    }

    /// Total number of cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// All cells in id order.
    pub fn cells(&self) -> impl Iterator<Item = &Cell<E, P>> {
        self.cells.iter()
    }

    /// Total entity placements across all cells.
    pub fn entity_count(&self) -> usize {
        self.cells.iter().map(Cell::entity_count).sum()
    }

    /// Direct index into the cell array; `None` when `id` is out of range.
    pub fn cell_by_id(&self, id: usize) -> Option<&Cell<E, P>> {
        self.cells.get(id)
    }

    /// Cell at grid coordinate `(grid_x, grid_y)`.
    ///
    /// Only the combined row-major id is range-checked, so a grid X past the
    /// last column wraps onto the next row.
    pub fn cell_by_grid_coord(&self, grid_x: i32, grid_y: i32) -> Option<&Cell<E, P>> {
        let id = i64::from(grid_x) + i64::from(grid_y) * i64::from(self.cell_count_x);
        if id >= 0 && id < self.cells.len() as i64 {
            self.cells.get(id as usize)
        } else {
            None
        }
    }

    /// Cell at grid coordinate `(grid_x, grid_y)`, checking each axis so that
    /// coordinates off either edge never wrap onto another row.
    fn cell_in_grid(&self, grid_x: i32, grid_y: i32) -> Option<&Cell<E, P>> {
        if (0..self.cell_count_x).contains(&grid_x) && (0..self.cell_count_y).contains(&grid_y) {
            self.cell_by_grid_coord(grid_x, grid_y)
        } else {
            None
        }
    }

    /// Cell owning world coordinate `(x, y)`, or `None` outside the world.
    pub fn cell_by_world_coord(&self, x: i32, y: i32) -> Option<&Cell<E, P>> {
        if x < 0 || y < 0 || x >= self.config.world_width || y >= self.config.world_height {
            return None;
        }
        self.cell_by_grid_coord(x / self.config.cell_width, y / self.config.cell_height)
    }

    /// Cell owning `point`.
    pub fn cell_at<Q: Point>(&self, point: &Q) -> Option<&Cell<E, P>> {
        self.cell_by_world_coord(point.x(), point.y())
    }

    /// Visit the entities of the focus cell, then of its neighborhood.
    ///
    /// `radius` is in cells and defaults to [`DEFAULT_RADIUS`] when `<= 0`.
    /// The X span is `[gx - r, gx + r]` clamped to the grid. The Y span starts
    /// at `max(gy - r, 0)` and ends at `max(gy + r, cell_count_y - 1)`: it
    /// reaches the last row whenever the focus is above it, and rows past the
    /// grid resolve to no cell and are skipped. Each visited cell stops on its
    /// own when the visitor errs; the next cell is still visited.
    pub fn range_entities<Q, F, V>(&self, focus: &Q, radius: i32, mut visit: F)
    where
        Q: Point,
        F: FnMut(&E) -> Result<(), V>,
    {
        let Some(focus_cell) = self.cell_at(focus) else {
            return;
        };
        let radius = if radius <= 0 { DEFAULT_RADIUS } else { radius };
        let _span = tracing::info_span!("range_entities", focus = focus_cell.id(), radius).entered();

        focus_cell.range_entities(&mut visit);

        let (gx, gy) = (focus_cell.grid_x(), focus_cell.grid_y());
        let start_x = gx.saturating_sub(radius).max(0);
        let end_x = gx.saturating_add(radius).min(self.cell_count_x - 1);
        let start_y = gy.saturating_sub(radius).max(0);
        let end_y = gy.saturating_add(radius).max(self.cell_count_y - 1);
        // Rows past the grid hold no cells.
        let end_y = end_y.min(self.cell_count_y - 1);

        let mut visited = 1usize;
        for y in start_y..=end_y {
            for x in start_x..=end_x {
                let id = (x + y * self.cell_count_x) as usize;
                if id == focus_cell.id() {
                    continue;
                }
                let Some(cell) = self.cell_by_id(id) else {
                    continue;
                };
                cell.range_entities(&mut visit);
                visited += 1;
            }
        }
        tracing::trace!(visited, "neighborhood scan complete");
    }

    /// Cells in the square `(2r + 1)^2` neighborhood of a grid coordinate,
    /// clamped to the grid on both axes, in row-major order.
    pub fn cells_in_radius(
        &self,
        grid_x: i32,
        grid_y: i32,
        radius: i32,
    ) -> impl Iterator<Item = &Cell<E, P>> {
        let radius = radius.max(0);
        let start_x = grid_x.saturating_sub(radius).max(0);
        let end_x = grid_x.saturating_add(radius).min(self.cell_count_x - 1);
        let start_y = grid_y.saturating_sub(radius).max(0);
        let end_y = grid_y.saturating_add(radius).min(self.cell_count_y - 1);
        (start_y..=end_y).flat_map(move |y| {
            (start_x..=end_x).filter_map(move |x| self.cell_by_id((x + y * self.cell_count_x) as usize))
        })
    }

    /// Candidate cells along the path from `src` to `target`, for incremental
    /// view updates as an entity moves.
    ///
    /// Both endpoints must resolve to a cell, otherwise the span is empty.
    /// Steps run from grid coordinate 0 towards the grid delta on each axis
    /// (not from the source cell). For every X step two vertical strips of
    /// three cells are emitted, centred on the source and target rows; for
    /// every Y step two horizontal strips, centred on the source and target
    /// columns. Strip order follows the direction of travel. Duplicates are
    /// kept, and coordinates off the grid on either axis appear as `None`.
    pub fn cell_span<Q: Point>(&self, src: &Q, target: &Q) -> Vec<Option<&Cell<E, P>>> {
        let mut span = Vec::new();
        let (Some(src_cell), Some(target_cell)) = (self.cell_at(src), self.cell_at(target)) else {
            return span;
        };

        let (sx, sy) = (src_cell.grid_x(), src_cell.grid_y());
        let (tx, ty) = (target_cell.grid_x(), target_cell.grid_y());
        let (dx, dy) = (tx - sx, ty - sy);

        let column = |span: &mut Vec<_>, x: i32, centre_y: i32| {
            for y in centre_y - SPAN_STRIP_RANGE..=centre_y + SPAN_STRIP_RANGE {
                span.push(self.cell_in_grid(x, y));
            }
        };
        let row = |span: &mut Vec<_>, y: i32, centre_x: i32| {
            for x in centre_x - SPAN_STRIP_RANGE..=centre_x + SPAN_STRIP_RANGE {
                span.push(self.cell_in_grid(x, y));
            }
        };

        if dx > 0 {
            for x in 0..dx {
                column(&mut span, x, sy);
                column(&mut span, x, ty);
            }
        } else {
            for x in (dx + 1..=0).rev() {
                column(&mut span, x, ty);
                column(&mut span, x, sy);
            }
        }

        if dy < 0 {
            for y in (dy + 1..=0).rev() {
                row(&mut span, y, tx);
                row(&mut span, y, sx);
            }
        } else {
            for y in 0..dy {
                row(&mut span, y, sx);
                row(&mut span, y, tx);
            }
        }

        tracing::trace!(
            src = src_cell.id(),
            target = target_cell.id(),
            len = span.len(),
            "cell span computed"
        );
        span
    }
}
