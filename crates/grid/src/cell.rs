use std::collections::HashMap;

use gridspace_common::{Entity, EntityId, Point, WorldPoint};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use crate::error::GridError;

/// Inclusive world-coordinate rectangle owned by a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellBounds {
    pub min_x: i32,
    pub max_x: i32,
    pub min_y: i32,
    pub max_y: i32,
}

impl CellBounds {
    /// True if `(x, y)` lies inside the owned rectangle.
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }
}

/// One partition of the world.
///
/// A cell owns the entities currently inside it and a dense table of points
/// addressed by local offset. The point table is always sized by the nominal
/// cell dimensions, even for boundary cells whose owned rectangle was clamped
/// to the world edge.
///
/// Membership operations take the cell's exclusive lock for their whole
/// duration. That includes the visitor passed to [`Cell::range_entities`]:
/// a slow visitor stalls every other membership call on this cell, and a
/// visitor that calls back into the same cell's membership operations will
/// deadlock. Use [`Cell::entities_snapshot`] to visit outside the lock.
#[derive(Debug)]
pub struct Cell<E, P = WorldPoint> {
    id: usize,
    grid_x: i32,
    grid_y: i32,
    width: i32,
    height: i32,
    bounds: CellBounds,
    entities: Mutex<HashMap<EntityId, E>>,
    points: RwLock<Vec<Option<P>>>,
}

impl<E, P> Cell<E, P> {
    pub(crate) fn new(
        id: usize,
        grid_x: i32,
        grid_y: i32,
        width: i32,
        height: i32,
        bounds: CellBounds,
    ) -> Self {
        let mut points = Vec::new();
        points.resize_with((width * height) as usize, || None);
        Self {
            id,
            grid_x,
            grid_y,
            width,
            height,
            bounds,
            entities: Mutex::new(HashMap::new()),
            points: RwLock::new(points),
        }
    }

    /// Row-major id: `grid_x + grid_y * cell_count_x`.
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn grid_x(&self) -> i32 {
        self.grid_x
    }

    pub fn grid_y(&self) -> i32 {
        self.grid_y
    }

    /// Nominal cell width (not clamped for boundary cells).
    pub fn width(&self) -> i32 {
        self.width
    }

    /// Nominal cell height (not clamped for boundary cells).
    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn bounds(&self) -> CellBounds {
        self.bounds
    }

    pub fn min_x(&self) -> i32 {
        self.bounds.min_x
    }

    pub fn max_x(&self) -> i32 {
        self.bounds.max_x
    }

    pub fn min_y(&self) -> i32 {
        self.bounds.min_y
    }

    pub fn max_y(&self) -> i32 {
        self.bounds.max_y
    }

    /// Number of entities currently stored.
    pub fn entity_count(&self) -> usize {
        self.entities.lock().len()
    }

    pub fn contains_entity(&self, id: EntityId) -> bool {
        self.entities.lock().contains_key(&id)
    }

    /// Remove the entity with `id` if present. Removing an absent id is a no-op.
    pub fn remove_entity(&self, id: EntityId) {
        if self.entities.lock().remove(&id).is_some() {
            tracing::debug!(cell = self.id, %id, "entity removed");
        }
    }

    /// Visit every stored entity, in no particular order, while holding the lock.
    ///
    /// Iteration stops at the first `Err` the visitor returns. The error itself
    /// is dropped: callers only observe that no further entities were visited.
    pub fn range_entities<F, V>(&self, mut visit: F)
    where
        F: FnMut(&E) -> Result<(), V>,
    {
        let entities = self.entities.lock();
        for entity in entities.values() {
            if visit(entity).is_err() {
                tracing::trace!(cell = self.id, "visitor stopped iteration");
                return;
            }
        }
    }

    /// Whether the world coordinate falls inside this cell's nominal extent.
    ///
    /// The test is done on the local offset from `(min_x, min_y)` against the
    /// nominal `width`/`height`, which matches the owned rectangle everywhere
    /// except the clamped boundary row and column.
    pub fn is_in_bounds(&self, x: i32, y: i32) -> bool {
        self.local_offset(x, y).is_some()
    }

    fn local_offset(&self, x: i32, y: i32) -> Option<usize> {
        let lx = x.checked_sub(self.bounds.min_x)?;
        let ly = y.checked_sub(self.bounds.min_y)?;
        if lx >= 0 && lx < self.width && ly >= 0 && ly < self.height {
            Some((lx + ly * self.width) as usize)
        } else {
            None
        }
    }
}

impl<E: Entity, P> Cell<E, P> {
    /// Insert `entity`, failing if an entity with the same id is already here.
    pub fn add_entity(&self, entity: E) -> Result<(), GridError> {
        let id = entity.id();
        let mut entities = self.entities.lock();
        if entities.contains_key(&id) {
            return Err(GridError::AlreadyExists { id });
        }
        entities.insert(id, entity);
        tracing::debug!(cell = self.id, %id, "entity added");
        Ok(())
    }
}

impl<E: Clone, P> Cell<E, P> {
    /// Look up an entity by id.
    ///
    /// Reads take the same lock as writes, so a lookup never observes a
    /// half-applied add or remove.
    pub fn get_entity(&self, id: EntityId) -> Result<E, GridError> {
        self.entities
            .lock()
            .get(&id)
            .cloned()
            .ok_or(GridError::NotFound { id })
    }

    /// Clone every stored entity out under the lock and return them.
    pub fn entities_snapshot(&self) -> Vec<E> {
        self.entities.lock().values().cloned().collect()
    }
}

impl<E, P: Point> Cell<E, P> {
    /// Store `point` at its local offset. Out-of-bounds points are ignored.
    pub fn set_point(&self, point: P) {
        if let Some(offset) = self.local_offset(point.x(), point.y()) {
            self.points.write()[offset] = Some(point);
        }
    }
}

impl<E, P: Clone> Cell<E, P> {
    /// The point stored at `(x, y)`, or `None` if out of bounds or never set.
    pub fn get_point(&self, x: i32, y: i32) -> Option<P> {
        let offset = self.local_offset(x, y)?;
        self.points.read()[offset].clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[derive(Debug, Clone, PartialEq)]
    struct Npc {
        id: i64,
        name: &'static str,
    }

    impl Entity for Npc {
        fn id(&self) -> EntityId {
            EntityId(self.id)
        }
    }

    fn npc(id: i64) -> Npc {
        Npc { id, name: "npc" }
    }

    fn cell_at(grid_x: i32, grid_y: i32) -> Cell<Npc> {
        Cell::new(
            (grid_x + grid_y * 10) as usize,
            grid_x,
            grid_y,
            10,
            10,
            CellBounds {
                min_x: grid_x * 10,
                max_x: grid_x * 10 + 9,
                min_y: grid_y * 10,
                max_y: grid_y * 10 + 9,
            },
        )
    }

    #[test]
    fn add_then_get() {
        let cell = cell_at(0, 0);
        cell.add_entity(npc(7)).unwrap();
        assert_eq!(cell.get_entity(EntityId(7)).unwrap(), npc(7));
        assert_eq!(cell.entity_count(), 1);
    }

    #[test]
    fn add_duplicate_fails() {
        let cell = cell_at(0, 0);
        cell.add_entity(npc(1)).unwrap();
        let err = cell
            .add_entity(Npc {
                id: 1,
                name: "other",
            })
            .unwrap_err();
        assert_eq!(err, GridError::AlreadyExists { id: EntityId(1) });
        // The first insert wins.
        assert_eq!(cell.get_entity(EntityId(1)).unwrap().name, "npc");
    }

    #[test]
    fn remove_is_idempotent() {
        let cell = cell_at(0, 0);
        cell.remove_entity(EntityId(99));
        cell.add_entity(npc(3)).unwrap();
        cell.remove_entity(EntityId(3));
        cell.remove_entity(EntityId(3));
        assert_eq!(
            cell.get_entity(EntityId(3)).unwrap_err(),
            GridError::NotFound { id: EntityId(3) }
        );
        assert!(!cell.contains_entity(EntityId(3)));
    }

    #[test]
    fn readd_after_remove() {
        let cell = cell_at(0, 0);
        cell.add_entity(npc(5)).unwrap();
        cell.remove_entity(EntityId(5));
        cell.add_entity(npc(5)).unwrap();
        assert!(cell.contains_entity(EntityId(5)));
    }

    #[test]
    fn range_visits_all() {
        let cell = cell_at(0, 0);
        for id in 0..5 {
            cell.add_entity(npc(id)).unwrap();
        }
        let mut seen = Vec::new();
        cell.range_entities(|e| {
            seen.push(e.id);
            Ok::<(), ()>(())
        });
        seen.sort_unstable();
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn range_stops_on_error_without_surfacing_it() {
        let cell = cell_at(0, 0);
        for id in 0..5 {
            cell.add_entity(npc(id)).unwrap();
        }
        let mut calls = 0;
        cell.range_entities(|_| {
            calls += 1;
            if calls == 2 { Err("stop") } else { Ok(()) }
        });
        assert_eq!(calls, 2);
    }

    #[test]
    fn snapshot_allows_reentrant_mutation() {
        let cell = cell_at(0, 0);
        cell.add_entity(npc(1)).unwrap();
        cell.add_entity(npc(2)).unwrap();
        for e in cell.entities_snapshot() {
            cell.remove_entity(e.id());
        }
        assert_eq!(cell.entity_count(), 0);
    }

    #[test]
    fn bounds_check_uses_local_offset() {
        let cell = cell_at(3, 2);
        assert!(cell.is_in_bounds(30, 20));
        assert!(cell.is_in_bounds(39, 29));
        assert!(!cell.is_in_bounds(40, 25));
        assert!(!cell.is_in_bounds(29, 25));
        assert!(!cell.is_in_bounds(35, 30));
        assert!(cell.bounds().contains(35, 25));
    }

    #[test]
    fn boundary_cell_keeps_nominal_extent() {
        // World 105 wide: last column owns x in [100, 104] but is sized 10.
        let cell: Cell<Npc> = Cell::new(
            10,
            10,
            0,
            10,
            10,
            CellBounds {
                min_x: 100,
                max_x: 104,
                min_y: 0,
                max_y: 9,
            },
        );
        assert_eq!(cell.width(), 10);
        assert!(cell.is_in_bounds(104, 0));
        assert!(cell.is_in_bounds(107, 0));
        assert!(!cell.bounds().contains(107, 0));
    }

    #[test]
    fn extreme_coordinates_are_out_of_bounds() {
        let cell = cell_at(5, 5);
        for (x, y) in [
            (i32::MIN, 55),
            (55, i32::MIN),
            (i32::MAX, 55),
            (55, i32::MAX),
            (i32::MIN, i32::MAX),
        ] {
            assert!(!cell.is_in_bounds(x, y));
            assert_eq!(cell.get_point(x, y), None);
            cell.set_point(WorldPoint::new(x, y));
        }
        assert_eq!(cell.get_point(55, 55), None);
    }

    #[test]
    fn point_round_trip() {
        let cell = cell_at(1, 1);
        let p = WorldPoint::new(12, 17);
        cell.set_point(p);
        assert_eq!(cell.get_point(12, 17), Some(p));
        assert_eq!(cell.get_point(13, 17), None);
    }

    #[test]
    fn point_overwrite() {
        let cell: Cell<Npc, (i32, i32)> = Cell::new(
            0,
            0,
            0,
            4,
            4,
            CellBounds {
                min_x: 0,
                max_x: 3,
                min_y: 0,
                max_y: 3,
            },
        );
        cell.set_point((2, 2));
        cell.set_point((2, 2));
        assert_eq!(cell.get_point(2, 2), Some((2, 2)));
    }

    #[test]
    fn out_of_bounds_point_is_ignored() {
        let cell = cell_at(0, 0);
        cell.set_point(WorldPoint::new(50, 50));
        assert_eq!(cell.get_point(50, 50), None);
        for x in 0..10 {
            for y in 0..10 {
                assert_eq!(cell.get_point(x, y), None);
            }
        }
    }

    #[test]
    fn concurrent_adds_serialize() {
        let cell: Cell<Arc<Npc>> = Cell::new(
            0,
            0,
            0,
            10,
            10,
            CellBounds {
                min_x: 0,
                max_x: 9,
                min_y: 0,
                max_y: 9,
            },
        );
        std::thread::scope(|s| {
            for t in 0..4 {
                let cell = &cell;
                s.spawn(move || {
                    for i in 0..250 {
                        // Every thread also races on id 0; exactly one wins.
                        let _ = cell.add_entity(Arc::new(npc(0)));
                        cell.add_entity(Arc::new(npc(1 + t * 250 + i))).unwrap();
                    }
                });
            }
        });
        assert_eq!(cell.entity_count(), 1001);
    }
}
