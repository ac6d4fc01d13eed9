use std::collections::BTreeSet;

use gridspace_common::Point;

use crate::grid::{DEFAULT_RADIUS, WorldGrid};

/// Cells that came into or dropped out of view on one update, sorted by id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewDelta {
    pub entered: Vec<usize>,
    pub left: Vec<usize>,
}

impl ViewDelta {
    pub fn is_empty(&self) -> bool {
        self.entered.is_empty() && self.left.is_empty()
    }
}

/// Statistics from the last [`AreaOfInterest::update`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewStats {
    pub entered: usize,
    pub left: usize,
    pub visible: usize,
    pub updates: u64,
}

/// Tracks the set of cells an observer can see as it moves.
///
/// The view is the square neighborhood of `radius` cells around the cell
/// holding the observer, clamped to the grid. Each update reports only the
/// cells whose visibility changed, so callers can subscribe and unsubscribe
/// incrementally instead of rescanning the whole neighborhood.
#[derive(Debug, Clone)]
pub struct AreaOfInterest {
    radius: i32,
    centre: Option<usize>,
    visible: BTreeSet<usize>,
    stats: ViewStats,
}

impl AreaOfInterest {
    /// New, empty view. A radius `<= 0` falls back to one cell.
    pub fn new(radius: i32) -> Self {
        Self {
            radius: if radius <= 0 { DEFAULT_RADIUS } else { radius },
            centre: None,
            visible: BTreeSet::new(),
            stats: ViewStats::default(),
        }
    }

    pub fn radius(&self) -> i32 {
        self.radius
    }

    /// Id of the cell the view was last centred on.
    pub fn centre(&self) -> Option<usize> {
        self.centre
    }

    /// Re-centre the view on `focus` and report which cells changed.
    ///
    /// A focus outside the world clears the view.
    pub fn update<E, P, Q: Point>(&mut self, grid: &WorldGrid<E, P>, focus: &Q) -> ViewDelta {
        let _span = tracing::info_span!("view_update", radius = self.radius).entered();

        let centre = grid.cell_at(focus);
        let centre_id = centre.map(|c| c.id());
        if centre_id.is_some() && centre_id == self.centre {
            self.stats.entered = 0;
            self.stats.left = 0;
            self.stats.updates += 1;
            return ViewDelta::default();
        }

        let desired: BTreeSet<usize> = match centre {
            Some(c) => grid
                .cells_in_radius(c.grid_x(), c.grid_y(), self.radius)
                .map(|cell| cell.id())
                .collect(),
            None => BTreeSet::new(),
        };

        let entered: Vec<usize> = desired.difference(&self.visible).copied().collect();
        let left: Vec<usize> = self.visible.difference(&desired).copied().collect();

        for id in &entered {
            tracing::trace!(cell = *id, "cell entered view");
        }
        for id in &left {
            tracing::trace!(cell = *id, "cell left view");
        }

        self.visible = desired;
        self.centre = centre_id;
        self.stats = ViewStats {
            entered: entered.len(),
            left: left.len(),
            visible: self.visible.len(),
            updates: self.stats.updates + 1,
        };

        tracing::debug!(
            entered = entered.len(),
            left = left.len(),
            visible = self.visible.len(),
            "view update complete"
        );

        ViewDelta { entered, left }
    }

    /// Cell ids currently in view.
    pub fn visible(&self) -> &BTreeSet<usize> {
        &self.visible
    }

    pub fn is_visible(&self, id: usize) -> bool {
        self.visible.contains(&id)
    }

    pub fn stats(&self) -> &ViewStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GridConfig;
    use gridspace_common::{Entity, EntityId, WorldPoint};

    struct Tag;

    impl Entity for Tag {
        fn id(&self) -> EntityId {
            EntityId(0)
        }
    }

    fn grid() -> WorldGrid<Tag> {
        WorldGrid::new(GridConfig::default()).unwrap()
    }

    #[test]
    fn first_update_enters_whole_neighborhood() {
        let g = grid();
        let mut view = AreaOfInterest::new(1);
        let delta = view.update(&g, &WorldPoint::new(55, 55));
        assert_eq!(delta.entered, vec![44, 45, 46, 54, 55, 56, 64, 65, 66]);
        assert!(delta.left.is_empty());
        assert_eq!(view.centre(), Some(55));
        assert_eq!(view.stats().visible, 9);
    }

    #[test]
    fn moving_within_cell_is_a_no_op() {
        let g = grid();
        let mut view = AreaOfInterest::new(1);
        view.update(&g, &WorldPoint::new(50, 50));
        let delta = view.update(&g, &WorldPoint::new(59, 59));
        assert!(delta.is_empty());
        assert_eq!(view.stats().updates, 2);
        assert_eq!(view.visible().len(), 9);
    }

    #[test]
    fn step_right_swaps_one_column() {
        let g = grid();
        let mut view = AreaOfInterest::new(1);
        view.update(&g, &WorldPoint::new(55, 55));
        let delta = view.update(&g, &WorldPoint::new(65, 55));
        assert_eq!(delta.entered, vec![47, 57, 67]);
        assert_eq!(delta.left, vec![44, 54, 64]);
        assert!(view.is_visible(57));
        assert!(!view.is_visible(44));
    }

    #[test]
    fn corner_view_is_clamped() {
        let g = grid();
        let mut view = AreaOfInterest::new(2);
        let delta = view.update(&g, &WorldPoint::new(0, 0));
        assert_eq!(delta.entered, vec![0, 1, 2, 10, 11, 12, 20, 21, 22]);
    }

    #[test]
    fn leaving_world_clears_view() {
        let g = grid();
        let mut view = AreaOfInterest::new(1);
        view.update(&g, &WorldPoint::new(5, 5));
        let delta = view.update(&g, &WorldPoint::new(-5, 5));
        assert_eq!(delta.left, vec![0, 1, 10, 11]);
        assert!(view.visible().is_empty());
        assert_eq!(view.centre(), None);
    }

    #[test]
    fn non_positive_radius_defaults() {
        assert_eq!(AreaOfInterest::new(0).radius(), 1);
        assert_eq!(AreaOfInterest::new(-4).radius(), 1);
        assert_eq!(AreaOfInterest::new(3).radius(), 3);
    }
}
