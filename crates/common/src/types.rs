use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use glam::IVec2;
use serde::{Deserialize, Serialize};

/// Unique identifier for an entity in the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub i64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<i64> for EntityId {
    fn from(raw: i64) -> Self {
        Self(raw)
    }
}

/// Anything the grid can hold: it only needs a world-unique identity.
pub trait Entity {
    fn id(&self) -> EntityId;
}

impl<T: Entity + ?Sized> Entity for &T {
    fn id(&self) -> EntityId {
        (**self).id()
    }
}

impl<T: Entity + ?Sized> Entity for Box<T> {
    fn id(&self) -> EntityId {
        (**self).id()
    }
}

impl<T: Entity + ?Sized> Entity for Rc<T> {
    fn id(&self) -> EntityId {
        (**self).id()
    }
}

impl<T: Entity + ?Sized> Entity for Arc<T> {
    fn id(&self) -> EntityId {
        (**self).id()
    }
}

/// A position in world coordinates (first quadrant, origin at 0,0).
pub trait Point {
    fn x(&self) -> i32;
    fn y(&self) -> i32;
}

impl<T: Point + ?Sized> Point for &T {
    fn x(&self) -> i32 {
        (**self).x()
    }

    fn y(&self) -> i32 {
        (**self).y()
    }
}

impl<T: Point + ?Sized> Point for Arc<T> {
    fn x(&self) -> i32 {
        (**self).x()
    }

    fn y(&self) -> i32 {
        (**self).y()
    }
}

impl Point for IVec2 {
    fn x(&self) -> i32 {
        self.x
    }

    fn y(&self) -> i32 {
        self.y
    }
}

impl Point for (i32, i32) {
    fn x(&self) -> i32 {
        self.0
    }

    fn y(&self) -> i32 {
        self.1
    }
}

/// Plain integer world coordinate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorldPoint {
    pub x: i32,
    pub y: i32,
}

impl WorldPoint {
    pub const ORIGIN: Self = Self { x: 0, y: 0 };

    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl Point for WorldPoint {
    fn x(&self) -> i32 {
        self.x
    }

    fn y(&self) -> i32 {
        self.y
    }
}

impl fmt::Display for WorldPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl From<IVec2> for WorldPoint {
    fn from(v: IVec2) -> Self {
        Self::new(v.x, v.y)
    }
}

impl From<WorldPoint> for IVec2 {
    fn from(p: WorldPoint) -> Self {
        IVec2::new(p.x, p.y)
    }
}
