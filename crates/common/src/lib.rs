//! Shared types for the gridspace index.
//!
//! The grid only ever asks two things of the values it stores: an entity has an
//! integer identity, and a point has integer X/Y world coordinates. Host
//! applications implement these capabilities on their own types.

mod types;

pub use types::{Entity, EntityId, Point, WorldPoint};
