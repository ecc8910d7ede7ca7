//! Collision geometry
//!
//! Stateless predicates and resolution math. Nothing in here owns state or
//! logs; every function is deterministic for identical inputs.

pub mod collision;
pub mod resolve;
pub mod shapes;
pub mod vector;

pub use collision::{
    overlaps_box, overlaps_circle, point_in_box, point_in_circle, polygons_overlap,
    segment_intersects_box, segment_intersects_segment,
};
pub use resolve::{raycast, resolve_position, resolve_velocity, sweep_circles, RayHit, SweepHit};
pub use shapes::{Aabb, Bounded, Circle, CircleBody, Segment};
pub use vector::Vector2;
