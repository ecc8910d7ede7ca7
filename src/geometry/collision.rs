//! Overlap predicates
//!
//! All predicates are total: degenerate input (zero-length edges, parallel
//! segments, empty polygons) produces a fixed answer instead of an error.

use super::{Aabb, Circle, Segment, Vector2};

/// Strict box overlap. Boxes that only share an edge do not overlap.
pub fn overlaps_box(a: &Aabb, b: &Aabb) -> bool {
    a.left < b.right && a.right > b.left && a.top < b.bottom && a.bottom > b.top
}

/// Strict circle overlap (tangent circles do not overlap)
pub fn overlaps_circle(a: &Circle, b: &Circle) -> bool {
    a.center.distance(b.center) < a.radius + b.radius
}

/// Inclusive point-in-box test
pub fn point_in_box(point: Vector2, rect: &Aabb) -> bool {
    point.x >= rect.left && point.x <= rect.right && point.y >= rect.top && point.y <= rect.bottom
}

/// Inclusive point-in-circle test
pub fn point_in_circle(point: Vector2, circle: &Circle) -> bool {
    (point - circle.center).magnitude_squared() <= circle.radius * circle.radius
}

/// Parametric segment intersection. Parallel or coincident segments
/// (zero denominator) are reported as non-intersecting.
pub fn segment_intersects_segment(a: &Segment, b: &Segment) -> bool {
    let (x1, y1) = (a.start.x, a.start.y);
    let (x2, y2) = (a.end.x, a.end.y);
    let (x3, y3) = (b.start.x, b.start.y);
    let (x4, y4) = (b.end.x, b.end.y);

    let denominator = (x1 - x2) * (y3 - y4) - (y1 - y2) * (x3 - x4);
    if denominator == 0.0 {
        return false;
    }

    let t = ((x1 - x3) * (y3 - y4) - (y1 - y3) * (x3 - x4)) / denominator;
    let u = -((x1 - x2) * (y1 - y3) - (y1 - y2) * (x1 - x3)) / denominator;

    (0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u)
}

/// True if either endpoint is inside the box or the segment crosses an edge
pub fn segment_intersects_box(segment: &Segment, rect: &Aabb) -> bool {
    if point_in_box(segment.start, rect) || point_in_box(segment.end, rect) {
        return true;
    }

    rect.edges()
        .iter()
        .any(|edge| segment_intersects_segment(segment, edge))
}

/// Separating Axis Theorem overlap for convex polygons.
///
/// Vertices may be in either winding order. An empty polygon never overlaps
/// anything. Projections that merely touch count as overlapping.
pub fn polygons_overlap(a: &[Vector2], b: &[Vector2]) -> bool {
    if a.is_empty() || b.is_empty() {
        return false;
    }

    edge_normals(a)
        .chain(edge_normals(b))
        .all(|axis| {
            let (min_a, max_a) = project(a, axis);
            let (min_b, max_b) = project(b, axis);
            !(max_a < min_b || max_b < min_a)
        })
}

fn edge_normals(polygon: &[Vector2]) -> impl Iterator<Item = Vector2> + '_ {
    (0..polygon.len()).map(move |i| {
        let current = polygon[i];
        let next = polygon[(i + 1) % polygon.len()];
        (next - current).perpendicular().normalize()
    })
}

fn project(polygon: &[Vector2], axis: Vector2) -> (f64, f64) {
    polygon
        .iter()
        .map(|vertex| vertex.dot(axis))
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), d| {
            (min.min(d), max.max(d))
        })
}
