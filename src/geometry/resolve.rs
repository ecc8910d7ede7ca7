//! Collision response, continuous sweeps and ray queries

use std::cmp::Ordering;

use super::collision::segment_intersects_box;
use super::{Bounded, CircleBody, Segment, Vector2};

/// Impulse-based bounce between two circles.
///
/// No-op when the centers coincide, when the bodies already separate along
/// the collision normal, or when either mass is not positive.
pub fn resolve_velocity(a: &mut CircleBody, b: &mut CircleBody) {
    let offset = b.position - a.position;
    let distance = offset.magnitude();
    if distance == 0.0 {
        return;
    }
    if !(a.mass > 0.0 && b.mass > 0.0) {
        return;
    }

    let normal = offset / distance;
    let separating_velocity = (b.velocity - a.velocity).dot(normal);
    if separating_velocity > 0.0 {
        return;
    }

    let restitution = a.bounce.min(b.bounce);
    let delta_velocity = -separating_velocity * restitution - separating_velocity;

    let total_inverse_mass = 1.0 / a.mass + 1.0 / b.mass;
    if total_inverse_mass <= 0.0 {
        return;
    }

    let impulse = delta_velocity / total_inverse_mass;
    a.velocity -= normal * (impulse / a.mass);
    b.velocity += normal * (impulse / b.mass);
}

/// Positional de-penetration. Heavier bodies move less.
pub fn resolve_position(a: &mut CircleBody, b: &mut CircleBody) {
    let offset = b.position - a.position;
    let distance = offset.magnitude();
    if distance == 0.0 {
        return;
    }

    let overlap = (a.radius + b.radius) - distance;
    if overlap <= 0.0 {
        return;
    }

    let total_mass = a.mass + b.mass;
    if !(total_mass > 0.0) {
        return;
    }

    let normal = offset / distance;
    let share_a = b.mass / total_mass;
    let share_b = a.mass / total_mass;

    a.position -= normal * (overlap * share_a);
    b.position += normal * (overlap * share_b);
}

/// Earliest contact between two moving circles within a step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepHit {
    /// Seconds from the start of the step
    pub time: f64,
    /// Predicted position of the first body at `time`
    pub position: Vector2,
}

/// Continuous time-of-impact test for two moving circles over `dt`.
///
/// Circles already overlapping and still closing report `time = 0`; an
/// overlapping pair that is moving apart has no impact ahead of it.
/// Without relative motion there is no impact to find.
pub fn sweep_circles(a: &CircleBody, b: &CircleBody, dt: f64) -> Option<SweepHit> {
    let relative_velocity = a.velocity - b.velocity;
    let relative_position = a.position - b.position;
    let radius_sum = a.radius + b.radius;

    let qa = relative_velocity.dot(relative_velocity);
    let qb = 2.0 * relative_position.dot(relative_velocity);
    let qc = relative_position.dot(relative_position) - radius_sum * radius_sum;

    if qc <= 0.0 && qb < 0.0 {
        return Some(SweepHit {
            time: 0.0,
            position: a.position,
        });
    }
    if qa == 0.0 {
        return None;
    }

    let discriminant = qb * qb - 4.0 * qa * qc;
    if discriminant < 0.0 {
        return None;
    }

    let root = discriminant.sqrt();
    let t = ((-qb - root) / (2.0 * qa)).min((-qb + root) / (2.0 * qa));

    if (0.0..=dt).contains(&t) {
        Some(SweepHit {
            time: t,
            position: a.position + a.velocity * t,
        })
    } else {
        None
    }
}

/// One candidate struck by a ray
#[derive(Debug, Clone, Copy)]
pub struct RayHit<'a, T> {
    pub target: &'a T,
    /// Distance from the ray origin to the target's position
    pub distance: f64,
    /// Point along the ray at `distance`
    pub point: Vector2,
}

/// Cast a segment of length `max_distance` and collect every candidate whose
/// bounding box it touches, nearest first. A zero direction degenerates to a
/// point test at the origin.
pub fn raycast<'a, T: Bounded>(
    origin: Vector2,
    direction: Vector2,
    max_distance: f64,
    candidates: impl IntoIterator<Item = &'a T>,
) -> Vec<RayHit<'a, T>> {
    let direction = direction.normalize();
    let ray = Segment::new(origin, origin + direction * max_distance);

    let mut hits: Vec<RayHit<'a, T>> = candidates
        .into_iter()
        .filter(|candidate| segment_intersects_box(&ray, &candidate.bounds()))
        .map(|candidate| {
            let distance = origin.distance(candidate.position());
            RayHit {
                target: candidate,
                distance,
                point: origin + direction * distance,
            }
        })
        .collect();

    hits.sort_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap_or(Ordering::Equal));
    hits
}
