//! Combatant physics and arena constraints

use serde::{Deserialize, Serialize};

use crate::geometry::{point_in_box, Aabb, Vector2};

use super::archetype::Archetype;

/// Fraction of horizontal velocity kept per second while idle
pub const IDLE_DAMPING: f64 = 1.532_5e-6;
/// Fraction of horizontal velocity kept per second while guarding
pub const GUARD_DAMPING: f64 = 1.797e-3;
/// Fraction of horizontal velocity kept per second while defeated
pub const DEFEATED_DAMPING: f64 = 4.607e-2;

/// Fraction of the jump impulse an air dash gets
pub const AIR_DASH_FACTOR: f64 = 0.7;

/// Point-mass state of a combatant
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Kinematics {
    pub position: Vector2,
    pub velocity: Vector2,
    pub acceleration: Vector2,
    pub mass: f64,
    /// Fraction of velocity kept per second
    pub friction: f64,
    pub bounce: f64,
}

impl Kinematics {
    pub fn at(position: Vector2, archetype: &Archetype) -> Self {
        Self {
            position,
            velocity: Vector2::ZERO,
            acceleration: Vector2::ZERO,
            mass: archetype.mass,
            friction: archetype.friction,
            bounce: archetype.bounce,
        }
    }
}

/// Physics system for updating combatant positions and velocities
pub struct PhysicsSystem;

impl PhysicsSystem {
    /// Semi-implicit Euler step followed by time-scaled friction
    pub fn integrate(body: &mut Kinematics, dt: f64) {
        body.velocity += body.acceleration * dt;
        body.position += body.velocity * dt;
        body.velocity *= body.friction.powf(dt);
    }

    pub fn apply_gravity(body: &mut Kinematics, gravity: f64, dt: f64) {
        body.velocity.y += gravity * dt;
    }

    /// Scale horizontal velocity by a per-second retention factor over `dt`
    pub fn damp_horizontal(body: &mut Kinematics, factor: f64, dt: f64) {
        body.velocity.x *= factor.powf(dt);
    }

    /// Keep the body's feet on or above the ground plane.
    /// Returns true while in contact with the ground.
    pub fn clamp_to_ground(body: &mut Kinematics, half_height: f64, ground_y: f64) -> bool {
        if body.position.y + half_height < ground_y {
            return false;
        }

        body.position.y = ground_y - half_height;
        if body.velocity.y > 0.0 {
            body.velocity.y = 0.0;
        }
        true
    }

    /// Clamp the body's box to the side walls and the ceiling, cancelling
    /// velocity that points out of the arena
    pub fn clamp_to_bounds(body: &mut Kinematics, width: f64, height: f64, bounds: &Aabb) {
        let half_width = width / 2.0;
        let half_height = height / 2.0;

        if body.position.x - half_width < bounds.left {
            body.position.x = bounds.left + half_width;
            body.velocity.x = body.velocity.x.max(0.0);
        } else if body.position.x + half_width > bounds.right {
            body.position.x = bounds.right - half_width;
            body.velocity.x = body.velocity.x.min(0.0);
        }

        if body.position.y - half_height < bounds.top {
            body.position.y = bounds.top + half_height;
            body.velocity.y = body.velocity.y.max(0.0);
        }
    }

    /// Check if a position has left the ring
    pub fn is_ring_out(position: Vector2, ring: &Aabb) -> bool {
        !point_in_box(position, ring)
    }

    /// Horizontal soft-body separation: each body moves half the overlap
    /// of their widths away from the other
    pub fn push_apart(a: &mut Kinematics, a_width: f64, b: &mut Kinematics, b_width: f64) {
        let dx = b.position.x - a.position.x;
        let overlap = (a_width + b_width) / 2.0 - dx.abs();
        if overlap <= 0.0 {
            return;
        }

        let push = overlap / 2.0;
        if dx > 0.0 {
            a.position.x -= push;
            b.position.x += push;
        } else {
            a.position.x += push;
            b.position.x -= push;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::archetype::ArchetypeKind;

    fn body(x: f64, y: f64) -> Kinematics {
        Kinematics::at(Vector2::new(x, y), &Archetype::for_kind(ArchetypeKind::Brawler))
    }

    #[test]
    fn integrate_moves_then_applies_friction() {
        let mut b = body(0.0, 0.0);
        b.velocity = Vector2::new(100.0, 0.0);
        PhysicsSystem::integrate(&mut b, 0.5);
        assert!((b.position.x - 50.0).abs() < 1e-9);
        assert!((b.velocity.x - 100.0 * 0.8f64.powf(0.5)).abs() < 1e-9);
    }

    #[test]
    fn damping_does_not_depend_on_tick_rate() {
        let mut fine = body(0.0, 0.0);
        let mut coarse = body(0.0, 0.0);
        fine.velocity.x = 300.0;
        coarse.velocity.x = 300.0;

        for _ in 0..60 {
            PhysicsSystem::damp_horizontal(&mut fine, GUARD_DAMPING, 1.0 / 60.0);
        }
        for _ in 0..30 {
            PhysicsSystem::damp_horizontal(&mut coarse, GUARD_DAMPING, 1.0 / 30.0);
        }

        assert!((fine.velocity.x - coarse.velocity.x).abs() < 1e-9);
        assert!((fine.velocity.x - 300.0 * GUARD_DAMPING).abs() < 1e-9);
    }

    #[test]
    fn landing_zeroes_downward_velocity() {
        let mut b = body(200.0, 465.0);
        b.velocity = Vector2::new(0.0, 120.0);
        assert!(PhysicsSystem::clamp_to_ground(&mut b, 40.0, 500.0));
        assert_eq!(b.position.y, 460.0);
        assert_eq!(b.velocity.y, 0.0);

        let mut airborne = body(200.0, 300.0);
        assert!(!PhysicsSystem::clamp_to_ground(&mut airborne, 40.0, 500.0));
    }

    #[test]
    fn walls_cancel_outward_velocity_only() {
        let bounds = Aabb::new(50.0, 50.0, 1150.0, 550.0);

        let mut b = body(1140.0, 300.0);
        b.velocity = Vector2::new(150.0, 10.0);
        PhysicsSystem::clamp_to_bounds(&mut b, 60.0, 80.0, &bounds);
        assert_eq!(b.position.x, 1120.0);
        assert_eq!(b.velocity, Vector2::new(0.0, 10.0));

        let mut b = body(60.0, 60.0);
        b.velocity = Vector2::new(40.0, -300.0);
        PhysicsSystem::clamp_to_bounds(&mut b, 60.0, 80.0, &bounds);
        assert_eq!(b.position, Vector2::new(80.0, 90.0));
        assert_eq!(b.velocity, Vector2::new(40.0, 0.0));
    }

    #[test]
    fn ring_out_outside_rectangle() {
        let ring = Aabb::new(0.0, -1.0e6, 1200.0, 650.0);
        assert!(!PhysicsSystem::is_ring_out(Vector2::new(600.0, 400.0), &ring));
        assert!(PhysicsSystem::is_ring_out(Vector2::new(-1.0, 400.0), &ring));
        assert!(PhysicsSystem::is_ring_out(Vector2::new(600.0, 651.0), &ring));
    }

    #[test]
    fn push_apart_splits_overlap_evenly() {
        let mut a = body(100.0, 460.0);
        let mut b = body(140.0, 460.0);
        PhysicsSystem::push_apart(&mut a, 60.0, &mut b, 60.0);
        assert_eq!(a.position.x, 90.0);
        assert_eq!(b.position.x, 150.0);

        // Already separated
        PhysicsSystem::push_apart(&mut a, 60.0, &mut b, 60.0);
        assert_eq!(a.position.x, 90.0);
    }
}
