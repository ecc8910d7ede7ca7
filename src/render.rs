//! Renderer seam. The simulation never depends on what gets drawn.

use crate::game::combat::AttackEntity;
use crate::game::combatant::{ActionState, Combatant, Facing};
use crate::geometry::{Aabb, Vector2};

/// Drawing surface handed to [`Renderable::draw`]
pub trait DrawContext {
    fn set_alpha(&mut self, alpha: f64);
    fn fill_rect(&mut self, rect: Aabb, color: u32);
    fn fill_circle(&mut self, center: Vector2, radius: f64, color: u32);
}

/// Anything a renderer can place and draw
pub trait Renderable {
    fn position(&self) -> Vector2;

    fn rotation(&self) -> f64 {
        0.0
    }

    fn facing(&self) -> Facing {
        Facing::Right
    }

    fn draw(&self, ctx: &mut dyn DrawContext);
}

impl Renderable for Combatant {
    fn position(&self) -> Vector2 {
        self.body.position
    }

    fn facing(&self) -> Facing {
        self.facing
    }

    fn draw(&self, ctx: &mut dyn DrawContext) {
        let alpha = match self.state {
            ActionState::Defeated => 0.4,
            _ if self.invulnerable => 0.6,
            _ => 1.0,
        };
        ctx.set_alpha(alpha);

        let body = self.hurtbox();
        ctx.fill_rect(body, self.archetype.primary_color);

        // Head on the leading side
        let head = Aabb::from_xywh(
            if self.facing == Facing::Right {
                body.center().x
            } else {
                body.left
            },
            body.top,
            body.width() / 2.0,
            body.height() / 4.0,
        );
        ctx.fill_rect(head, self.archetype.secondary_color);

        if !self.hit_volumes.is_empty() {
            ctx.set_alpha(0.3);
            for volume in &self.hit_volumes {
                ctx.fill_rect(volume.world_area(self.body.position), self.archetype.secondary_color);
            }
        }
        ctx.set_alpha(1.0);
    }
}

impl Renderable for AttackEntity {
    fn position(&self) -> Vector2 {
        self.position
    }

    fn rotation(&self) -> f64 {
        AttackEntity::rotation(self)
    }

    fn facing(&self) -> Facing {
        if self.velocity.x < 0.0 {
            Facing::Left
        } else {
            Facing::Right
        }
    }

    fn draw(&self, ctx: &mut dyn DrawContext) {
        if self.velocity == Vector2::ZERO {
            ctx.fill_circle(self.position, self.width.max(self.height) / 2.0, self.color);
        } else {
            ctx.fill_rect(self.bounds(), self.color);
        }
    }
}
