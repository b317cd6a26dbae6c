//! Moving entities, their bounding boxes, and the per-tick integration step.
//!
//! Boxes are anchored at their TOP-LEFT corner: an entity at `position`
//! occupies `[x, x + w) × [y, y + h)`. Blocks and entities share this
//! convention, which the collision snap relies on.

use crate::block::Block;
use crate::vector::{Axis, Vector2};
use crate::HITBOX_SIZE;
use log::warn;
use std::time::Instant;

/// Axis-aligned rectangle anchored at its top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Top-left corner.
    pub min: Vector2,
    /// Full width and height.
    pub size: Vector2,
}

impl BoundingBox {
    pub fn new(min: Vector2, size: Vector2) -> Self {
        Self { min, size }
    }

    /// Bottom-right corner.
    pub fn max(&self) -> Vector2 {
        Vector2::new(self.min.x() + self.size.x(), self.min.y() + self.size.y())
    }

    /// Strict overlap test. Boxes that only share an edge do not overlap.
    pub fn overlaps(&self, other: &BoundingBox) -> bool {
        self.min.x() < other.min.x() + other.size.x()
            && self.min.x() + self.size.x() > other.min.x()
            && self.min.y() < other.min.y() + other.size.y()
            && self.min.y() + self.size.y() > other.min.y()
    }
}

/// Anything that occupies a box in the world.
pub trait Collider {
    fn bounding_box(&self) -> BoundingBox;
}

/// How an entity is pushed out when it overlaps several blocks on one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CollisionResolution {
    /// Apply the smallest correction that clears every overlapping block:
    /// snap against the contact face the entity reached first.
    #[default]
    MinimumCorrection,
    /// Walk blocks in layout order and snap against each overlapping one.
    /// The last overlapping block decides the final position.
    LastBlockWins,
}

/// Base moving entity: kinematics, a collidable box and its own clock.
#[derive(Debug, Clone)]
pub struct Entity2D {
    pub position: Vector2,
    pub velocity: Vector2,
    /// Consumed once per step, then reset to zero.
    pub acceleration: Vector2,
    /// Radians. Not used by collision.
    pub orientation: f32,
    /// Not used by the integrator.
    pub mass: f32,
    /// Legacy radius, superseded by `hitbox_dimensions`.
    pub hitbox: f32,
    pub hitbox_dimensions: Vector2,
    /// Unset until the first update.
    pub last_update: Option<Instant>,
    /// Seconds consumed by the most recent step.
    pub delta_time: f32,
}

impl Default for Entity2D {
    fn default() -> Self {
        Entity2D {
            position: Vector2::ZERO,
            velocity: Vector2::ZERO,
            acceleration: Vector2::ZERO,
            orientation: 0.0,
            mass: 1.0,
            hitbox: 0.0,
            hitbox_dimensions: Vector2::new(HITBOX_SIZE, HITBOX_SIZE),
            last_update: None,
            delta_time: 0.0,
        }
    }
}

impl Collider for Entity2D {
    fn bounding_box(&self) -> BoundingBox {
        BoundingBox::new(self.position, self.hitbox_dimensions)
    }
}

impl Entity2D {
    pub fn new(position: Vector2) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    pub fn x(&self) -> f32 {
        self.position.x()
    }

    pub fn y(&self) -> f32 {
        self.position.y()
    }

    pub fn is_collided_with(&self, other: &impl Collider) -> bool {
        self.bounding_box().overlaps(&other.bounding_box())
    }

    /// True when every kinematic value is a finite number.
    pub fn is_finite(&self) -> bool {
        self.position.is_finite()
            && self.velocity.is_finite()
            && self.acceleration.is_finite()
            && self.hitbox_dimensions.is_finite()
    }

    /// Measures elapsed wall-clock time since the previous call.
    ///
    /// The first call has nothing to measure against and yields zero.
    /// Elapsed time above `max_delta` seconds is clamped to it.
    pub fn advance_clock(&mut self, now: Instant, max_delta: f32) -> f32 {
        let elapsed = match self.last_update {
            Some(last) => now.saturating_duration_since(last).as_secs_f32(),
            None => 0.0,
        };
        self.last_update = Some(now);

        self.delta_time = if elapsed > max_delta {
            warn!(
                "Large delta time detected ({:.3}s), capping to {:.3}s",
                elapsed, max_delta
            );
            max_delta
        } else {
            elapsed
        };
        self.delta_time
    }

    /// Advances the entity by the wall-clock time since its last update and
    /// pushes it out of any block it ran into.
    pub fn update(
        &mut self,
        now: Instant,
        blocks: &[Block],
        max_delta: f32,
        resolution: CollisionResolution,
    ) {
        let dt = self.advance_clock(now, max_delta);
        self.integrate(dt, blocks, resolution);
    }

    /// Moves the entity by `dt` seconds, one axis at a time.
    ///
    /// Each axis is integrated and then corrected against every block before
    /// the next axis moves, so x is settled before y is considered.
    pub fn integrate(&mut self, dt: f32, blocks: &[Block], resolution: CollisionResolution) {
        self.delta_time = dt;
        for axis in Axis::ALL {
            self.position[axis] += self.velocity[axis] * dt;
            self.resolve_axis(axis, blocks, resolution);
            self.velocity[axis] += self.acceleration[axis] * dt;
        }
        self.acceleration = Vector2::ZERO;
    }

    /// Resolves overlaps produced by movement along `axis`. Returns true if
    /// the entity was snapped.
    fn resolve_axis(
        &mut self,
        axis: Axis,
        blocks: &[Block],
        resolution: CollisionResolution,
    ) -> bool {
        let dir = direction(self.velocity[axis]);
        if dir == 0 {
            return false;
        }

        let collided = match resolution {
            CollisionResolution::LastBlockWins => {
                let mut collided = false;
                for block in blocks {
                    if self.is_collided_with(block) {
                        self.position[axis] = self.contact_position(axis, dir, block);
                        collided = true;
                    }
                }
                collided
            }
            CollisionResolution::MinimumCorrection => {
                let contacts = blocks
                    .iter()
                    .filter(|b| self.is_collided_with(*b))
                    .map(|b| self.contact_position(axis, dir, b));
                // The face reached first along the motion clears every block.
                let target = if dir > 0 {
                    contacts.reduce(f32::min)
                } else {
                    contacts.reduce(f32::max)
                };
                match target {
                    Some(target) => {
                        self.position[axis] = target;
                        true
                    }
                    None => false,
                }
            }
        };

        if collided {
            self.velocity[axis] = 0.0;
        }
        collided
    }

    /// Position on `axis` that puts this entity flush against the face of
    /// `block` it was moving toward.
    ///
    /// With equal box sizes this is
    /// `block.pos - block.size / 2 * dir - self.size / 2 * dir`.
    fn contact_position(&self, axis: Axis, dir: i8, block: &Block) -> f32 {
        let bounds = block.bounding_box();
        if dir > 0 {
            bounds.min[axis] - self.hitbox_dimensions[axis]
        } else {
            bounds.max()[axis]
        }
    }
}

/// Sign of a velocity component as -1, 0 or +1. Zero (and NaN) map to 0.
pub fn direction(value: f32) -> i8 {
    if value > 0.0 {
        1
    } else if value < 0.0 {
        -1
    } else {
        0
    }
}
