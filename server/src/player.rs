use shared::{Block, ClientId, CollisionResolution, Entity2D, KeyboardState, Vector2};
use std::time::Instant;

/// The movable entity owned by one connection.
#[derive(Debug, Clone)]
pub struct Player {
    pub id: ClientId,
    pub entity: Entity2D,
    pub speed: f32,
    /// Last decoded input, kept for logging and inspection.
    pub keys: KeyboardState,
}

impl Player {
    pub fn new(id: ClientId, spawn: Vector2, speed: f32) -> Self {
        Self {
            id,
            entity: Entity2D::new(spawn),
            speed,
            keys: KeyboardState::default(),
        }
    }

    pub fn position(&self) -> Vector2 {
        self.entity.position
    }

    pub fn velocity(&self) -> Vector2 {
        self.entity.velocity
    }

    /// Sets velocity straight from the held keys. Releasing every key stops
    /// the player on the next step.
    pub fn update_on_input(&mut self, keys: KeyboardState) {
        let (dx, dy) = keys.direction();
        self.entity.velocity = Vector2::new(dx * self.speed, dy * self.speed);
        self.keys = keys;
    }

    pub fn update(
        &mut self,
        now: Instant,
        blocks: &[Block],
        max_delta: f32,
        resolution: CollisionResolution,
    ) {
        self.entity.update(now, blocks, max_delta, resolution);
    }

    /// Snapshot coordinates sent to clients.
    pub fn floored_position(&self) -> [i32; 2] {
        self.entity.position.floor_to_i32()
    }
}
