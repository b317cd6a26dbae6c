pub mod block;
pub mod entity;
pub mod input;
pub mod vector;

pub use block::{Block, Map};
pub use entity::{BoundingBox, Collider, CollisionResolution, Entity2D};
pub use input::{InputError, KeyboardState};
pub use vector::{Axis, Vector2};

use serde::{Deserialize, Serialize};

pub const PROTOCOL_VERSION: u32 = 1;
/// Width and height of every block and player box.
pub const HITBOX_SIZE: f32 = 20.0;
pub const MAX_PACKET_SIZE: usize = 2048;

pub type ClientId = u32;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum Packet {
    Join {
        client_version: u32,
    },
    /// Movement bitmask: 1=right, 2=up, 4=left, 8=down.
    Input {
        keys: u8,
    },
    Leave,

    Welcome {
        client_id: ClientId,
    },
    /// Static block coordinates, sent once after `Welcome`.
    Layout {
        blocks: Vec<[i32; 2]>,
    },
    /// Floored `[x, y]` of every player, identical for every recipient.
    State {
        positions: Vec<[i32; 2]>,
    },
    Rejected {
        reason: String,
    },
}

impl Packet {
    pub fn to_bytes(&self) -> bincode::Result<Vec<u8>> {
        bincode::serialize(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> bincode::Result<Self> {
        bincode::deserialize(bytes)
    }
}
