//! Four-key movement input packed into the low bits of one byte.

use thiserror::Error;

pub const RIGHT: u8 = 1;
pub const UP: u8 = 2;
pub const LEFT: u8 = 4;
pub const DOWN: u8 = 8;
/// Every bit that carries meaning.
pub const INPUT_MASK: u8 = RIGHT | UP | LEFT | DOWN;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
    #[error("input value {0} is outside 0..=15")]
    OutOfRange(u8),
}

/// Which movement keys are held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyboardState {
    pub right: bool,
    pub up: bool,
    pub left: bool,
    pub down: bool,
}

impl KeyboardState {
    /// Decodes a bitmask, highest bit first. Bits above the four key bits
    /// are ignored.
    pub fn decode(encoded: u8) -> Self {
        let bits = encoded & INPUT_MASK;
        Self {
            down: bits & DOWN != 0,
            left: bits & LEFT != 0,
            up: bits & UP != 0,
            right: bits & RIGHT != 0,
        }
    }

    /// Like `decode`, but refuses values with bits outside the key mask.
    pub fn decode_strict(encoded: u8) -> Result<Self, InputError> {
        if encoded & !INPUT_MASK != 0 {
            return Err(InputError::OutOfRange(encoded));
        }
        Ok(Self::decode(encoded))
    }

    pub fn encode(&self) -> u8 {
        let mut encoded = 0;
        if self.right {
            encoded |= RIGHT;
        }
        if self.up {
            encoded |= UP;
        }
        if self.left {
            encoded |= LEFT;
        }
        if self.down {
            encoded |= DOWN;
        }
        encoded
    }

    /// Unit steps along each axis in screen space (y grows downward).
    /// Opposing keys cancel out.
    pub fn direction(&self) -> (f32, f32) {
        let axis = |positive: bool, negative: bool| match (positive, negative) {
            (true, false) => 1.0,
            (false, true) => -1.0,
            _ => 0.0,
        };
        (axis(self.right, self.left), axis(self.down, self.up))
    }

    pub fn is_idle(&self) -> bool {
        self.encode() == 0
    }
}
