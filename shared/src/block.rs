use crate::entity::{BoundingBox, Collider};
use crate::vector::Vector2;
use crate::HITBOX_SIZE;

/// Static obstacle with a fixed 20×20 box. Immutable once built.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Block {
    position: Vector2,
    hitbox_dimensions: Vector2,
}

impl Block {
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            position: Vector2::new(x, y),
            hitbox_dimensions: Vector2::new(HITBOX_SIZE, HITBOX_SIZE),
        }
    }

    /// Builds a block from an integer layout entry.
    pub fn create(x: i32, y: i32) -> Self {
        Self::new(x as f32, y as f32)
    }

    pub fn position(&self) -> Vector2 {
        self.position
    }

    pub fn hitbox_dimensions(&self) -> Vector2 {
        self.hitbox_dimensions
    }

    pub fn x(&self) -> f32 {
        self.position.x()
    }

    pub fn y(&self) -> f32 {
        self.position.y()
    }
}

impl Collider for Block {
    fn bounding_box(&self) -> BoundingBox {
        BoundingBox::new(self.position, self.hitbox_dimensions)
    }
}

/// Ordered list of block spawn coordinates describing the static world.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Map {
    layout: Vec<[i32; 2]>,
}

impl Default for Map {
    /// The demo arena: four blocks around the middle of the field.
    fn default() -> Self {
        Self::new(vec![[256, 128], [256, 256], [128, 256], [128, 128]])
    }
}

impl Map {
    pub fn new(layout: Vec<[i32; 2]>) -> Self {
        Self { layout }
    }

    /// Coordinates in layout order.
    pub fn layout(&self) -> &[[i32; 2]] {
        &self.layout
    }

    /// Instantiates one block per layout entry, preserving order.
    pub fn blocks(&self) -> Vec<Block> {
        self.layout
            .iter()
            .map(|&[x, y]| Block::create(x, y))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.layout.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layout.is_empty()
    }
}
