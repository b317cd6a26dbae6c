use std::ops::{Index, IndexMut};

/// One of the two simulation axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
}

impl Axis {
    /// Axes in the order the integrator walks them.
    pub const ALL: [Axis; 2] = [Axis::X, Axis::Y];

    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
        }
    }
}

/// A 2-component value backed by a single `[f32; 2]`.
///
/// The named accessors (`x`, `y`) and indexing (by `Axis` or `usize`) all
/// address the same storage, so writes through one view are visible through
/// the other.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector2([f32; 2]);

impl Vector2 {
    pub const ZERO: Vector2 = Vector2([0.0, 0.0]);

    pub const fn new(x: f32, y: f32) -> Self {
        Vector2([x, y])
    }

    pub fn x(&self) -> f32 {
        self.0[0]
    }

    pub fn y(&self) -> f32 {
        self.0[1]
    }

    pub fn set_x(&mut self, x: f32) {
        self.0[0] = x;
    }

    pub fn set_y(&mut self, y: f32) {
        self.0[1] = y;
    }

    pub fn as_array(&self) -> &[f32; 2] {
        &self.0
    }

    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|v| v.is_finite())
    }

    /// Floors both components and converts to integers.
    ///
    /// The float to int cast saturates, so out-of-range values clamp to
    /// `i32::MIN`/`i32::MAX` instead of wrapping.
    pub fn floor_to_i32(&self) -> [i32; 2] {
        [self.0[0].floor() as i32, self.0[1].floor() as i32]
    }
}

impl From<[f32; 2]> for Vector2 {
    fn from(values: [f32; 2]) -> Self {
        Vector2(values)
    }
}

impl From<Vector2> for [f32; 2] {
    fn from(vector: Vector2) -> Self {
        vector.0
    }
}

impl Index<Axis> for Vector2 {
    type Output = f32;

    fn index(&self, axis: Axis) -> &f32 {
        &self.0[axis.index()]
    }
}

impl IndexMut<Axis> for Vector2 {
    fn index_mut(&mut self, axis: Axis) -> &mut f32 {
        &mut self.0[axis.index()]
    }
}

impl Index<usize> for Vector2 {
    type Output = f32;

    fn index(&self, index: usize) -> &f32 {
        &self.0[index]
    }
}

impl IndexMut<usize> for Vector2 {
    fn index_mut(&mut self, index: usize) -> &mut f32 {
        &mut self.0[index]
    }
}
