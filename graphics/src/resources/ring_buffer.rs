//! Fixed-size ring of per-frame resources.
//!
//! Rewriting a buffer the device may still be reading stalls the pipeline.
//! A [`FrameRing`] holds N copies of a resource and hands out a different
//! one each frame, so the CPU writes copy `k` while earlier frames still
//! read copies `k-1`, `k-2`, ...
//!
//! # Example
//!
//! ```ignore
//! let mut ring = FrameRing::new(vec![a, b, c])?;
//!
//! // Each frame, move to the next copy and write into it
//! ring.advance();
//! upload(ring.top_mut());
//! ```

use crate::error::{GraphicsError, GraphicsResult};

/// A ring of `N` resources with one current slot.
///
/// The ring starts on its last slot, so the first [`advance`](Self::advance)
/// lands on slot 0.
#[derive(Debug)]
pub struct FrameRing<T> {
    slots: Vec<T>,
    current: usize,
}

impl<T> FrameRing<T> {
    /// Create a ring over `slots`. An empty ring is rejected.
    pub fn new(slots: Vec<T>) -> GraphicsResult<Self> {
        if slots.is_empty() {
            return Err(GraphicsError::InvalidParameter(
                "frame ring needs at least one slot".to_string(),
            ));
        }
        let current = slots.len() - 1;
        Ok(Self { slots, current })
    }

    /// Move to the next slot, wrapping around.
    pub fn advance(&mut self) {
        self.current = (self.current + 1) % self.slots.len();
    }

    /// The current slot.
    pub fn top(&self) -> &T {
        &self.slots[self.current]
    }

    pub fn top_mut(&mut self) -> &mut T {
        &mut self.slots[self.current]
    }

    /// Index of the current slot.
    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.slots.get(index)
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Always false: rings have at least one slot.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.slots.iter()
    }

    pub fn into_inner(self) -> Vec<T> {
        self.slots
    }
}
