//! Multi-dimensional slot layout of a node.

use crate::types::{NodeId, TraceError, TraceResult, MAX_DIMENSIONS};

/// Sizes of each dimension of a node, e.g. `[4, 2]` for 4 banks of 2 ways.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    dims: Vec<u32>,
    capacity: u64,
}

impl Layout {
    /// Validate and build a layout for `node`.
    pub fn new(node: NodeId, dims: &[u32]) -> TraceResult<Self> {
        if dims.len() > MAX_DIMENSIONS {
            return Err(TraceError::TooManyDimensions {
                got: dims.len(),
                max: MAX_DIMENSIONS,
            });
        }
        if dims.is_empty() || dims.contains(&0) {
            return Err(TraceError::InvalidLayout(node));
        }
        let capacity = dims
            .iter()
            .try_fold(1u64, |acc, &d| acc.checked_mul(d as u64))
            .ok_or(TraceError::InvalidLayout(node))?;
        Ok(Self {
            dims: dims.to_vec(),
            capacity,
        })
    }

    pub fn dimensions(&self) -> &[u32] {
        &self.dims
    }

    /// Total number of slots.
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Check that `position` addresses a slot of this layout.
    pub fn validate(&self, node: NodeId, position: &[u32]) -> TraceResult<()> {
        if position.len() != self.dims.len() {
            return Err(TraceError::DimensionMismatch {
                node,
                expected: self.dims.len(),
                got: position.len(),
            });
        }
        for (dimension, (&p, &size)) in position.iter().zip(&self.dims).enumerate() {
            if p >= size {
                return Err(TraceError::PositionOutOfRange {
                    node,
                    dimension,
                    position: p,
                    size,
                });
            }
        }
        Ok(())
    }

    /// Row-major slot index of a validated position.
    pub fn flatten(&self, position: &[u32]) -> u64 {
        position
            .iter()
            .zip(&self.dims)
            .fold(0u64, |acc, (&p, &size)| acc * size as u64 + p as u64)
    }

    /// Inverse of [`flatten`](Self::flatten).
    pub fn unflatten(&self, mut slot: u64) -> Vec<u32> {
        let mut position = vec![0u32; self.dims.len()];
        for (p, &size) in position.iter_mut().zip(&self.dims).rev() {
            *p = (slot % size as u64) as u32;
            slot /= size as u64;
        }
        position
    }
}
