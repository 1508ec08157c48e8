//! Validated do() sets over leaf nodes
//!
//! An `Intervention` is checked once against a topology and can then be
//! reused for any number of draws. Only leaves can be intervened on, values
//! must be 0 or 1, and each leaf may appear at most once.

use crate::error::{InterventionError, Result};
use crate::node::{NodeId, Topology};

/// Hard intervention fixing a set of leaves to given values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Intervention {
    topology: Topology,
    /// overrides[leaf_position] — forced value, or None to sample normally
    overrides: Vec<Option<u8>>,
    /// (node, value) pairs in the order supplied
    pairs: Vec<(NodeId, u8)>,
}

impl Intervention {
    /// Validate `indices`/`values` as positionally paired leaf assignments.
    ///
    /// Nothing is constructed unless every pair is valid.
    pub fn new(topology: &Topology, indices: &[NodeId], values: &[u8]) -> Result<Self> {
        if indices.len() != values.len() {
            return Err(InterventionError::LengthMismatch {
                indices: indices.len(),
                values: values.len(),
            }
            .into());
        }
        for &index in indices {
            // out-of-range indices are simply not leaves here
            if !topology.is_leaf(index).unwrap_or(false) {
                return Err(InterventionError::NotALeaf(index).into());
            }
        }
        for (&index, &value) in indices.iter().zip(values) {
            if value > 1 {
                return Err(InterventionError::InvalidValue { index, value }.into());
            }
        }

        let offset = topology.num_internal();
        let mut overrides = vec![None; topology.num_leaves()];
        for (&index, &value) in indices.iter().zip(values) {
            let slot = &mut overrides[index - offset];
            if slot.is_some() {
                return Err(InterventionError::DuplicateLeaf(index).into());
            }
            *slot = Some(value);
        }

        Ok(Intervention {
            topology: *topology,
            overrides,
            pairs: indices.iter().copied().zip(values.iter().copied()).collect(),
        })
    }

    /// The empty intervention: every leaf keeps its Bernoulli law.
    pub fn none(topology: &Topology) -> Self {
        Intervention {
            topology: *topology,
            overrides: vec![None; topology.num_leaves()],
            pairs: Vec::new(),
        }
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Forced value for the leaf at `leaf_position`, if any.
    pub fn forced(&self, leaf_position: usize) -> Option<u8> {
        self.overrides.get(leaf_position).copied().flatten()
    }

    pub fn pairs(&self) -> &[(NodeId, u8)] {
        &self.pairs
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }
}
