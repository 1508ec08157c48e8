//! Node addressing for complete d-ary trees
//!
//! Nodes live in a flat array in breadth-first order: node 0 is the root and
//! the children of node k occupy `[d*k + 1, d*(k + 1)]`. There is no pointer
//! structure; parent, children, layer and role are all derived from the index.
//!
//! Layers are numbered from the root: the root is layer 0 and the leaves are
//! layer `num_layers`.

use std::ops::Range;

use crate::error::{Result, ScmError};

/// Node ID type (index into the flat sample array)
pub type NodeId = usize;

/// Largest tree accepted, in nodes. Every draw allocates one byte per node and
/// the estimator keeps a `u64` counter per node.
pub const MAX_NODES: usize = 1 << 28;

/// Role of a node in the sampling rule, in the order the rules are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Exogenous Bernoulli variable at the bottom layer
    Leaf,
    /// The last penultimate node; its law depends on all children being 1
    ChosenParent,
    /// Any other penultimate node; Bernoulli(mu) regardless of children
    Penultimate,
    /// Root and every node above the penultimate layer; OR of children
    Internal,
}

/// Shape of a complete d-ary tree and the index arithmetic over it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Topology {
    degree: usize,
    num_layers: usize,
    num_nodes: usize,
    num_leaves: usize,
    num_penultimate: usize,
}

impl Topology {
    /// Build the topology for a tree of the given degree and depth.
    ///
    /// Requires `degree >= 2` and `num_layers >= 2`; fails if the tree has more
    /// than `MAX_NODES` nodes.
    pub fn new(degree: usize, num_layers: usize) -> Result<Self> {
        if degree < 2 {
            return Err(ScmError::InvalidParameter(format!(
                "degree must be at least 2, got {degree}"
            )));
        }
        if num_layers < 2 {
            return Err(ScmError::InvalidParameter(format!(
                "num_layers must be at least 2, got {num_layers}"
            )));
        }

        let too_large = || {
            ScmError::InvalidParameter(format!(
                "tree with degree {degree} and {num_layers} layers is too large"
            ))
        };
        let exp = u32::try_from(num_layers).map_err(|_| too_large())?;
        let num_leaves = degree.checked_pow(exp).ok_or_else(too_large)?;
        let num_penultimate = num_leaves / degree;
        // (d^(k+1) - 1) / (d - 1), computed without forming d^(k+1)
        let num_internal = (num_leaves - 1) / (degree - 1);
        let num_nodes = num_internal.checked_add(num_leaves).ok_or_else(too_large)?;
        if num_nodes > MAX_NODES {
            return Err(ScmError::InvalidParameter(format!(
                "tree with degree {degree} and {num_layers} layers has {num_nodes} nodes, \
                 limit is {MAX_NODES}"
            )));
        }

        Ok(Topology {
            degree,
            num_layers,
            num_nodes,
            num_leaves,
            num_penultimate,
        })
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    pub fn num_layers(&self) -> usize {
        self.num_layers
    }

    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    pub fn num_leaves(&self) -> usize {
        self.num_leaves
    }

    pub fn num_internal(&self) -> usize {
        self.num_nodes - self.num_leaves
    }

    pub fn num_penultimate(&self) -> usize {
        self.num_penultimate
    }

    /// Index of the first penultimate node.
    pub fn first_penultimate_index(&self) -> NodeId {
        self.num_internal() - self.num_penultimate
    }

    /// The single penultimate node whose law reacts to its children.
    pub fn distinguished_penultimate_index(&self) -> NodeId {
        self.num_internal() - 1
    }

    fn check(&self, k: NodeId) -> Result<()> {
        if k >= self.num_nodes {
            return Err(ScmError::InvalidIndex {
                index: k,
                num_nodes: self.num_nodes,
            });
        }
        Ok(())
    }

    pub fn is_leaf(&self, k: NodeId) -> Result<bool> {
        self.check(k)?;
        Ok(k >= self.num_internal())
    }

    pub fn is_penultimate(&self, k: NodeId) -> Result<bool> {
        self.check(k)?;
        Ok((self.first_penultimate_index()..self.num_internal()).contains(&k))
    }

    pub fn is_chosen_penultimate_parent(&self, k: NodeId) -> Result<bool> {
        self.check(k)?;
        Ok(k == self.distinguished_penultimate_index())
    }

    /// Classify a node. Rules are checked leaf first, then the chosen parent,
    /// then the rest of the penultimate layer.
    pub fn kind(&self, k: NodeId) -> Result<NodeKind> {
        self.check(k)?;
        Ok(self.kind_unchecked(k))
    }

    pub(crate) fn kind_unchecked(&self, k: NodeId) -> NodeKind {
        if k >= self.num_internal() {
            NodeKind::Leaf
        } else if k == self.distinguished_penultimate_index() {
            NodeKind::ChosenParent
        } else if k >= self.first_penultimate_index() {
            NodeKind::Penultimate
        } else {
            NodeKind::Internal
        }
    }

    /// Parent of node k: `ceil(k / d) - 1`, or `None` for the root.
    pub fn parent_of(&self, k: NodeId) -> Result<Option<NodeId>> {
        self.check(k)?;
        if k == 0 {
            return Ok(None);
        }
        Ok(Some(k.div_ceil(self.degree) - 1))
    }

    /// Children of node k as the half-open range `d*k + 1 .. d*(k + 1) + 1`.
    /// Leaves yield an empty range.
    pub fn children_of(&self, k: NodeId) -> Result<Range<NodeId>> {
        if self.is_leaf(k)? {
            return Ok(0..0);
        }
        Ok(self.children_unchecked(k))
    }

    pub(crate) fn children_unchecked(&self, k: NodeId) -> Range<NodeId> {
        self.degree * k + 1..self.degree * (k + 1) + 1
    }

    /// Layer of node k, counting the root as layer 0.
    pub fn layer_of(&self, k: NodeId) -> Result<usize> {
        self.check(k)?;
        let mut layer = 0;
        let mut end = 1;
        let mut width = 1;
        while k >= end {
            width *= self.degree;
            end += width;
            layer += 1;
        }
        Ok(layer)
    }

    /// Index range of the given layer.
    pub fn layer_range(&self, layer: usize) -> Option<Range<NodeId>> {
        if layer > self.num_layers {
            return None;
        }
        let mut start = 0;
        let mut width = 1;
        for _ in 0..layer {
            start += width;
            width *= self.degree;
        }
        Some(start..start + width)
    }

    /// Position of leaf k within the leaf probability table.
    pub fn leaf_position(&self, k: NodeId) -> Result<usize> {
        if !self.is_leaf(k)? {
            return Err(ScmError::InvalidParameter(format!("node {k} is not a leaf")));
        }
        Ok(k - self.num_internal())
    }
}
