//! covtree Tree Builder - SCM construction from parameters
//!
//! This crate turns a parameter set (degree, depth, leaf probability, mu,
//! epsilon) into a `TreeScm` and provides the standard intervention
//! scenarios run against it.

pub mod scenario;

use covtree_engine::{Result, TreeScm};
use tracing::debug;

pub use scenario::Scenario;

/// Parameters of a tree SCM.
///
/// The defaults are the reference run: a ternary tree of depth 4 whose leaves
/// never fire on their own, mu = 0.05 and epsilon = 0.05.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeParams {
    /// Children per internal node (>= 2)
    pub degree: usize,
    /// Depth; the root is layer 0 and the leaves are layer `num_layers` (>= 2)
    pub num_layers: usize,
    /// Base P(leaf = 1) shared by all leaves
    pub leaf_prob: f64,
    /// Baseline P(penultimate = 1)
    pub mu: f64,
    /// Bonus for the chosen penultimate node when all its children are 1
    pub epsilon: f64,
}

impl Default for TreeParams {
    fn default() -> Self {
        TreeParams {
            degree: 3,
            num_layers: 4,
            leaf_prob: 0.0,
            mu: 0.05,
            epsilon: 0.05,
        }
    }
}

impl TreeParams {
    /// Build the SCM described by these parameters.
    pub fn build(&self) -> Result<TreeScm> {
        debug!(params = ?self, "building tree SCM");
        TreeScm::new(self.degree, self.num_layers, self.leaf_prob, self.mu, self.epsilon)
    }
}

/// Build an SCM with the reference parameters.
pub fn build_tree() -> Result<TreeScm> {
    TreeParams::default().build()
}
