//! Error taxonomy for topology queries, construction and interventions
//!
//! Everything here is a deterministic validation failure. Nothing is retried
//! and no partial sample is ever returned alongside an error.

use thiserror::Error;

/// Errors surfaced by the engine.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScmError {
    /// A node index fell outside `[0, num_nodes)`.
    #[error("invalid node index {index} (tree has {num_nodes} nodes)")]
    InvalidIndex { index: usize, num_nodes: usize },

    /// An intervention was rejected before any sampling took place.
    #[error("invalid do() operation: {0}")]
    InvalidIntervention(#[from] InterventionError),

    /// Construction parameters do not describe a valid tree SCM.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Reasons an intervention set is not a valid do() operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InterventionError {
    #[error("node {0} is not a leaf")]
    NotALeaf(usize),

    #[error("value {value} for leaf {index} is not 0 or 1")]
    InvalidValue { index: usize, value: u8 },

    #[error("{indices} indices paired with {values} values")]
    LengthMismatch { indices: usize, values: usize },

    #[error("leaf {0} is intervened on more than once")]
    DuplicateLeaf(usize),
}

pub type Result<T> = std::result::Result<T, ScmError>;
