//! covtree Engine - Stochastic tree SCM sampler
//!
//! This crate contains the index arithmetic for complete d-ary trees stored
//! as flat arrays, the layer-dependent sampling law, hard interventions on
//! leaves, and a parallel Monte-Carlo estimator for the root reward.
//!
//! The engine owns no global randomness: every sampling call takes the
//! caller's `Rng`.

pub mod error;
pub mod estimate;
pub mod intervention;
pub mod node;
pub mod sample;
pub mod scm;

pub use error::{InterventionError, Result, ScmError};
pub use estimate::{Comparison, Estimate, MonteCarlo};
pub use intervention::Intervention;
pub use node::{NodeId, NodeKind, Topology, MAX_NODES};
pub use sample::Sample;
pub use scm::TreeScm;
