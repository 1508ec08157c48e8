//! CLI argument definitions using clap

use clap::{ArgAction, Args, Parser, Subcommand};
use covtree_engine::NodeId;
use covtree_tree::{Scenario, TreeParams};

/// Sample a stochastic tree SCM and estimate the effect of leaf interventions on its root
#[derive(Parser, Debug)]
#[command(name = "covtree")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase log verbosity (-d info, -dd debug, -ddd trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub debug: u8,

    #[command(flatten)]
    pub tree: TreeArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Tree and sampling parameters shared by every subcommand
#[derive(Args, Debug, Clone)]
pub struct TreeArgs {
    /// Children per internal node
    #[arg(long, env = "COVTREE_DEGREE", default_value_t = 3, global = true)]
    pub degree: usize,

    /// Tree depth (root is layer 0, leaves are layer LAYERS)
    #[arg(long, env = "COVTREE_LAYERS", default_value_t = 4, global = true)]
    pub layers: usize,

    /// Base probability of every leaf being 1
    #[arg(long, env = "COVTREE_LEAF_PROB", default_value_t = 0.0, global = true)]
    pub leaf_prob: f64,

    /// Baseline probability of a penultimate node being 1
    #[arg(long, env = "COVTREE_MU", default_value_t = 0.05, global = true)]
    pub mu: f64,

    /// Bonus for the chosen penultimate node when all its children are 1
    #[arg(long, env = "COVTREE_EPSILON", default_value_t = 0.05, global = true)]
    pub epsilon: f64,

    /// Seed for the random stream
    #[arg(long, env = "COVTREE_SEED", default_value_t = 8, global = true)]
    pub seed: u64,

    /// Number of draws for reward estimates
    #[arg(long, env = "COVTREE_DRAWS", default_value_t = 10_000, global = true)]
    pub draws: usize,
}

impl TreeArgs {
    pub fn params(&self) -> TreeParams {
        TreeParams {
            degree: self.degree,
            num_layers: self.layers,
            leaf_prob: self.leaf_prob,
            mu: self.mu,
            epsilon: self.epsilon,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print parent and children of every node
    Topology,

    /// Draw one sample and estimate the mean reward with no intervention
    Observe,

    /// Draw one sample and estimate the mean reward under a do() on leaves
    Intervene {
        #[command(flatten)]
        target: InterventionArgs,
    },

    /// Estimate observational vs interventional reward and their difference
    Compare {
        #[command(flatten)]
        target: InterventionArgs,
    },
}

/// Leaves to intervene on; defaults to every chosen leaf set to 1
#[derive(Args, Debug, Clone, Default)]
pub struct InterventionArgs {
    /// Leaf node index (repeatable, paired with --value)
    #[arg(long = "leaf")]
    pub leaves: Vec<NodeId>,

    /// Value forced on the matching --leaf (0 or 1)
    #[arg(long = "value")]
    pub values: Vec<u8>,
}

impl InterventionArgs {
    pub fn scenario(&self) -> Scenario {
        if self.leaves.is_empty() && self.values.is_empty() {
            Scenario::ChosenLeaves { value: 1 }
        } else {
            Scenario::Leaves {
                indices: self.leaves.clone(),
                values: self.values.clone(),
            }
        }
    }
}
