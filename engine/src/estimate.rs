//! Monte-Carlo estimation of reward and node marginals over repeated draws
//!
//! Draws are split into fixed-size chunks. Each chunk owns a ChaCha8 stream
//! derived from `(seed, chunk index)`, so the chunks run in parallel under
//! Rayon and the result depends only on `seed`, `draws` and `chunk_size`,
//! never on the number of worker threads. Only `&TreeScm` is shared between
//! workers.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use tracing::{info, trace};

use crate::error::{Result, ScmError};
use crate::intervention::Intervention;
use crate::scm::TreeScm;

/// Summary of many independent draws.
#[derive(Debug, Clone, PartialEq)]
pub struct Estimate {
    pub draws: usize,
    /// Mean of the root value across draws
    pub mean_reward: f64,
    /// Standard error of `mean_reward`
    pub std_error: f64,
    /// marginals[k] — fraction of draws in which node k was 1
    pub marginals: Vec<f64>,
}

/// Observational vs interventional reward, estimated with the same seed.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub observed: Estimate,
    pub intervened: Estimate,
    /// intervened.mean_reward - observed.mean_reward
    pub effect: f64,
}

/// Per-chunk counts, merged after the parallel map.
#[derive(Debug, Clone)]
struct Tally {
    draws: usize,
    ones: Vec<u64>,
}

impl Tally {
    fn empty(num_nodes: usize) -> Self {
        Tally {
            draws: 0,
            ones: vec![0; num_nodes],
        }
    }

    fn merge(mut self, other: Tally) -> Tally {
        self.draws += other.draws;
        for (a, b) in self.ones.iter_mut().zip(other.ones) {
            *a += b;
        }
        self
    }
}

/// Parallel Monte-Carlo driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonteCarlo {
    pub draws: usize,
    pub seed: u64,
    pub chunk_size: usize,
}

impl Default for MonteCarlo {
    fn default() -> Self {
        MonteCarlo {
            draws: 10_000,
            seed: 8,
            chunk_size: 1_024,
        }
    }
}

impl MonteCarlo {
    pub fn new(draws: usize, seed: u64) -> Self {
        MonteCarlo {
            draws,
            seed,
            ..Default::default()
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Estimate under no intervention.
    pub fn observe(&self, scm: &TreeScm) -> Result<Estimate> {
        self.run(scm, None)
    }

    /// Estimate under a validated intervention.
    pub fn intervene(&self, scm: &TreeScm, intervention: &Intervention) -> Result<Estimate> {
        scm.check_intervention(intervention)?;
        self.run(scm, Some(intervention))
    }

    /// Estimate both regimes and the causal effect of the intervention on reward.
    pub fn compare(&self, scm: &TreeScm, intervention: &Intervention) -> Result<Comparison> {
        let observed = self.observe(scm)?;
        let intervened = self.intervene(scm, intervention)?;
        let effect = intervened.mean_reward - observed.mean_reward;
        info!(
            observed = observed.mean_reward,
            intervened = intervened.mean_reward,
            effect,
            "compared regimes"
        );
        Ok(Comparison {
            observed,
            intervened,
            effect,
        })
    }

    fn run(&self, scm: &TreeScm, intervention: Option<&Intervention>) -> Result<Estimate> {
        if self.draws == 0 {
            return Err(ScmError::InvalidParameter("draws must be positive".to_string()));
        }
        if self.chunk_size == 0 {
            return Err(ScmError::InvalidParameter("chunk_size must be positive".to_string()));
        }

        let num_nodes = scm.num_nodes();
        let num_chunks = self.draws.div_ceil(self.chunk_size);

        let tally = (0..num_chunks)
            .into_par_iter()
            .map(|chunk| {
                let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
                rng.set_stream(chunk as u64);
                let n = self.chunk_size.min(self.draws - chunk * self.chunk_size);
                trace!(chunk, draws = n, "sampling chunk");

                let mut tally = Tally::empty(num_nodes);
                for _ in 0..n {
                    let sample = scm.draw(intervention, &mut rng);
                    for (count, &v) in tally.ones.iter_mut().zip(sample.values()) {
                        *count += v as u64;
                    }
                }
                tally.draws = n;
                tally
            })
            .reduce(|| Tally::empty(num_nodes), Tally::merge);

        let n = tally.draws as f64;
        let marginals: Vec<f64> = tally.ones.iter().map(|&c| c as f64 / n).collect();
        let mean_reward = marginals[0];
        let std_error = (mean_reward * (1.0 - mean_reward) / n).sqrt();

        info!(
            draws = tally.draws,
            intervened = intervention.map_or(0, |i| i.len()),
            mean_reward,
            std_error,
            "estimated reward"
        );

        Ok(Estimate {
            draws: tally.draws,
            mean_reward,
            std_error,
            marginals,
        })
    }
}
