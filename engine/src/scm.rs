//! Stochastic tree SCM: construction and the two sampling entry points
//!
//! Every draw walks the node array from the last index down to the root.
//! Children always have larger indices than their parent, so each node sees
//! its children's values already realised. Per node:
//!   - Leaf:          Bernoulli(leaf base probability), unless intervened on
//!   - Chosen parent: Bernoulli(mu + epsilon) if all d children are 1,
//!                    otherwise Bernoulli(mu)
//!   - Penultimate:   Bernoulli(mu), children ignored
//!   - Internal:      1 if any child is 1 (OR), including the root
//!
//! Randomness is always supplied by the caller, so an instance can be shared
//! across threads as long as each thread owns its own stream.

use rand::Rng;
use tracing::debug;

use crate::error::{Result, ScmError};
use crate::intervention::Intervention;
use crate::node::{NodeId, NodeKind, Topology};
use crate::sample::Sample;

fn check_probability(name: &str, p: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&p) {
        return Err(ScmError::InvalidParameter(format!(
            "{name} must be a probability in [0, 1], got {p}"
        )));
    }
    Ok(())
}

/// Complete d-ary tree of boolean variables with the layer-dependent law above.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeScm {
    topology: Topology,
    /// leaf_base_prob[leaf_position] — P(leaf = 1) without intervention
    leaf_base_prob: Vec<f64>,
    mu: f64,
    epsilon: f64,
}

impl TreeScm {
    /// Construct a tree SCM with every leaf sharing `initial_leaf_prob`.
    pub fn new(
        degree: usize,
        num_layers: usize,
        initial_leaf_prob: f64,
        mu: f64,
        epsilon: f64,
    ) -> Result<Self> {
        let topology = Topology::new(degree, num_layers)?;
        check_probability("initial_leaf_prob", initial_leaf_prob)?;
        check_probability("mu", mu)?;
        check_probability("epsilon", epsilon)?;
        check_probability("mu + epsilon", mu + epsilon)?;

        debug!(
            degree,
            num_layers,
            num_nodes = topology.num_nodes(),
            num_leaves = topology.num_leaves(),
            chosen = topology.distinguished_penultimate_index(),
            "built tree SCM"
        );

        Ok(TreeScm {
            topology,
            leaf_base_prob: vec![initial_leaf_prob; topology.num_leaves()],
            mu,
            epsilon,
        })
    }

    /// Override the base probability of a single leaf (by node index).
    pub fn with_leaf_probability(mut self, leaf: NodeId, p: f64) -> Result<Self> {
        check_probability("leaf probability", p)?;
        let pos = self.topology.leaf_position(leaf)?;
        self.leaf_base_prob[pos] = p;
        Ok(self)
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn mu(&self) -> f64 {
        self.mu
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn leaf_base_probs(&self) -> &[f64] {
        &self.leaf_base_prob
    }

    pub fn num_nodes(&self) -> usize {
        self.topology.num_nodes()
    }

    pub fn parent_of(&self, k: NodeId) -> Result<Option<NodeId>> {
        self.topology.parent_of(k)
    }

    pub fn children_of(&self, k: NodeId) -> Result<std::ops::Range<NodeId>> {
        self.topology.children_of(k)
    }

    pub fn distinguished_penultimate_index(&self) -> NodeId {
        self.topology.distinguished_penultimate_index()
    }

    /// Draw every node with no intervention.
    pub fn observe<R: Rng + ?Sized>(&self, rng: &mut R) -> Sample {
        self.draw(None, rng)
    }

    /// Draw every node with `indices[i]` forced to `values[i]`.
    ///
    /// Fails with `InvalidIntervention` before consuming any randomness.
    pub fn intervene<R: Rng + ?Sized>(
        &self,
        indices: &[NodeId],
        values: &[u8],
        rng: &mut R,
    ) -> Result<Sample> {
        let intervention = Intervention::new(&self.topology, indices, values)?;
        Ok(self.draw(Some(&intervention), rng))
    }

    /// Draw with a pre-validated intervention.
    pub fn intervene_with<R: Rng + ?Sized>(
        &self,
        intervention: &Intervention,
        rng: &mut R,
    ) -> Result<Sample> {
        self.check_intervention(intervention)?;
        Ok(self.draw(Some(intervention), rng))
    }

    pub(crate) fn check_intervention(&self, intervention: &Intervention) -> Result<()> {
        if *intervention.topology() != self.topology {
            return Err(ScmError::InvalidParameter(
                "intervention was built for a different tree".to_string(),
            ));
        }
        Ok(())
    }

    pub(crate) fn draw<R: Rng + ?Sized>(
        &self,
        intervention: Option<&Intervention>,
        rng: &mut R,
    ) -> Sample {
        let t = &self.topology;
        let offset = t.num_internal();
        let mut values = vec![0u8; t.num_nodes()];

        for k in (0..t.num_nodes()).rev() {
            values[k] = match t.kind_unchecked(k) {
                NodeKind::Leaf => {
                    let pos = k - offset;
                    match intervention.and_then(|i| i.forced(pos)) {
                        Some(v) => v,
                        None => rng.gen_bool(self.leaf_base_prob[pos]) as u8,
                    }
                }
                NodeKind::ChosenParent => {
                    let p = if children_sum(&values, t, k) == t.degree() {
                        self.mu + self.epsilon
                    } else {
                        self.mu
                    };
                    rng.gen_bool(p) as u8
                }
                NodeKind::Penultimate => rng.gen_bool(self.mu) as u8,
                NodeKind::Internal => (children_sum(&values, t, k) > 0) as u8,
            };
        }

        Sample::from_values(values)
    }

    /// Exact P(reward = 1) under the given intervention.
    ///
    /// Penultimate nodes are mutually independent and the root is the OR of
    /// all of them, so
    /// `P = 1 - (1 - mu)^(P_count - 1) * (1 - p_chosen)` with
    /// `p_chosen = mu + epsilon * P(all chosen children are 1)`.
    pub fn expected_reward(&self, intervention: Option<&Intervention>) -> Result<f64> {
        if let Some(i) = intervention {
            self.check_intervention(i)?;
        }
        let t = &self.topology;
        let offset = t.num_internal();
        let all_ones: f64 = t
            .children_unchecked(t.distinguished_penultimate_index())
            .map(|c| {
                let pos = c - offset;
                match intervention.and_then(|i| i.forced(pos)) {
                    Some(v) => v as f64,
                    None => self.leaf_base_prob[pos],
                }
            })
            .product();
        let p_chosen = self.mu + self.epsilon * all_ones;
        let others = (1.0 - self.mu).powf((t.num_penultimate() - 1) as f64);
        Ok(1.0 - others * (1.0 - p_chosen))
    }
}

fn children_sum(values: &[u8], t: &Topology, k: NodeId) -> usize {
    values[t.children_unchecked(k)]
        .iter()
        .map(|&v| v as usize)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InterventionError;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn reference(leaf_prob: f64) -> TreeScm {
        TreeScm::new(3, 4, leaf_prob, 0.05, 0.05).unwrap()
    }

    #[test]
    fn test_sample_length_and_domain() {
        let scm = reference(0.3);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let s = scm.observe(&mut rng);
        assert_eq!(s.len(), 121);
        assert!(s.values().iter().all(|&v| v <= 1));
    }

    #[test]
    fn test_zero_leaf_probability_gives_zero_leaves() {
        let scm = reference(0.0);
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        for _ in 0..200 {
            let s = scm.observe(&mut rng);
            assert!(s.values()[40..].iter().all(|&v| v == 0));
        }
    }

    #[test]
    fn test_internal_nodes_are_or_of_children() {
        let scm = reference(0.3);
        let t = *scm.topology();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..200 {
            let s = scm.observe(&mut rng);
            for k in 0..t.first_penultimate_index() {
                let any = t.children_of(k).unwrap().any(|c| s[c] == 1);
                assert_eq!(s[k], any as u8, "node {} is not the OR of its children", k);
            }
        }
    }

    #[test]
    fn test_intervention_overrides_leaf_law() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let never = reference(0.0);
        let always = reference(1.0);
        for _ in 0..100 {
            assert_eq!(never.intervene(&[57], &[1], &mut rng).unwrap()[57], 1);
            assert_eq!(always.intervene(&[57], &[0], &mut rng).unwrap()[57], 0);
            // untouched leaves keep their law
            assert_eq!(always.intervene(&[57], &[0], &mut rng).unwrap()[58], 1);
        }
    }

    #[test]
    fn test_invalid_intervention_consumes_no_randomness() {
        let scm = reference(0.5);
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut untouched = rng.clone();

        let err = scm.intervene(&[39], &[1], &mut rng).unwrap_err();
        assert_eq!(err, ScmError::InvalidIntervention(InterventionError::NotALeaf(39)));
        let err = scm.intervene(&[118], &[2], &mut rng).unwrap_err();
        assert_eq!(
            err,
            ScmError::InvalidIntervention(InterventionError::InvalidValue {
                index: 118,
                value: 2,
            })
        );

        assert_eq!(rng.gen::<u64>(), untouched.gen::<u64>());
    }

    #[test]
    fn test_same_seed_same_draws() {
        let scm = reference(0.4);
        let mut a = ChaCha8Rng::seed_from_u64(9);
        let mut b = ChaCha8Rng::seed_from_u64(9);
        for _ in 0..20 {
            assert_eq!(scm.observe(&mut a), scm.observe(&mut b));
        }
    }

    #[test]
    fn test_degenerate_mu() {
        let mut rng = ChaCha8Rng::seed_from_u64(6);
        let silent = TreeScm::new(2, 3, 1.0, 0.0, 0.0).unwrap();
        let loud = TreeScm::new(2, 3, 0.0, 1.0, 0.0).unwrap();
        for _ in 0..50 {
            assert_eq!(silent.observe(&mut rng).reward(), 0);
            assert_eq!(loud.observe(&mut rng).reward(), 1);
        }
    }

    fn chosen_frequency(scm: &TreeScm, forced: bool, draws: usize, seed: u64) -> f64 {
        let chosen = scm.distinguished_penultimate_index();
        let leaves: Vec<NodeId> = scm.children_of(chosen).unwrap().collect();
        let ones = vec![1u8; leaves.len()];
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut hits = 0usize;
        for _ in 0..draws {
            let s = if forced {
                scm.intervene(&leaves, &ones, &mut rng).unwrap()
            } else {
                scm.observe(&mut rng)
            };
            hits += s[chosen] as usize;
        }
        hits as f64 / draws as f64
    }

    #[test]
    fn test_boost_applies_when_all_children_are_one() {
        let scm = reference(0.0);
        let boosted = chosen_frequency(&scm, true, 40_000, 10);
        let baseline = chosen_frequency(&scm, false, 40_000, 11);
        assert!((boosted - 0.10).abs() < 0.015, "boosted frequency {}", boosted);
        assert!((baseline - 0.05).abs() < 0.015, "baseline frequency {}", baseline);
    }

    #[test]
    fn test_boost_via_leaf_probabilities() {
        let scm = reference(0.0)
            .with_leaf_probability(118, 1.0)
            .and_then(|s| s.with_leaf_probability(119, 1.0))
            .and_then(|s| s.with_leaf_probability(120, 1.0))
            .unwrap();
        let freq = chosen_frequency(&scm, false, 40_000, 12);
        assert!((freq - 0.10).abs() < 0.015, "frequency {}", freq);
    }

    #[test]
    fn test_partial_children_do_not_boost() {
        let scm = reference(0.0);
        let mut rng = ChaCha8Rng::seed_from_u64(13);
        let mut hits = 0usize;
        let draws = 40_000;
        for _ in 0..draws {
            hits += scm.intervene(&[118, 119], &[1, 1], &mut rng).unwrap()[39] as usize;
        }
        let freq = hits as f64 / draws as f64;
        assert!((freq - 0.05).abs() < 0.015, "frequency {}", freq);
    }

    #[test]
    fn test_mean_reward_regression() {
        let scm = reference(0.0);
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let draws = 10_000;
        let total: usize = (0..draws).map(|_| scm.observe(&mut rng).reward() as usize).sum();
        let mean = total as f64 / draws as f64;
        let exact = scm.expected_reward(None).unwrap();
        assert!(mean > 0.0);
        assert!((mean - exact).abs() < 0.03, "mean {} vs exact {}", mean, exact);
    }

    #[test]
    fn test_expected_reward_closed_form() {
        let scm = reference(0.0);
        let observed = scm.expected_reward(None).unwrap();
        assert!((observed - (1.0 - 0.95f64.powi(27))).abs() < 1e-12);

        let doing = Intervention::new(scm.topology(), &[118, 119, 120], &[1, 1, 1]).unwrap();
        let intervened = scm.expected_reward(Some(&doing)).unwrap();
        assert!((intervened - (1.0 - 0.95f64.powi(26) * 0.90)).abs() < 1e-12);
        assert!(intervened > observed);
    }

    #[test]
    fn test_oversize_tree_rejected_before_allocating() {
        for (degree, layers) in [(2, 62), (2, 40), (3, 30)] {
            assert!(
                matches!(
                    TreeScm::new(degree, layers, 0.0, 0.05, 0.05),
                    Err(ScmError::InvalidParameter(_))
                ),
                "accepted degree={} layers={}",
                degree,
                layers
            );
        }
    }

    #[test]
    fn test_expected_reward_wide_penultimate_layer() {
        // 2^19 penultimate nodes
        let scm = TreeScm::new(2, 20, 0.0, 1e-6, 0.0).unwrap();
        let exact = 1.0 - (1.0 - 1e-6f64).powf((1u64 << 19) as f64);
        let got = scm.expected_reward(None).unwrap();
        assert!((got - exact).abs() < 1e-12, "{} vs {}", got, exact);
        assert!(got > 0.4 && got < 0.5);
    }

    #[test]
    fn test_foreign_intervention_rejected() {
        let scm = reference(0.0);
        let other = Topology::new(2, 3).unwrap();
        let doing = Intervention::none(&other);
        let mut rng = ChaCha8Rng::seed_from_u64(14);
        assert!(matches!(
            scm.intervene_with(&doing, &mut rng),
            Err(ScmError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_invalid_probabilities_rejected() {
        let cases = [
            (1.5, 0.05, 0.05),
            (0.0, -0.1, 0.05),
            (0.0, 0.6, 0.5),
            (f64::NAN, 0.1, 0.1),
        ];
        for (leaf, mu, eps) in cases {
            assert!(
                matches!(TreeScm::new(3, 4, leaf, mu, eps), Err(ScmError::InvalidParameter(_))),
                "accepted leaf={} mu={} eps={}",
                leaf,
                mu,
                eps
            );
        }
        assert!(reference(0.0).with_leaf_probability(39, 0.5).is_err());
        assert!(reference(0.0).with_leaf_probability(118, 1.2).is_err());
    }

    #[test]
    fn test_scm_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TreeScm>();
        assert_send_sync::<Intervention>();
    }
}
