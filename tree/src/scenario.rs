//! Named intervention scenarios
//!
//! The scenario of interest forces every leaf under the chosen penultimate
//! parent to 1, which is the only pattern that activates the epsilon bonus.

use covtree_engine::{Intervention, NodeId, Result, TreeScm};

/// Which do() set to apply to a tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scenario {
    /// No intervention
    Observe,
    /// Force every child of the chosen penultimate parent to `value`
    ChosenLeaves { value: u8 },
    /// Force explicit (leaf, value) pairs
    Leaves {
        indices: Vec<NodeId>,
        values: Vec<u8>,
    },
}

impl Scenario {
    /// Leaves under the chosen penultimate parent.
    pub fn chosen_leaves(scm: &TreeScm) -> Result<Vec<NodeId>> {
        Ok(scm.children_of(scm.distinguished_penultimate_index())?.collect())
    }

    /// Resolve this scenario into a validated intervention for `scm`.
    pub fn intervention(&self, scm: &TreeScm) -> Result<Intervention> {
        match self {
            Scenario::Observe => Ok(Intervention::none(scm.topology())),
            Scenario::ChosenLeaves { value } => {
                let leaves = Self::chosen_leaves(scm)?;
                let values = vec![*value; leaves.len()];
                Intervention::new(scm.topology(), &leaves, &values)
            }
            Scenario::Leaves { indices, values } => {
                Intervention::new(scm.topology(), indices, values)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build_tree;
    use covtree_engine::{InterventionError, ScmError};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_chosen_leaves_of_reference_tree() {
        let scm = build_tree().unwrap();
        assert_eq!(Scenario::chosen_leaves(&scm).unwrap(), vec![118, 119, 120]);
    }

    #[test]
    fn test_chosen_scenario_forces_block() {
        let scm = build_tree().unwrap();
        let doing = Scenario::ChosenLeaves { value: 1 }.intervention(&scm).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        for _ in 0..50 {
            let s = scm.intervene_with(&doing, &mut rng).unwrap();
            assert_eq!(&s.values()[118..121], &[1, 1, 1]);
        }
    }

    #[test]
    fn test_observe_scenario_is_empty() {
        let scm = build_tree().unwrap();
        assert!(Scenario::Observe.intervention(&scm).unwrap().is_empty());
    }

    #[test]
    fn test_explicit_scenario_validates() {
        let scm = build_tree().unwrap();
        let bad = Scenario::Leaves {
            indices: vec![0],
            values: vec![1],
        };
        assert_eq!(
            bad.intervention(&scm),
            Err(ScmError::InvalidIntervention(InterventionError::NotALeaf(0)))
        );
        let bad = Scenario::ChosenLeaves { value: 3 };
        assert!(matches!(bad.intervention(&scm), Err(ScmError::InvalidIntervention(_))));
    }
}
