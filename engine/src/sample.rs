//! One realised draw of every node in the tree

use std::fmt;
use std::ops::Index;

use crate::node::NodeId;

/// Dense 0/1 values for every node of one draw, root at index 0.
///
/// Produced fresh by each sampling call and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    values: Vec<u8>,
}

impl Sample {
    pub(crate) fn from_values(values: Vec<u8>) -> Self {
        Sample { values }
    }

    /// Value of the root node, the reward.
    pub fn reward(&self) -> u8 {
        self.values[0]
    }

    pub fn get(&self, k: NodeId) -> Option<u8> {
        self.values.get(k).copied()
    }

    pub fn values(&self) -> &[u8] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn into_values(self) -> Vec<u8> {
        self.values
    }
}

impl Index<NodeId> for Sample {
    type Output = u8;

    fn index(&self, k: NodeId) -> &u8 {
        &self.values[k]
    }
}

impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, v) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{v}")?;
        }
        write!(f, "]")
    }
}
