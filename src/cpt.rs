//! The compressed conditional-probability-table representation for a single
//! node, and the primitives to navigate it.
//!
//! A [`CptTree`] is a tagged variant rather than a struct probed by key
//! presence: a `Branch` descends one parent level via `deeper`/`skip`, a
//! `Leaf` holds the terminal value distribution. See SPEC_FULL.md §4.1.

use std::collections::HashMap;

use serde::Deserialize;

use crate::Arbitrary;

/// A value distribution: value name to probability mass.
pub type Distribution = HashMap<String, f64>;

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CptTree {
    Branch {
        deeper: HashMap<String, CptTree>,
        #[serde(default)]
        skip: Option<Box<CptTree>>,
    },
    Leaf { #[serde(flatten)] distribution: Distribution },
}

impl CptTree {
    /// Resolve the conditional distribution given an assignment of parent
    /// values, walking `parent_names` in order. Missing parent bindings or
    /// values absent from `deeper` fall through to `skip`; if neither is
    /// available, the empty distribution is returned ("no defined
    /// conditional here" — never an error, per §4.2).
    pub fn resolve(&self, parent_names: &[String], parent_values: &HashMap<String, String>) -> Distribution {
        let mut node = self;
        for name in parent_names {
            match node {
                CptTree::Leaf { .. } => break,
                CptTree::Branch { deeper, skip } => {
                    let next = parent_values
                        .get(name)
                        .and_then(|value| deeper.get(value))
                        .or_else(|| skip.as_deref());
                    match next {
                        Some(next) => node = next,
                        None => return Distribution::new(),
                    }
                }
            }
        }
        match node {
            CptTree::Leaf { distribution } => distribution.clone(),
            CptTree::Branch { .. } => Distribution::new(),
        }
    }

    /// Compute, for each parent level, the union of parent-values along
    /// every root-to-leaf path whose leaf assigns positive probability to
    /// at least one key in `valid_leaf_keys`. A level where every
    /// qualifying path took `skip` yields the empty set at that level
    /// (unconstraining). See SPEC_FULL.md §4.1.
    pub fn support(&self, depth: usize, valid_leaf_keys: &[&str]) -> Vec<std::collections::HashSet<String>> {
        let mut levels = vec![std::collections::HashSet::new(); depth];
        let mut path = Vec::with_capacity(depth);
        self.collect_support(valid_leaf_keys, &mut path, &mut levels);
        levels
    }

    fn collect_support(
        &self,
        valid_leaf_keys: &[&str],
        path: &mut Vec<Option<String>>,
        levels: &mut [std::collections::HashSet<String>],
    ) {
        match self {
            CptTree::Leaf { distribution } => {
                let qualifies = valid_leaf_keys
                    .iter()
                    .any(|key| distribution.get(*key).is_some_and(|p| *p > 0.0));
                if qualifies {
                    for (level, choice) in path.iter().enumerate() {
                        if let Some(value) = choice {
                            levels[level].insert(value.clone());
                        }
                    }
                }
            }
            CptTree::Branch { deeper, skip } => {
                for (value, child) in deeper {
                    path.push(Some(value.clone()));
                    child.collect_support(valid_leaf_keys, path, levels);
                    path.pop();
                }
                if let Some(skip) = skip {
                    path.push(None);
                    skip.collect_support(valid_leaf_keys, path, levels);
                    path.pop();
                }
            }
        }
    }

    /// All leaf distributions reachable from this node, used at load time to
    /// validate that `possibleValues` covers every leaf's support.
    pub fn leaf_distributions(&self) -> Vec<&Distribution> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a Distribution>) {
        match self {
            CptTree::Leaf { distribution } => out.push(distribution),
            CptTree::Branch { deeper, skip } => {
                for child in deeper.values() {
                    child.collect_leaves(out);
                }
                if let Some(skip) = skip {
                    skip.collect_leaves(out);
                }
            }
        }
    }
}

impl Arbitrary for CptTree {
    /// A random tree over a synthetic `v0..vn` value namespace: a leaf with
    /// probability 0.5, otherwise one level of branching over a synthetic
    /// `p0..pn` parent-value namespace, each arm a random leaf.
    fn random() -> Self {
        use rand::Rng;
        let mut rng = rand::rng();
        if rng.random_bool(0.5) {
            random_leaf(&mut rng)
        } else {
            let arms = rng.random_range(2..=3);
            CptTree::Branch { deeper: (0..arms).map(|i| (format!("p{i}"), random_leaf(&mut rng))).collect(), skip: None }
        }
    }
}

fn random_leaf(rng: &mut impl rand::Rng) -> CptTree {
    let n = rng.random_range(2..=4);
    let mut masses: Vec<f64> = (0..n).map(|_| rng.random::<f64>() + 0.01).collect();
    let total: f64 = masses.iter().sum();
    for mass in &mut masses {
        *mass /= total;
    }
    CptTree::Leaf { distribution: masses.into_iter().enumerate().map(|(i, mass)| (format!("v{i}"), mass)).collect() }
}
