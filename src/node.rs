//! A single categorical random variable: its name, ordered parent names,
//! possible values, and conditional probability table. See SPEC_FULL.md §4.2.

use std::collections::HashMap;
use std::collections::HashSet;

use rand::Rng;
use serde::Deserialize;

use crate::Arbitrary;
use crate::cpt::CptTree;
use crate::cpt::Distribution;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) parent_names: Vec<String>,
    pub(crate) possible_values: Vec<String>,
    pub(crate) conditional_probabilities: CptTree,
}

impl Node {
    pub fn new(name: impl Into<String>, parent_names: Vec<String>, possible_values: Vec<String>, conditional_probabilities: CptTree) -> Self {
        Node { name: name.into(), parent_names, possible_values, conditional_probabilities }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent_names(&self) -> &[String] {
        &self.parent_names
    }

    pub fn possible_values(&self) -> &[String] {
        &self.possible_values
    }

    pub(crate) fn cpt(&self) -> &CptTree {
        &self.conditional_probabilities
    }

    /// The conditional distribution of this node's value given `parent_values`.
    pub fn probabilities_given(&self, parent_values: &HashMap<String, String>) -> Distribution {
        self.conditional_probabilities.resolve(&self.parent_names, parent_values)
    }

    /// A weighted categorical draw from `probabilities_given(parent_values)`.
    /// Returns `None` ("no value") when the distribution is empty.
    pub fn sample(&self, parent_values: &HashMap<String, String>, rng: &mut impl Rng) -> Option<String> {
        let distribution = self.probabilities_given(parent_values);
        draw(&distribution, distribution.keys(), rng)
    }

    /// Like [`Node::sample`], but restricted to `allowed ∩ support(distribution) \ banned`.
    /// Returns `None` when that intersection is empty.
    pub fn sample_restricted(
        &self,
        parent_values: &HashMap<String, String>,
        allowed: &HashSet<String>,
        banned: &HashSet<String>,
        rng: &mut impl Rng,
    ) -> Option<String> {
        let distribution = self.probabilities_given(parent_values);
        let candidates: Vec<&String> = allowed
            .iter()
            .filter(|value| distribution.contains_key(value.as_str()) && !banned.contains(value.as_str()))
            .collect();
        draw(&distribution, candidates.into_iter(), rng)
    }
}

impl Arbitrary for Node {
    /// A parentless node over a random `v0..vn` value set with a random
    /// leaf distribution, named `node-<random suffix>`.
    fn random() -> Self {
        use rand::Rng;
        let mut rng = rand::rng();
        let n = rng.random_range(2..=4);
        let values: Vec<String> = (0..n).map(|i| format!("v{i}")).collect();
        let mut masses: Vec<f64> = (0..n).map(|_| rng.random::<f64>() + 0.01).collect();
        let total: f64 = masses.iter().sum();
        for mass in &mut masses {
            *mass /= total;
        }
        let distribution = values.iter().cloned().zip(masses).collect();
        Node::new(format!("node-{}", rng.random::<u32>()), vec![], values, CptTree::Leaf { distribution })
    }
}

/// Draw a uniform `u ∈ [0,1)`, iterate `candidates` in their own order,
/// accumulate probability mass, and return the first candidate whose
/// cumulative mass strictly exceeds `u * total`. `total` is the summed mass
/// of `candidates` (not of the whole distribution), matching §4.2's
/// "candidate set is the intersection ... minus banned" semantics.
fn draw<'a>(
    distribution: &Distribution,
    candidates: impl Iterator<Item = &'a String>,
    rng: &mut impl Rng,
) -> Option<String> {
    let candidates: Vec<&String> = candidates.collect();
    if candidates.is_empty() {
        return None;
    }
    let total: f64 = candidates.iter().filter_map(|v| distribution.get(v.as_str())).sum();
    if total <= 0.0 {
        return None;
    }
    let anchor = rng.random::<f64>() * total;
    let mut cumulative = 0.0;
    for value in &candidates {
        if let Some(&mass) = distribution.get(value.as_str()) {
            cumulative += mass;
            if cumulative > anchor {
                return Some((*value).clone());
            }
        }
    }
    // floating-point rounding: fall back to the last candidate with mass.
    candidates
        .into_iter()
        .rev()
        .find(|v| distribution.get(v.as_str()).copied().unwrap_or(0.0) > 0.0)
        .cloned()
}
