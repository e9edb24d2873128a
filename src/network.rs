//! An ordered collection of [`Node`]s in topological (sampling) order, and
//! the three operations that matter: unconditional sampling, backtracking
//! constrained sampling, and whitelist propagation. See SPEC_FULL.md §4.3.

use std::collections::HashMap;
use std::collections::HashSet;

use petgraph::algo::toposort;
use petgraph::graph::DiGraph;
use rand::Rng;

use crate::Arbitrary;
use crate::error::ModelError;
use crate::node::Node;

/// A binding from node name to chosen value. Partial until every node in
/// the sampling order is bound.
pub type Sample = HashMap<String, String>;

/// A per-node whitelist of allowed values.
pub type Constraints = HashMap<String, HashSet<String>>;

pub struct Network {
    nodes: Vec<Node>,
    index_by_name: HashMap<String, usize>,
}

impl Network {
    /// Build a network from nodes already in sampling order, validating the
    /// invariants in SPEC_FULL.md §3: unique names, parents declared and
    /// preceding their children, and (as a belt-and-suspenders DAG check)
    /// no cycle slipping through despite the ordering check.
    pub fn new(nodes: Vec<Node>) -> Result<Self, ModelError> {
        let mut index_by_name = HashMap::with_capacity(nodes.len());
        for (i, node) in nodes.iter().enumerate() {
            if index_by_name.insert(node.name().to_string(), i).is_some() {
                return Err(ModelError::DuplicateNode(node.name().to_string()));
            }
        }
        for (i, node) in nodes.iter().enumerate() {
            for parent in node.parent_names() {
                let &parent_index = index_by_name
                    .get(parent)
                    .ok_or_else(|| ModelError::UnknownParent(node.name().to_string(), parent.clone()))?;
                if parent_index >= i {
                    return Err(ModelError::ParentOutOfOrder(node.name().to_string(), parent.clone()));
                }
            }
        }
        Self::check_acyclic(&nodes, &index_by_name)?;
        Ok(Self { nodes, index_by_name })
    }

    fn check_acyclic(nodes: &[Node], index_by_name: &HashMap<String, usize>) -> Result<(), ModelError> {
        let mut graph = DiGraph::<(), ()>::with_capacity(nodes.len(), 0);
        let graph_indices: Vec<_> = nodes.iter().map(|_| graph.add_node(())).collect();
        for (i, node) in nodes.iter().enumerate() {
            for parent in node.parent_names() {
                let &parent_index = index_by_name.get(parent).expect("validated above");
                graph.add_edge(graph_indices[parent_index], graph_indices[i], ());
            }
        }
        toposort(&graph, None).map(|_| ()).map_err(|cycle| {
            let name = nodes[cycle.node_id().index()].name().to_string();
            ModelError::Cyclic(name)
        })
    }

    pub fn node(&self, name: &str) -> Option<&Node> {
        self.index_by_name.get(name).map(|&i| &self.nodes[i])
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn possible_values_of(&self, name: &str) -> Option<&[String]> {
        self.node(name).map(Node::possible_values)
    }

    /// Unconditional (topological-order) sampling. Nodes already bound in
    /// `fixed_values` are never resampled, even if inconsistent with the
    /// CPT — that contract belongs to the caller. Nodes whose conditional
    /// distribution is empty (a malformed or partially-specified model) are
    /// left unbound rather than causing a panic.
    pub fn sample(&self, fixed_values: &Sample, rng: &mut impl Rng) -> Sample {
        let mut assignment = fixed_values.clone();
        for node in &self.nodes {
            if assignment.contains_key(node.name()) {
                continue;
            }
            if let Some(value) = node.sample(&assignment, rng) {
                assignment.insert(node.name().to_string(), value);
            }
        }
        assignment
    }

    /// Depth-first constrained sampling with backtracking, implemented as an
    /// explicit per-level stack (REDESIGN, §9) rather than recursion. Returns
    /// `None` if no assignment satisfies `constraints`.
    pub fn sample_consistent(&self, constraints: &Constraints, rng: &mut impl Rng) -> Option<Sample> {
        struct Frame {
            banned: HashSet<String>,
        }

        if self.nodes.is_empty() {
            return Some(Sample::new());
        }

        let mut assignment = Sample::new();
        let mut stack: Vec<Frame> = vec![Frame { banned: HashSet::new() }];

        loop {
            let depth = stack.len() - 1;
            let node = &self.nodes[depth];
            let allowed = constraints
                .get(node.name())
                .cloned()
                .unwrap_or_else(|| node.possible_values().iter().cloned().collect());

            let banned = &stack[depth].banned;
            match node.sample_restricted(&assignment, &allowed, banned, rng) {
                Some(value) => {
                    assignment.insert(node.name().to_string(), value);
                    if stack.len() == self.nodes.len() {
                        return Some(assignment);
                    }
                    stack.push(Frame { banned: HashSet::new() });
                }
                None => {
                    // This frame is exhausted; backtrack one level, banning
                    // the value that frame had chosen so it isn't retried.
                    stack.pop();
                    let Some(parent_frame) = stack.last_mut() else {
                        return None;
                    };
                    let parent_node = &self.nodes[stack.len() - 1];
                    if let Some(value) = assignment.remove(parent_node.name()) {
                        parent_frame.banned.insert(value);
                    }
                }
            }
        }
    }

    /// Propagate `constraints` through local CPT supports to obtain an
    /// induced, possibly tighter, constraint set. Returns `None` (FAIL) when
    /// an input whitelist is itself empty, or when some induced set becomes
    /// empty (unsatisfiable under the local model), per SPEC_FULL.md §4.3.3.
    pub fn possible_values(&self, constraints: &Constraints) -> Option<Constraints> {
        let mut induced: Constraints = HashMap::new();

        let mut merge = |name: &str, set: HashSet<String>| -> bool {
            if set.is_empty() {
                return false;
            }
            match induced.get_mut(name) {
                Some(existing) => {
                    let intersected: HashSet<String> = existing.intersection(&set).cloned().collect();
                    if intersected.is_empty() {
                        return false;
                    }
                    *existing = intersected;
                }
                None => {
                    induced.insert(name.to_string(), set);
                }
            }
            true
        };

        for (name, allowed) in constraints {
            if !merge(name, allowed.clone()) {
                return None;
            }
            let Some(node) = self.node(name) else {
                continue; // UnknownNode: ignored, per §7.
            };
            let valid_keys: Vec<&str> = allowed.iter().map(String::as_str).collect();
            let levels = node.cpt().support(node.parent_names().len(), &valid_keys);
            for (parent_name, level_set) in node.parent_names().iter().zip(levels) {
                if level_set.is_empty() {
                    continue; // unconstraining
                }
                if !merge(parent_name, level_set) {
                    return None;
                }
            }
        }

        Some(induced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpt::CptTree;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn two_node_network() -> Network {
        let a = Node {
            name: "A".to_string(),
            parent_names: vec![],
            possible_values: vec!["a1".to_string(), "a2".to_string()],
            conditional_probabilities: CptTree::Leaf {
                distribution: HashMap::from([("a1".to_string(), 0.7), ("a2".to_string(), 0.3)]),
            },
        };
        let b = Node {
            name: "B".to_string(),
            parent_names: vec!["A".to_string()],
            possible_values: vec!["b1".to_string(), "b2".to_string()],
            conditional_probabilities: CptTree::Branch {
                deeper: HashMap::from([
                    (
                        "a1".to_string(),
                        CptTree::Leaf { distribution: HashMap::from([("b1".to_string(), 0.8), ("b2".to_string(), 0.2)]) },
                    ),
                    (
                        "a2".to_string(),
                        CptTree::Leaf { distribution: HashMap::from([("b1".to_string(), 0.3), ("b2".to_string(), 0.7)]) },
                    ),
                ]),
                skip: None,
            },
        };
        Network::new(vec![a, b]).unwrap()
    }

    #[test]
    fn rejects_unknown_parent() {
        let b = Node {
            name: "B".to_string(),
            parent_names: vec!["A".to_string()],
            possible_values: vec!["b1".to_string()],
            conditional_probabilities: CptTree::Leaf { distribution: HashMap::from([("b1".to_string(), 1.0)]) },
        };
        assert!(matches!(Network::new(vec![b]), Err(ModelError::UnknownParent(_, _))));
    }

    #[test]
    fn rejects_parent_declared_after_child() {
        let a = Node {
            name: "A".to_string(),
            parent_names: vec!["B".to_string()],
            possible_values: vec!["a1".to_string()],
            conditional_probabilities: CptTree::Leaf { distribution: HashMap::from([("a1".to_string(), 1.0)]) },
        };
        let b = Node {
            name: "B".to_string(),
            parent_names: vec![],
            possible_values: vec!["b1".to_string()],
            conditional_probabilities: CptTree::Leaf { distribution: HashMap::from([("b1".to_string(), 1.0)]) },
        };
        assert!(matches!(Network::new(vec![a, b]), Err(ModelError::ParentOutOfOrder(_, _))));
    }

    #[test]
    fn rejects_duplicate_names() {
        let a = Node {
            name: "A".to_string(),
            parent_names: vec![],
            possible_values: vec!["a1".to_string()],
            conditional_probabilities: CptTree::Leaf { distribution: HashMap::from([("a1".to_string(), 1.0)]) },
        };
        assert!(matches!(Network::new(vec![a.clone(), a]), Err(ModelError::DuplicateNode(_))));
    }

    #[test]
    fn s1_unconditional_sampling_statistics() {
        let network = two_node_network();
        let mut rng = SmallRng::seed_from_u64(42);
        let mut a1_count = 0;
        let mut b1_given_a1 = 0;
        for _ in 0..10_000 {
            let sample = network.sample(&Sample::new(), &mut rng);
            if sample["A"] == "a1" {
                a1_count += 1;
                if sample["B"] == "b1" {
                    b1_given_a1 += 1;
                }
            }
        }
        assert!((6_800..=7_200).contains(&a1_count), "a1 count {a1_count}");
        assert!((7_800..=8_200).contains(&b1_given_a1), "b1|a1 count {b1_given_a1}");
    }

    #[test]
    fn s2_constrained_sampling_honours_constraint() {
        let network = two_node_network();
        let mut rng = SmallRng::seed_from_u64(1);
        let constraints = Constraints::from([("A".to_string(), HashSet::from(["a1".to_string()]))]);
        for _ in 0..200 {
            let sample = network.sample_consistent(&constraints, &mut rng).unwrap();
            assert_eq!(sample["A"], "a1");
            assert!(["b1", "b2"].contains(&sample["B"].as_str()));
        }
    }

    #[test]
    fn sample_consistent_returns_none_for_impossible_constraint() {
        let network = two_node_network();
        let mut rng = SmallRng::seed_from_u64(1);
        let constraints = Constraints::from([("A".to_string(), HashSet::from(["no-such-value".to_string()]))]);
        assert_eq!(network.sample_consistent(&constraints, &mut rng), None);
    }

    #[test]
    fn s3_propagation_both_directions() {
        let network = two_node_network();
        let constraints = Constraints::from([("B".to_string(), HashSet::from(["b1".to_string()]))]);
        let induced = network.possible_values(&constraints).unwrap();
        assert_eq!(induced["A"], HashSet::from(["a1".to_string(), "a2".to_string()]));
        assert_eq!(induced["B"], HashSet::from(["b1".to_string()]));

        let constraints = Constraints::from([("B".to_string(), HashSet::from(["b2".to_string()]))]);
        let induced = network.possible_values(&constraints).unwrap();
        assert_eq!(induced["A"], HashSet::from(["a1".to_string(), "a2".to_string()]));
    }

    #[test]
    fn propagation_fails_on_empty_input_whitelist() {
        let network = two_node_network();
        let constraints = Constraints::from([("B".to_string(), HashSet::new())]);
        assert_eq!(network.possible_values(&constraints), None);
    }

    #[test]
    fn propagation_unknown_node_is_ignored() {
        let network = two_node_network();
        let constraints = Constraints::from([("nonexistent".to_string(), HashSet::from(["x".to_string()]))]);
        let induced = network.possible_values(&constraints).unwrap();
        assert_eq!(induced["nonexistent"], HashSet::from(["x".to_string()]));
    }

    #[test]
    fn propagation_monotonicity() {
        let network = two_node_network();
        let wide = Constraints::from([("B".to_string(), HashSet::from(["b1".to_string(), "b2".to_string()]))]);
        let narrow = Constraints::from([("B".to_string(), HashSet::from(["b1".to_string()]))]);
        let wide_induced = network.possible_values(&wide).unwrap();
        let narrow_induced = network.possible_values(&narrow).unwrap();
        assert!(narrow_induced["A"].is_subset(&wide_induced["A"]));
    }

    #[test]
    fn invariant_sample_consistent_result_lies_within_propagated_domain() {
        let network = two_node_network();
        let mut rng = SmallRng::seed_from_u64(5);
        let constraints = Constraints::from([("B".to_string(), HashSet::from(["b1".to_string()]))]);
        let induced = network.possible_values(&constraints).unwrap();
        for _ in 0..100 {
            let sample = network.sample_consistent(&constraints, &mut rng).unwrap();
            for (name, allowed) in &induced {
                if let Some(value) = sample.get(name) {
                    assert!(allowed.contains(value));
                }
            }
        }
    }
}
