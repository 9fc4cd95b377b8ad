//! Strongly-connected-component detection over arbitrary node sets.
//!
//! [`find_cycles`] is the general detector: it reports every SCC of size
//! greater than one, plus any single node with a self-edge. It runs petgraph's
//! `tarjan_scc` — the iterative, explicit-stack Tarjan with per-node discovery
//! index and low-link — so components come back in the order their root
//! finishes, and repeated runs over the same input return identical output.
//!
//! The linker applies it to the package-import projection of a schema to
//! reject illegal cross-package cycles. Recursive message definitions are a
//! legitimate data cycle and never pass through here.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::hash::Hash;

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::schema::Schema;

/// Every strongly connected component of size > 1, plus self-edged singletons.
/// Edges to nodes outside `nodes` are ignored.
pub fn find_cycles<N, I, F>(nodes: I, mut edges_of: F) -> Vec<Vec<N>>
where
    N: Clone + Eq + Hash,
    I: IntoIterator<Item = N>,
    F: FnMut(&N) -> Vec<N>,
{
    let mut graph: DiGraph<N, ()> = DiGraph::new();
    let mut indices: HashMap<N, NodeIndex> = HashMap::new();

    let order: Vec<N> = nodes.into_iter().collect();
    for node in &order {
        if !indices.contains_key(node) {
            let index = graph.add_node(node.clone());
            indices.insert(node.clone(), index);
        }
    }

    let mut self_edged: HashSet<NodeIndex> = HashSet::new();
    for node in &order {
        let from = indices[node];
        for successor in edges_of(node) {
            let Some(&to) = indices.get(&successor) else {
                continue;
            };
            if from == to {
                self_edged.insert(from);
            }
            graph.add_edge(from, to, ());
        }
    }

    tarjan_scc(&graph)
        .into_iter()
        .filter(|component| component.len() > 1 || self_edged.contains(&component[0]))
        .map(|component| {
            component
                .into_iter()
                .map(|index| graph[index].clone())
                .collect()
        })
        .collect()
}

/// Cycles in the package-import projection of a schema: package P depends on
/// package Q when any file of P imports a file of Q.
pub(crate) fn package_cycles(schema: &Schema) -> Vec<Vec<String>> {
    let mut edges: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for file in schema.files() {
        let package = file.package().to_string();
        edges.entry(package.clone()).or_default();
        for import in file.imports.iter().chain(file.public_imports.iter()) {
            let Some(imported) = schema.proto_file(import) else {
                continue;
            };
            let imported_package = imported.package();
            if imported_package != package {
                edges
                    .entry(package.clone())
                    .or_default()
                    .insert(imported_package.to_string());
            }
        }
    }

    let packages: Vec<String> = edges.keys().cloned().collect();
    find_cycles(packages, |package| {
        edges
            .get(package)
            .map(|successors| successors.iter().cloned().collect())
            .unwrap_or_default()
    })
}
