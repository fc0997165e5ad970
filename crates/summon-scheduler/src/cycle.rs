use std::collections::HashMap;

use petgraph::graph::DiGraph;

use crate::graph::Node;

/// Builds a throwaway `petgraph` graph over the resolved dependency edges
/// and reports the first strongly-connected component with more than one
/// member, i.e. a real cycle rather than a single self-contained node.
///
/// Grounded on `turborepo-graph-utils::cycles_and_cut_candidates`, which
/// uses the same `tarjan_scc` entry point; this scheduler only needs "is
/// there a cycle, and who's in it" rather than every minimal cut, since a
/// cyclic task graph is always a hard configuration error here (the FOMOD
/// guesser's own recipe-override cycle check reuses `tarjan_scc` directly
/// for its "which edges would break it" diagnostic instead).
pub(crate) fn find_cycle(nodes: &HashMap<String, Node>) -> Option<Vec<String>> {
    let mut graph = DiGraph::<&str, ()>::new();
    let mut indices = HashMap::new();
    for name in nodes.keys() {
        indices.insert(name.as_str(), graph.add_node(name.as_str()));
    }
    for (name, node) in nodes {
        let from = indices[name.as_str()];
        for dep in &node.resolved_deps {
            if let Some(&to) = indices.get(dep.as_str()) {
                graph.add_edge(from, to, ());
            }
        }
    }

    petgraph::algo::tarjan_scc(&graph)
        .into_iter()
        .find(|scc| scc.len() > 1)
        .map(|scc| scc.into_iter().map(|idx| graph[idx].to_string()).collect())
}
