use std::collections::HashMap;

/// A graph of schema versions and directional upgrade edges represented using
/// _adjacency lists_. Versions are sparse integer labels, so the adjacency
/// index is a map rather than a dense vector.
///
/// Every edge satisfies `from < to`, which makes the graph acyclic by
/// construction: any walk strictly increases the version label, so no walk
/// can revisit a node and path lengths are bounded by the number of edges.
///
/// Edges are identified by their position in the caller's edge list. The
/// graph never sees edge payloads; it hands back positions and the caller
/// resolves them.
pub struct VersionGraph {
    /// The map key is the `from` version, while the contents of the Vec are
    /// `(to, edge index)` pairs for every edge leaving that version.
    outgoing_edges : HashMap<u32, Vec<(u32, usize)>>
}

impl VersionGraph {
    /// Construct a graph from the edges relevant to an upgrade from `low` to
    /// `high`.
    ///
    ///   - Malformed edges (`from >= to`) are dropped with a warning; they
    ///     could otherwise introduce cycles.
    ///   - Edges outside the target range (`from < low` or `to > high`) are
    ///     discarded, since no increasing walk from `low` to `high` can use
    ///     them.
    pub fn new<I>(low : u32, high : u32, edges : I) -> Self
    where I : IntoIterator<Item = (u32, u32)> {
        let mut outgoing_edges : HashMap<u32, Vec<(u32, usize)>> = HashMap::new();
        for (index, (from, to)) in edges.into_iter().enumerate() {
            if from >= to {
                warn!("ignoring malformed upgrade edge {} -> {}", from, to);
                continue;
            }
            if from < low || to > high {
                continue;
            }
            outgoing_edges.entry(from).or_insert_with(Vec::new).push((to, index));
        }
        VersionGraph { outgoing_edges }
    }

    /// Find a shortest sequence of edge indices leading from `low` to `high`.
    ///
    /// Returns `None` when `high < low` or when no path exists. When `low`
    /// equals `high` the empty sequence is returned. Ties between paths of
    /// equal length are broken by discovery order.
    ///
    /// A depth-first search is enough here: upgrade graphs hold a handful of
    /// edges, and the `from < to` constraint bounds every walk.
    pub fn shortest_path(&self, low : u32, high : u32) -> Option<Vec<usize>> {
        if high < low {
            return None;
        }
        let mut best : Option<Vec<usize>> = None;
        let mut trail : Vec<usize> = Vec::new();
        self.descend(low, high, &mut trail, &mut best);
        best
    }

    fn descend(&self, node : u32, high : u32, trail : &mut Vec<usize>, best : &mut Option<Vec<usize>>) {
        if node == high {
            let improves = match best {
                Some(path) => trail.len() < path.len(),
                None => true
            };
            if improves {
                *best = Some(trail.clone());
            }
            return;
        }
        if let Some(next) = self.outgoing_edges.get(&node) {
            for (to, index) in next {
                // Prune walks that already match the best known length.
                if let Some(path) = best {
                    if trail.len() + 1 >= path.len() {
                        continue;
                    }
                }
                trail.push(*index);
                self.descend(*to, high, trail, best);
                trail.pop();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #[allow(unused_imports)]
    use super::*;

    #[allow(unused_imports)]
    use spectral::prelude::*;

    #[test]
    fn single_edge_path() {
        let graph = VersionGraph::new(1, 2, vec![(1, 2)]);
        asserting("direct edge found").that(&graph.shortest_path(1, 2)).is_equal_to(Some(vec![0]));
    }

    #[test]
    fn chained_path() {
        let graph = VersionGraph::new(1, 3, vec![(1, 2), (2, 3)]);
        asserting("two-step chain").that(&graph.shortest_path(1, 3)).is_equal_to(Some(vec![0, 1]));
    }

    #[test]
    fn shortest_of_competing_paths_wins() {
        // 1 -> 2 -> 3 -> 4 competes with the direct 1 -> 4.
        let graph = VersionGraph::new(1, 4, vec![(1, 2), (2, 3), (3, 4), (1, 4)]);
        asserting("direct edge beats the chain").that(&graph.shortest_path(1, 4)).is_equal_to(Some(vec![3]));
    }

    #[test]
    fn gap_in_the_chain_means_no_path() {
        let graph = VersionGraph::new(1, 5, vec![(1, 2), (3, 4)]);
        asserting("no way across the gap").that(&graph.shortest_path(1, 5)).is_equal_to(None);
    }

    #[test]
    fn downgrade_is_never_planned() {
        let graph = VersionGraph::new(3, 1, vec![(1, 2), (2, 3)]);
        asserting("high below low").that(&graph.shortest_path(3, 1)).is_equal_to(None);
    }

    #[test]
    fn same_version_is_the_empty_plan() {
        let graph = VersionGraph::new(2, 2, Vec::<(u32, u32)>::new());
        asserting("nothing to do").that(&graph.shortest_path(2, 2)).is_equal_to(Some(Vec::new()));
    }

    #[test]
    fn malformed_and_out_of_range_edges_are_ignored() {
        // (3, 3) is malformed; (0, 1) and (4, 9) fall outside [1, 4].
        let graph = VersionGraph::new(1, 4, vec![(3, 3), (0, 1), (4, 9), (1, 4)]);
        asserting("only the in-range edge is used").that(&graph.shortest_path(1, 4)).is_equal_to(Some(vec![3]));
    }

    #[test]
    fn tie_breaks_by_discovery_order() {
        // Two distinct two-step paths; the one discovered first is kept.
        let graph = VersionGraph::new(1, 4, vec![(1, 2), (2, 4), (1, 3), (3, 4)]);
        asserting("first discovered path wins").that(&graph.shortest_path(1, 4)).is_equal_to(Some(vec![0, 1]));
    }
}
