//! SF-003: Dependency resolution via topological ordering of plugins and resources.
//!
//! Kahn's algorithm over a node list with edges `(before, after)`. Ready nodes
//! are drained from a min-heap keyed by their position in the input list, so
//! nodes with no ordering constraint keep input (registration) order.
//! Edges that mention a node outside the list are dropped.

use super::error::TransformError;
use super::types::PluginId;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, VecDeque};
use std::hash::Hash;

/// Topologically sort `nodes` under `edges`. On failure returns the shortest
/// cycle found among the unsorted nodes (first element repeated implicitly).
pub fn topo_sort<T>(nodes: &[T], edges: &[(T, T)]) -> Result<Vec<T>, Vec<T>>
where
    T: Clone + Eq + Hash,
{
    let index: HashMap<&T, usize> = nodes.iter().enumerate().map(|(i, n)| (n, i)).collect();
    let mut in_degree = vec![0usize; nodes.len()];
    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];

    for (before, after) in edges {
        let (Some(&b), Some(&a)) = (index.get(before), index.get(after)) else {
            continue;
        };
        adjacency[b].push(a);
        in_degree[a] += 1;
    }

    let mut ready: BinaryHeap<Reverse<usize>> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, &d)| d == 0)
        .map(|(i, _)| Reverse(i))
        .collect();

    let mut order = Vec::with_capacity(nodes.len());
    while let Some(Reverse(current)) = ready.pop() {
        order.push(current);
        for &next in &adjacency[current] {
            in_degree[next] -= 1;
            if in_degree[next] == 0 {
                ready.push(Reverse(next));
            }
        }
    }

    if order.len() != nodes.len() {
        let remaining: Vec<bool> = in_degree.iter().map(|&d| d > 0).collect();
        let cycle = shortest_cycle(&adjacency, &remaining);
        return Err(cycle.into_iter().map(|i| nodes[i].clone()).collect());
    }

    Ok(order.into_iter().map(|i| nodes[i].clone()).collect())
}

/// BFS from every unsorted node back to itself; keep the shortest loop.
/// Ties go to the earliest start node.
fn shortest_cycle(adjacency: &[Vec<usize>], remaining: &[bool]) -> Vec<usize> {
    let mut best: Option<Vec<usize>> = None;

    for start in (0..adjacency.len()).filter(|&i| remaining[i]) {
        let mut parent: Vec<Option<usize>> = vec![None; adjacency.len()];
        let mut seen = vec![false; adjacency.len()];
        let mut queue = VecDeque::from([start]);
        seen[start] = true;
        let mut closing = None;

        'bfs: while let Some(node) = queue.pop_front() {
            for &next in &adjacency[node] {
                if !remaining[next] {
                    continue;
                }
                if next == start {
                    closing = Some(node);
                    break 'bfs;
                }
                if !seen[next] {
                    seen[next] = true;
                    parent[next] = Some(node);
                    queue.push_back(next);
                }
            }
        }

        if let Some(mut node) = closing {
            let mut path = vec![node];
            while let Some(p) = parent[node] {
                path.push(p);
                node = p;
            }
            // path runs last → start; flip to start → last
            path.reverse();
            if best.as_ref().is_none_or(|b| path.len() < b.len()) {
                best = Some(path);
            }
        }
    }

    best.unwrap_or_default()
}

/// Order participating plugins so every edge `(a, b)` puts `a` before `b`.
/// `participating` must be in registration order; it is the tie-break.
pub fn order_plugins(
    edges: &[(PluginId, PluginId)],
    participating: &[PluginId],
) -> Result<Vec<PluginId>, TransformError> {
    topo_sort(participating, edges).map_err(|cycle| TransformError::DependencyCycle { cycle })
}
