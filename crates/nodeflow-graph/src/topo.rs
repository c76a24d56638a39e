use std::collections::{BTreeSet, HashMap};

use crate::error::GraphError;

/// Order `nodes` so that every edge's source precedes its target.
///
/// Kahn's algorithm. Edges with an end outside `nodes` are ignored. Among
/// nodes that are ready at the same time, the one listed first in `nodes`
/// runs first, so callers pass nodes in declaration order to get a
/// deterministic result.
///
/// Returns [`GraphError::CyclicDependency`] naming the nodes left unsorted
/// when the subset contains a cycle.
pub fn topological_sort<'a, I>(nodes: &[String], edges: I) -> Result<Vec<String>, GraphError>
where
  I: IntoIterator<Item = (&'a str, &'a str)>,
{
  let position: HashMap<&str, usize> = nodes
    .iter()
    .enumerate()
    .map(|(i, id)| (id.as_str(), i))
    .collect();

  let mut in_degree = vec![0usize; nodes.len()];
  let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];

  for (source, target) in edges {
    let (Some(&from), Some(&to)) = (position.get(source), position.get(target)) else {
      continue;
    };
    adjacency[from].push(to);
    in_degree[to] += 1;
  }

  let mut ready: BTreeSet<usize> = in_degree
    .iter()
    .enumerate()
    .filter(|(_, degree)| **degree == 0)
    .map(|(i, _)| i)
    .collect();

  let mut order = Vec::with_capacity(nodes.len());
  while let Some(current) = ready.pop_first() {
    order.push(current);
    for &next in &adjacency[current] {
      in_degree[next] -= 1;
      if in_degree[next] == 0 {
        ready.insert(next);
      }
    }
  }

  if order.len() < nodes.len() {
    let sorted: BTreeSet<usize> = order.iter().copied().collect();
    let remaining = (0..nodes.len())
      .filter(|i| !sorted.contains(i))
      .map(|i| nodes[i].clone())
      .collect();
    return Err(GraphError::CyclicDependency { nodes: remaining });
  }

  Ok(order.into_iter().map(|i| nodes[i].clone()).collect())
}
