use crate::errors::{Result, SamplerError};
use std::collections::VecDeque;

/// An edge between two sites.
pub type Edge = (usize, usize);

/// Lattice connectivity, as seen by the hop and exchange proposers.
pub trait Graph {
    /// Number of sites.
    fn n_sites(&self) -> usize;

    /// Neighbours of each site.
    fn adjacency_list(&self) -> &[Vec<usize>];

    /// Graph distance between every pair of sites, None when unreachable.
    fn distances(&self) -> Vec<Vec<Option<usize>>> {
        let adj = self.adjacency_list();
        (0..self.n_sites()).map(|i| bfs_distances(adj, i)).collect()
    }
}

/// Breadth first distances from `start`.
fn bfs_distances(adj: &[Vec<usize>], start: usize) -> Vec<Option<usize>> {
    let mut dist = vec![None; adj.len()];
    let mut queue = VecDeque::new();
    dist[start] = Some(0);
    queue.push_back(start);
    while let Some(site) = queue.pop_front() {
        let d = dist[site].unwrap_or_default();
        adj[site].iter().for_each(|next| {
            if dist[*next].is_none() {
                dist[*next] = Some(d + 1);
                queue.push_back(*next);
            }
        });
    }
    dist
}

/// A graph built from a list of undirected edges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeGraph {
    edges: Vec<Edge>,
    adjacency: Vec<Vec<usize>>,
}

impl EdgeGraph {
    /// Make a graph on `n` sites. Fails if an edge leaves the graph.
    pub fn new(n: usize, edges: &[Edge]) -> Result<Self> {
        let mut adjacency = vec![vec![]; n];
        for (a, b) in edges.iter().cloned() {
            if a >= n || b >= n {
                return Err(SamplerError::construction(
                    "edges",
                    (a, b),
                    format!("edge endpoint outside of a graph with {} sites", n),
                ));
            }
            if a != b {
                adjacency[a].push(b);
                adjacency[b].push(a);
            }
        }
        // Sort just in case
        adjacency.iter_mut().for_each(|vs| {
            vs.sort_unstable();
            vs.dedup();
        });
        Ok(Self {
            edges: edges.to_vec(),
            adjacency,
        })
    }

    /// A one dimensional chain of `l` sites, optionally periodic.
    pub fn chain(l: usize, pbc: bool) -> Self {
        let mut edges: Vec<Edge> = (0..l.saturating_sub(1)).map(|i| (i, i + 1)).collect();
        if pbc && l > 2 {
            edges.push((l - 1, 0));
        }
        let mut adjacency = vec![vec![]; l];
        edges.iter().for_each(|(a, b)| {
            adjacency[*a].push(*b);
            adjacency[*b].push(*a);
        });
        adjacency.iter_mut().for_each(|vs| vs.sort_unstable());
        Self { edges, adjacency }
    }

    /// The edges used to build the graph.
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }
}

impl Graph for EdgeGraph {
    fn n_sites(&self) -> usize {
        self.adjacency.len()
    }

    fn adjacency_list(&self) -> &[Vec<usize>] {
        &self.adjacency
    }
}
