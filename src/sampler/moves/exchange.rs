use crate::errors::{Result, SamplerError};
use crate::graph::Graph;
use crate::machine::Machine;
use crate::sampler::metropolis::{Move, MoveProposer};
use crate::sampler::moves::hop::check_graph;
use crate::util::hilbert::same_value;
use itertools::Itertools;
use log::warn;
use rand::Rng;

/// Swaps the values of two sites within `d_max` of each other.
///
/// Preserves any conserved total of the local values. Swapping two equal values is the
/// identity move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeMove {
    clusters: Vec<(usize, usize)>,
}

impl ExchangeMove {
    /// Make a proposer from the graph's distances. Fails if `d_max` is zero or the graph
    /// does not match the machine.
    pub fn new<G, M>(graph: &G, machine: &M, d_max: usize) -> Result<Self>
    where
        G: Graph + ?Sized,
        M: Machine + ?Sized,
    {
        check_graph(graph, machine, d_max)?;
        let dist = graph.distances();
        let clusters: Vec<(usize, usize)> = (0..graph.n_sites())
            .tuple_combinations()
            .filter(|(i, j): &(usize, usize)| dist[*i][*j].map(|d| d <= d_max).unwrap_or(false))
            .collect();
        if clusters.is_empty() {
            warn!("No pair of sites within distance {}, every exchange will be rejected", d_max);
        }
        Ok(Self { clusters })
    }

    /// Unordered site pairs `i < j` moves are drawn from.
    pub fn clusters(&self) -> &[(usize, usize)] {
        &self.clusters
    }
}

impl MoveProposer for ExchangeMove {
    fn propose<R: Rng + ?Sized>(&mut self, v: &[f64], rng: &mut R) -> Result<Move> {
        if self.clusters.is_empty() {
            return Err(SamplerError::no_valid_move("exchange", "no pairs within d_max"));
        }
        let (si, sj) = self.clusters[rng.gen_range(0..self.clusters.len())];
        if same_value(v[si], v[sj]) {
            Ok(Move::identity())
        } else {
            Ok(Move::new([si, sj], [v[sj], v[si]]))
        }
    }

    fn name(&self) -> &'static str {
        "MetropolisExchange"
    }
}
