use crate::errors::{Result, SamplerError};
use crate::graph::Graph;
use crate::machine::Machine;
use crate::sampler::metropolis::{Move, MoveProposer};
use crate::util::local_index;
use itertools::Itertools;
use log::warn;
use rand::Rng;

/// Preconditions shared by the hop and exchange proposers.
pub(crate) fn check_graph<G, M>(graph: &G, machine: &M, d_max: usize) -> Result<()>
where
    G: Graph + ?Sized,
    M: Machine + ?Sized,
{
    if d_max == 0 {
        return Err(SamplerError::construction(
            "d_max",
            d_max,
            "the maximum hopping distance must be at least 1",
        ));
    }
    if graph.n_sites() != machine.n_visible() {
        return Err(SamplerError::construction(
            "graph",
            graph.n_sites(),
            format!("graph sites do not match {} visible units", machine.n_visible()),
        ));
    }
    Ok(())
}

/// Moves the values of two sites within `d_max` of each other to a new pair of values.
///
/// Ordered pairs `(i, j)` with `i != j` are chosen uniformly, then the new pair of values is
/// chosen uniformly among the `S^2 - 1` pairs differing from the current one. The proposal is
/// symmetric.
#[derive(Debug, Clone, PartialEq)]
pub struct HopMove {
    pairs: Vec<(usize, usize)>,
    local_states: Vec<f64>,
}

impl HopMove {
    /// Make a proposer from the graph's distances. Fails if `d_max` is zero or the graph
    /// does not match the machine.
    pub fn new<G, M>(graph: &G, machine: &M, d_max: usize) -> Result<Self>
    where
        G: Graph + ?Sized,
        M: Machine + ?Sized,
    {
        check_graph(graph, machine, d_max)?;
        let dist = graph.distances();
        let n = graph.n_sites();
        let pairs: Vec<_> = (0..n)
            .cartesian_product(0..n)
            .filter(|(i, j)| i != j)
            .filter(|(i, j)| dist[*i][*j].map(|d| d <= d_max).unwrap_or(false))
            .collect();
        if pairs.is_empty() {
            warn!("No pair of sites within distance {}, every hop will be rejected", d_max);
        }
        Ok(Self {
            pairs,
            local_states: machine.local_states().to_vec(),
        })
    }

    /// The ordered site pairs moves are drawn from.
    pub fn pairs(&self) -> &[(usize, usize)] {
        &self.pairs
    }
}

impl MoveProposer for HopMove {
    fn propose<R: Rng + ?Sized>(&mut self, v: &[f64], rng: &mut R) -> Result<Move> {
        let n_local = self.local_states.len();
        if self.pairs.is_empty() {
            return Err(SamplerError::no_valid_move("hop", "no pairs within d_max"));
        }
        if n_local < 2 {
            return Err(SamplerError::no_valid_move(
                "hop",
                "a single local state leaves nothing to change",
            ));
        }
        let (si, sj) = self.pairs[rng.gen_range(0..self.pairs.len())];
        let (ci, cj) = local_index(&self.local_states, v[si])
            .zip(local_index(&self.local_states, v[sj]))
            .ok_or_else(|| SamplerError::no_valid_move("hop", "unknown local value"))?;
        let current = ci * n_local + cj;
        let mut new = rng.gen_range(0..n_local * n_local - 1);
        if new >= current {
            new += 1;
        }
        Ok(Move::new(
            [si, sj],
            [
                self.local_states[new / n_local],
                self.local_states[new % n_local],
            ],
        ))
    }

    fn name(&self) -> &'static str {
        "MetropolisHop"
    }
}
