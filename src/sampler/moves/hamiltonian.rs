use crate::errors::{Result, SamplerError};
use crate::operator::{Connection, Operator};
use crate::sampler::metropolis::{Move, MoveProposer};
use crate::util::hilbert::same_value;
use crate::util::CumulativeWeights;
use rand::Rng;
use std::fmt::{Debug, Formatter};

/// Moves along the off-diagonal connections of an operator, weighted by `|<s|H|s'>|`.
///
/// The proposal is not symmetric: the backward probability is computed from the
/// connections of the candidate configuration. Several connections leading to the same
/// configuration are summed.
pub struct HamiltonianMove<'a, O: Operator + ?Sized> {
    operator: &'a O,
    forward: Vec<Connection>,
    backward: Vec<Connection>,
    candidate: Vec<f64>,
}

impl<'a, O: Operator + ?Sized> HamiltonianMove<'a, O> {
    /// Make a proposer for the given operator.
    pub fn new(operator: &'a O) -> Self {
        Self {
            operator,
            forward: vec![],
            backward: vec![],
            candidate: vec![],
        }
    }

    /// The operator moves are drawn from.
    pub fn operator(&self) -> &'a O {
        self.operator
    }
}

impl<'a, O: Operator + ?Sized> Clone for HamiltonianMove<'a, O> {
    fn clone(&self) -> Self {
        Self::new(self.operator)
    }
}

impl<'a, O: Operator + ?Sized> Debug for HamiltonianMove<'a, O> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HamiltonianMove")
            .field("n_connections", &self.forward.len())
            .finish()
    }
}

/// Whether `conn` changes `v`.
fn changes(v: &[f64], conn: &Connection) -> bool {
    !conn.is_diagonal()
        && conn
            .sites
            .iter()
            .zip(conn.values.iter())
            .any(|(s, x)| !same_value(v[*s], *x))
}

/// `|mel|` for connections which change `v`, zero otherwise.
fn move_weight(v: &[f64], conn: &Connection) -> f64 {
    if changes(v, conn) {
        conn.mel.norm()
    } else {
        0.0
    }
}

/// Summed weight of the connections of `from` which lead to `to`. `diff` lists the sites
/// where the two differ.
fn weight_to(from: &[f64], conns: &[Connection], diff: &[usize], to: &[f64]) -> f64 {
    conns
        .iter()
        .filter(|c| {
            diff.iter().all(|d| c.sites.contains(d))
                && c.sites
                    .iter()
                    .zip(c.values.iter())
                    .all(|(s, x)| same_value(to[*s], *x))
        })
        .map(|c| move_weight(from, c))
        .sum()
}

impl<'a, O: Operator + ?Sized> MoveProposer for HamiltonianMove<'a, O> {
    fn propose<R: Rng + ?Sized>(&mut self, v: &[f64], rng: &mut R) -> Result<Move> {
        self.forward.clear();
        self.operator.find_conn(v, &mut self.forward);
        let weights = CumulativeWeights::new(self.forward.iter().map(|c| move_weight(v, c)))
            .ok_or_else(|| {
                SamplerError::no_valid_move("hamiltonian", "no off-diagonal connection")
            })?;
        let chosen = &self.forward[weights.sample(rng)];

        self.candidate.clear();
        self.candidate.extend_from_slice(v);
        crate::machine::update_conf(&mut self.candidate, &chosen.sites, &chosen.values);
        let diff: Vec<usize> = chosen
            .sites
            .iter()
            .cloned()
            .filter(|s| !same_value(v[*s], self.candidate[*s]))
            .collect();

        let forward_p = weight_to(v, &self.forward, &diff, &self.candidate) / weights.total();

        self.backward.clear();
        self.operator.find_conn(&self.candidate, &mut self.backward);
        let backward_total: f64 = self
            .backward
            .iter()
            .map(|c| move_weight(&self.candidate, c))
            .sum();
        let backward_p = if backward_total > 0.0 {
            weight_to(&self.candidate, &self.backward, &diff, v) / backward_total
        } else {
            0.0
        };
        // ln(0) = -inf, the move is rejected when it cannot be reversed.
        let log_ratio = backward_p.ln() - forward_p.ln();

        let values: Vec<f64> = diff.iter().map(|s| self.candidate[*s]).collect();
        Ok(Move::new(diff, values).with_log_proposal_ratio(log_ratio))
    }

    fn name(&self) -> &'static str {
        "MetropolisHamiltonian"
    }
}
