use crate::errors::Result;
use crate::machine::{update_conf, Machine};
use crate::operator::Sites;
use crate::sampler::AbstractSampler;
use crate::util::{check_configuration, random_configuration, SubConfig};
use log::{trace, warn};
use rand::Rng;

/// Running count of proposed and accepted moves.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AcceptanceStats {
    /// Number of elementary attempts.
    pub proposed: u64,
    /// Number of attempts which changed (or kept, for identity moves) the configuration.
    pub accepted: u64,
}

impl AcceptanceStats {
    /// Count one attempt.
    pub fn record(&mut self, accepted: bool) {
        self.proposed += 1;
        if accepted {
            self.accepted += 1;
        }
    }

    /// Accepted over proposed, zero before the first attempt.
    pub fn ratio(&self) -> f64 {
        if self.proposed == 0 {
            0.0
        } else {
            self.accepted as f64 / self.proposed as f64
        }
    }

    /// Zero both counters.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// A sparse proposed update of a configuration.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Move {
    /// Sites to change.
    pub sites: Sites,
    /// New values for those sites.
    pub values: SubConfig,
    /// `ln(T(s' -> s) / T(s -> s'))`, zero for symmetric proposals.
    pub log_proposal_ratio: f64,
    /// Which kind of move this is, for the per category acceptance breakdown.
    pub category: usize,
}

impl Move {
    /// A symmetric move setting `values` on `sites`.
    pub fn new<A, B>(sites: A, values: B) -> Self
    where
        A: IntoIterator<Item = usize>,
        B: IntoIterator<Item = f64>,
    {
        Self {
            sites: sites.into_iter().collect(),
            values: values.into_iter().collect(),
            log_proposal_ratio: 0.0,
            category: 0,
        }
    }

    /// The move which leaves the configuration unchanged.
    pub fn identity() -> Self {
        Self::default()
    }

    /// Set the log ratio of backward to forward proposal probabilities.
    pub fn with_log_proposal_ratio(mut self, log_ratio: f64) -> Self {
        self.log_proposal_ratio = log_ratio;
        self
    }

    /// Set the move category.
    pub fn with_category(mut self, category: usize) -> Self {
        self.category = category;
        self
    }

    /// Whether this move changes nothing.
    pub fn is_identity(&self) -> bool {
        self.sites.is_empty()
    }

    /// Write the move into a configuration.
    pub fn apply(&self, v: &mut [f64]) {
        update_conf(v, &self.sites, &self.values)
    }
}

/// A strategy producing candidate moves for the Metropolis engine.
///
/// The forward/backward pairing is carried by [`Move::log_proposal_ratio`], the engine
/// satisfies detailed balance only if every proposer sets it correctly.
pub trait MoveProposer: Clone {
    /// Propose a move from `v`. Fails with `NoValidMove` when there is no candidate.
    fn propose<R: Rng + ?Sized>(&mut self, v: &[f64], rng: &mut R) -> Result<Move>;

    /// Name of the sampler built from this proposer.
    fn name(&self) -> &'static str;

    /// Number of move categories reported in the acceptance breakdown.
    fn n_categories(&self) -> usize {
        1
    }
}

/// Randomly choose if a move should be accepted given its log acceptance probability.
/// Non-finite values are always rejected.
pub fn should_accept<R: Rng + ?Sized>(rng: &mut R, log_p: f64) -> bool {
    if !log_p.is_finite() {
        false
    } else if log_p >= 0.0 {
        // Always accepted, don't bother drawing.
        true
    } else {
        rng.gen::<f64>() < log_p.exp()
    }
}

/// Random configurations `reset` draws looking for a nonzero amplitude.
const RESET_ATTEMPTS: usize = 100;

/// Metropolis-Hastings chain sampling `|psi|^(2 beta)` with a pluggable move proposer.
#[derive(Debug)]
pub struct MetropolisHastings<'a, M, P, R>
where
    M: Machine + ?Sized,
    P: MoveProposer,
    R: Rng,
{
    machine: &'a M,
    proposer: P,
    rng: R,
    visible: Vec<f64>,
    beta: f64,
    stats: AcceptanceStats,
    category_stats: Vec<AcceptanceStats>,
}

impl<'a, M, P, R> MetropolisHastings<'a, M, P, R>
where
    M: Machine + ?Sized,
    P: MoveProposer,
    R: Rng,
{
    /// Make a new chain at a random initial configuration.
    pub fn new(machine: &'a M, proposer: P, rng: R) -> Result<Self> {
        crate::sampler::check_machine(machine)?;
        let n_categories = proposer.n_categories().max(1);
        let mut sampler = Self {
            machine,
            proposer,
            rng,
            visible: vec![],
            beta: 1.0,
            stats: AcceptanceStats::default(),
            category_stats: vec![AcceptanceStats::default(); n_categories],
        };
        sampler.reset();
        Ok(sampler)
    }

    /// Sample `|psi|^(2 beta)` instead of `|psi|^2`.
    pub fn with_beta(mut self, beta: f64) -> Self {
        self.beta = beta;
        self
    }

    /// The exponent scaling the target distribution.
    pub fn beta(&self) -> f64 {
        self.beta
    }

    /// Change the exponent, the current configuration is kept.
    pub fn set_beta(&mut self, beta: f64) {
        self.beta = beta;
    }

    /// Perform a single elementary move attempt, returns whether it was accepted.
    pub fn step(&mut self) -> bool {
        let mv = match self.proposer.propose(&self.visible, &mut self.rng) {
            Ok(mv) => mv,
            Err(err) => {
                trace!("{} rejected: {}", self.proposer.name(), err);
                self.stats.record(false);
                return false;
            }
        };
        let accepted = if mv.is_identity() {
            true
        } else {
            let lvd = self
                .machine
                .log_val_diff(&self.visible, &mv.sites, &mv.values);
            let log_p = 2.0 * self.beta * lvd.re + mv.log_proposal_ratio;
            should_accept(&mut self.rng, log_p)
        };
        if accepted {
            mv.apply(&mut self.visible);
        }
        self.stats.record(accepted);
        if let Some(stats) = self.category_stats.get_mut(mv.category) {
            stats.record(accepted);
        }
        accepted
    }

    /// Acceptance ratio per move category. Attempts which failed to produce a move are only
    /// counted in the aggregate.
    pub fn acceptance_breakdown(&self) -> Vec<f64> {
        self.category_stats.iter().map(|s| s.ratio()).collect()
    }

    /// Aggregate counters.
    pub fn stats(&self) -> AcceptanceStats {
        self.stats
    }

    /// The move proposer.
    pub fn proposer(&self) -> &P {
        &self.proposer
    }

    /// The machine being sampled.
    pub fn machine(&self) -> &'a M {
        self.machine
    }

    /// Overwrite the configuration without validation.
    pub(crate) fn replace_visible(&mut self, v: Vec<f64>) -> Vec<f64> {
        std::mem::replace(&mut self.visible, v)
    }
}

impl<'a, M, P, R> AbstractSampler for MetropolisHastings<'a, M, P, R>
where
    M: Machine + ?Sized,
    P: MoveProposer,
    R: Rng,
{
    /// Draws a new random configuration, avoiding ones where `psi` vanishes when it can.
    fn reset(&mut self) {
        let machine = self.machine;
        let draw = |rng: &mut R| {
            random_configuration(machine.n_visible(), machine.local_states(), rng)
        };
        let mut visible = draw(&mut self.rng);
        let mut attempts = 1;
        while !machine.log_val(&visible).re.is_finite() {
            if attempts == RESET_ATTEMPTS {
                warn!(
                    "No configuration with nonzero amplitude in {} draws, starting from {:?}",
                    RESET_ATTEMPTS, visible
                );
                break;
            }
            visible = draw(&mut self.rng);
            attempts += 1;
        }
        self.visible = visible;
        self.stats.clear();
        self.category_stats.iter_mut().for_each(|s| s.clear());
    }

    fn sweep(&mut self) {
        for _ in 0..self.machine.n_visible() {
            self.step();
        }
    }

    fn visible(&self) -> &[f64] {
        &self.visible
    }

    fn set_visible(&mut self, v: &[f64]) -> Result<()> {
        check_configuration(v, self.machine.n_visible(), self.machine.local_states())?;
        self.visible.clear();
        self.visible.extend_from_slice(v);
        Ok(())
    }

    fn acceptance(&self) -> Vec<f64> {
        vec![self.stats.ratio()]
    }

    fn name(&self) -> &'static str {
        self.proposer.name()
    }
}
