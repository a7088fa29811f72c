//! Single chain samplers: the Metropolis-Hastings engine with its move proposers, and the
//! exact enumeration sampler.

/// Sampling by enumeration of every configuration.
pub mod exact;
/// The Metropolis-Hastings engine.
pub mod metropolis;
pub mod moves;

pub use exact::*;
pub use metropolis::*;
pub use moves::{CustomMove, ExchangeMove, HamiltonianMove, HopMove, LocalMove};

use crate::errors::{Result, SamplerError};
use crate::graph::Graph;
use crate::machine::Machine;
use crate::operator::Operator;
use rand::Rng;
use std::fmt::{Debug, Formatter};

/// The uniform contract every sampler exposes to a driver.
pub trait AbstractSampler {
    /// Pick a fresh initial configuration and zero the acceptance statistics.
    fn reset(&mut self);

    /// Perform one sweep, `n_visible` elementary attempts for Markov chain samplers.
    fn sweep(&mut self);

    /// The current configuration.
    fn visible(&self) -> &[f64];

    /// Overwrite the current configuration. Fails if it does not match the machine.
    fn set_visible(&mut self, v: &[f64]) -> Result<()>;

    /// Acceptance ratios since the last reset, each in `[0, 1]`.
    fn acceptance(&self) -> Vec<f64>;

    /// Number of sites in a configuration.
    fn n_visible(&self) -> usize {
        self.visible().len()
    }

    /// Registry name of the sampler.
    fn name(&self) -> &'static str;

    /// Discard `n_discard` sweeps then record the configuration after each of `n_samples`
    /// further sweeps.
    fn samples(&mut self, n_samples: usize, n_discard: usize) -> Vec<Vec<f64>> {
        (0..n_discard).for_each(|_| self.sweep());
        (0..n_samples)
            .map(|_| {
                self.sweep();
                self.visible().to_vec()
            })
            .collect()
    }
}

impl<S: AbstractSampler + ?Sized> AbstractSampler for Box<S> {
    fn reset(&mut self) {
        (**self).reset()
    }

    fn sweep(&mut self) {
        (**self).sweep()
    }

    fn visible(&self) -> &[f64] {
        (**self).visible()
    }

    fn set_visible(&mut self, v: &[f64]) -> Result<()> {
        (**self).set_visible(v)
    }

    fn acceptance(&self) -> Vec<f64> {
        (**self).acceptance()
    }

    fn n_visible(&self) -> usize {
        (**self).n_visible()
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn samples(&mut self, n_samples: usize, n_discard: usize) -> Vec<Vec<f64>> {
        (**self).samples(n_samples, n_discard)
    }
}

impl Debug for dyn AbstractSampler + '_ {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AbstractSampler")
            .field("name", &self.name())
            .field("n_visible", &self.n_visible())
            .finish()
    }
}

/// A machine must have sites and at least one local value.
pub(crate) fn check_machine<M: Machine + ?Sized>(machine: &M) -> Result<()> {
    if machine.local_states().is_empty() {
        return Err(SamplerError::construction(
            "machine",
            machine.local_states(),
            "the machine has no local states",
        ));
    }
    if machine.n_visible() == 0 {
        return Err(SamplerError::construction(
            "machine",
            machine.n_visible(),
            "the machine has no visible units",
        ));
    }
    Ok(())
}

/// Single site Metropolis sampler.
pub type MetropolisLocal<'a, M, R> = MetropolisHastings<'a, M, LocalMove, R>;
/// Two site hopping Metropolis sampler.
pub type MetropolisHop<'a, M, R> = MetropolisHastings<'a, M, HopMove, R>;
/// Two site exchange Metropolis sampler.
pub type MetropolisExchange<'a, M, R> = MetropolisHastings<'a, M, ExchangeMove, R>;
/// Metropolis sampler moving along the connections of an operator.
pub type MetropolisHamiltonian<'a, M, O, R> = MetropolisHastings<'a, M, HamiltonianMove<'a, O>, R>;
/// Metropolis sampler with user supplied stochastic move matrices.
pub type CustomSampler<'a, M, R> = MetropolisHastings<'a, M, CustomMove, R>;

/// Make a single site Metropolis sampler.
pub fn metropolis_local<M, R>(machine: &M, rng: R) -> Result<MetropolisLocal<'_, M, R>>
where
    M: Machine + ?Sized,
    R: Rng,
{
    MetropolisHastings::new(machine, LocalMove::new(machine), rng)
}

/// Make a hopping sampler over pairs of sites at most `d_max` apart on `graph`.
pub fn metropolis_hop<'a, M, G, R>(
    machine: &'a M,
    graph: &G,
    d_max: usize,
    rng: R,
) -> Result<MetropolisHop<'a, M, R>>
where
    M: Machine + ?Sized,
    G: Graph + ?Sized,
    R: Rng,
{
    MetropolisHastings::new(machine, HopMove::new(graph, machine, d_max)?, rng)
}

/// Make an exchange sampler over pairs of sites at most `d_max` apart on `graph`.
pub fn metropolis_exchange<'a, M, G, R>(
    machine: &'a M,
    graph: &G,
    d_max: usize,
    rng: R,
) -> Result<MetropolisExchange<'a, M, R>>
where
    M: Machine + ?Sized,
    G: Graph + ?Sized,
    R: Rng,
{
    MetropolisHastings::new(machine, ExchangeMove::new(graph, machine, d_max)?, rng)
}

/// Make a sampler moving along the off-diagonal connections of `hamiltonian`.
pub fn metropolis_hamiltonian<'a, M, O, R>(
    machine: &'a M,
    hamiltonian: &'a O,
    rng: R,
) -> Result<MetropolisHamiltonian<'a, M, O, R>>
where
    M: Machine + ?Sized,
    O: Operator + ?Sized,
    R: Rng,
{
    MetropolisHastings::new(machine, HamiltonianMove::new(hamiltonian), rng)
}

/// Make a sampler from column stochastic move matrices acting on the given sites.
pub fn custom_sampler<M, R>(
    machine: &M,
    move_operators: Vec<Vec<Vec<f64>>>,
    acting_on: Vec<Vec<usize>>,
    move_weights: Option<Vec<f64>>,
    rng: R,
) -> Result<CustomSampler<'_, M, R>>
where
    M: Machine + ?Sized,
    R: Rng,
{
    let proposer = CustomMove::new(machine, move_operators, acting_on, move_weights)?;
    MetropolisHastings::new(machine, proposer, rng)
}

/// Make an exact sampler with the default enumeration bound.
pub fn exact_sampler<M, R>(machine: &M, rng: R) -> Result<ExactSampler<'_, M, R>>
where
    M: Machine + ?Sized,
    R: Rng,
{
    ExactSampler::new(machine, rng)
}
