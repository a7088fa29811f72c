use crate::machine::Machine;
use crate::sampler::{AbstractSampler, MetropolisHastings, MoveProposer};
use rand::Rng;

/// Allows setting states without validation, used to move configurations between replicas.
pub trait StateSetter {
    /// Replace the state of the instance, returning the previous one.
    fn set_state(&mut self, state: Vec<f64>) -> Vec<f64>;
}

/// Allows evaluating the weight of the current state.
pub trait LogWeight {
    /// `Re log psi` of the current state, before scaling by the exponent.
    fn log_weight(&self) -> f64;
}

/// Samplers whose target distribution can be flattened by an exponent.
pub trait Tempered {
    /// The exponent `beta` of the target `|psi|^(2 beta)`.
    fn beta(&self) -> f64;

    /// Set the exponent.
    fn set_beta(&mut self, beta: f64);
}

/// Everything the tempering container needs from a replica.
pub trait Replica: AbstractSampler + StateSetter + LogWeight + Tempered {}

impl<T: AbstractSampler + StateSetter + LogWeight + Tempered> Replica for T {}

impl<'a, M, P, R> StateSetter for MetropolisHastings<'a, M, P, R>
where
    M: Machine + ?Sized,
    P: MoveProposer,
    R: Rng,
{
    fn set_state(&mut self, state: Vec<f64>) -> Vec<f64> {
        debug_assert_eq!(state.len(), self.n_visible());
        self.replace_visible(state)
    }
}

impl<'a, M, P, R> LogWeight for MetropolisHastings<'a, M, P, R>
where
    M: Machine + ?Sized,
    P: MoveProposer,
    R: Rng,
{
    fn log_weight(&self) -> f64 {
        self.machine().log_val(self.visible()).re
    }
}

impl<'a, M, P, R> Tempered for MetropolisHastings<'a, M, P, R>
where
    M: Machine + ?Sized,
    P: MoveProposer,
    R: Rng,
{
    fn beta(&self) -> f64 {
        MetropolisHastings::beta(self)
    }

    fn set_beta(&mut self, beta: f64) {
        MetropolisHastings::set_beta(self, beta)
    }
}
