use crate::errors::{Result, SamplerError};
use crate::machine::Machine;
use crate::sampler::AbstractSampler;
use crate::util::{check_configuration, space_size, sub_index, sub_values, CumulativeWeights};
use log::{debug, warn};
use rand::Rng;

/// Largest number of configurations enumerated by default.
pub const DEFAULT_MAX_STATES: usize = 1 << 20;

/// Draws independent configurations from `|psi|^2` by enumerating the full Hilbert space.
///
/// Configurations are indexed in mixed radix over the local values, site 0 being the most
/// significant digit. Only usable for small systems.
#[derive(Debug)]
pub struct ExactSampler<'a, M, R>
where
    M: Machine + ?Sized,
    R: Rng,
{
    machine: &'a M,
    rng: R,
    visible: Vec<f64>,
    bound: usize,
    weights: CumulativeWeights,
    probabilities: Vec<f64>,
}

impl<'a, M, R> ExactSampler<'a, M, R>
where
    M: Machine + ?Sized,
    R: Rng,
{
    /// Enumerate up to [`DEFAULT_MAX_STATES`] configurations.
    pub fn new(machine: &'a M, rng: R) -> Result<Self> {
        Self::with_bound(machine, DEFAULT_MAX_STATES, rng)
    }

    /// Enumerate up to `bound` configurations, fails with `HilbertSpaceTooLarge` beyond it.
    pub fn with_bound(machine: &'a M, bound: usize, rng: R) -> Result<Self> {
        crate::sampler::check_machine(machine)?;
        let local_size = machine.local_states().len();
        let n_sites = machine.n_visible();
        match space_size(local_size, n_sites) {
            Some(size) if size <= bound => {}
            _ => {
                return Err(SamplerError::HilbertSpaceTooLarge {
                    local_size,
                    n_sites,
                    bound,
                })
            }
        }
        let (weights, probabilities) = Self::distribution(machine)?;
        let mut sampler = Self {
            machine,
            rng,
            visible: vec![],
            bound,
            weights,
            probabilities,
        };
        sampler.draw();
        Ok(sampler)
    }

    /// Normalized `|psi|^2` for every configuration, shifted by the largest log amplitude
    /// before exponentiating.
    fn distribution(machine: &M) -> Result<(CumulativeWeights, Vec<f64>)> {
        let local = machine.local_states();
        let n = machine.n_visible();
        let size = space_size(local.len(), n).unwrap_or(0);
        let log_p: Vec<f64> = (0..size)
            .map(|indx| 2.0 * machine.log_val(&sub_values(indx, n, local)).re)
            .collect();
        let max = log_p.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let unnormalized = log_p.iter().map(|lp| (lp - max).exp());
        let weights = CumulativeWeights::new(unnormalized).ok_or_else(|| {
            SamplerError::construction(
                "machine",
                max,
                "no configuration has a finite nonzero amplitude",
            )
        })?;
        let probabilities = (0..weights.len()).map(|i| weights.probability(i)).collect();
        Ok((weights, probabilities))
    }

    fn draw(&mut self) {
        let indx = self.weights.sample(&mut self.rng);
        self.visible = self.state_from_index(indx);
    }

    /// Probability of every configuration, by index.
    pub fn probabilities(&self) -> &[f64] {
        &self.probabilities
    }

    /// The configuration with the given index.
    pub fn state_from_index(&self, indx: usize) -> Vec<f64> {
        sub_values(indx, self.machine.n_visible(), self.machine.local_states()).into_vec()
    }

    /// Index of a configuration, None if a value is not a local state.
    pub fn index_of_state(&self, v: &[f64]) -> Option<usize> {
        if v.len() != self.machine.n_visible() {
            return None;
        }
        let sites: Vec<usize> = (0..v.len()).collect();
        sub_index(v, &sites, self.machine.local_states())
    }

    /// The enumeration bound this sampler was built with.
    pub fn bound(&self) -> usize {
        self.bound
    }
}

impl<'a, M, R> AbstractSampler for ExactSampler<'a, M, R>
where
    M: Machine + ?Sized,
    R: Rng,
{
    /// Recomputes the distribution, picking up machine parameter changes.
    fn reset(&mut self) {
        match Self::distribution(self.machine) {
            Ok((weights, probabilities)) => {
                self.weights = weights;
                self.probabilities = probabilities;
            }
            Err(err) => warn!("Keeping previous distribution: {}", err),
        }
        debug!("Enumerated {} configurations", self.probabilities.len());
        self.draw();
    }

    /// Draws one independent configuration.
    fn sweep(&mut self) {
        self.draw();
    }

    fn visible(&self) -> &[f64] {
        &self.visible
    }

    fn set_visible(&mut self, v: &[f64]) -> Result<()> {
        check_configuration(v, self.machine.n_visible(), self.machine.local_states())?;
        self.visible = v.to_vec();
        Ok(())
    }

    /// Every draw is accepted, also right after a reset.
    fn acceptance(&self) -> Vec<f64> {
        vec![1.0]
    }

    fn name(&self) -> &'static str {
        "ExactSampler"
    }
}
