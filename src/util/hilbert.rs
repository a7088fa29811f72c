use crate::errors::{Result, SamplerError};
use rand::Rng;
use smallvec::SmallVec;

/// Values of a few sites, as produced by a sparse move.
pub type SubConfig = SmallVec<[f64; 4]>;

/// Tolerance used to compare local values.
pub(crate) fn same_value(a: f64, b: f64) -> bool {
    (a - b).abs() <= f64::EPSILON * a.abs().max(b.abs()).max(1.0)
}

/// Index of `value` within the allowed local values, if present.
pub fn local_index(local_states: &[f64], value: f64) -> Option<usize> {
    local_states.iter().position(|s| same_value(*s, value))
}

/// Check that a configuration has n entries, each drawn from `local_states`.
pub fn check_configuration(v: &[f64], n: usize, local_states: &[f64]) -> Result<()> {
    if v.len() != n {
        return Err(SamplerError::invalid_configuration(format!(
            "expected {} sites, got {}",
            n,
            v.len()
        )));
    }
    match v
        .iter()
        .enumerate()
        .find(|(_, x)| local_index(local_states, **x).is_none())
    {
        Some((site, x)) => Err(SamplerError::invalid_configuration(format!(
            "value {} at site {} is not one of the local states {:?}",
            x, site, local_states
        ))),
        None => Ok(()),
    }
}

/// Randomly build a configuration with values drawn uniformly from `local_states`.
pub fn random_configuration<R: Rng + ?Sized>(
    n: usize,
    local_states: &[f64],
    rng: &mut R,
) -> Vec<f64> {
    (0..n)
        .map(|_| local_states[rng.gen_range(0..local_states.len())])
        .collect()
}

/// Mixed radix index of the values at `sites`, first site most significant.
pub fn sub_index(v: &[f64], sites: &[usize], local_states: &[f64]) -> Option<usize> {
    let base = local_states.len();
    sites.iter().try_fold(0usize, |acc, site| {
        local_index(local_states, v[*site]).map(|indx| acc * base + indx)
    })
}

/// Values encoded by a mixed radix index over `n_sites` sites. Inverse of [`sub_index`].
pub fn sub_values(index: usize, n_sites: usize, local_states: &[f64]) -> SubConfig {
    let base = local_states.len();
    let mut values: SubConfig = SmallVec::from_elem(0.0, n_sites);
    let mut rest = index;
    values.iter_mut().rev().for_each(|x| {
        *x = local_states[rest % base];
        rest /= base;
    });
    values
}

/// Number of configurations of `n_sites` sites with `local_size` values each, if it fits.
pub fn space_size(local_size: usize, n_sites: usize) -> Option<usize> {
    let exp = u32::try_from(n_sites).ok()?;
    local_size.checked_pow(exp)
}
