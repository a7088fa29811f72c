#![allow(dead_code)]

use num_complex::Complex64;
use rand::rngs::SmallRng;
use vmc_sampler::machine::Machine;
use vmc_sampler::operator::LocalOperator;
use vmc_sampler::sampler::ExactSampler;

/// `log psi = sum_i h_i v_i + J sum_i v_i v_{i+1} + i phase(v)`
#[derive(Debug, Clone)]
pub struct IsingChain {
    pub fields: Vec<f64>,
    pub coupling: f64,
    pub local: Vec<f64>,
}

impl IsingChain {
    pub fn new(fields: Vec<f64>, coupling: f64) -> Self {
        Self {
            fields,
            coupling,
            local: vec![-1.0, 1.0],
        }
    }
}

impl Machine for IsingChain {
    fn n_visible(&self) -> usize {
        self.fields.len()
    }

    fn local_states(&self) -> &[f64] {
        &self.local
    }

    fn log_val(&self, v: &[f64]) -> Complex64 {
        let field: f64 = v.iter().zip(self.fields.iter()).map(|(a, b)| a * b).sum();
        let bonds: f64 = v.windows(2).map(|w| w[0] * w[1]).sum();
        let phase: f64 = v.iter().enumerate().map(|(i, x)| 0.1 * i as f64 * x).sum();
        Complex64::new(field + self.coupling * bonds, phase)
    }
}

/// Every configuration has the same amplitude.
#[derive(Debug, Clone)]
pub struct FlatMachine {
    pub n: usize,
    pub local: Vec<f64>,
}

impl Machine for FlatMachine {
    fn n_visible(&self) -> usize {
        self.n
    }

    fn local_states(&self) -> &[f64] {
        &self.local
    }

    fn log_val(&self, _v: &[f64]) -> Complex64 {
        Complex64::new(-0.5, 0.25)
    }
}

/// Two well separated modes, all up and all down.
#[derive(Debug, Clone)]
pub struct TwoModes {
    pub n: usize,
    pub local: Vec<f64>,
    pub bias: f64,
}

impl Machine for TwoModes {
    fn n_visible(&self) -> usize {
        self.n
    }

    fn local_states(&self) -> &[f64] {
        &self.local
    }

    fn log_val(&self, v: &[f64]) -> Complex64 {
        let m: f64 = v.iter().sum();
        Complex64::new(0.5 * m * m + self.bias * m, 0.0)
    }
}

pub fn sigma_x() -> Vec<Vec<f64>> {
    vec![vec![0.0, 1.0], vec![1.0, 0.0]]
}

/// Transverse field on every site plus a two site term with configuration dependent
/// off-diagonal magnitudes on the first bond.
pub fn uneven_hamiltonian(n: usize) -> LocalOperator {
    let pair = vec![
        vec![0.0, 0.0, 0.0, 2.0],
        vec![0.0, 0.0, 0.5, 0.0],
        vec![0.0, 0.5, 0.0, 0.0],
        vec![2.0, 0.0, 0.0, 0.0],
    ];
    let mut op = LocalOperator::new(vec![-1.0, 1.0]);
    for i in 0..n {
        op.push_term(sigma_x(), vec![i]).unwrap();
    }
    op.push_term(pair, vec![0, 1]).unwrap();
    op
}

/// Empirical frequencies of the configurations visited after each sweep.
pub fn visit_frequencies<M, F>(
    exact: &ExactSampler<'_, M, SmallRng>,
    n_sweeps: usize,
    mut sweep: F,
) -> Vec<f64>
where
    M: Machine + ?Sized,
    F: FnMut() -> Vec<f64>,
{
    let mut counts = vec![0usize; exact.probabilities().len()];
    for _ in 0..n_sweeps {
        let v = sweep();
        let indx = exact.index_of_state(&v).unwrap();
        counts[indx] += 1;
    }
    counts
        .into_iter()
        .map(|c| c as f64 / n_sweeps as f64)
        .collect()
}

/// Largest absolute difference between two distributions.
pub fn max_deviation(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, f64::max)
}
