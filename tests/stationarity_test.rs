extern crate rand;
extern crate vmc_sampler;

mod common;

use common::*;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use vmc_sampler::comm::SingleProcess;
use vmc_sampler::graph::EdgeGraph;
use vmc_sampler::parallel_tempering::*;
use vmc_sampler::sampler::*;

const N_SWEEPS: usize = 40_000;
const TOLERANCE: f64 = 0.02;

fn chain_machine() -> IsingChain {
    IsingChain::new(vec![0.3, -0.2, 0.1, 0.25], 0.2)
}

fn exact(machine: &IsingChain) -> ExactSampler<'_, IsingChain, SmallRng> {
    ExactSampler::new(machine, SmallRng::seed_from_u64(0)).unwrap()
}

fn check_against_exact<S: AbstractSampler>(machine: &IsingChain, mut sampler: S) {
    let exact = exact(machine);
    (0..100).for_each(|_| sampler.sweep());
    let freqs = visit_frequencies(&exact, N_SWEEPS, || {
        sampler.sweep();
        sampler.visible().to_vec()
    });
    let dev = max_deviation(&freqs, exact.probabilities());
    assert!(
        dev < TOLERANCE,
        "{}: deviation {} from {:?}",
        sampler.name(),
        dev,
        exact.probabilities()
    );
}

#[test]
fn local_matches_exact() {
    let m = chain_machine();
    let s = metropolis_local(&m, SmallRng::seed_from_u64(1)).unwrap();
    check_against_exact(&m, s);
}

#[test]
fn hop_matches_exact() {
    let m = chain_machine();
    let g = EdgeGraph::chain(4, true);
    let s = metropolis_hop(&m, &g, 1, SmallRng::seed_from_u64(2)).unwrap();
    check_against_exact(&m, s);
}

#[test]
fn hamiltonian_matches_exact() {
    let m = chain_machine();
    let h = uneven_hamiltonian(4);
    let s = metropolis_hamiltonian(&m, &h, SmallRng::seed_from_u64(3)).unwrap();
    check_against_exact(&m, s);
}

#[test]
fn custom_matches_exact() {
    let m = chain_machine();
    // Column stochastic, at(new, old) = T(old -> new).
    let tilted = vec![vec![0.3, 0.6], vec![0.7, 0.4]];
    let uniform_pair = vec![vec![0.25; 4]; 4];
    let mut ops: Vec<Vec<Vec<f64>>> = (0..4).map(|_| tilted.clone()).collect();
    ops.push(uniform_pair);
    let acting_on = vec![vec![0], vec![1], vec![2], vec![3], vec![1, 2]];
    let s = custom_sampler(
        &m,
        ops,
        acting_on,
        Some(vec![1.0, 1.0, 1.0, 1.0, 2.0]),
        SmallRng::seed_from_u64(4),
    )
    .unwrap();
    check_against_exact(&m, s);
}

#[test]
fn tempered_target_matches_exact() {
    let m = chain_machine();
    let s = metropolis_local_pt(&m, 3, SingleProcess, SmallRng::seed_from_u64(5)).unwrap();
    check_against_exact(&m, s);
}

#[test]
fn exact_sampler_matches_itself() {
    let m = chain_machine();
    let s = ExactSampler::new(&m, SmallRng::seed_from_u64(6)).unwrap();
    check_against_exact(&m, s);
}

#[test]
fn exchange_matches_exact_in_sector() {
    let m = chain_machine();
    let g = EdgeGraph::chain(4, true);
    let mut s = metropolis_exchange(&m, &g, 1, SmallRng::seed_from_u64(7)).unwrap();
    s.set_visible(&[1.0, 1.0, -1.0, -1.0]).unwrap();

    let exact = exact(&m);
    let in_sector: Vec<bool> = (0..exact.probabilities().len())
        .map(|i| exact.state_from_index(i).iter().sum::<f64>() == 0.0)
        .collect();
    let sector_total: f64 = exact
        .probabilities()
        .iter()
        .zip(in_sector.iter())
        .filter(|(_, b)| **b)
        .map(|(p, _)| p)
        .sum();
    let expected: Vec<f64> = exact
        .probabilities()
        .iter()
        .zip(in_sector.iter())
        .map(|(p, b)| if *b { p / sector_total } else { 0.0 })
        .collect();

    let freqs = visit_frequencies(&exact, N_SWEEPS, || {
        s.sweep();
        s.visible().to_vec()
    });
    let dev = max_deviation(&freqs, &expected);
    assert!(dev < TOLERANCE, "deviation {} from {:?}", dev, expected);
}
