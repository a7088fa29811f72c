use crate::comm::Communicator;
use crate::errors::{Result, SamplerError};
use crate::graph::Graph;
use crate::machine::Machine;
use crate::operator::Operator;
use crate::parallel_tempering::tempering_traits::*;
use crate::sampler::*;
use log::{debug, info};
use rand::{Rng, SeedableRng};
use std::ops::Range;

/// Parallel tempering over a ladder of `n_replicas` exponents, distributed over ranks.
///
/// Slot `i` samples `|psi|^(2 beta_i)` with `beta_i = 1 - i / n_replicas`, slot 0 being the
/// physical distribution. Slots are assigned to ranks in contiguous blocks. Exponents stay
/// attached to their slots, configurations move between them.
///
/// [`TemperingContainer::sweep`] and [`TemperingContainer::exchange_step`] are collective:
/// every rank must call them the same number of times.
#[derive(Debug)]
pub struct TemperingContainer<S: Replica, R: Rng, C: Communicator> {
    replicas: Vec<S>,
    slots: Range<usize>,
    exponents: Vec<f64>,
    comm: C,
    rng: R,
    exchange_interval: usize,
    sweeps_since_exchange: usize,
    swap_stats: Vec<AcceptanceStats>,
    name: &'static str,
}

/// Contiguous block of slots owned by `rank`.
pub fn slot_range(n_replicas: usize, size: usize, rank: usize) -> Range<usize> {
    let base = n_replicas / size;
    let rem = n_replicas % size;
    let start = rank * base + rank.min(rem);
    let len = base + usize::from(rank < rem);
    start..start + len
}

/// Rank owning `slot`.
pub fn slot_owner(n_replicas: usize, size: usize, slot: usize) -> usize {
    (0..size)
        .find(|rank| slot_range(n_replicas, size, *rank).contains(&slot))
        .unwrap_or(size - 1)
}

/// Exponents `1 - i / n_replicas` for every slot.
pub fn exponent_ladder(n_replicas: usize) -> Vec<f64> {
    (0..n_replicas)
        .map(|i| 1.0 - i as f64 / n_replicas as f64)
        .collect()
}

/// Registry name of a tempered version of the inner sampler.
fn tempered_name(inner: &str) -> &'static str {
    match inner {
        "MetropolisLocal" => "MetropolisLocalPt",
        "MetropolisHamiltonian" => "MetropolisHamiltonianPt",
        "MetropolisExchange" => "MetropolisExchangePt",
        "CustomSampler" => "CustomSamplerPt",
        _ => "ParallelTempering",
    }
}

impl<S: Replica, R: Rng + SeedableRng, C: Communicator> TemperingContainer<S, R, C> {
    /// Build the local replicas with `make_replica(slot, rng)`, each with its own generator
    /// drawn from `rng`.
    pub fn new<F>(n_replicas: usize, comm: C, mut rng: R, mut make_replica: F) -> Result<Self>
    where
        F: FnMut(usize, R) -> Result<S>,
    {
        let size = comm.size();
        if n_replicas == 0 {
            return Err(SamplerError::construction(
                "n_replicas",
                n_replicas,
                "at least one replica is needed",
            ));
        }
        if n_replicas < size {
            return Err(SamplerError::construction(
                "n_replicas",
                n_replicas,
                format!("every one of the {} ranks needs at least one replica", size),
            ));
        }
        let exponents = exponent_ladder(n_replicas);
        let slots = slot_range(n_replicas, size, comm.rank());
        let replicas = slots
            .clone()
            .map(|slot| {
                let replica_rng = R::seed_from_u64(rng.gen::<u64>().wrapping_add(slot as u64));
                let mut replica = make_replica(slot, replica_rng)?;
                replica.set_beta(exponents[slot]);
                Ok(replica)
            })
            .collect::<Result<Vec<_>>>()?;
        let name = replicas
            .first()
            .map(|r| tempered_name(r.name()))
            .unwrap_or("ParallelTempering");
        info!(
            "Rank {} holds tempering slots {:?} out of {}",
            comm.rank(),
            slots,
            n_replicas
        );
        Ok(Self {
            replicas,
            slots,
            exponents,
            comm,
            rng,
            exchange_interval: 1,
            sweeps_since_exchange: 0,
            swap_stats: vec![AcceptanceStats::default(); n_replicas - 1],
            name,
        })
    }
}

impl<S: Replica, R: Rng, C: Communicator> TemperingContainer<S, R, C> {
    /// Exchange configurations every `interval` sweeps instead of after every sweep.
    pub fn set_exchange_interval(&mut self, interval: usize) -> Result<()> {
        if interval == 0 {
            return Err(SamplerError::construction(
                "exchange_interval",
                interval,
                "must be at least 1",
            ));
        }
        self.exchange_interval = interval;
        self.sweeps_since_exchange = 0;
        Ok(())
    }

    /// Builder version of [`TemperingContainer::set_exchange_interval`].
    pub fn with_exchange_interval(mut self, interval: usize) -> Result<Self> {
        self.set_exchange_interval(interval)?;
        Ok(self)
    }

    /// Sweeps between two exchange steps.
    pub fn exchange_interval(&self) -> usize {
        self.exchange_interval
    }

    /// Total number of slots across ranks.
    pub fn n_replicas(&self) -> usize {
        self.exponents.len()
    }

    /// The exponent of every slot.
    pub fn exponents(&self) -> &[f64] {
        &self.exponents
    }

    /// Slots held by this rank.
    pub fn local_slots(&self) -> Range<usize> {
        self.slots.clone()
    }

    /// The replicas held by this rank, in slot order.
    pub fn replicas(&self) -> &[S] {
        &self.replicas
    }

    /// Configuration of `slot`, if it is held by this rank.
    pub fn replica_visible(&self, slot: usize) -> Option<&[f64]> {
        if self.slots.contains(&slot) {
            Some(self.replicas[slot - self.slots.start].visible())
        } else {
            None
        }
    }

    /// Number of accepted configuration exchanges since the last reset.
    pub fn total_swaps(&self) -> u64 {
        self.swap_stats.iter().map(|s| s.accepted).sum()
    }

    /// Exchange acceptance for each adjacent pair of slots.
    pub fn swap_acceptance(&self) -> Vec<f64> {
        self.swap_stats.iter().map(|s| s.ratio()).collect()
    }

    /// The communicator the container was built with.
    pub fn comm(&self) -> &C {
        &self.comm
    }

    /// Sweep every local replica once, without exchanging.
    pub fn sweep_replicas(&mut self) {
        self.replicas.iter_mut().for_each(|r| r.sweep());
    }

    /// Count a sweep and exchange when the interval is reached.
    fn after_sweep(&mut self) {
        self.sweeps_since_exchange += 1;
        if self.sweeps_since_exchange >= self.exchange_interval {
            self.sweeps_since_exchange = 0;
            self.exchange_step();
        }
    }

    /// Attempt to exchange configurations between adjacent slots: first the pairs
    /// `(0, 1), (2, 3), ...` then `(1, 2), (3, 4), ...`.
    ///
    /// Collective. Rank 0 draws every decision and broadcasts it, all ranks then apply the
    /// same swaps.
    pub fn exchange_step(&mut self) {
        let n = self.n_replicas();
        if n < 2 {
            return;
        }
        self.comm.barrier();
        let local_weights: Vec<f64> = self.replicas.iter().map(|r| r.log_weight()).collect();
        let mut log_weights: Vec<f64> = self.comm.all_gather(&local_weights).concat();
        debug_assert_eq!(log_weights.len(), n);

        for parity in 0..2 {
            let lower_slots: Vec<usize> = (parity..n - 1).step_by(2).collect();
            let mut decisions: Vec<f64> = if self.comm.rank() == 0 {
                lower_slots
                    .iter()
                    .map(|i| {
                        let log_p = 2.0
                            * (self.exponents[*i] - self.exponents[*i + 1])
                            * (log_weights[*i + 1] - log_weights[*i]);
                        if should_accept(&mut self.rng, log_p) {
                            1.0
                        } else {
                            0.0
                        }
                    })
                    .collect()
            } else {
                vec![]
            };
            self.comm.broadcast(&mut decisions, 0);

            for (i, decision) in lower_slots.into_iter().zip(decisions.into_iter()) {
                let swap = decision > 0.5;
                self.swap_stats[i].record(swap);
                if swap {
                    self.swap_slots(i, i + 1);
                    log_weights.swap(i, i + 1);
                }
            }
        }
        debug!("{} configuration exchanges so far", self.total_swaps());
    }

    /// Swap the configurations of slots `a < b`, talking to the owner of the other slot
    /// when only one of them is local.
    fn swap_slots(&mut self, a: usize, b: usize) {
        let local_a = self.slots.contains(&a);
        let local_b = self.slots.contains(&b);
        let offset = self.slots.start;
        match (local_a, local_b) {
            (true, true) => {
                let (low, high) = self.replicas.split_at_mut(b - offset);
                let state_a = low[a - offset].set_state(high[0].visible().to_vec());
                high[0].set_state(state_a);
            }
            (true, false) | (false, true) => {
                let (mine, theirs) = if local_a { (a, b) } else { (b, a) };
                let peer = slot_owner(self.n_replicas(), self.comm.size(), theirs);
                let mut state = self.replicas[mine - offset].visible().to_vec();
                self.comm.exchange(peer, &mut state);
                self.replicas[mine - offset].set_state(state);
            }
            (false, false) => {}
        }
    }
}

impl<S: Replica, R: Rng, C: Communicator> AbstractSampler for TemperingContainer<S, R, C> {
    /// Reset every local replica and the exchange statistics. Not collective, the exchange
    /// schedule carries on so ranks that did not reset stay in step.
    fn reset(&mut self) {
        self.replicas.iter_mut().for_each(|r| r.reset());
        self.swap_stats.iter_mut().for_each(|s| s.clear());
    }

    /// Collective.
    fn sweep(&mut self) {
        self.sweep_replicas();
        self.after_sweep();
    }

    /// Configuration of the coldest local replica, the physical one on rank 0.
    fn visible(&self) -> &[f64] {
        self.replicas[0].visible()
    }

    fn set_visible(&mut self, v: &[f64]) -> Result<()> {
        self.replicas[0].set_visible(v)
    }

    /// Acceptance of the coldest local replica followed by the exchange acceptance of
    /// every adjacent pair of slots.
    fn acceptance(&self) -> Vec<f64> {
        let mut acc = self.replicas[0].acceptance();
        acc.truncate(1);
        acc.extend(self.swap_acceptance());
        acc
    }

    fn n_visible(&self) -> usize {
        self.replicas[0].n_visible()
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

/// Tempered single site Metropolis sampler.
pub type MetropolisLocalPt<'a, M, R, C> = TemperingContainer<MetropolisLocal<'a, M, R>, R, C>;
/// Tempered exchange Metropolis sampler.
pub type MetropolisExchangePt<'a, M, R, C> =
    TemperingContainer<MetropolisExchange<'a, M, R>, R, C>;
/// Tempered Hamiltonian Metropolis sampler.
pub type MetropolisHamiltonianPt<'a, M, O, R, C> =
    TemperingContainer<MetropolisHamiltonian<'a, M, O, R>, R, C>;
/// Tempered custom move sampler.
pub type CustomSamplerPt<'a, M, R, C> = TemperingContainer<CustomSampler<'a, M, R>, R, C>;

/// Make a tempered single site Metropolis sampler.
pub fn metropolis_local_pt<M, R, C>(
    machine: &M,
    n_replicas: usize,
    comm: C,
    rng: R,
) -> Result<MetropolisLocalPt<'_, M, R, C>>
where
    M: Machine + ?Sized,
    R: Rng + SeedableRng,
    C: Communicator,
{
    TemperingContainer::new(n_replicas, comm, rng, |_, rng| {
        metropolis_local(machine, rng)
    })
}

/// Make a tempered exchange sampler over pairs of sites at most `d_max` apart on `graph`.
pub fn metropolis_exchange_pt<'a, M, G, R, C>(
    machine: &'a M,
    graph: &G,
    d_max: usize,
    n_replicas: usize,
    comm: C,
    rng: R,
) -> Result<MetropolisExchangePt<'a, M, R, C>>
where
    M: Machine + ?Sized,
    G: Graph + ?Sized,
    R: Rng + SeedableRng,
    C: Communicator,
{
    let proposer = ExchangeMove::new(graph, machine, d_max)?;
    TemperingContainer::new(n_replicas, comm, rng, |_, rng| {
        MetropolisHastings::new(machine, proposer.clone(), rng)
    })
}

/// Make a tempered sampler moving along the off-diagonal connections of `hamiltonian`.
pub fn metropolis_hamiltonian_pt<'a, M, O, R, C>(
    machine: &'a M,
    hamiltonian: &'a O,
    n_replicas: usize,
    comm: C,
    rng: R,
) -> Result<MetropolisHamiltonianPt<'a, M, O, R, C>>
where
    M: Machine + ?Sized,
    O: Operator + ?Sized,
    R: Rng + SeedableRng,
    C: Communicator,
{
    TemperingContainer::new(n_replicas, comm, rng, |_, rng| {
        metropolis_hamiltonian(machine, hamiltonian, rng)
    })
}

/// Make a tempered sampler from column stochastic move matrices.
pub fn custom_sampler_pt<M, R, C>(
    machine: &M,
    move_operators: Vec<Vec<Vec<f64>>>,
    acting_on: Vec<Vec<usize>>,
    move_weights: Option<Vec<f64>>,
    n_replicas: usize,
    comm: C,
    rng: R,
) -> Result<CustomSamplerPt<'_, M, R, C>>
where
    M: Machine + ?Sized,
    R: Rng + SeedableRng,
    C: Communicator,
{
    let proposer = CustomMove::new(machine, move_operators, acting_on, move_weights)?;
    TemperingContainer::new(n_replicas, comm, rng, |_, rng| {
        MetropolisHastings::new(machine, proposer.clone(), rng)
    })
}

/// Parallel sweeps of the replicas held by one rank.
#[cfg(feature = "parallel-tempering")]
pub mod rayon_tempering {
    use super::*;
    use rayon::prelude::*;

    /// Sweep the local replicas on the rayon thread pool.
    pub trait ParallelSweep {
        /// Parallel version of [`AbstractSampler::sweep`]. Collective across ranks.
        fn parallel_sweep(&mut self);

        /// Parallel version of [`AbstractSampler::samples`].
        fn parallel_samples(&mut self, n_samples: usize, n_discard: usize) -> Vec<Vec<f64>>;
    }

    impl<S, R, C> ParallelSweep for TemperingContainer<S, R, C>
    where
        S: Replica + Send,
        R: Rng,
        C: Communicator,
    {
        fn parallel_sweep(&mut self) {
            self.replicas.par_iter_mut().for_each(|r| r.sweep());
            self.after_sweep();
        }

        fn parallel_samples(&mut self, n_samples: usize, n_discard: usize) -> Vec<Vec<f64>> {
            (0..n_discard).for_each(|_| self.parallel_sweep());
            (0..n_samples)
                .map(|_| {
                    self.parallel_sweep();
                    self.visible().to_vec()
                })
                .collect()
        }
    }

}

#[cfg(test)]
mod swap_test {
    use super::*;
    use crate::comm::SingleProcess;
    use crate::machine::test_machines::{Flat, Ising};
    use rand::rngs::SmallRng;

    #[test]
    fn block_distribution() {
        assert_eq!(slot_range(5, 2, 0), 0..3);
        assert_eq!(slot_range(5, 2, 1), 3..5);
        assert_eq!(slot_range(4, 4, 3), 3..4);
        assert_eq!(slot_owner(5, 2, 2), 0);
        assert_eq!(slot_owner(5, 2, 3), 1);
    }

    #[test]
    fn ladder_starts_at_one() {
        assert_eq!(exponent_ladder(4), vec![1.0, 0.75, 0.5, 0.25]);
    }

    #[test]
    fn zero_replicas_fail() {
        let m = Flat {
            n: 3,
            local: vec![-1.0, 1.0],
        };
        let err = metropolis_local_pt(&m, 0, SingleProcess, SmallRng::seed_from_u64(0))
            .unwrap_err();
        assert!(err.is_construction_error());
    }

    #[test]
    fn flat_machine_always_swaps() {
        let m = Flat {
            n: 3,
            local: vec![-1.0, 1.0],
        };
        let mut pt =
            metropolis_local_pt(&m, 3, SingleProcess, SmallRng::seed_from_u64(1)).unwrap();
        assert_eq!(pt.name(), "MetropolisLocalPt");
        for _ in 0..10 {
            pt.sweep();
        }
        let acc = pt.acceptance();
        assert_eq!(acc.len(), 3);
        assert_eq!(acc[0], 1.0);
        assert_eq!(&acc[1..], &[1.0, 1.0]);
        // Even pairs and odd pairs, once per sweep.
        assert_eq!(pt.total_swaps(), 10 + 10);
    }

    #[test]
    fn exponents_stay_with_slots() {
        let m = Ising {
            fields: vec![0.5, -0.3, 0.1, 0.7],
            coupling: 0.8,
            local: vec![-1.0, 1.0],
        };
        let mut pt =
            metropolis_local_pt(&m, 5, SingleProcess, SmallRng::seed_from_u64(2)).unwrap();
        for _ in 0..50 {
            pt.sweep();
        }
        let betas: Vec<f64> = pt.replicas().iter().map(|r| r.beta()).collect();
        assert_eq!(betas, pt.exponents());
        assert!(pt.acceptance().iter().all(|a| (0.0..=1.0).contains(a)));
        assert!(pt.replica_visible(4).is_some());
        assert!(pt.replica_visible(5).is_none());
    }

    #[test]
    fn exchange_interval() {
        let m = Flat {
            n: 2,
            local: vec![-1.0, 1.0],
        };
        let mut pt = metropolis_local_pt(&m, 2, SingleProcess, SmallRng::seed_from_u64(3))
            .unwrap()
            .with_exchange_interval(3)
            .unwrap();
        for _ in 0..7 {
            pt.sweep();
        }
        assert_eq!(pt.total_swaps(), 2);
        assert!(pt.set_exchange_interval(0).is_err());
        assert_eq!(pt.exchange_interval(), 3);
        assert_eq!(pt.comm().size(), 1);
        pt.reset();
        assert_eq!(pt.total_swaps(), 0);
    }

    #[test]
    fn reset_keeps_exchange_schedule() {
        let m = Flat {
            n: 2,
            local: vec![-1.0, 1.0],
        };
        let mut pt = metropolis_local_pt(&m, 2, SingleProcess, SmallRng::seed_from_u64(4))
            .unwrap()
            .with_exchange_interval(3)
            .unwrap();
        pt.sweep();
        pt.sweep();
        pt.reset();
        pt.sweep();
        // Third sweep overall, so the exchange still happens on schedule.
        assert_eq!(pt.total_swaps(), 1);
    }
}
