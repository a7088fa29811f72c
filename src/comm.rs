//! Explicit distributed execution context for the parallel tempering coordinator.
//!
//! The coordinator never reaches for global process state. Every collective operation goes
//! through a [`Communicator`] handed over at construction. All ranks must call the
//! collective operations in the same order.

use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Barrier};

/// Rank/size discovery and the few communication primitives the coordinator needs.
pub trait Communicator {
    /// Index of this process.
    fn rank(&self) -> usize;

    /// Number of processes.
    fn size(&self) -> usize;

    /// Block until every process reaches the barrier.
    fn barrier(&self);

    /// Collect `local` from every process, in rank order.
    fn all_gather(&self, local: &[f64]) -> Vec<Vec<f64>>;

    /// Overwrite `data` on every process with the copy held by `root`.
    fn broadcast(&self, data: &mut Vec<f64>, root: usize);

    /// Send `data` to `peer` and replace it with the buffer `peer` sent back.
    fn exchange(&self, peer: usize, data: &mut Vec<f64>);
}

impl<C: Communicator + ?Sized> Communicator for &C {
    fn rank(&self) -> usize {
        (**self).rank()
    }

    fn size(&self) -> usize {
        (**self).size()
    }

    fn barrier(&self) {
        (**self).barrier()
    }

    fn all_gather(&self, local: &[f64]) -> Vec<Vec<f64>> {
        (**self).all_gather(local)
    }

    fn broadcast(&self, data: &mut Vec<f64>, root: usize) {
        (**self).broadcast(data, root)
    }

    fn exchange(&self, peer: usize, data: &mut Vec<f64>) {
        (**self).exchange(peer, data)
    }
}

/// A single process owning everything.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SingleProcess;

impl Communicator for SingleProcess {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn barrier(&self) {}

    fn all_gather(&self, local: &[f64]) -> Vec<Vec<f64>> {
        vec![local.to_vec()]
    }

    fn broadcast(&self, _data: &mut Vec<f64>, _root: usize) {}

    fn exchange(&self, _peer: usize, _data: &mut Vec<f64>) {}
}

/// Emulates a group of processes with one thread per rank.
///
/// Messages between each ordered pair of ranks travel over their own channel, so matching
/// collective calls pair up in order. A rank whose peer has died panics, there is no
/// recovery from a partial exchange.
#[derive(Debug)]
pub struct ThreadComm {
    rank: usize,
    barrier: Arc<Barrier>,
    senders: Vec<Sender<Vec<f64>>>,
    receivers: Vec<Receiver<Vec<f64>>>,
}

impl ThreadComm {
    /// Make `size` connected handles, one to move into each thread.
    pub fn cluster(size: usize) -> Vec<ThreadComm> {
        let barrier = Arc::new(Barrier::new(size));
        let mut senders: Vec<Vec<Sender<Vec<f64>>>> = (0..size).map(|_| vec![]).collect();
        let mut receivers: Vec<Vec<Receiver<Vec<f64>>>> = (0..size).map(|_| vec![]).collect();
        // receivers[to][from] pairs with senders[from][to]
        for to in 0..size {
            for from in 0..size {
                let (tx, rx) = channel();
                senders[from].push(tx);
                receivers[to].push(rx);
            }
        }
        senders
            .into_iter()
            .zip(receivers)
            .enumerate()
            .map(|(rank, (senders, receivers))| ThreadComm {
                rank,
                barrier: barrier.clone(),
                senders,
                receivers,
            })
            .collect()
    }

    fn send(&self, peer: usize, data: Vec<f64>) {
        if self.senders[peer].send(data).is_err() {
            panic!("rank {} lost its connection to rank {}", self.rank, peer);
        }
    }

    fn recv(&self, peer: usize) -> Vec<f64> {
        match self.receivers[peer].recv() {
            Ok(data) => data,
            Err(_) => panic!("rank {} lost its connection to rank {}", self.rank, peer),
        }
    }
}

impl Communicator for ThreadComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.senders.len()
    }

    fn barrier(&self) {
        self.barrier.wait();
    }

    fn all_gather(&self, local: &[f64]) -> Vec<Vec<f64>> {
        (0..self.size())
            .filter(|peer| *peer != self.rank)
            .for_each(|peer| self.send(peer, local.to_vec()));
        (0..self.size())
            .map(|peer| {
                if peer == self.rank {
                    local.to_vec()
                } else {
                    self.recv(peer)
                }
            })
            .collect()
    }

    fn broadcast(&self, data: &mut Vec<f64>, root: usize) {
        if self.rank == root {
            (0..self.size())
                .filter(|peer| *peer != root)
                .for_each(|peer| self.send(peer, data.clone()));
        } else {
            *data = self.recv(root);
        }
    }

    fn exchange(&self, peer: usize, data: &mut Vec<f64>) {
        if peer == self.rank {
            return;
        }
        self.send(peer, std::mem::take(data));
        *data = self.recv(peer);
    }
}

/// Ranks are MPI processes of a communicator such as `universe.world()`.
#[cfg(feature = "mpi")]
mod mpi_comm {
    use super::Communicator;
    use mpi::collective::{CommunicatorCollectives, Root};
    use mpi::datatype::PartitionMut;
    use mpi::point_to_point::send_receive_replace_into;
    use mpi::topology::{Communicator as MpiCommunicator, SimpleCommunicator};
    use mpi::{Count, Rank};

    impl Communicator for SimpleCommunicator {
        fn rank(&self) -> usize {
            MpiCommunicator::rank(self) as usize
        }

        fn size(&self) -> usize {
            MpiCommunicator::size(self) as usize
        }

        fn barrier(&self) {
            CommunicatorCollectives::barrier(self)
        }

        fn all_gather(&self, local: &[f64]) -> Vec<Vec<f64>> {
            // Ranks may hold different numbers of slots, gather the counts first.
            let mut counts: Vec<Count> = vec![0; Communicator::size(self)];
            self.all_gather_into(&(local.len() as Count), &mut counts[..]);
            let displs: Vec<Count> = counts
                .iter()
                .scan(0, |acc, c| {
                    let start = *acc;
                    *acc += *c;
                    Some(start)
                })
                .collect();
            let total = counts.iter().map(|c| *c as usize).sum();
            let mut buf = vec![0.0; total];
            {
                let mut partition = PartitionMut::new(&mut buf[..], &counts[..], &displs[..]);
                self.all_gather_varcount_into(local, &mut partition);
            }
            counts
                .iter()
                .zip(displs.iter())
                .map(|(c, d)| buf[*d as usize..(*d + *c) as usize].to_vec())
                .collect()
        }

        fn broadcast(&self, data: &mut Vec<f64>, root: usize) {
            let root = self.process_at_rank(root as Rank);
            let mut len = data.len() as Count;
            root.broadcast_into(&mut len);
            data.resize(len as usize, 0.0);
            root.broadcast_into(&mut data[..]);
        }

        fn exchange(&self, peer: usize, data: &mut Vec<f64>) {
            if peer == Communicator::rank(self) {
                return;
            }
            let peer = self.process_at_rank(peer as Rank);
            send_receive_replace_into(&mut data[..], &peer, &peer);
        }
    }

    #[cfg(test)]
    mod mpi_tests {
        use super::*;
        use crate::machine::test_machines::Flat;
        use crate::parallel_tempering::metropolis_local_pt;
        use crate::sampler::AbstractSampler;
        use rand::rngs::SmallRng;
        use rand::SeedableRng;

        // MPI may only be initialized once per process, so everything lives in one test.
        #[test]
        fn world_as_communicator() {
            let universe = mpi::initialize().unwrap();
            let world = universe.world();
            let rank = Communicator::rank(&world);
            let size = Communicator::size(&world);

            let gathered = Communicator::all_gather(&world, &[rank as f64, 1.0]);
            assert_eq!(gathered.len(), size);
            assert_eq!(gathered[rank], vec![rank as f64, 1.0]);

            let mut data = if rank == 0 { vec![4.0, 5.0] } else { vec![] };
            Communicator::broadcast(&world, &mut data, 0);
            assert_eq!(data, vec![4.0, 5.0]);

            let m = Flat {
                n: 3,
                local: vec![-1.0, 1.0],
            };
            let rng = SmallRng::seed_from_u64(rank as u64);
            let mut pt = metropolis_local_pt(&m, 2 * size, &world, rng).unwrap();
            for _ in 0..5 {
                pt.sweep();
            }
            // Flat amplitudes accept every exchange, on every rank alike.
            assert_eq!(pt.total_swaps(), 5 * (2 * size as u64 - 1));
        }
    }
}

#[cfg(test)]
mod comm_tests {
    use super::*;
    use std::thread;

    #[test]
    fn gather_broadcast_exchange() {
        let handles: Vec<_> = ThreadComm::cluster(3)
            .into_iter()
            .map(|comm| {
                thread::spawn(move || {
                    let r = comm.rank() as f64;
                    let gathered = comm.all_gather(&[r, 10.0 * r]);
                    assert_eq!(gathered.len(), 3);
                    assert_eq!(gathered[2], vec![2.0, 20.0]);

                    let mut data = if comm.rank() == 1 { vec![7.0] } else { vec![] };
                    comm.broadcast(&mut data, 1);
                    assert_eq!(data, vec![7.0]);

                    comm.barrier();
                    let mut mine = vec![r];
                    match comm.rank() {
                        0 => comm.exchange(1, &mut mine),
                        1 => comm.exchange(0, &mut mine),
                        _ => {}
                    }
                    mine
                })
            })
            .collect();
        let results: Vec<Vec<f64>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(results, vec![vec![1.0], vec![0.0], vec![2.0]]);
    }

    #[test]
    fn single_process_is_trivial() {
        let comm = SingleProcess;
        assert_eq!(comm.size(), 1);
        assert_eq!(comm.all_gather(&[1.0]), vec![vec![1.0]]);
        let mut data = vec![3.0];
        comm.exchange(0, &mut data);
        assert_eq!(data, vec![3.0]);
    }
}
