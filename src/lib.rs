#![deny(
    missing_docs,
    unreachable_pub,
    missing_debug_implementations,
    missing_copy_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code,
    unused_import_braces,
    unused_qualifications
)]

//! `vmc-sampler` is a library of Markov chain Monte Carlo samplers drawing configurations
//! from `|psi(v)|^2` for variational quantum wavefunctions.
//!
//! The wavefunction is only ever queried through the [`machine::Machine`] trait. Samplers
//! include Metropolis-Hastings with local, hopping, exchange, Hamiltonian or user supplied
//! moves, exact enumeration for small systems, and parallel tempering distributed over the
//! ranks of a [`comm::Communicator`].
//!
//! It also offers a few feature gated extras:
//! - parallel sweeps of the replicas held by a rank using the `parallel-tempering` feature.
//! - MPI processes as tempering ranks with the `mpi` feature.
//! - serde support for the sampler configuration with the `serialize` feature.
//!
//! # Basic Metropolis Example
//! ```
//! use num_complex::Complex64;
//! use rand::rngs::SmallRng;
//! use rand::SeedableRng;
//! use vmc_sampler::machine::Machine;
//! use vmc_sampler::sampler::*;
//!
//! // log psi = h sum_i v_i
//! struct Product {
//!     n: usize,
//!     h: f64,
//!     local: Vec<f64>,
//! }
//!
//! impl Machine for Product {
//!     fn n_visible(&self) -> usize {
//!         self.n
//!     }
//!     fn local_states(&self) -> &[f64] {
//!         &self.local
//!     }
//!     fn log_val(&self, v: &[f64]) -> Complex64 {
//!         Complex64::new(self.h * v.iter().sum::<f64>(), 0.0)
//!     }
//! }
//!
//! let machine = Product { n: 8, h: 0.3, local: vec![-1.0, 1.0] };
//! let mut sampler = metropolis_local(&machine, SmallRng::seed_from_u64(1234)).unwrap();
//!
//! // Discard 10 sweeps then keep the configuration after each of 100 sweeps.
//! let samples = sampler.samples(100, 10);
//! assert_eq!(samples.len(), 100);
//! let acceptance = sampler.acceptance();
//! assert!(acceptance[0] >= 0.0 && acceptance[0] <= 1.0);
//! ```

/// Explicit distributed context used by parallel tempering.
pub mod comm;
/// Error types.
pub mod errors;
/// Lattice connectivity and distances.
pub mod graph;
/// The wavefunction interface.
pub mod machine;
/// Sparse operators, such as Hamiltonians, acting on configurations.
pub mod operator;
pub mod parallel_tempering;
pub mod registry;
pub mod sampler;
/// Configuration helpers and weighted sampling.
pub mod util;
