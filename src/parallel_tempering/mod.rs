//! Parallel tempering over a ladder of exponents, distributed over the ranks of a
//! [`Communicator`](crate::comm::Communicator). Parallel sweeps of the local replicas are
//! enabled via the `parallel-tempering` feature.

/// A container to run parallel tempering on Metropolis replicas.
pub mod tempering_container;
/// Traits which allow for tempering.
pub mod tempering_traits;

pub use tempering_container::*;
pub use tempering_traits::*;

#[cfg(feature = "parallel-tempering")]
pub use tempering_container::rayon_tempering::*;
