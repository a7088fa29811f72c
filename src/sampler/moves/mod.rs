//! Move proposers for the Metropolis-Hastings engine.

/// User supplied stochastic move matrices.
pub mod custom;
/// Two site exchanges.
pub mod exchange;
/// Moves along the connections of an operator.
pub mod hamiltonian;
/// Two site hops.
pub mod hop;
/// Single site changes.
pub mod local;

pub use custom::CustomMove;
pub use exchange::ExchangeMove;
pub use hamiltonian::HamiltonianMove;
pub use hop::HopMove;
pub use local::LocalMove;
