/// Local state lookup and mixed radix encoding of configurations.
pub mod hilbert;
/// Sampling indices proportionally to weights.
pub mod weights;

pub use hilbert::*;
pub use weights::*;
