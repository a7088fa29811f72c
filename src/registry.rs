//! A single table mapping sampler names to their constructors.
//!
//! Callers which pick a sampler at runtime go through [`build_sampler`], everything else can
//! use the typed constructors in [`crate::sampler`] and [`crate::parallel_tempering`].

use crate::comm::{Communicator, SingleProcess};
use crate::errors::{Result, SamplerError};
use crate::graph::Graph;
use crate::machine::Machine;
use crate::operator::Operator;
use crate::parallel_tempering::*;
use crate::sampler::*;
use log::info;
use rand::rngs::SmallRng;
use rand::SeedableRng;
#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display, Formatter};
use std::str::FromStr;

/// Every sampler the registry can build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub enum SamplerKind {
    /// Single site moves.
    MetropolisLocal,
    /// Tempered single site moves.
    MetropolisLocalPt,
    /// Two site hopping moves.
    MetropolisHop,
    /// Moves along the connections of an operator.
    MetropolisHamiltonian,
    /// Tempered moves along the connections of an operator.
    MetropolisHamiltonianPt,
    /// Two site exchange moves.
    MetropolisExchange,
    /// Tempered two site exchange moves.
    MetropolisExchangePt,
    /// Exact enumeration.
    ExactSampler,
    /// User supplied stochastic move matrices.
    CustomSampler,
    /// Tempered user supplied stochastic move matrices.
    CustomSamplerPt,
}

impl Default for SamplerKind {
    fn default() -> Self {
        SamplerKind::MetropolisLocal
    }
}

impl SamplerKind {
    /// All kinds, in registration order.
    pub const ALL: [SamplerKind; 10] = [
        SamplerKind::MetropolisLocal,
        SamplerKind::MetropolisLocalPt,
        SamplerKind::MetropolisHop,
        SamplerKind::MetropolisHamiltonian,
        SamplerKind::MetropolisHamiltonianPt,
        SamplerKind::MetropolisExchange,
        SamplerKind::MetropolisExchangePt,
        SamplerKind::ExactSampler,
        SamplerKind::CustomSampler,
        SamplerKind::CustomSamplerPt,
    ];

    /// The registered name.
    pub fn name(self) -> &'static str {
        match self {
            SamplerKind::MetropolisLocal => "MetropolisLocal",
            SamplerKind::MetropolisLocalPt => "MetropolisLocalPt",
            SamplerKind::MetropolisHop => "MetropolisHop",
            SamplerKind::MetropolisHamiltonian => "MetropolisHamiltonian",
            SamplerKind::MetropolisHamiltonianPt => "MetropolisHamiltonianPt",
            SamplerKind::MetropolisExchange => "MetropolisExchange",
            SamplerKind::MetropolisExchangePt => "MetropolisExchangePt",
            SamplerKind::ExactSampler => "ExactSampler",
            SamplerKind::CustomSampler => "CustomSampler",
            SamplerKind::CustomSamplerPt => "CustomSamplerPt",
        }
    }

    /// Options which must be supplied, parameters with a default are not listed.
    pub fn required(self) -> &'static [&'static str] {
        match self {
            SamplerKind::MetropolisLocal | SamplerKind::ExactSampler => &["machine"],
            SamplerKind::MetropolisLocalPt => &["machine", "n_replicas"],
            SamplerKind::MetropolisHop => &["graph", "machine", "d_max"],
            SamplerKind::MetropolisHamiltonian => &["machine", "hamiltonian"],
            SamplerKind::MetropolisHamiltonianPt => &["machine", "hamiltonian", "n_replicas"],
            SamplerKind::MetropolisExchange | SamplerKind::MetropolisExchangePt => {
                &["graph", "machine"]
            }
            SamplerKind::CustomSampler => &["machine", "move_operators", "acting_on"],
            SamplerKind::CustomSamplerPt => {
                &["machine", "move_operators", "acting_on", "n_replicas"]
            }
        }
    }

    /// Whether this kind runs parallel tempering.
    pub fn is_tempered(self) -> bool {
        matches!(
            self,
            SamplerKind::MetropolisLocalPt
                | SamplerKind::MetropolisHamiltonianPt
                | SamplerKind::MetropolisExchangePt
                | SamplerKind::CustomSamplerPt
        )
    }
}

impl Display for SamplerKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SamplerKind {
    type Err = SamplerError;

    fn from_str(s: &str) -> Result<Self> {
        SamplerKind::ALL
            .iter()
            .cloned()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| SamplerError::construction("sampler", s, "unknown sampler name"))
    }
}

/// Construction options. Which ones are read depends on the kind, see
/// [`SamplerKind::required`].
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serialize", serde(default))]
pub struct SamplerConfig {
    /// Which sampler to build.
    pub kind: SamplerKind,
    /// Maximum graph distance of hop and exchange moves.
    pub d_max: Option<i64>,
    /// Number of tempering replicas across all ranks.
    pub n_replicas: Option<i64>,
    /// Sweeps between two replica exchanges, 1 if unset.
    pub exchange_interval: Option<i64>,
    /// Seed of the random number generators, entropy if unset.
    pub seed: Option<u64>,
    /// Column stochastic move matrices of the custom samplers.
    pub move_operators: Option<Vec<Vec<Vec<f64>>>>,
    /// Sites each move matrix acts on.
    pub acting_on: Option<Vec<Vec<usize>>>,
    /// Relative weights of the move matrices, uniform if unset.
    pub move_weights: Option<Vec<f64>>,
}

impl SamplerConfig {
    /// Default options for the given kind.
    pub fn new(kind: SamplerKind) -> Self {
        Self {
            kind,
            ..Default::default()
        }
    }
}

/// The collaborators a sampler is built from.
#[derive(Clone, Copy)]
pub struct SamplerContext<'a> {
    /// The wavefunction to sample.
    pub machine: &'a dyn Machine,
    /// Lattice for hop and exchange moves.
    pub graph: Option<&'a dyn Graph>,
    /// Operator for Hamiltonian moves.
    pub hamiltonian: Option<&'a dyn Operator>,
    /// Distributed context for tempering.
    pub comm: &'a dyn Communicator,
}

impl<'a> SamplerContext<'a> {
    /// A context with only a machine, running as a single process.
    pub fn new(machine: &'a dyn Machine) -> Self {
        Self {
            machine,
            graph: None,
            hamiltonian: None,
            comm: &SingleProcess,
        }
    }

    /// Add a graph.
    pub fn with_graph(mut self, graph: &'a dyn Graph) -> Self {
        self.graph = Some(graph);
        self
    }

    /// Add a Hamiltonian.
    pub fn with_hamiltonian(mut self, hamiltonian: &'a dyn Operator) -> Self {
        self.hamiltonian = Some(hamiltonian);
        self
    }

    /// Use a communicator other than a single process.
    pub fn with_comm(mut self, comm: &'a dyn Communicator) -> Self {
        self.comm = comm;
        self
    }
}

impl<'a> Debug for SamplerContext<'a> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SamplerContext")
            .field("n_visible", &self.machine.n_visible())
            .field("graph", &self.graph.map(|g| g.n_sites()))
            .field("hamiltonian", &self.hamiltonian.is_some())
            .field("rank", &self.comm.rank())
            .field("size", &self.comm.size())
            .finish()
    }
}

fn missing(parameter: &'static str, kind: SamplerKind) -> SamplerError {
    SamplerError::construction(parameter, None::<()>, format!("required by {}", kind))
}

/// Turn a signed option into a count, rejecting zero and negative values.
fn positive(parameter: &'static str, value: i64) -> Result<usize> {
    if value <= 0 {
        return Err(SamplerError::construction(
            parameter,
            value,
            "must be a positive integer",
        ));
    }
    usize::try_from(value)
        .map_err(|_| SamplerError::construction(parameter, value, "does not fit in usize"))
}

fn required<T: Clone>(value: &Option<T>, parameter: &'static str, kind: SamplerKind) -> Result<T> {
    value.clone().ok_or_else(|| missing(parameter, kind))
}

/// Build the sampler named by `config.kind` from the collaborators in `ctx`.
pub fn build_sampler<'a>(
    config: &SamplerConfig,
    ctx: SamplerContext<'a>,
) -> Result<Box<dyn AbstractSampler + 'a>> {
    let kind = config.kind;
    let machine = ctx.machine;
    let rng = match config.seed {
        Some(seed) => SmallRng::seed_from_u64(seed.wrapping_add(ctx.comm.rank() as u64)),
        None => SmallRng::from_entropy(),
    };
    let graph = || ctx.graph.ok_or_else(|| missing("graph", kind));
    let hamiltonian = || ctx.hamiltonian.ok_or_else(|| missing("hamiltonian", kind));
    let n_replicas = |default: Option<i64>| {
        config
            .n_replicas
            .or(default)
            .ok_or_else(|| missing("n_replicas", kind))
            .and_then(|n| positive("n_replicas", n))
    };
    let exchange_interval = || positive("exchange_interval", config.exchange_interval.unwrap_or(1));

    let sampler: Box<dyn AbstractSampler + 'a> = match kind {
        SamplerKind::MetropolisLocal => Box::new(metropolis_local(machine, rng)?),
        SamplerKind::MetropolisLocalPt => Box::new(
            metropolis_local_pt(machine, n_replicas(None)?, ctx.comm, rng)?
                .with_exchange_interval(exchange_interval()?)?,
        ),
        SamplerKind::MetropolisHop => {
            let d_max = positive("d_max", required(&config.d_max, "d_max", kind)?)?;
            Box::new(metropolis_hop(machine, graph()?, d_max, rng)?)
        }
        SamplerKind::MetropolisHamiltonian => {
            Box::new(metropolis_hamiltonian(machine, hamiltonian()?, rng)?)
        }
        SamplerKind::MetropolisHamiltonianPt => Box::new(
            metropolis_hamiltonian_pt(machine, hamiltonian()?, n_replicas(None)?, ctx.comm, rng)?
                .with_exchange_interval(exchange_interval()?)?,
        ),
        SamplerKind::MetropolisExchange => {
            let d_max = positive("d_max", config.d_max.unwrap_or(1))?;
            Box::new(metropolis_exchange(machine, graph()?, d_max, rng)?)
        }
        SamplerKind::MetropolisExchangePt => {
            let d_max = positive("d_max", config.d_max.unwrap_or(1))?;
            Box::new(
                metropolis_exchange_pt(
                    machine,
                    graph()?,
                    d_max,
                    n_replicas(Some(1))?,
                    ctx.comm,
                    rng,
                )?
                .with_exchange_interval(exchange_interval()?)?,
            )
        }
        SamplerKind::ExactSampler => Box::new(exact_sampler(machine, rng)?),
        SamplerKind::CustomSampler => Box::new(custom_sampler(
            machine,
            required(&config.move_operators, "move_operators", kind)?,
            required(&config.acting_on, "acting_on", kind)?,
            config.move_weights.clone(),
            rng,
        )?),
        SamplerKind::CustomSamplerPt => Box::new(
            custom_sampler_pt(
                machine,
                required(&config.move_operators, "move_operators", kind)?,
                required(&config.acting_on, "acting_on", kind)?,
                config.move_weights.clone(),
                n_replicas(None)?,
                ctx.comm,
                rng,
            )?
            .with_exchange_interval(exchange_interval()?)?,
        ),
    };
    info!(
        "Built {} over {} visible units on rank {}",
        kind,
        machine.n_visible(),
        ctx.comm.rank()
    );
    Ok(sampler)
}

/// [`build_sampler`] with the kind given by its registered name.
pub fn build_sampler_by_name<'a>(
    name: &str,
    config: &SamplerConfig,
    ctx: SamplerContext<'a>,
) -> Result<Box<dyn AbstractSampler + 'a>> {
    let config = SamplerConfig {
        kind: name.parse()?,
        ..config.clone()
    };
    build_sampler(&config, ctx)
}

#[cfg(test)]
mod registry_tests {
    use super::*;
    use crate::graph::EdgeGraph;
    use crate::machine::test_machines::Flat;

    #[test]
    fn names_round_trip() {
        for kind in SamplerKind::ALL.iter() {
            assert_eq!(kind.name().parse::<SamplerKind>().unwrap(), *kind);
        }
        assert!("MetropolisFoo".parse::<SamplerKind>().is_err());
    }

    #[test]
    fn required_options() {
        assert_eq!(SamplerKind::MetropolisLocal.required(), &["machine"]);
        assert!(SamplerKind::MetropolisHop.required().contains(&"d_max"));
        assert!(!SamplerKind::MetropolisExchange.required().contains(&"d_max"));
        assert!(!SamplerKind::MetropolisExchangePt
            .required()
            .contains(&"n_replicas"));
        assert!(SamplerKind::CustomSamplerPt.is_tempered());
    }

    #[test]
    fn exchange_defaults() {
        let m = Flat {
            n: 4,
            local: vec![-1.0, 1.0],
        };
        let g = EdgeGraph::chain(4, true);
        let config = SamplerConfig {
            seed: Some(3),
            ..SamplerConfig::new(SamplerKind::MetropolisExchangePt)
        };
        let mut s = build_sampler(&config, SamplerContext::new(&m).with_graph(&g)).unwrap();
        assert_eq!(s.name(), "MetropolisExchangePt");
        s.sweep();
        // One replica, no exchange pair.
        assert_eq!(s.acceptance().len(), 1);
    }

    #[test]
    fn missing_and_invalid_options() {
        let m = Flat {
            n: 4,
            local: vec![-1.0, 1.0],
        };
        let g = EdgeGraph::chain(4, false);
        let ctx = SamplerContext::new(&m).with_graph(&g);

        let hop = SamplerConfig::new(SamplerKind::MetropolisHop);
        assert!(build_sampler(&hop, ctx).unwrap_err().is_construction_error());
        let hop = SamplerConfig {
            d_max: Some(-2),
            ..hop
        };
        let err = build_sampler(&hop, ctx).unwrap_err();
        assert!(err.to_string().contains("-2"));

        let pt = SamplerConfig {
            n_replicas: Some(0),
            ..SamplerConfig::new(SamplerKind::MetropolisLocalPt)
        };
        assert!(build_sampler(&pt, ctx).unwrap_err().is_construction_error());

        let ham = SamplerConfig::new(SamplerKind::MetropolisHamiltonian);
        assert!(build_sampler(&ham, SamplerContext::new(&m))
            .unwrap_err()
            .is_construction_error());
    }

    #[test]
    fn by_name() {
        let m = Flat {
            n: 2,
            local: vec![-1.0, 1.0],
        };
        let s = build_sampler_by_name("ExactSampler", &SamplerConfig::default(), SamplerContext::new(&m))
            .unwrap();
        assert_eq!(s.name(), "ExactSampler");
        assert_eq!(s.acceptance(), vec![1.0]);
    }

    #[test]
    fn boxed_sampler_debug() {
        let m = Flat {
            n: 3,
            local: vec![-1.0, 1.0],
        };
        let s = build_sampler(&SamplerConfig::default(), SamplerContext::new(&m)).unwrap();
        let text = format!("{:?}", s);
        assert!(text.contains("MetropolisLocal"), "{}", text);
        assert!(text.contains("n_visible: 3"), "{}", text);
        let err = build_sampler_by_name("Nope", &SamplerConfig::default(), SamplerContext::new(&m))
            .unwrap_err();
        assert!(err.is_construction_error());
    }
}
