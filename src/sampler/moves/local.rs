use crate::errors::{Result, SamplerError};
use crate::machine::Machine;
use crate::sampler::metropolis::{Move, MoveProposer};
use crate::util::local_index;
use rand::Rng;

/// Changes the value of a single uniformly chosen site to a different local value.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalMove {
    n_sites: usize,
    local_states: Vec<f64>,
}

impl LocalMove {
    /// Make a proposer for the machine's sites and local values.
    pub fn new<M: Machine + ?Sized>(machine: &M) -> Self {
        Self {
            n_sites: machine.n_visible(),
            local_states: machine.local_states().to_vec(),
        }
    }
}

impl MoveProposer for LocalMove {
    fn propose<R: Rng + ?Sized>(&mut self, v: &[f64], rng: &mut R) -> Result<Move> {
        let n_local = self.local_states.len();
        if n_local < 2 || self.n_sites == 0 {
            return Err(SamplerError::no_valid_move(
                "local",
                "a single local state leaves nothing to change",
            ));
        }
        let site = rng.gen_range(0..self.n_sites);
        let current = local_index(&self.local_states, v[site]).ok_or_else(|| {
            SamplerError::no_valid_move("local", format!("unknown value {}", v[site]))
        })?;
        // Draw among the other S-1 values.
        let mut new = rng.gen_range(0..n_local - 1);
        if new >= current {
            new += 1;
        }
        Ok(Move::new(Some(site), Some(self.local_states[new])))
    }

    fn name(&self) -> &'static str {
        "MetropolisLocal"
    }
}
