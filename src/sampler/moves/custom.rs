use crate::errors::{Result, SamplerError};
use crate::machine::Machine;
use crate::operator::LocalMatrix;
use crate::sampler::metropolis::{Move, MoveProposer};
use crate::util::{sub_index, sub_values, CumulativeWeights};
use log::warn;
use rand::Rng;

/// Tolerance on the column sums of a move operator.
pub const STOCHASTIC_TOLERANCE: f64 = 1e-6;

/// Moves drawn from user supplied column stochastic matrices on groups of sites.
///
/// An operator is picked with probability proportional to its weight, then the new local
/// configuration is drawn from the column of the current one. Each operator is its own move
/// category.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomMove {
    operators: Vec<LocalMatrix>,
    columns: Vec<Vec<CumulativeWeights>>,
    weights: CumulativeWeights,
    local_states: Vec<f64>,
}

impl CustomMove {
    /// Build from dense matrices, the sites they act on, and optional relative weights.
    ///
    /// Missing or all-zero weights fall back to uniform. Fails if the lists disagree in
    /// length, a matrix does not fit its sites, a site is out of range, or a matrix is not
    /// column stochastic.
    pub fn new<M: Machine + ?Sized>(
        machine: &M,
        move_operators: Vec<Vec<Vec<f64>>>,
        acting_on: Vec<Vec<usize>>,
        move_weights: Option<Vec<f64>>,
    ) -> Result<Self> {
        if move_operators.is_empty() {
            return Err(SamplerError::construction(
                "move_operators",
                &move_operators,
                "at least one move operator is needed",
            ));
        }
        if move_operators.len() != acting_on.len() {
            return Err(SamplerError::construction(
                "acting_on",
                acting_on.len(),
                format!("expected one site list per move operator ({})", move_operators.len()),
            ));
        }
        let n_ops = move_operators.len();
        let weights = Self::operator_weights(n_ops, move_weights)?;

        let local_states = machine.local_states().to_vec();
        let n = machine.n_visible();
        let operators = move_operators
            .into_iter()
            .zip(acting_on.into_iter())
            .map(|(rows, sites)| {
                if let Some(bad) = sites.iter().find(|s| **s >= n) {
                    return Err(SamplerError::construction(
                        "acting_on",
                        *bad,
                        format!("site outside of the {} visible units", n),
                    ));
                }
                let op = LocalMatrix::new(rows, sites, local_states.len())?;
                if op.is_column_stochastic(STOCHASTIC_TOLERANCE) {
                    Ok(op)
                } else {
                    Err(SamplerError::construction(
                        "move_operators",
                        op.sites(),
                        "move operators must be column stochastic",
                    ))
                }
            })
            .collect::<Result<Vec<_>>>()?;
        let columns = operators
            .iter()
            .map(|op| {
                (0..op.dim())
                    .map(|col| {
                        CumulativeWeights::new(op.column(col)).ok_or_else(|| {
                            SamplerError::construction(
                                "move_operators",
                                col,
                                "empty column in move operator",
                            )
                        })
                    })
                    .collect::<Result<Vec<_>>>()
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            operators,
            columns,
            weights,
            local_states,
        })
    }

    fn operator_weights(n_ops: usize, move_weights: Option<Vec<f64>>) -> Result<CumulativeWeights> {
        let uniform = || {
            CumulativeWeights::uniform(n_ops).ok_or_else(|| {
                SamplerError::construction("move_operators", n_ops, "no move operators")
            })
        };
        match move_weights {
            None => uniform(),
            Some(w) if w.is_empty() => uniform(),
            Some(w) => {
                if w.len() != n_ops {
                    return Err(SamplerError::construction(
                        "move_weights",
                        &w,
                        format!("expected one weight per move operator ({})", n_ops),
                    ));
                }
                if w.iter().any(|x| !x.is_finite() || *x < 0.0) {
                    return Err(SamplerError::construction(
                        "move_weights",
                        &w,
                        "weights must be finite and non-negative",
                    ));
                }
                if w.iter().all(|x| *x == 0.0) {
                    warn!("All move weights are zero, picking move operators uniformly");
                    return uniform();
                }
                CumulativeWeights::new(w.iter().cloned()).ok_or_else(|| {
                    SamplerError::construction("move_weights", &w, "cannot normalize weights")
                })
            }
        }
    }

    /// The validated move operators.
    pub fn operators(&self) -> &[LocalMatrix] {
        &self.operators
    }

    /// Probability of picking operator i.
    pub fn operator_probability(&self, i: usize) -> f64 {
        self.weights.probability(i)
    }
}

impl MoveProposer for CustomMove {
    fn propose<R: Rng + ?Sized>(&mut self, v: &[f64], rng: &mut R) -> Result<Move> {
        let k = self.weights.sample(rng);
        let op = &self.operators[k];
        let old = sub_index(v, op.sites(), &self.local_states)
            .ok_or_else(|| SamplerError::no_valid_move("custom", "unknown local value"))?;
        let new = self.columns[k][old].sample(rng);
        if new == old {
            return Ok(Move::identity().with_category(k));
        }
        // at(new, old) is T(old -> new)
        let log_ratio = op.at(old, new).ln() - op.at(new, old).ln();
        let values = sub_values(new, op.sites().len(), &self.local_states);
        Ok(Move::new(op.sites().iter().cloned(), values)
            .with_log_proposal_ratio(log_ratio)
            .with_category(k))
    }

    fn name(&self) -> &'static str {
        "CustomSampler"
    }

    fn n_categories(&self) -> usize {
        self.operators.len()
    }
}

#[cfg(test)]
mod custom_tests {
    use super::*;
    use crate::machine::test_machines::Flat;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn machine() -> Flat {
        Flat {
            n: 3,
            local: vec![-1.0, 1.0],
        }
    }

    fn sigma_x() -> Vec<Vec<f64>> {
        vec![vec![0.0, 1.0], vec![1.0, 0.0]]
    }

    #[test]
    fn mismatched_lengths_fail() {
        let err = CustomMove::new(&machine(), vec![sigma_x(), sigma_x()], vec![vec![0]], None)
            .unwrap_err();
        assert!(err.is_construction_error());
    }

    #[test]
    fn non_stochastic_fails() {
        let m = vec![vec![0.5, 1.0], vec![1.0, 0.0]];
        let err = CustomMove::new(&machine(), vec![m], vec![vec![0]], None).unwrap_err();
        assert!(err.is_construction_error());
    }

    #[test]
    fn out_of_range_site_fails() {
        let err = CustomMove::new(&machine(), vec![sigma_x()], vec![vec![3]], None).unwrap_err();
        assert!(err.is_construction_error());
    }

    #[test]
    fn zero_weights_fall_back_to_uniform() {
        let p = CustomMove::new(
            &machine(),
            vec![sigma_x(), sigma_x()],
            vec![vec![0], vec![1]],
            Some(vec![0.0, 0.0]),
        )
        .unwrap();
        assert!((p.operator_probability(0) - 0.5).abs() < 1e-12);
        let p = CustomMove::new(
            &machine(),
            vec![sigma_x(), sigma_x()],
            vec![vec![0], vec![1]],
            Some(vec![3.0, 1.0]),
        )
        .unwrap();
        assert!((p.operator_probability(0) - 0.75).abs() < 1e-12);
    }

    #[test]
    fn asymmetric_matrix_ratio() {
        // T(-1 -> 1) = 0.5, T(1 -> -1) = 0.25
        let t = vec![vec![0.5, 0.25], vec![0.5, 0.75]];
        let mut p = CustomMove::new(&machine(), vec![t], vec![vec![2]], None).unwrap();
        let mut rng = SmallRng::seed_from_u64(51);
        let mut seen_move = false;
        for _ in 0..100 {
            let mv = p.propose(&[1.0, 1.0, -1.0], &mut rng).unwrap();
            assert_eq!(mv.category, 0);
            if !mv.is_identity() {
                seen_move = true;
                assert_eq!(mv.values.as_slice(), &[1.0]);
                assert!((mv.log_proposal_ratio - (0.25f64.ln() - 0.5f64.ln())).abs() < 1e-12);
            }
        }
        assert!(seen_move);
    }

    #[test]
    fn categories_follow_operators() {
        let mut p = CustomMove::new(
            &machine(),
            vec![sigma_x(), sigma_x()],
            vec![vec![0], vec![1]],
            None,
        )
        .unwrap();
        assert_eq!(p.n_categories(), 2);
        let mut rng = SmallRng::seed_from_u64(52);
        for _ in 0..50 {
            let mv = p.propose(&[1.0, 1.0, 1.0], &mut rng).unwrap();
            assert_eq!(mv.sites[0], mv.category);
        }
    }
}
