use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, SamplerError>;

/// Everything that can go wrong while building or driving a sampler.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SamplerError {
    /// A configuration does not match the machine's size or local value domain.
    #[error("invalid configuration: {reason}")]
    InvalidConfiguration {
        /// What was wrong with the configuration.
        reason: String,
    },
    /// A sampler could not be built from the given parameters.
    #[error("cannot construct sampler: `{parameter}` = {value} ({reason})")]
    ConstructionError {
        /// Name of the offending parameter.
        parameter: &'static str,
        /// The offending value, formatted.
        value: String,
        /// The violated precondition.
        reason: String,
    },
    /// The proposer has no candidate for the current configuration.
    /// Absorbed by the Metropolis engine, never returned from a sweep.
    #[error("no valid move for {proposer}: {reason}")]
    NoValidMove {
        /// Name of the proposer.
        proposer: &'static str,
        /// Why no candidate exists.
        reason: String,
    },
    /// The exact sampler was asked to enumerate too many configurations.
    #[error(
        "hilbert space of {local_size}^{n_sites} configurations exceeds the enumeration bound of {bound}"
    )]
    HilbertSpaceTooLarge {
        /// Number of local values per site.
        local_size: usize,
        /// Number of sites.
        n_sites: usize,
        /// Largest number of configurations that may be enumerated.
        bound: usize,
    },
}

impl SamplerError {
    pub(crate) fn invalid_configuration<S: Into<String>>(reason: S) -> Self {
        SamplerError::InvalidConfiguration {
            reason: reason.into(),
        }
    }

    pub(crate) fn construction<V, S>(parameter: &'static str, value: V, reason: S) -> Self
    where
        V: std::fmt::Debug,
        S: Into<String>,
    {
        SamplerError::ConstructionError {
            parameter,
            value: format!("{:?}", value),
            reason: reason.into(),
        }
    }

    pub(crate) fn no_valid_move<S: Into<String>>(proposer: &'static str, reason: S) -> Self {
        SamplerError::NoValidMove {
            proposer,
            reason: reason.into(),
        }
    }

    /// Whether this error is fatal to the sampler's creation.
    pub fn is_construction_error(&self) -> bool {
        matches!(
            self,
            SamplerError::ConstructionError { .. } | SamplerError::HilbertSpaceTooLarge { .. }
        )
    }
}

#[cfg(test)]
mod error_tests {
    use super::*;

    #[test]
    fn construction_message_names_parameter_and_value() {
        let err = SamplerError::construction("n_replicas", 0usize, "must be positive");
        let msg = err.to_string();
        assert!(msg.contains("n_replicas"));
        assert!(msg.contains('0'));
        assert!(msg.contains("must be positive"));
        assert!(err.is_construction_error());
    }

    #[test]
    fn no_valid_move_is_not_fatal() {
        let err = SamplerError::no_valid_move("hop", "no pairs within d_max");
        assert!(!err.is_construction_error());
    }
}
