use core::fmt;

/// Errors returned when building a tree from an invalid [`Config`](crate::Config).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ConfigError {
    /// The branching factor cannot guarantee at least one key per non-root node.
    BranchingFactorTooSmall {
        /// The rejected branching factor.
        branching_factor: usize,
        /// The smallest accepted branching factor.
        minimum: usize,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::BranchingFactorTooSmall {
                branching_factor,
                minimum,
            } => write!(
                f,
                "branching factor {branching_factor} is too small; it must be at least {minimum} so every non-root node holds a key"
            ),
        }
    }
}

impl core::error::Error for ConfigError {}
