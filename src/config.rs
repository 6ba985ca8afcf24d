use crate::error::ConfigError;

/// Branching factor used by [`Config::new`] and [`BPlusTree::new`](crate::BPlusTree::new).
pub const DEFAULT_BRANCHING_FACTOR: usize = 50;

/// Smallest branching factor for which every non-root node keeps at least one key.
pub const MIN_BRANCHING_FACTOR: usize = 3;

/// Construction options for a [`BPlusTree`](crate::BPlusTree).
///
/// The branching factor `B` fixes the node bounds for the lifetime of the tree:
/// a node holds at most `B - 1` keys, and a non-root leaf at least `B / 2`.
///
/// # Examples
///
/// ```
/// use bucket_tree::Config;
///
/// let config = Config::new().with_branching_factor(4);
/// assert_eq!(config.max_keys(), 3);
/// assert_eq!(config.min_keys(), 2);
/// assert!(config.validate().is_ok());
///
/// assert!(Config::new().with_branching_factor(2).validate().is_err());
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct Config {
    branching_factor: usize,
}

impl Config {
    /// Returns the default configuration.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            branching_factor: DEFAULT_BRANCHING_FACTOR,
        }
    }

    /// Sets the branching factor. Validation is deferred to [`Config::validate`].
    #[must_use]
    pub const fn with_branching_factor(mut self, branching_factor: usize) -> Self {
        self.branching_factor = branching_factor;
        self
    }

    #[must_use]
    pub const fn branching_factor(&self) -> usize {
        self.branching_factor
    }

    /// Upper bound on keys per node (`B - 1`).
    #[must_use]
    pub const fn max_keys(&self) -> usize {
        self.branching_factor.saturating_sub(1)
    }

    /// Lower bound on keys per non-root leaf (`B / 2`, rounded down).
    #[must_use]
    pub const fn min_keys(&self) -> usize {
        self.branching_factor / 2
    }

    /// Checks that the configuration produces a well-formed tree.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::BranchingFactorTooSmall`] if the branching factor is
    /// below [`MIN_BRANCHING_FACTOR`].
    pub const fn validate(&self) -> Result<(), ConfigError> {
        if self.branching_factor < MIN_BRANCHING_FACTOR {
            return Err(ConfigError::BranchingFactorTooSmall {
                branching_factor: self.branching_factor,
                minimum: MIN_BRANCHING_FACTOR,
            });
        }
        Ok(())
    }

    pub(crate) const fn bounds(&self) -> Bounds {
        Bounds {
            max_keys: self.max_keys(),
            min_leaf_keys: self.min_keys(),
            // At least ceil(B / 2) children. Splitting a node of B keys and merging an
            // underflowing node with a minimal sibling both land inside the bounds.
            min_internal_keys: self.branching_factor.div_ceil(2).saturating_sub(1),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

/// Node size limits derived from a validated [`Config`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct Bounds {
    pub(crate) max_keys: usize,
    pub(crate) min_leaf_keys: usize,
    pub(crate) min_internal_keys: usize,
}

impl Bounds {
    /// Lower bound on keys for a non-root node of the given kind.
    pub(crate) const fn min_keys(&self, leaf: bool) -> usize {
        if leaf { self.min_leaf_keys } else { self.min_internal_keys }
    }
}
