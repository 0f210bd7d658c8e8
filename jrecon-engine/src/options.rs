//! Engine configuration

use crate::error::{ReconstructError, Result};
use jrecon_schema::ResolveLimits;
use std::fmt;
use std::str::FromStr;

/// Which candidate to construct when several wrapper types share a schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TieBreak {
    /// Most recently registered candidate
    #[default]
    Last,
    /// Earliest registered candidate
    First,
    /// Refuse to guess and fail with `AmbiguousSchema`
    Reject,
}

impl TieBreak {
    /// Stable lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            TieBreak::Last => "last",
            TieBreak::First => "first",
            TieBreak::Reject => "reject",
        }
    }
}

impl fmt::Display for TieBreak {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TieBreak {
    type Err = ReconstructError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "last" => Ok(TieBreak::Last),
            "first" => Ok(TieBreak::First),
            "reject" => Ok(TieBreak::Reject),
            other => Err(ReconstructError::InvalidOption {
                reason: format!(
                    "unknown tie-break policy '{other}' (expected last, first, or reject)"
                ),
            }),
        }
    }
}

/// Options controlling a reconstruction session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    /// Candidate selection for shared schemas
    pub tie_break: TieBreak,
    /// Maximum nesting depth of the input value (default: 128, hard: 4,096)
    pub max_depth: usize,
    /// Limits for `$ref` resolution
    pub resolve: ResolveLimits,
    /// Also match the fragments a `$ref` chain passes through when the
    /// fragment as written matches no type (default: off)
    pub lookup_through_refs: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            tie_break: TieBreak::Last,
            max_depth: 128,
            resolve: ResolveLimits::default(),
            lookup_through_refs: false,
        }
    }
}

impl EngineOptions {
    /// Hard maximum depth that cannot be exceeded
    pub const HARD_MAX_DEPTH: usize = 4_096;

    /// Validate options against hard maximums
    pub fn validate(&self) -> Result<()> {
        if self.max_depth == 0 {
            return Err(ReconstructError::ConfigurationExceedsHardLimits {
                reason: "max_depth must be greater than zero".to_string(),
            });
        }
        if self.max_depth > Self::HARD_MAX_DEPTH {
            return Err(ReconstructError::ConfigurationExceedsHardLimits {
                reason: format!(
                    "max_depth {} exceeds hard limit {}",
                    self.max_depth,
                    Self::HARD_MAX_DEPTH
                ),
            });
        }
        self.resolve.validate()?;
        Ok(())
    }
}
