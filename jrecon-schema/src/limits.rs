//! Reference resolution limits and configuration

use crate::error::{Result, SchemaError};

/// Limits applied while following `$ref` chains through a root schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveLimits {
    /// Maximum `$ref` hops followed for a single fragment (default: 32, hard: 1,024)
    pub max_ref_hops: usize,
    /// Maximum pointer string length (default: 1,024, hard: 8,192)
    pub max_pointer_length: usize,
    /// Maximum pointer depth in tokens (default: 32, hard: 256)
    pub max_pointer_depth: usize,
}

impl Default for ResolveLimits {
    fn default() -> Self {
        Self {
            max_ref_hops: 32,
            max_pointer_length: 1_024,
            max_pointer_depth: 32,
        }
    }
}

impl ResolveLimits {
    /// Hard maximum limits that cannot be exceeded
    pub fn hard_maximums() -> Self {
        Self {
            max_ref_hops: 1_024,
            max_pointer_length: 8_192,
            max_pointer_depth: 256,
        }
    }

    /// Validate limits against hard maximums
    pub fn validate(&self) -> Result<()> {
        let hard = Self::hard_maximums();

        let reason = if self.max_ref_hops == 0 {
            Some("max_ref_hops must be greater than zero".to_string())
        } else if self.max_ref_hops > hard.max_ref_hops {
            Some(format!(
                "max_ref_hops {} exceeds hard limit {}",
                self.max_ref_hops, hard.max_ref_hops
            ))
        } else if self.max_pointer_length > hard.max_pointer_length {
            Some(format!(
                "max_pointer_length {} exceeds hard limit {}",
                self.max_pointer_length, hard.max_pointer_length
            ))
        } else if self.max_pointer_depth > hard.max_pointer_depth {
            Some(format!(
                "max_pointer_depth {} exceeds hard limit {}",
                self.max_pointer_depth, hard.max_pointer_depth
            ))
        } else {
            None
        };

        match reason {
            Some(reason) => Err(SchemaError::ConfigurationExceedsHardLimits {
                reason,
                max_ref_hops: hard.max_ref_hops,
                max_pointer_length: hard.max_pointer_length,
                max_pointer_depth: hard.max_pointer_depth,
            }),
            None => Ok(()),
        }
    }
}
