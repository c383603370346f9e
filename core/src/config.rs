//! Configuration for the page aligner.
//!
//! `AlignConfig` centralizes the similarity threshold and the guard rails around
//! a chapter run so that no algorithm constant is hardcoded at a call site.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::archive::ArchiveLimits;
use crate::error_codes;
use crate::fingerprint::FINGERPRINT_BITS;

/// Threshold used when nothing else is requested.
pub const DEFAULT_THRESHOLD: u32 = 20;
/// Threshold suited to two encodings of the same scan.
pub const SAME_SOURCE_THRESHOLD: u32 = 12;
/// Threshold suited to scans from different scanlation groups.
pub const CROSS_GROUP_THRESHOLD: u32 = 25;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignConfig {
    /// Largest Hamming distance still accepted as a match.
    pub threshold: u32,
    /// Score charged for leaving one page unmatched. `None` derives
    /// `-(threshold + 1)`.
    pub gap_penalty: Option<i32>,
    /// Upper bound on pages per side; the DP table is `(m+1) x (n+1)`.
    pub max_pages_per_side: u32,
    /// Per-chapter wall-clock budget.
    pub timeout_seconds: Option<u32>,
    pub archive_limits: ArchiveLimits,
}

impl Default for AlignConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            gap_penalty: None,
            max_pages_per_side: 2_000,
            timeout_seconds: None,
            archive_limits: ArchiveLimits::default(),
        }
    }
}

impl AlignConfig {
    pub fn same_source() -> Self {
        Self {
            threshold: SAME_SOURCE_THRESHOLD,
            ..Default::default()
        }
    }

    pub fn balanced() -> Self {
        Self::default()
    }

    pub fn cross_group() -> Self {
        Self {
            threshold: CROSS_GROUP_THRESHOLD,
            ..Default::default()
        }
    }

    pub fn builder() -> AlignConfigBuilder {
        AlignConfigBuilder {
            inner: AlignConfig::default(),
        }
    }

    /// Gap penalty actually used by the aligner.
    pub fn effective_gap_penalty(&self) -> i32 {
        match self.gap_penalty {
            Some(gap) => gap,
            None => -(self.threshold as i32 + 1),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.threshold == 0 || self.threshold > FINGERPRINT_BITS {
            return Err(ConfigError::InvalidThreshold {
                value: self.threshold as i64,
            });
        }

        if let Some(gap) = self.gap_penalty {
            if gap >= 0 {
                return Err(ConfigError::InvalidGapPenalty { value: gap });
            }
        }

        ensure_non_zero(self.max_pages_per_side as u64, "max_pages_per_side")?;
        if let Some(secs) = self.timeout_seconds {
            ensure_non_zero(secs as u64, "timeout_seconds")?;
        }
        ensure_non_zero(self.archive_limits.max_entries as u64, "archive_limits.max_entries")?;
        ensure_non_zero(
            self.archive_limits.max_entry_uncompressed_bytes,
            "archive_limits.max_entry_uncompressed_bytes",
        )?;
        ensure_non_zero(
            self.archive_limits.max_total_uncompressed_bytes,
            "archive_limits.max_total_uncompressed_bytes",
        )?;

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error(
        "[PGALIGN_CONFIG_001] threshold must be in 1..=64 (got {value}). Suggestion: use 12-15 for same-source scans or 20-25 across scanlation groups."
    )]
    InvalidThreshold { value: i64 },
    #[error("[PGALIGN_CONFIG_002] gap_penalty must be negative (got {value}). Suggestion: omit it to derive -(threshold + 1).")]
    InvalidGapPenalty { value: i32 },
    #[error("[PGALIGN_CONFIG_003] {field} must be greater than zero (got {value}).")]
    NonPositiveLimit { field: &'static str, value: u64 },
}

impl ConfigError {
    pub fn code(&self) -> &'static str {
        match self {
            ConfigError::InvalidThreshold { .. } => error_codes::CONFIG_INVALID_THRESHOLD,
            ConfigError::InvalidGapPenalty { .. } => error_codes::CONFIG_INVALID_GAP_PENALTY,
            ConfigError::NonPositiveLimit { .. } => error_codes::CONFIG_NON_POSITIVE_LIMIT,
        }
    }
}

/// Narrows a user-supplied threshold, rejecting values outside `1..=64`.
pub fn checked_threshold(value: i64) -> Result<u32, ConfigError> {
    match u32::try_from(value) {
        Ok(threshold) if (1..=FINGERPRINT_BITS).contains(&threshold) => Ok(threshold),
        _ => Err(ConfigError::InvalidThreshold { value }),
    }
}

fn ensure_non_zero(value: u64, field: &'static str) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::NonPositiveLimit { field, value });
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct AlignConfigBuilder {
    inner: AlignConfig,
}

impl Default for AlignConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AlignConfigBuilder {
    pub fn new() -> Self {
        AlignConfig::builder()
    }

    pub fn from_config(config: AlignConfig) -> Self {
        Self { inner: config }
    }

    pub fn threshold(mut self, value: u32) -> Self {
        self.inner.threshold = value;
        self
    }

    pub fn gap_penalty(mut self, value: i32) -> Self {
        self.inner.gap_penalty = Some(value);
        self
    }

    pub fn max_pages_per_side(mut self, value: u32) -> Self {
        self.inner.max_pages_per_side = value;
        self
    }

    pub fn timeout_seconds(mut self, value: Option<u32>) -> Self {
        self.inner.timeout_seconds = value;
        self
    }

    pub fn archive_limits(mut self, value: ArchiveLimits) -> Self {
        self.inner.archive_limits = value;
        self
    }

    pub fn build(self) -> Result<AlignConfig, ConfigError> {
        self.inner.validate()?;
        Ok(self.inner)
    }
}
