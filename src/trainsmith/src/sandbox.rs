//! Hit-count uniqueness classification.
//!
//! The live memory scan happens in an external backend; this module only
//! judges the count it reports. A pattern is safe to act on exactly when it
//! matched once: zero hits means the pattern is stale for this build, more
//! than one means it is too generic to identify anything.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Classification of one reported hit count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ScanOutcome {
    /// Exactly one match; the pattern is safe to use.
    Pass,
    /// Zero matches; the pattern was not found in process memory.
    FailNoMatch,
    /// Multiple matches; the pattern is too generic.
    FailAmbiguous,
}

/// Verdict for one pattern's scan result.
#[derive(Debug, Clone, Serialize)]
pub struct ScanVerdict {
    pub pattern_name: String,
    pub hit_count: i64,
    pub outcome: ScanOutcome,
    pub reason: String,
}

impl ScanVerdict {
    pub fn passed(&self) -> bool {
        self.outcome == ScanOutcome::Pass
    }
}

impl fmt::Display for ScanVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.passed() { "PASS" } else { "FAIL" };
        write!(f, "[{status}] '{}': {}", self.pattern_name, self.reason)
    }
}

/// A negative hit count is a bug in the calling scanner, not a property of
/// the pattern, so it is an error rather than a verdict.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SandboxError {
    #[error("scanner reported impossible hit count {count} for '{pattern_name}'")]
    InvalidHitCount { pattern_name: String, count: i64 },
}

/// Classify a scan's hit count for the named pattern.
pub fn check_unique(pattern_name: &str, hit_count: i64) -> Result<ScanVerdict, SandboxError> {
    if hit_count < 0 {
        return Err(SandboxError::InvalidHitCount {
            pattern_name: pattern_name.to_string(),
            count: hit_count,
        });
    }

    let (outcome, reason) = match hit_count {
        0 => (
            ScanOutcome::FailNoMatch,
            "0 matches - pattern not found in process memory".to_string(),
        ),
        1 => (ScanOutcome::Pass, "1 unique match".to_string()),
        n => (
            ScanOutcome::FailAmbiguous,
            format!("{n} matches - pattern too generic, unsafe to act on"),
        ),
    };

    Ok(ScanVerdict {
        pattern_name: pattern_name.to_string(),
        hit_count,
        outcome,
        reason,
    })
}
