//! AOB byte patterns and their format validation.
//!
//! A pattern is a space-separated token string, each token a 2-digit hex byte
//! or the `??` wildcard, e.g. `"48 8B 05 ?? ?? ?? ??"`. Patterns locate code
//! or data in a live process, so a malformed or over-generic one must be
//! rejected before anything downstream scans with it. Validation collects
//! every defect in one pass rather than stopping at the first.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Wildcard token accepted in patterns.
pub const WILDCARD: &str = "??";

/// Minimum token count for a pattern to be considered identifying.
pub const MIN_PATTERN_TOKENS: usize = 4;

/// Wildcard fraction above which a pattern is judged too generic. The 0.60
/// ceiling accommodates RIP-relative patterns like `48 8B 05 ?? ?? ?? ??`
/// (4/7) while still rejecting mostly-wildcard sequences.
pub const MAX_WILDCARD_RATIO: f64 = 0.60;

/// One format defect found in a pattern. [`BytePattern::validate`] returns
/// all of them together.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PatternDefect {
    #[error("token {index} ('{token}') is not a 2-digit hex byte or '??'")]
    MalformedToken { index: usize, token: String },

    #[error("pattern has {count} tokens, minimum is 4")]
    TooShort { count: usize },

    #[error("wildcard ratio {ratio:.2} exceeds the 0.60 ceiling")]
    ExcessiveWildcards { ratio: f64 },
}

/// A named AOB pattern.
///
/// `offset` is the signed byte distance from the scan match to the address of
/// interest; `module` restricts the scan (empty scans everywhere).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BytePattern {
    pub name: String,
    pub pattern: String,
    #[serde(default)]
    pub offset: i64,
    #[serde(default)]
    pub module: String,
    #[serde(default)]
    pub description: String,
}

impl BytePattern {
    pub fn new(name: impl Into<String>, pattern: impl Into<String>) -> Self {
        BytePattern {
            name: name.into(),
            pattern: pattern.into(),
            offset: 0,
            module: String::new(),
            description: String::new(),
        }
    }

    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.module = module.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Individual byte tokens, e.g. `["48", "8B", "??"]`.
    pub fn tokens(&self) -> Vec<&str> {
        self.pattern.split_whitespace().collect()
    }

    /// Fraction of wildcard tokens (0.0 to 1.0). Empty patterns count as 0.
    pub fn wildcard_ratio(&self) -> f64 {
        let tokens = self.tokens();
        if tokens.is_empty() {
            return 0.0;
        }
        let wildcards = tokens.iter().filter(|t| **t == WILDCARD).count();
        wildcards as f64 / tokens.len() as f64
    }

    /// Check format rules, collecting every defect:
    ///
    /// 1. every token is a 2-digit hex byte or `??`
    /// 2. at least [`MIN_PATTERN_TOKENS`] tokens
    /// 3. wildcard ratio at most [`MAX_WILDCARD_RATIO`] (the exact boundary
    ///    passes; the comparison is integer-exact, no float rounding)
    pub fn validate(&self) -> Result<(), Vec<PatternDefect>> {
        let tokens = self.tokens();
        let mut defects = Vec::new();

        for (index, token) in tokens.iter().enumerate() {
            if !valid_token(token) {
                defects.push(PatternDefect::MalformedToken {
                    index,
                    token: (*token).to_string(),
                });
            }
        }

        if tokens.len() < MIN_PATTERN_TOKENS {
            defects.push(PatternDefect::TooShort {
                count: tokens.len(),
            });
        }

        let wildcards = tokens.iter().filter(|t| **t == WILDCARD).count();
        // ratio > 0.60 exactly when wildcards * 5 > tokens * 3
        if wildcards * 5 > tokens.len() * 3 {
            defects.push(PatternDefect::ExcessiveWildcards {
                ratio: self.wildcard_ratio(),
            });
        }

        if defects.is_empty() {
            Ok(())
        } else {
            Err(defects)
        }
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

fn valid_token(token: &str) -> bool {
    token == WILDCARD || (token.len() == 2 && token.bytes().all(|b| b.is_ascii_hexdigit()))
}

impl fmt::Display for BytePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AOB[{}]({})", self.name, self.pattern)?;
        if !self.module.is_empty() {
            write!(f, " [{}]", self.module)?;
        }
        if self.offset != 0 {
            write!(f, " {:+#x}", self.offset)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_four_fixed_tokens_pass() {
        let p = BytePattern::new("min", "48 8B 05 C0");
        assert!(p.validate().is_ok());
    }

    #[test]
    fn test_three_tokens_fail_too_short() {
        let p = BytePattern::new("short", "48 8B 05");
        let defects = p.validate().unwrap_err();
        assert_eq!(defects, vec![PatternDefect::TooShort { count: 3 }]);
    }

    #[test]
    fn test_exact_sixty_percent_wildcards_pass() {
        // 3 wildcards of 5 tokens = 0.60 exactly
        let p = BytePattern::new("boundary", "48 8B ?? ?? ??");
        assert!(p.validate().is_ok());
    }

    #[test]
    fn test_above_sixty_percent_wildcards_fail() {
        // 4 wildcards of 6 tokens ~= 0.67
        let p = BytePattern::new("generic", "48 8B ?? ?? ?? ??");
        let defects = p.validate().unwrap_err();
        assert!(matches!(
            defects[0],
            PatternDefect::ExcessiveWildcards { ratio } if ratio > 0.6
        ));
    }

    #[test]
    fn test_malformed_tokens_reported_with_index() {
        let p = BytePattern::new("bad", "48 8B Z5 4");
        let defects = p.validate().unwrap_err();
        assert!(defects.contains(&PatternDefect::MalformedToken {
            index: 2,
            token: "Z5".to_string()
        }));
        assert!(defects.contains(&PatternDefect::MalformedToken {
            index: 3,
            token: "4".to_string()
        }));
    }

    #[test]
    fn test_all_defects_collected_in_one_pass() {
        // Malformed token, too short, and too many wildcards at once.
        let p = BytePattern::new("everything", "?? ?? G1");
        let defects = p.validate().unwrap_err();
        assert_eq!(defects.len(), 3);
    }

    #[test]
    fn test_empty_pattern_is_too_short() {
        let p = BytePattern::new("empty", "");
        let defects = p.validate().unwrap_err();
        assert_eq!(defects, vec![PatternDefect::TooShort { count: 0 }]);
    }

    #[test]
    fn test_validation_is_idempotent() {
        let p = BytePattern::new("again", "?? ?? ?? ?? 48");
        let first = p.validate().unwrap_err();
        let second = p.validate().unwrap_err();
        assert_eq!(first, second);
    }

    #[test]
    fn test_single_question_mark_is_malformed() {
        let p = BytePattern::new("halfwild", "48 8B ? C0");
        let defects = p.validate().unwrap_err();
        assert_eq!(
            defects,
            vec![PatternDefect::MalformedToken {
                index: 2,
                token: "?".to_string()
            }]
        );
    }

    #[test]
    fn test_wildcard_ratio() {
        let p = BytePattern::new("r", "48 ?? ?? ??");
        assert!((p.wildcard_ratio() - 0.75).abs() < f64::EPSILON);
        assert_eq!(BytePattern::new("e", "").wildcard_ratio(), 0.0);
    }

    #[test]
    fn test_display() {
        let p = BytePattern::new("root", "48 8B 05 ??")
            .with_module("GameAssembly.dll")
            .with_offset(3);
        let s = p.to_string();
        assert!(s.contains("root"));
        assert!(s.contains("GameAssembly.dll"));
        assert!(s.contains("+0x3"));
    }
}
