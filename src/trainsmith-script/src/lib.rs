//! # trainsmith-script
//!
//! Static validation of generated CE Lua trainer scripts.
//!
//! Script generation happens downstream of the resolver (usually an LLM fed
//! with an [`EngineContext`](trainsmith::EngineContext)); before anything is
//! handed to the injection layer, the script text gets a strategy-aware
//! static pass here. Nothing is executed and no Lua interpreter is invoked;
//! all checks are textual.
//!
//! Checks, in order:
//! 1. `non_empty` - the script has at least one non-comment line (error)
//! 2. `insufficient_data` - generation gave up and said so (error)
//! 3. `aob_format` / `aob_length` / `aob_wildcards` - declared patterns are
//!    well-formed; skipped for Mono scripts, which need no patterns
//! 4. inline AOB strings in the script body are format-checked
//! 5. `ce_api_used` - the script calls the expected API family (warning)
//! 6. `toggle_present` - an enable/disable toggle exists (warning)
//! 7. `mono_no_excessive_aob` - Mono scripts should not lean on AOBScan
//!    (warning)

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use trainsmith::{BytePattern, PatternDefect, ResolutionStrategy};

/// Minimum token count for a write-site pattern declared by a script under
/// a full-AOB strategy. Stricter than the core validator's minimum: a
/// write-site pattern competes with the whole code section for uniqueness.
pub const MIN_SCRIPT_AOB_TOKENS: usize = 7;

/// Wildcard ratio above which a declared pattern draws a warning. Stricter
/// than the core ceiling (which is a hard error above 0.60).
pub const SCRIPT_WILDCARD_WARN_RATIO: f64 = 0.50;

/// Standard CE Lua read/write/scan API.
static CE_API_RE: Lazy<Regex> = Lazy::new(|| {
    let names = [
        "readFloat",
        "writeFloat",
        "readInteger",
        "writeInteger",
        "readBytes",
        "writeBytes",
        "getAddress",
        "AOBScan",
        "defineByteTable",
        "createThread",
        "registerSymbol",
        "getLocalPlayer",
        "readDouble",
        "writeDouble",
        "readPointer",
        "writePointer",
        "readQword",
        "writeQword",
        "readSmallInteger",
        "writeSmallInteger",
    ];
    Regex::new(&format!(r"\b({})\b", names.join("|"))).expect("CE API regex")
});

/// CE Mono bridge API.
static MONO_API_RE: Lazy<Regex> = Lazy::new(|| {
    let names = [
        "mono_findClass",
        "mono_getClassField",
        "mono_getFieldOffset",
        "mono_findObject",
        "mono_enumDomain",
        "mono_enumAssemblies",
        "mono_object_get_field_address",
        "mono_getStaticFieldAddress",
    ];
    Regex::new(&format!(r"\b({})\b", names.join("|"))).expect("Mono API regex")
});

static TOGGLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(cheatEnabled|enabled|isActive|toggle)\b").expect("toggle regex"));

/// Quoted strings of 5+ space-separated 2-char tokens. Deliberately broader
/// than the valid token alphabet so malformed patterns are caught, not
/// skipped.
static INLINE_AOB_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""([0-9A-Za-z?]{2}(?:[ ][0-9A-Za-z?]{2}){4,})""#).expect("inline AOB regex")
});

static AOBSCAN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bAOBScan\b").expect("AOBScan regex"));

/// Result of one validation pass.
#[derive(Debug, Clone, Default)]
pub struct ScriptReport {
    /// True iff no blocking errors were found.
    pub passed: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub checks_run: Vec<String>,
}

impl fmt::Display for ScriptReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.passed { "PASS" } else { "FAIL" };
        write!(
            f,
            "[{status}] {} error(s), {} warning(s)",
            self.errors.len(),
            self.warnings.len()
        )
    }
}

/// Validate `lua` against the strategy that produced it.
///
/// `patterns` are the AOB patterns the generation step declared alongside
/// the script. `strategy` of `None` means the engine was never classified;
/// the full per-field AOB checks apply, same as
/// [`ResolutionStrategy::AobWrite`].
pub fn validate_script(
    lua: &str,
    patterns: &[BytePattern],
    strategy: Option<ResolutionStrategy>,
) -> ScriptReport {
    let mut report = ScriptReport::default();
    let strategy = strategy.unwrap_or(ResolutionStrategy::AobWrite);
    let is_mono = strategy == ResolutionStrategy::MonoApi;

    check_non_empty(lua, &mut report);
    check_insufficient(lua, &mut report);

    if is_mono {
        // Mono needs no patterns; any that are present (e.g. a singleton
        // root finder) still get a format check.
        report.checks_run.push("aob_skipped_for_mono".to_string());
        for pattern in patterns {
            push_format_errors(pattern, &mut report);
        }
    } else {
        for pattern in patterns {
            check_declared_pattern(pattern, &mut report);
        }
        for candidate in extract_inline_aobs(lua) {
            let inline = BytePattern::new("inline", candidate);
            if has_malformed_token(&inline) {
                report.errors.push(format!(
                    "inline AOB pattern has invalid tokens: '{}'",
                    inline.pattern
                ));
            }
        }
    }

    check_api_usage(lua, is_mono, &mut report);
    check_toggle(lua, &mut report);
    if is_mono {
        check_excessive_aobscan(lua, &mut report);
    }

    report.passed = report.errors.is_empty();
    report
}

fn check_non_empty(lua: &str, report: &mut ScriptReport) {
    report.checks_run.push("non_empty".to_string());
    let substantive = lua
        .lines()
        .any(|line| !line.trim().is_empty() && !line.trim().starts_with("--"));
    if !substantive {
        report
            .errors
            .push("script is empty or contains only comments".to_string());
    }
}

fn check_insufficient(lua: &str, report: &mut ScriptReport) {
    report.checks_run.push("insufficient_data".to_string());
    if lua.contains("-- INSUFFICIENT_DATA") {
        report.errors.push(
            "generation reported insufficient data; see the script's inline comments".to_string(),
        );
    }
}

fn check_declared_pattern(pattern: &BytePattern, report: &mut ScriptReport) {
    report.checks_run.push(format!("aob_format:{}", pattern.name));
    if push_format_errors(pattern, report) {
        return;
    }

    report.checks_run.push(format!("aob_length:{}", pattern.name));
    let count = pattern.tokens().len();
    if count < MIN_SCRIPT_AOB_TOKENS {
        report.errors.push(format!(
            "pattern '{}' too short ({count} tokens < {MIN_SCRIPT_AOB_TOKENS}): '{}'",
            pattern.name, pattern.pattern
        ));
    }

    report
        .checks_run
        .push(format!("aob_wildcards:{}", pattern.name));
    let ratio = pattern.wildcard_ratio();
    if ratio > trainsmith::MAX_WILDCARD_RATIO {
        report.errors.push(format!(
            "pattern '{}' is {:.0}% wildcards, over the hard ceiling: '{}'",
            pattern.name,
            ratio * 100.0,
            pattern.pattern
        ));
    } else if ratio > SCRIPT_WILDCARD_WARN_RATIO {
        report.warnings.push(format!(
            "pattern '{}' is {:.0}% wildcards and may match more than once: '{}'",
            pattern.name,
            ratio * 100.0,
            pattern.pattern
        ));
    }
}

/// Report malformed tokens for `pattern`; true when any were found.
fn push_format_errors(pattern: &BytePattern, report: &mut ScriptReport) -> bool {
    let Err(defects) = pattern.validate() else {
        return false;
    };
    let mut found = false;
    for defect in defects {
        if let PatternDefect::MalformedToken { .. } = defect {
            report.errors.push(format!(
                "pattern '{}': {defect}; each token must be a 2-digit hex byte or '??'",
                pattern.name
            ));
            found = true;
        }
    }
    found
}

fn has_malformed_token(pattern: &BytePattern) -> bool {
    matches!(
        pattern.validate(),
        Err(defects) if defects
            .iter()
            .any(|d| matches!(d, PatternDefect::MalformedToken { .. }))
    )
}

fn check_api_usage(lua: &str, is_mono: bool, report: &mut ScriptReport) {
    report.checks_run.push("ce_api_used".to_string());
    if is_mono {
        if !MONO_API_RE.is_match(lua) {
            report.warnings.push(
                "Mono script does not call any mono_* bridge function (mono_findClass, mono_getClassField, ...)"
                    .to_string(),
            );
        }
    } else if !CE_API_RE.is_match(lua) {
        report.warnings.push(
            "script does not call any standard CE Lua API function (readFloat/writeFloat/AOBScan/...)"
                .to_string(),
        );
    }
}

fn check_toggle(lua: &str, report: &mut ScriptReport) {
    report.checks_run.push("toggle_present".to_string());
    if !TOGGLE_RE.is_match(lua) {
        report.warnings.push(
            "no enable/disable toggle detected (cheatEnabled / enabled / isActive)".to_string(),
        );
    }
}

fn check_excessive_aobscan(lua: &str, report: &mut ScriptReport) {
    report.checks_run.push("mono_no_excessive_aob".to_string());
    let calls = AOBSCAN_RE.find_iter(lua).count();
    if calls > 2 {
        report.warnings.push(format!(
            "Mono script calls AOBScan {calls} times; prefer the mono_* bridge, AOBs are fragile across patches"
        ));
    }
}

/// Quoted AOB-looking strings inside the Lua body, valid or not.
fn extract_inline_aobs(lua: &str) -> Vec<&str> {
    INLINE_AOB_RE
        .captures_iter(lua)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const MONO_SCRIPT: &str = r#"
-- infinite health (Mono)
local cheatEnabled = false
local cls = mono_findClass("Assembly-CSharp", "Game.Player", "PlayerController")
local fld = mono_getClassField(cls, "health")
writeFloat(mono_getStaticFieldAddress(fld), 9999)
"#;

    const AOB_SCRIPT: &str = r#"
local cheatEnabled = true
local match = AOBScan("F3 0F 11 83 44 04 00 00")
writeBytes(match, 0x90)
"#;

    #[test]
    fn test_empty_script_fails() {
        let report = validate_script("", &[], None);
        assert!(!report.passed);
        assert!(report.errors[0].contains("empty"));
    }

    #[test]
    fn test_comment_only_script_fails() {
        let report = validate_script("-- just a comment\n-- another\n", &[], None);
        assert!(!report.passed);
    }

    #[test]
    fn test_insufficient_data_marker_fails() {
        let lua = "-- INSUFFICIENT_DATA\nprint('x')\n";
        let report = validate_script(lua, &[], None);
        assert!(!report.passed);
        assert!(report.errors.iter().any(|e| e.contains("insufficient")));
    }

    #[test]
    fn test_mono_script_passes() {
        let report = validate_script(MONO_SCRIPT, &[], Some(ResolutionStrategy::MonoApi));
        assert!(report.passed, "errors: {:?}", report.errors);
        assert!(report.warnings.is_empty(), "warnings: {:?}", report.warnings);
        assert!(report.checks_run.contains(&"aob_skipped_for_mono".to_string()));
    }

    #[test]
    fn test_mono_script_without_bridge_calls_warns_only() {
        let lua = "local cheatEnabled = true\nwriteFloat(0x1000, 1)\n";
        let report = validate_script(lua, &[], Some(ResolutionStrategy::MonoApi));
        assert!(report.passed);
        assert!(report.warnings.iter().any(|w| w.contains("mono_*")));
    }

    #[test]
    fn test_declared_pattern_with_bad_tokens_fails() {
        let bad = BytePattern::new("health_write", "F3 0F ZZ 83 44 04 00 00");
        let report = validate_script(AOB_SCRIPT, &[bad], None);
        assert!(!report.passed);
        assert!(report.errors.iter().any(|e| e.contains("health_write")));
    }

    #[test]
    fn test_short_pattern_fails_under_full_checks() {
        // Valid for the core validator (>= 4 tokens) but below the script
        // minimum of 7.
        let short = BytePattern::new("short", "F3 0F 11 83");
        let report = validate_script(AOB_SCRIPT, &[short.clone()], None);
        assert!(!report.passed);
        assert!(report.errors.iter().any(|e| e.contains("too short")));

        // The same pattern under Mono draws no length error.
        let report = validate_script(MONO_SCRIPT, &[short], Some(ResolutionStrategy::MonoApi));
        assert!(report.passed);
    }

    #[test]
    fn test_wildcard_heavy_pattern_warns() {
        // 4/7 wildcards ~= 0.57: over the 0.50 warning line, under the hard
        // 0.60 ceiling.
        let heavy = BytePattern::new("rip", "48 8B 05 ?? ?? ?? ??");
        let report = validate_script(AOB_SCRIPT, &[heavy], None);
        assert!(report.passed, "errors: {:?}", report.errors);
        assert!(report.warnings.iter().any(|w| w.contains("wildcards")));
    }

    #[test]
    fn test_inline_malformed_aob_detected() {
        let lua = r#"
local cheatEnabled = true
local m = AOBScan("G1 22 33 44 55 66 77")
writeBytes(m, 0x90)
"#;
        let report = validate_script(lua, &[], None);
        assert!(!report.passed);
        assert!(report.errors.iter().any(|e| e.contains("inline")));
    }

    #[test]
    fn test_inline_valid_aob_accepted() {
        let report = validate_script(AOB_SCRIPT, &[], None);
        assert!(report.passed, "errors: {:?}", report.errors);
    }

    #[test]
    fn test_missing_toggle_warns() {
        let lua = "writeFloat(0x1000, 1)\n";
        let report = validate_script(lua, &[], None);
        assert!(report.passed);
        assert!(report.warnings.iter().any(|w| w.contains("toggle")));
    }

    #[test]
    fn test_missing_ce_api_warns() {
        let lua = "local cheatEnabled = somethingCustom()\n";
        let report = validate_script(lua, &[], None);
        assert!(report.passed);
        assert!(report.warnings.iter().any(|w| w.contains("CE Lua API")));
    }

    #[test]
    fn test_mono_excessive_aobscan_warns() {
        let lua = format!(
            "{MONO_SCRIPT}\nAOBScan(\"48 8B 05 11 22 33 44\")\nAOBScan(\"48 8B 05 11 22 33 45\")\nAOBScan(\"48 8B 05 11 22 33 46\")\n"
        );
        let report = validate_script(&lua, &[], Some(ResolutionStrategy::MonoApi));
        assert!(report.passed);
        assert!(report.warnings.iter().any(|w| w.contains("AOBScan 3 times")));
    }

    #[test]
    fn test_report_display() {
        let report = validate_script(AOB_SCRIPT, &[], None);
        assert!(report.to_string().starts_with("[PASS]"));
        let report = validate_script("", &[], None);
        assert!(report.to_string().starts_with("[FAIL]"));
    }
}
