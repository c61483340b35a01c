//! Engine context assembly.
//!
//! The assembler is the one place the other components meet: it selects the
//! strategy for the classification, ranks dumped fields against each
//! requested feature, builds resolutions, registers the shared root pattern
//! on first need, and validates every pattern before it is allowed in. A
//! feature that cannot be resolved never aborts the assembly; it becomes an
//! unresolved-feature note and the context ships without it. The returned
//! context is frozen: all state is private and read through accessors.

use crate::engine::EngineInfo;
use crate::matcher::{alias_terms, FieldMatcher};
use crate::pattern::{BytePattern, PatternDefect};
use crate::resolve::{preamble::preamble, FieldResolution, ResolveError, RootHandle};
use crate::strategy::ResolutionStrategy;
use crate::structure::{FieldDescriptor, StructureDump};
use std::fmt;
use tracing::{debug, warn};

/// External supplier of per-field pattern content (`AobWrite` only).
///
/// Byte content for a write-site pattern cannot be derived from structural
/// data; it takes disassembly this engine does not perform. Whatever authors
/// it (usually the script-generation step) plugs in here; the assembler
/// validates every supplied pattern before accepting it. Returning `None`
/// leaves the named slot declared but unfilled.
pub trait PatternSource {
    fn pattern_for(&self, field: &FieldDescriptor, pattern_name: &str) -> Option<BytePattern>;
}

/// The no-op source used when no author is wired up yet.
struct NoPatterns;

impl PatternSource for NoPatterns {
    fn pattern_for(&self, _field: &FieldDescriptor, _pattern_name: &str) -> Option<BytePattern> {
        None
    }
}

/// Why a requested feature produced no resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum UnresolvedReason {
    /// The feature keyword has no alias row; needs human disambiguation.
    UnknownFeature,
    /// No dumped field matched any alias term.
    NoMatchingField,
    /// A pattern this feature needed failed format validation.
    BadPattern(Vec<PatternDefect>),
    /// The resolution builder refused the field.
    Unresolvable(ResolveError),
}

impl fmt::Display for UnresolvedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnresolvedReason::UnknownFeature => write!(f, "feature keyword not recognized"),
            UnresolvedReason::NoMatchingField => write!(f, "no field matched the alias terms"),
            UnresolvedReason::BadPattern(defects) => {
                write!(f, "pattern failed validation: ")?;
                for (i, d) in defects.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{d}")?;
                }
                Ok(())
            }
            UnresolvedReason::Unresolvable(err) => write!(f, "{err}"),
        }
    }
}

/// One feature the assembly could not resolve. Expected and frequent; the
/// orchestrator decides whether to retry, ask the user, or accept the rest.
#[derive(Debug, Clone, PartialEq)]
pub struct UnresolvedFeature {
    pub feature: String,
    pub reason: UnresolvedReason,
}

impl fmt::Display for UnresolvedFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.feature, self.reason)
    }
}

/// Everything script generation needs for one request: the strategy, the
/// per-field resolutions, the shared root pattern (when the strategy uses
/// one), the strategy preamble, and notes for whatever did not resolve.
///
/// Assembled once, then immutable. Each request builds its own context;
/// nothing is shared across concurrent assemblies.
#[derive(Debug, Clone)]
pub struct EngineContext {
    info: EngineInfo,
    strategy: ResolutionStrategy,
    resolutions: Vec<FieldResolution>,
    root_pattern: Option<BytePattern>,
    preamble: String,
    unresolved: Vec<UnresolvedFeature>,
}

impl EngineContext {
    /// Assemble a context with no external pattern author wired up.
    /// `AobWrite` slots stay declared-but-empty.
    pub fn assemble(
        info: &EngineInfo,
        structure: &StructureDump,
        features: &[&str],
    ) -> EngineContext {
        Self::assemble_with_patterns(info, structure, features, &NoPatterns)
    }

    /// Assemble a context, pulling per-field pattern content from `patterns`.
    ///
    /// Steps per feature: match (top-ranked candidate wins), build the
    /// resolution, register the shared root lazily on first need, validate
    /// any pattern before inclusion. Failures become unresolved notes.
    pub fn assemble_with_patterns(
        info: &EngineInfo,
        structure: &StructureDump,
        features: &[&str],
        patterns: &dyn PatternSource,
    ) -> EngineContext {
        let strategy = ResolutionStrategy::for_engine(info.class);
        let matcher = match structure.guess_player_class() {
            Some(class) => FieldMatcher::with_player_class(class),
            None => FieldMatcher::new(),
        };
        let fields = structure.descriptors();

        let mut resolutions = Vec::new();
        let mut unresolved: Vec<UnresolvedFeature> = Vec::new();
        let mut root_pattern: Option<BytePattern> = None;
        let mut root_handle: Option<RootHandle> = None;

        let note = |unresolved: &mut Vec<UnresolvedFeature>, feature: &str, reason| {
            warn!(feature, %strategy, "feature left unresolved");
            unresolved.push(UnresolvedFeature {
                feature: feature.to_string(),
                reason,
            });
        };

        for &feature in features {
            if alias_terms(feature).is_none() {
                note(&mut unresolved, feature, UnresolvedReason::UnknownFeature);
                continue;
            }

            let candidates = matcher.rank_fields(feature, &fields);
            let Some(top) = candidates.first() else {
                note(&mut unresolved, feature, UnresolvedReason::NoMatchingField);
                continue;
            };
            debug!(
                feature,
                field = %top.field.qualified_name(),
                rank = ?top.rank,
                "matched feature to field"
            );

            // Create-if-absent: the single root pattern is registered the
            // first time a pointer/table resolution needs it.
            if strategy.needs_root() && root_pattern.is_none() {
                match strategy.root_pattern(info.class) {
                    Some(root) => match root.validate() {
                        Ok(()) => {
                            debug!(pattern = %root.name, "registered context root pattern");
                            root_handle = Some(RootHandle::new(&root));
                            root_pattern = Some(root);
                        }
                        Err(defects) => {
                            note(&mut unresolved, feature, UnresolvedReason::BadPattern(defects));
                            continue;
                        }
                    },
                    // Unreachable by the strategy table; kept total.
                    None => {
                        note(
                            &mut unresolved,
                            feature,
                            UnresolvedReason::Unresolvable(ResolveError::MissingRootHandle {
                                strategy,
                                field: top.field.qualified_name(),
                            }),
                        );
                        continue;
                    }
                }
            }

            let mut resolution =
                match FieldResolution::build(&top.field, strategy, root_handle.as_ref(), info) {
                    Ok(res) => res,
                    Err(err) => {
                        note(&mut unresolved, feature, UnresolvedReason::Unresolvable(err));
                        continue;
                    }
                };
            resolution.confidence = top.confidence;
            if top.likely_derived {
                resolution.notes = format!(
                    "{}; matched '{}' but looks like a derived stat",
                    resolution.notes, top.matched_term
                );
            }

            if strategy == ResolutionStrategy::AobWrite {
                // The builder allocated the slot name; pull content if an
                // author is available, and gate it through the validator.
                let slot = resolution
                    .pattern_name
                    .clone()
                    .unwrap_or_else(|| top.field.qualified_name());
                match patterns.pattern_for(&top.field, &slot) {
                    Some(mut supplied) => {
                        supplied.name = slot;
                        match supplied.validate() {
                            Ok(()) => resolution.pattern = Some(supplied),
                            Err(defects) => {
                                note(&mut unresolved, feature, UnresolvedReason::BadPattern(defects));
                                continue;
                            }
                        }
                    }
                    None => {
                        debug!(pattern = %slot, "per-field slot declared, content pending");
                    }
                }
            }

            resolutions.push(resolution);
        }

        EngineContext {
            info: info.clone(),
            strategy,
            resolutions,
            root_pattern,
            preamble: preamble(strategy, info),
            unresolved,
        }
    }

    pub fn info(&self) -> &EngineInfo {
        &self.info
    }

    pub fn strategy(&self) -> ResolutionStrategy {
        self.strategy
    }

    pub fn resolutions(&self) -> &[FieldResolution] {
        &self.resolutions
    }

    /// The shared root pattern, present iff the strategy uses one and at
    /// least one resolution needed it.
    pub fn root_pattern(&self) -> Option<&BytePattern> {
        self.root_pattern.as_ref()
    }

    /// Root patterns in this context: 0 or 1 by construction.
    pub fn root_pattern_count(&self) -> usize {
        usize::from(self.root_pattern.is_some())
    }

    /// Strategy helper block prepended to every generated script.
    pub fn preamble(&self) -> &str {
        &self.preamble
    }

    pub fn unresolved(&self) -> &[UnresolvedFeature] {
        &self.unresolved
    }

    pub fn is_fully_resolved(&self) -> bool {
        self.unresolved.is_empty()
    }
}
