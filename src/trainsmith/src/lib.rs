//! # trainsmith
//!
//! Addressing resolution and validation for trainer-script generation.
//!
//! Given an engine classification (from the fingerprinting step) and a
//! structural dump of a game's classes and fields (from the dumper), this
//! library:
//! - Matches feature requests like `infinite_health` onto concrete dumped
//!   fields, without substring false positives
//! - Selects the one addressing strategy legal for the engine family
//! - Builds per-field access expressions plus the byte-pattern bookkeeping
//!   the strategy requires
//! - Validates AOB patterns before anything downstream scans with them, and
//!   classifies scan hit counts for uniqueness
//!
//! It never touches a live process: scanning, script generation, and
//! persistence are external collaborators.
//!
//! ## Example
//!
//! ```
//! use trainsmith::{EngineClass, EngineContext, EngineInfo, StructureDump};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let dump = StructureDump::from_json(r#"{
//!     "engine": "Unity_IL2CPP",
//!     "version": "2022.3.10f1",
//!     "classes": [{
//!         "name": "PlayerController",
//!         "namespace": "Game.Player",
//!         "fields": [
//!             { "name": "health", "type": "float", "offset": "0x58" },
//!             { "name": "maxHealth", "type": "float", "offset": "0x5C" }
//!         ]
//!     }]
//! }"#)?;
//!
//! let info = EngineInfo::new(EngineClass::UnityIl2Cpp);
//! let ctx = EngineContext::assemble(&info, &dump, &["infinite_health"]);
//!
//! assert_eq!(ctx.resolutions().len(), 1);
//! assert_eq!(ctx.resolutions()[0].field.name, "health");
//! assert_eq!(ctx.root_pattern_count(), 1);
//! # Ok(())
//! # }
//! ```

pub mod context;
pub mod engine;
pub mod matcher;
pub mod pattern;
pub mod resolve;
pub mod sandbox;
pub mod strategy;
pub mod structure;

// Re-export commonly used items
#[doc(inline)]
pub use context::{EngineContext, PatternSource, UnresolvedFeature, UnresolvedReason};
#[doc(inline)]
pub use engine::{EngineClass, EngineInfo, UnrealMajor};
#[doc(inline)]
pub use matcher::{alias_terms, tokenize_name, FieldMatcher, MatchCandidate, MatchRank};
#[doc(inline)]
pub use pattern::{BytePattern, PatternDefect, MAX_WILDCARD_RATIO, MIN_PATTERN_TOKENS};
#[doc(inline)]
pub use resolve::{FieldResolution, PatternRole, ResolveError, RootHandle};
#[doc(inline)]
pub use sandbox::{check_unique, SandboxError, ScanOutcome, ScanVerdict};
#[doc(inline)]
pub use strategy::ResolutionStrategy;
#[doc(inline)]
pub use structure::{ClassDump, FieldDescriptor, FieldDump, FieldType, StructureDump};
