//! Field resolution - turning one matched field into runtime access
//! expressions under a given strategy.
//!
//! A [`FieldResolution`] is the unit script generation consumes: a read
//! expression, a write expression (with `{value}` as the placeholder for the
//! value to write), and whatever pattern bookkeeping the strategy demands.
//! The builder never mints root patterns itself; pointer- and table-based
//! strategies require the caller to pass the root handle already registered
//! for the context, which is how the one-root-per-context rule stays intact.

pub mod preamble;

use crate::engine::EngineInfo;
use crate::pattern::BytePattern;
use crate::strategy::ResolutionStrategy;
use crate::structure::FieldDescriptor;
use serde::Serialize;
use thiserror::Error;

/// Which pattern a resolution depends on, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PatternRole {
    /// No pattern involved (Mono bridge resolution).
    None,
    /// Shares the context-wide root pattern.
    Root,
    /// Owns a distinct per-field pattern slot.
    PerField,
}

/// Witness that the context's shared root pattern exists. Handed to the
/// builder by the assembler once the root is registered.
#[derive(Debug, Clone, PartialEq)]
pub struct RootHandle {
    pub pattern_name: String,
}

impl RootHandle {
    pub fn new(pattern: &BytePattern) -> Self {
        RootHandle {
            pattern_name: pattern.name.clone(),
        }
    }
}

/// Errors from building a single resolution. Fatal to that resolution only;
/// the assembler records them as unresolved-feature notes.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResolveError {
    /// A pattern role was requested that the strategy does not admit, e.g. a
    /// root pattern under the Mono bridge. Caller-side ordering bug.
    #[error("strategy {strategy} takes no root pattern (field {field})")]
    StrategyFieldMismatch { strategy: ResolutionStrategy, field: String },

    /// A pointer/table strategy was invoked before the context registered
    /// its root pattern.
    #[error("no root pattern established for {strategy} resolution of {field}")]
    MissingRootHandle { strategy: ResolutionStrategy, field: String },

    /// The field's dumped offset is missing or unparseable, and the strategy
    /// needs one.
    #[error("field {field} has no usable static offset ('{offset}')")]
    BadOffset { field: String, offset: String },
}

/// How to read and write one field at script runtime.
#[derive(Debug, Clone, Serialize)]
pub struct FieldResolution {
    pub field: FieldDescriptor,
    pub strategy: ResolutionStrategy,
    /// Expression evaluating to the field's current value.
    pub read_expr: String,
    /// Statement writing `{value}` to the field.
    pub write_expr: String,
    pub pattern_role: PatternRole,
    /// Name of the pattern this resolution depends on: the shared root for
    /// pointer/table strategies, a per-field slot for `AobWrite`, `None` for
    /// the Mono bridge.
    pub pattern_name: Option<String>,
    /// Concrete per-field pattern content, once supplied and validated.
    /// Always `None` outside `AobWrite`; the shared root lives on the
    /// context, not here.
    pub pattern: Option<BytePattern>,
    /// Matcher confidence carried through for the script generator.
    pub confidence: f32,
    pub notes: String,
}

impl FieldResolution {
    /// Build the resolution for `field` under `strategy`.
    ///
    /// `root` must be `Some` exactly for the pointer/table strategies
    /// (`Il2CppPtr`, `UeGObjects`) and `None` otherwise; violations are
    /// [`ResolveError::StrategyFieldMismatch`] or
    /// [`ResolveError::MissingRootHandle`].
    pub fn build(
        field: &FieldDescriptor,
        strategy: ResolutionStrategy,
        root: Option<&RootHandle>,
        info: &EngineInfo,
    ) -> Result<FieldResolution, ResolveError> {
        if !strategy.needs_root() && root.is_some() {
            return Err(ResolveError::StrategyFieldMismatch {
                strategy,
                field: field.qualified_name(),
            });
        }
        let require_root = || {
            root.ok_or_else(|| ResolveError::MissingRootHandle {
                strategy,
                field: field.qualified_name(),
            })
        };

        match strategy {
            ResolutionStrategy::MonoApi => Ok(build_mono(field, info)),
            ResolutionStrategy::Il2CppPtr => build_il2cpp(field, require_root()?),
            ResolutionStrategy::UeGObjects => build_unreal(field, require_root()?),
            ResolutionStrategy::AobWrite => Ok(build_aob_write(field)),
        }
    }
}

fn build_mono(field: &FieldDescriptor, info: &EngineInfo) -> FieldResolution {
    let read_fn = field.field_type.read_fn();
    let write_fn = field.field_type.write_fn();
    let ns = &field.declaring_namespace;
    let class = &field.declaring_class;
    let name = &field.name;

    let (read_expr, write_expr) = if field.is_static {
        let addr = format!(
            "mono_getStaticFieldAddress(mono_getClassField(mono_findClass(\"{}\", \"{ns}\", \"{class}\"), \"{name}\"))",
            info.assembly_name
        );
        (
            format!("{read_fn}({addr})"),
            format!("{write_fn}({addr}, {{value}})"),
        )
    } else {
        let base = format!("_getObj_{class}() + _monoOffset(\"{ns}\", \"{class}\", \"{name}\")");
        (
            format!("{read_fn}({base})"),
            format!("{write_fn}({base}, {{value}})"),
        )
    };

    FieldResolution {
        field: field.clone(),
        strategy: ResolutionStrategy::MonoApi,
        read_expr,
        write_expr,
        pattern_role: PatternRole::None,
        pattern_name: None,
        pattern: None,
        confidence: 1.0,
        notes: format!("resolved by name via the Mono bridge ({})", info.assembly_name),
    }
}

fn build_il2cpp(field: &FieldDescriptor, root: &RootHandle) -> Result<FieldResolution, ResolveError> {
    let offset = require_offset(field)?;
    let read_fn = field.field_type.read_fn();
    let write_fn = field.field_type.write_fn();
    let base = format!("_getBase_{}()", field.declaring_class);

    Ok(FieldResolution {
        field: field.clone(),
        strategy: ResolutionStrategy::Il2CppPtr,
        read_expr: format!("{read_fn}({base} + {offset:#x})"),
        write_expr: format!("{write_fn}({base} + {offset:#x}, {{value}})"),
        pattern_role: PatternRole::Root,
        pattern_name: Some(root.pattern_name.clone()),
        pattern: None,
        confidence: 1.0,
        notes: format!(
            "static offset {offset:#x} from dump; root located by pattern '{}'",
            root.pattern_name
        ),
    })
}

fn build_unreal(field: &FieldDescriptor, root: &RootHandle) -> Result<FieldResolution, ResolveError> {
    let offset = require_offset(field)?;
    let read_fn = field.field_type.read_fn();
    let write_fn = field.field_type.write_fn();
    let actor = format!("_findActor(\"{}\")", field.declaring_class);

    Ok(FieldResolution {
        field: field.clone(),
        strategy: ResolutionStrategy::UeGObjects,
        read_expr: format!("{read_fn}({actor} + {offset:#x})"),
        write_expr: format!("{write_fn}({actor} + {offset:#x}, {{value}})"),
        pattern_role: PatternRole::Root,
        pattern_name: Some(root.pattern_name.clone()),
        pattern: None,
        confidence: 1.0,
        notes: format!(
            "property offset {offset:#x} from dump; object table located by pattern '{}'",
            root.pattern_name
        ),
    })
}

fn build_aob_write(field: &FieldDescriptor) -> FieldResolution {
    let read_fn = field.field_type.read_fn();
    let write_fn = field.field_type.write_fn();
    let pattern_name = per_field_pattern_name(field);

    FieldResolution {
        field: field.clone(),
        strategy: ResolutionStrategy::AobWrite,
        read_expr: format!("{read_fn}(_aobTarget(\"{pattern_name}\"))"),
        write_expr: format!("{write_fn}(_aobTarget(\"{pattern_name}\"), {{value}})"),
        pattern_role: PatternRole::PerField,
        pattern_name: Some(pattern_name.clone()),
        pattern: None,
        confidence: 1.0,
        notes: format!(
            "byte content for '{pattern_name}' must be supplied by the pattern author"
        ),
    }
}

/// Per-field pattern slot name, unique per (class, field) pair.
pub fn per_field_pattern_name(field: &FieldDescriptor) -> String {
    format!("aob_{}_{}", field.declaring_class, field.name)
}

fn require_offset(field: &FieldDescriptor) -> Result<u64, ResolveError> {
    field.offset().ok_or_else(|| ResolveError::BadOffset {
        field: field.qualified_name(),
        offset: field.offset_hex.clone(),
    })
}
