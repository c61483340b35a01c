//! Resolution strategy selection.
//!
//! One addressing technique is legal per engine family; the mapping is total
//! so there is no "unsupported engine" failure path, only the per-field AOB
//! fallback for unclassified binaries. Each strategy carries fixed pattern counts:
//! how many root patterns a context needs and how many per-field
//! patterns each resolution needs. The builder and assembler enforce those
//! counts; they are not advisory.

use crate::engine::{EngineClass, UnrealMajor};
use crate::pattern::BytePattern;
use serde::{Deserialize, Serialize};
use std::fmt;

/// RIP-relative MOV pattern that locates static singleton roots in IL2CPP
/// binaries: `mov rax, [rip+off]; test rax, rax; jz ..; mov rax, [rax+..]`.
const IL2CPP_SINGLETON_AOB: &str = "48 8B 05 ?? ?? ?? ?? 48 85 C0 74 ?? 48 8B 40";

/// GUObjectArray locator for UE4 x64, targeting the
/// `TUObjectArray::AddUObjectToArray` call site.
const GOBJECTS_AOB_UE4: &str = "48 8B 05 ?? ?? ?? ?? 48 8B 0C C8 48 8B 04 D1";

/// GUObjectArray locator for UE5 x64; the store site changed shape.
const GOBJECTS_AOB_UE5: &str = "48 89 05 ?? ?? ?? ?? E9";

/// Addressing technique used to reach a field at script runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResolutionStrategy {
    /// Resolve fields by name through the Mono runtime bridge. No patterns.
    MonoApi,
    /// One root pattern locates a singleton pointer; static dump offsets are
    /// applied on top of it.
    Il2CppPtr,
    /// One root pattern locates GUObjectArray; owning objects are found by
    /// class name, then static property offsets applied.
    UeGObjects,
    /// One pattern per field locates the instruction that writes it. Fallback
    /// for engines with no better structure to lean on.
    AobWrite,
}

impl ResolutionStrategy {
    /// The single legal strategy for an engine family. Total by construction.
    pub fn for_engine(class: EngineClass) -> Self {
        match class {
            EngineClass::UnityMono => ResolutionStrategy::MonoApi,
            EngineClass::UnityIl2Cpp => ResolutionStrategy::Il2CppPtr,
            EngineClass::Unreal(_) => ResolutionStrategy::UeGObjects,
            EngineClass::Unknown => ResolutionStrategy::AobWrite,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ResolutionStrategy::MonoApi => "mono_api",
            ResolutionStrategy::Il2CppPtr => "il2cpp_ptr",
            ResolutionStrategy::UeGObjects => "ue_gobjects",
            ResolutionStrategy::AobWrite => "aob_write",
        }
    }

    /// Root patterns a context assembled under this strategy must carry.
    pub fn root_pattern_count(&self) -> usize {
        match self {
            ResolutionStrategy::MonoApi | ResolutionStrategy::AobWrite => 0,
            ResolutionStrategy::Il2CppPtr | ResolutionStrategy::UeGObjects => 1,
        }
    }

    /// Patterns each individual resolution must carry.
    pub fn per_field_pattern_count(&self) -> usize {
        match self {
            ResolutionStrategy::AobWrite => 1,
            _ => 0,
        }
    }

    /// True when resolutions under this strategy hang off a shared root.
    pub fn needs_root(&self) -> bool {
        self.root_pattern_count() > 0
    }

    /// The context-wide root pattern template for this strategy, or `None`
    /// for strategies that use no root. The UE locator differs per engine
    /// generation, so the classification is needed to pick it.
    pub fn root_pattern(&self, class: EngineClass) -> Option<BytePattern> {
        match self {
            ResolutionStrategy::MonoApi | ResolutionStrategy::AobWrite => None,
            ResolutionStrategy::Il2CppPtr => Some(
                BytePattern::new("il2cpp_singleton_root", IL2CPP_SINGLETON_AOB)
                    .with_description("RIP-relative singleton load"),
            ),
            ResolutionStrategy::UeGObjects => {
                let (name, aob) = match class {
                    EngineClass::Unreal(UnrealMajor::Ue5) => ("gobjects_ue5", GOBJECTS_AOB_UE5),
                    _ => ("gobjects_ue4", GOBJECTS_AOB_UE4),
                };
                Some(BytePattern::new(name, aob).with_description("GUObjectArray locator"))
            }
        }
    }
}

impl fmt::Display for ResolutionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_CLASSES: &[EngineClass] = &[
        EngineClass::UnityMono,
        EngineClass::UnityIl2Cpp,
        EngineClass::Unreal(UnrealMajor::Ue4),
        EngineClass::Unreal(UnrealMajor::Ue5),
        EngineClass::Unknown,
    ];

    #[test]
    fn test_mapping_is_total_and_fixed() {
        assert_eq!(
            ResolutionStrategy::for_engine(EngineClass::UnityMono),
            ResolutionStrategy::MonoApi
        );
        assert_eq!(
            ResolutionStrategy::for_engine(EngineClass::UnityIl2Cpp),
            ResolutionStrategy::Il2CppPtr
        );
        assert_eq!(
            ResolutionStrategy::for_engine(EngineClass::Unreal(UnrealMajor::Ue4)),
            ResolutionStrategy::UeGObjects
        );
        assert_eq!(
            ResolutionStrategy::for_engine(EngineClass::Unreal(UnrealMajor::Ue5)),
            ResolutionStrategy::UeGObjects
        );
        assert_eq!(
            ResolutionStrategy::for_engine(EngineClass::Unknown),
            ResolutionStrategy::AobWrite
        );
    }

    #[test]
    fn test_pattern_count_table() {
        assert_eq!(ResolutionStrategy::MonoApi.root_pattern_count(), 0);
        assert_eq!(ResolutionStrategy::Il2CppPtr.root_pattern_count(), 1);
        assert_eq!(ResolutionStrategy::UeGObjects.root_pattern_count(), 1);
        assert_eq!(ResolutionStrategy::AobWrite.root_pattern_count(), 0);

        assert_eq!(ResolutionStrategy::MonoApi.per_field_pattern_count(), 0);
        assert_eq!(ResolutionStrategy::Il2CppPtr.per_field_pattern_count(), 0);
        assert_eq!(ResolutionStrategy::UeGObjects.per_field_pattern_count(), 0);
        assert_eq!(ResolutionStrategy::AobWrite.per_field_pattern_count(), 1);
    }

    #[test]
    fn test_root_templates_exist_exactly_when_needed() {
        for &class in ALL_CLASSES {
            let strategy = ResolutionStrategy::for_engine(class);
            let root = strategy.root_pattern(class);
            assert_eq!(root.is_some(), strategy.needs_root(), "{class}");
        }
    }

    #[test]
    fn test_root_templates_pass_the_validator() {
        for &class in ALL_CLASSES {
            let strategy = ResolutionStrategy::for_engine(class);
            if let Some(root) = strategy.root_pattern(class) {
                assert!(root.is_valid(), "root template invalid for {class}");
            }
        }
    }

    #[test]
    fn test_ue_root_differs_by_generation() {
        let s = ResolutionStrategy::UeGObjects;
        let ue4 = s.root_pattern(EngineClass::Unreal(UnrealMajor::Ue4)).unwrap();
        let ue5 = s.root_pattern(EngineClass::Unreal(UnrealMajor::Ue5)).unwrap();
        assert_ne!(ue4.pattern, ue5.pattern);
        assert_eq!(ue4.name, "gobjects_ue4");
        assert_eq!(ue5.name, "gobjects_ue5");
    }

    #[test]
    fn test_strategy_names() {
        assert_eq!(ResolutionStrategy::MonoApi.to_string(), "mono_api");
        assert_eq!(ResolutionStrategy::AobWrite.to_string(), "aob_write");
    }
}
