//! Engine classification and fingerprint data.
//!
//! `EngineClass` is the closed set of runtime families the resolver knows how
//! to address. Classification itself happens outside this crate (the detector
//! inspects the game binary); this module only carries the result downstream.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Major Unreal Engine generation. The GUObjectArray locator pattern differs
/// between the two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnrealMajor {
    Ue4,
    Ue5,
}

impl UnrealMajor {
    pub fn name(&self) -> &'static str {
        match self {
            UnrealMajor::Ue4 => "UE4",
            UnrealMajor::Ue5 => "UE5",
        }
    }
}

/// Runtime family of the target game.
///
/// Every variant has exactly one legal [`ResolutionStrategy`](crate::ResolutionStrategy);
/// see [`ResolutionStrategy::for_engine`](crate::ResolutionStrategy::for_engine).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EngineClass {
    /// Unity with the Mono scripting backend. Fields resolve by name through
    /// the runtime's own metadata, no byte patterns needed.
    UnityMono,
    /// Unity with the IL2CPP backend (ahead-of-time compiled). Field offsets
    /// are static; one root pattern locates the singleton base pointer.
    UnityIl2Cpp,
    /// Unreal Engine. Objects are reachable by walking GUObjectArray; one
    /// root pattern locates the array.
    Unreal(UnrealMajor),
    /// Unclassified engine. Falls back to per-field write-site patterns.
    Unknown,
}

impl EngineClass {
    pub fn name(&self) -> &'static str {
        match self {
            EngineClass::UnityMono => "Unity_Mono",
            EngineClass::UnityIl2Cpp => "Unity_IL2CPP",
            EngineClass::Unreal(major) => major.name(),
            EngineClass::Unknown => "Unknown",
        }
    }

    /// True for the two Unity backends.
    pub fn is_unity(&self) -> bool {
        matches!(self, EngineClass::UnityMono | EngineClass::UnityIl2Cpp)
    }
}

impl fmt::Display for EngineClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Fingerprint result handed over by the detector.
///
/// Only `class` drives strategy selection; the remaining members feed the
/// generated access expressions and preamble (module to scan, managed
/// assembly to query, pointer width).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineInfo {
    pub class: EngineClass,
    pub version: String,
    pub bitness: u8,
    /// Module the root pattern is scanned in, e.g. "GameAssembly.dll".
    /// Empty means scan the whole process.
    pub module_name: String,
    /// Managed assembly queried by the Mono bridge.
    pub assembly_name: String,
}

impl EngineInfo {
    /// Build an `EngineInfo` with the usual defaults for the given family:
    /// 64-bit, "Assembly-CSharp" for Unity backends, "GameAssembly.dll" as
    /// the scan module for IL2CPP.
    pub fn new(class: EngineClass) -> Self {
        let module_name = match class {
            EngineClass::UnityIl2Cpp => "GameAssembly.dll".to_string(),
            _ => String::new(),
        };
        let assembly_name = if class.is_unity() {
            "Assembly-CSharp".to_string()
        } else {
            String::new()
        };
        EngineInfo {
            class,
            version: String::new(),
            bitness: 64,
            module_name,
            assembly_name,
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_bitness(mut self, bitness: u8) -> Self {
        self.bitness = bitness;
        self
    }

    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.module_name = module.into();
        self
    }

    /// Pointer width in bytes.
    pub fn pointer_size(&self) -> u8 {
        if self.bitness == 32 {
            4
        } else {
            8
        }
    }
}

impl fmt::Display for EngineInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({}-bit)", self.class, self.version, self.bitness)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_class_names() {
        assert_eq!(EngineClass::UnityMono.name(), "Unity_Mono");
        assert_eq!(EngineClass::UnityIl2Cpp.name(), "Unity_IL2CPP");
        assert_eq!(EngineClass::Unreal(UnrealMajor::Ue4).name(), "UE4");
        assert_eq!(EngineClass::Unreal(UnrealMajor::Ue5).name(), "UE5");
        assert_eq!(EngineClass::Unknown.name(), "Unknown");
    }

    #[test]
    fn test_info_defaults() {
        let info = EngineInfo::new(EngineClass::UnityIl2Cpp);
        assert_eq!(info.module_name, "GameAssembly.dll");
        assert_eq!(info.assembly_name, "Assembly-CSharp");
        assert_eq!(info.bitness, 64);
        assert_eq!(info.pointer_size(), 8);

        let info = EngineInfo::new(EngineClass::Unreal(UnrealMajor::Ue5));
        assert!(info.module_name.is_empty());
        assert!(info.assembly_name.is_empty());
    }

    #[test]
    fn test_pointer_size_32bit() {
        let info = EngineInfo::new(EngineClass::Unknown).with_bitness(32);
        assert_eq!(info.pointer_size(), 4);
    }

    #[test]
    fn test_display() {
        let info = EngineInfo::new(EngineClass::UnityMono).with_version("2022.3.10f1");
        assert_eq!(info.to_string(), "Unity_Mono 2022.3.10f1 (64-bit)");
    }
}
