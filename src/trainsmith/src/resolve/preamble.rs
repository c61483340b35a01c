//! Per-strategy Lua preambles.
//!
//! Every generated script starts with the helper block for its strategy: the
//! functions the access expressions in [`FieldResolution`](super::FieldResolution)
//! call into. The blocks are self-contained Lua; script generation prepends
//! them verbatim.

use crate::engine::EngineInfo;
use crate::strategy::ResolutionStrategy;

/// UObjectBase::ClassPrivate offset, stable across UE4/UE5.
const UOB_CLASS_PRIVATE: u64 = 0x10;
/// UObjectBase::NamePrivate offset (FName index).
const UOB_NAME_PRIVATE: u64 = 0x18;

/// Pattern text of the strategy's root template, baked into the preamble so
/// the helper block is self-contained.
fn root_aob_for(strategy: ResolutionStrategy, info: &EngineInfo) -> String {
    strategy
        .root_pattern(info.class)
        .map(|p| p.pattern)
        .unwrap_or_default()
}

/// Helper block for `strategy`, parameterized on the engine fingerprint
/// (assembly name, scan module, pointer width).
pub fn preamble(strategy: ResolutionStrategy, info: &EngineInfo) -> String {
    match strategy {
        ResolutionStrategy::MonoApi => mono_preamble(info),
        ResolutionStrategy::Il2CppPtr => il2cpp_preamble(info),
        ResolutionStrategy::UeGObjects => unreal_preamble(info),
        ResolutionStrategy::AobWrite => aob_write_preamble(),
    }
}

fn mono_preamble(info: &EngineInfo) -> String {
    let assembly = if info.assembly_name.is_empty() {
        "Assembly-CSharp"
    } else {
        &info.assembly_name
    };
    format!(
        r#"-- Mono runtime helpers
-- Assembly: {assembly}
-- Bridge functions used: mono_findClass, mono_getClassField, mono_getFieldOffset

local _classCache = {{}}
local _fieldCache = {{}}

local function _monoClass(ns, name)
  local key = ns .. "." .. name
  if not _classCache[key] then
    _classCache[key] = mono_findClass("{assembly}", ns, name)
  end
  return _classCache[key]
end

local function _monoField(ns, className, fieldName)
  local key = ns .. "." .. className .. ":" .. fieldName
  if not _fieldCache[key] then
    local cls = _monoClass(ns, className)
    if cls then
      _fieldCache[key] = mono_getClassField(cls, fieldName)
    end
  end
  return _fieldCache[key]
end

local function _monoOffset(ns, className, fieldName)
  local f = _monoField(ns, className, fieldName)
  return f and mono_getFieldOffset(f) or nil
end

-- Generation must supply one object finder per referenced class:
--   function _getObj_PlayerController()
--     return mono_findObject("{assembly}", "Game.Player", "PlayerController")
--   end
"#
    )
}

fn il2cpp_preamble(info: &EngineInfo) -> String {
    let module = if info.module_name.is_empty() {
        "GameAssembly.dll"
    } else {
        &info.module_name
    };
    let bitness = info.bitness;
    let ptr_size = info.pointer_size();
    let root_aob = root_aob_for(ResolutionStrategy::Il2CppPtr, info);
    format!(
        r#"-- IL2CPP pointer-chain helpers
-- Module : {module}
-- Bitness: {bitness}-bit (pointer size = {ptr_size} bytes)
-- One root pattern per context; static field offsets apply on top.

local ROOT_AOB = "{root_aob}"
local _baseCache = {{}}

-- Resolve a RIP-relative MOV to its target address:
--   48 8B 05 [offset32]  ->  next_instr_addr + offset32
local function _resolveRIP(matchAddr)
  local rel = readInteger(matchAddr + 3)
  return matchAddr + 7 + rel
end

-- Scan for the root pattern, dereference the static pointer, then walk an
-- optional chain of pointer offsets to the owning instance.
local function _findRoot(aobPattern, chain)
  local match = AOBScan(aobPattern, "{module}")
  if not match then return nil end
  local addr = readPointer(_resolveRIP(match))
  for _, off in ipairs(chain or {{}}) do
    if addr == 0 then return nil end
    addr = readPointer(addr + off)
  end
  return addr
end

-- Generation must supply one base finder per referenced class, scanning once
-- and caching the result:
--   local function _getBase_PlayerController()
--     if not _baseCache["PlayerController"] then
--       _baseCache["PlayerController"] = _findRoot(ROOT_AOB, {{0x18, 0x28}})
--     end
--     return _baseCache["PlayerController"]
--   end
"#
    )
}

fn unreal_preamble(info: &EngineInfo) -> String {
    let engine = info.class.name();
    let gobjects_aob = root_aob_for(ResolutionStrategy::UeGObjects, info);
    format!(
        r#"-- Unreal Engine ({engine}) GUObjectArray helpers
-- GObjects AOB: {gobjects_aob}
-- UObjectBase offsets: ClassPrivate={UOB_CLASS_PRIVATE:#x}, NamePrivate={UOB_NAME_PRIVATE:#x}

local _GOBJECTS_AOB = "{gobjects_aob}"
local _GObjects = nil
local _GNames = nil
local _actorCache = {{}}

local function _resolveRIP(addr)
  return addr + 7 + readInteger(addr + 3)
end

-- Locate GUObjectArray once, on first use.
local function _initGObjects()
  if _GObjects then return end
  local match = AOBScan(_GOBJECTS_AOB)
  if match then
    _GObjects = _resolveRIP(match)
  end
end

-- Read an FName string out of the GNames pool.
local function _readFName(nameIndex)
  if not _GNames then return "" end
  local chunk = readPointer(_GNames + (nameIndex >> 16) * 8)
  local entry = chunk + (nameIndex & 0xFFFF) * 2
  local len = readSmallInteger(entry)
  return readString(entry + 6, len)
end

local function _getClassName(obj)
  local classPtr = readPointer(obj + {UOB_CLASS_PRIVATE:#x})
  if classPtr == 0 then return "" end
  local nameIdx = readInteger(classPtr + {UOB_NAME_PRIVATE:#x})
  return _readFName(nameIdx)
end

-- Walk GUObjectArray for the first object of the given class.
local function _findActor(className)
  _initGObjects()
  if not _GObjects then return 0 end
  if _actorCache[className] then return _actorCache[className] end

  local numObjs = readInteger(_GObjects + 0x14)
  for i = 0, numObjs - 1 do
    local entry = readPointer(_GObjects + 0x18 + i * 8)
    if entry ~= 0 then
      local obj = readPointer(entry)
      if obj ~= 0 and _getClassName(obj) == className then
        _actorCache[className] = obj
        return obj
      end
    end
  end
  return 0
end
"#
    )
}

fn aob_write_preamble() -> String {
    r#"-- Per-field AOB patch helpers
-- Each field is reached through its own registered write-site pattern.

local _aobPatterns = {}
local _aobCache = {}

-- Generation registers every pattern slot before use:
--   _registerAob("aob_Player_health", "F3 0F 11 83 ?? ?? 00 00", 4)
local function _registerAob(name, pattern, offset)
  _aobPatterns[name] = { pattern = pattern, offset = offset or 0 }
end

-- Scan for a registered pattern and return the target address.
local function _aobTarget(name)
  if _aobCache[name] then return _aobCache[name] end
  local entry = _aobPatterns[name]
  if not entry then return nil end
  local match = AOBScan(entry.pattern)
  if not match then return nil end
  _aobCache[name] = match + entry.offset
  return _aobCache[name]
end
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineClass, UnrealMajor};

    #[test]
    fn test_mono_preamble_names_assembly() {
        let info = EngineInfo::new(EngineClass::UnityMono);
        let text = preamble(ResolutionStrategy::MonoApi, &info);
        assert!(text.contains("mono_findClass(\"Assembly-CSharp\""));
        assert!(text.contains("_monoOffset"));
        assert!(!text.contains("AOBScan"));
    }

    #[test]
    fn test_il2cpp_preamble_names_module_and_pointer_size() {
        let info = EngineInfo::new(EngineClass::UnityIl2Cpp).with_bitness(32);
        let text = preamble(ResolutionStrategy::Il2CppPtr, &info);
        assert!(text.contains("GameAssembly.dll"));
        assert!(text.contains("pointer size = 4 bytes"));
        assert!(text.contains("_findRoot"));
        assert!(text.contains("_resolveRIP"));
        assert!(text.contains("local ROOT_AOB = \"48 8B 05"));
    }

    #[test]
    fn test_unreal_preamble_carries_uobject_offsets() {
        let info = EngineInfo::new(EngineClass::Unreal(UnrealMajor::Ue5));
        let text = preamble(ResolutionStrategy::UeGObjects, &info);
        assert!(text.contains("(UE5)"));
        assert!(text.contains("ClassPrivate=0x10"));
        assert!(text.contains("NamePrivate=0x18"));
        assert!(text.contains("_findActor"));
        assert!(text.contains("local _GOBJECTS_AOB = \"48 89 05"));

        let ue4 = EngineInfo::new(EngineClass::Unreal(UnrealMajor::Ue4));
        let text4 = preamble(ResolutionStrategy::UeGObjects, &ue4);
        assert!(text4.contains("local _GOBJECTS_AOB = \"48 8B 05"));
    }

    #[test]
    fn test_aob_preamble_has_registry_helpers() {
        let info = EngineInfo::new(EngineClass::Unknown);
        let text = preamble(ResolutionStrategy::AobWrite, &info);
        assert!(text.contains("_registerAob"));
        assert!(text.contains("_aobTarget"));
    }

    #[test]
    fn test_custom_module_overrides_default() {
        let info = EngineInfo::new(EngineClass::UnityIl2Cpp).with_module("UserAssembly.dll");
        let text = preamble(ResolutionStrategy::Il2CppPtr, &info);
        assert!(text.contains("UserAssembly.dll"));
        assert!(!text.contains("GameAssembly.dll"));
    }
}
