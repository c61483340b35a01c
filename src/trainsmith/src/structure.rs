//! Structural dump model - the canonical class/field layout handed over by
//! the dumper.
//!
//! The dumper (IL2CPP metadata reader, Mono reflection walk, UE4SS dump, ...)
//! runs outside this crate and serializes its result as JSON in this shape:
//!
//! ```json
//! {
//!   "engine": "Unity_IL2CPP",
//!   "version": "2022.3.10f1",
//!   "classes": [
//!     {
//!       "name": "PlayerController",
//!       "namespace": "Game.Player",
//!       "fields": [
//!         { "name": "health", "type": "float", "offset": "0x58" },
//!         { "name": "gold", "type": "int32", "offset": "0x64", "static": true }
//!       ]
//!     }
//!   ]
//! }
//! ```

use crate::matcher::tokenize_name;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Semantic type of a dumped field, as far as the dumper could tell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    Float,
    Double,
    Int32,
    Int64,
    Bool,
    String,
    Vector3,
    Unknown,
}

impl FieldType {
    /// Parse a dumper type string. Dumpers are not consistent about casing
    /// or C#/C++ spellings, so this accepts the common aliases.
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "float" | "single" => FieldType::Float,
            "double" => FieldType::Double,
            "int" | "int32" | "uint32" => FieldType::Int32,
            "int64" | "uint64" | "long" => FieldType::Int64,
            "bool" | "boolean" => FieldType::Bool,
            "string" => FieldType::String,
            "vector3" => FieldType::Vector3,
            _ => FieldType::Unknown,
        }
    }

    /// CE Lua read function for this type.
    ///
    /// Unknown and Vector3 fall back to `readFloat`: Vector3 access reads one
    /// component at a time, and a float read is the least destructive default
    /// for an untyped field.
    pub fn read_fn(&self) -> &'static str {
        match self {
            FieldType::Float | FieldType::Vector3 | FieldType::Unknown => "readFloat",
            FieldType::Double => "readDouble",
            FieldType::Int32 => "readInteger",
            FieldType::Int64 => "readQword",
            FieldType::Bool => "readBytes",
            FieldType::String => "readString",
        }
    }

    /// CE Lua write function for this type.
    pub fn write_fn(&self) -> &'static str {
        match self {
            FieldType::Float | FieldType::Vector3 | FieldType::Unknown => "writeFloat",
            FieldType::Double => "writeDouble",
            FieldType::Int32 => "writeInteger",
            FieldType::Int64 => "writeQword",
            FieldType::Bool => "writeBytes",
            FieldType::String => "writeString",
        }
    }
}

/// One field as serialized by the dumper. `type` and `offset` stay strings
/// here; [`FieldDescriptor`] carries the parsed forms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDump {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub offset: String,
    #[serde(default, rename = "static")]
    pub is_static: bool,
}

/// One class as serialized by the dumper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDump {
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default)]
    pub fields: Vec<FieldDump>,
}

/// Complete structural dump of a target game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureDump {
    pub engine: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub classes: Vec<ClassDump>,
}

impl StructureDump {
    /// Parse a dump from its JSON interchange form.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Case-insensitive class lookup.
    pub fn find_class(&self, name: &str) -> Option<&ClassDump> {
        self.classes
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Case-insensitive field lookup within a class.
    pub fn find_field(&self, class_name: &str, field_name: &str) -> Option<&FieldDump> {
        self.find_class(class_name)?
            .fields
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(field_name))
    }

    /// Flatten every class into per-field descriptors, in declaration order.
    pub fn descriptors(&self) -> Vec<FieldDescriptor> {
        let mut out = Vec::new();
        for class in &self.classes {
            for field in &class.fields {
                out.push(FieldDescriptor {
                    name: field.name.clone(),
                    declaring_class: class.name.clone(),
                    declaring_namespace: class.namespace.clone(),
                    field_type: FieldType::parse(&field.type_name),
                    offset_hex: field.offset.clone(),
                    is_static: field.is_static,
                });
            }
        }
        out
    }

    /// Classes reordered so gameplay-relevant names come first.
    ///
    /// Scores by whole-token keyword hits on the CamelCase tokenization of
    /// the class name, so "PlayerController" outranks "ReplayerWidget".
    pub fn priority_classes(&self) -> Vec<&ClassDump> {
        let mut ranked: Vec<&ClassDump> = self.classes.iter().collect();
        ranked.sort_by(|a, b| {
            (keyword_hits(&b.name), &a.name).cmp(&(keyword_hits(&a.name), &b.name))
        });
        ranked
    }

    /// Best guess at the class holding the player avatar's state, used by the
    /// matcher as a ranking tie-break. `None` when nothing looks player-like.
    pub fn guess_player_class(&self) -> Option<&str> {
        self.priority_classes()
            .into_iter()
            .find(|c| {
                tokenize_name(&c.name)
                    .iter()
                    .any(|t| PLAYER_KEYWORDS.contains(&t.as_str()))
            })
            .map(|c| c.name.as_str())
    }
}

/// Class-name tokens that mark a class as gameplay-relevant.
const PRIORITY_KEYWORDS: &[&str] = &[
    "player",
    "character",
    "hero",
    "protagonist",
    "health",
    "hp",
    "stamina",
    "mana",
    "ammo",
    "gold",
    "money",
    "currency",
    "score",
    "inventory",
    "item",
    "weapon",
    "skill",
    "game",
    "manager",
    "controller",
    "singleton",
];

/// Subset of tokens that specifically mark the player avatar.
const PLAYER_KEYWORDS: &[&str] = &["player", "character", "hero", "protagonist", "avatar"];

fn keyword_hits(class_name: &str) -> usize {
    tokenize_name(class_name)
        .iter()
        .filter(|t| PRIORITY_KEYWORDS.contains(&t.as_str()))
        .count()
}

/// Flattened view of one dumped field, carrying its declaring class.
///
/// This is the unit the matcher ranks and the resolution builder consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub declaring_class: String,
    pub declaring_namespace: String,
    pub field_type: FieldType,
    /// Static offset from the dump, e.g. "0x58". Empty when unknown.
    pub offset_hex: String,
    pub is_static: bool,
}

impl FieldDescriptor {
    /// Parse the dumped hex offset. `None` when the dump had no offset or an
    /// unparseable one.
    pub fn offset(&self) -> Option<u64> {
        let digits = self
            .offset_hex
            .trim()
            .trim_start_matches("0x")
            .trim_start_matches("0X");
        if digits.is_empty() {
            return None;
        }
        u64::from_str_radix(digits, 16).ok()
    }

    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.declaring_class, self.name)
    }
}

impl fmt::Display for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{:?}]", self.qualified_name(), self.field_type)
    }
}
