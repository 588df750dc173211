//! Parameter layouts.
//!
//! A layout maps field names to byte offsets, lengths, and kinds inside a
//! parameter image. Two dialects exist:
//! - XML object layouts describing PIB images (see [`xml`])
//! - semicolon-delimited CSV layouts describing paramconfig images (see [`csv`])
//!
//! Both produce the same [`ParameterSchema`], an ordered list of
//! [`ParameterDescriptor`]s whose keys are unique even when names repeat.

pub mod csv;
pub mod xml;

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use thiserror::Error;

pub use self::csv::{load_csv_layout, parse_csv_layout, PARAMCONFIG_HEADER_LENGTH};
pub use self::xml::{load_xml_layout, parse_xml_layout};

/// Errors that can occur while loading a layout
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("IO error reading layout: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed XML near line {line}: {source}")]
    Xml {
        line: usize,
        #[source]
        source: quick_xml::Error,
    },

    #[error("Line {line}: <{element}> is missing the '{attribute}' attribute")]
    MissingAttribute {
        line: usize,
        element: String,
        attribute: String,
    },

    #[error("Line {line}: object '{object}' has no <{element}> element")]
    MissingElement {
        line: usize,
        object: String,
        element: String,
    },

    #[error("Line {line}: invalid {field} value '{value}'")]
    InvalidNumber {
        line: usize,
        field: &'static str,
        value: String,
    },

    #[error("Line {line}: expected at least {expected} ';'-separated fields: {content}")]
    MalformedLine {
        line: usize,
        expected: usize,
        content: String,
    },

    #[error("Key '{key}' is produced by more than one field")]
    KeyCollision { key: String },
}

/// How a field's bytes are interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParameterKind {
    /// Opaque bytes, shown as upper-case hex
    #[serde(rename = "DATA")]
    Raw,
    /// MAC address
    #[serde(rename = "MAC")]
    Mac,
    /// Human-friendly identifier string
    #[serde(rename = "HFID")]
    Hfid,
}

impl ParameterKind {
    /// Tag passed to the PIB helper for this kind
    pub fn helper_tag(self) -> &'static str {
        match self {
            Self::Raw => "data",
            Self::Mac => "mac",
            Self::Hfid => "hfid",
        }
    }
}

impl fmt::Display for ParameterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Raw => write!(f, "DATA"),
            Self::Mac => write!(f, "MAC"),
            Self::Hfid => write!(f, "HFID"),
        }
    }
}

/// A field as declared by a layout, before keys are assigned
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldLayout {
    pub name: String,
    pub offset: u64,
    pub length: usize,
    pub kind: ParameterKind,
}

impl FieldLayout {
    pub fn new(name: impl Into<String>, offset: u64, length: usize, kind: ParameterKind) -> Self {
        Self {
            name: name.into(),
            offset,
            length,
            kind,
        }
    }
}

/// One schema entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterDescriptor {
    /// Name as declared by the layout, not necessarily unique
    pub name: String,
    /// Unique key used to match fields across two images
    pub key: String,
    /// Byte offset into the image
    pub offset: u64,
    /// Byte count
    pub length: usize,
    #[serde(rename = "type")]
    pub kind: ParameterKind,
}

/// Ordered, immutable list of descriptors in declaration order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterSchema {
    descriptors: Vec<ParameterDescriptor>,
}

impl ParameterSchema {
    /// Build a schema from declared fields, assigning unique keys.
    ///
    /// A name that occurs once keeps its name as key. A name that occurs more
    /// than once has every occurrence suffixed with its two-digit occurrence
    /// index, so `Foo, Foo` becomes `Foo00, Foo01`.
    pub fn from_fields(fields: Vec<FieldLayout>) -> Result<Self, SchemaError> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for field in &fields {
            *counts.entry(field.name.as_str()).or_default() += 1;
        }

        let mut seen: HashMap<&str, usize> = HashMap::new();
        let mut keys = Vec::with_capacity(fields.len());
        for field in &fields {
            let name = field.name.as_str();
            let key = if counts[name] > 1 {
                let occurrence = seen.entry(name).or_default();
                let key = format!("{}{:02}", name, occurrence);
                *occurrence += 1;
                key
            } else {
                name.to_string()
            };
            keys.push(key);
        }

        let mut unique = HashSet::with_capacity(keys.len());
        for key in &keys {
            if !unique.insert(key.as_str()) {
                return Err(SchemaError::KeyCollision { key: key.clone() });
            }
        }

        let descriptors = fields
            .into_iter()
            .zip(keys)
            .map(|(field, key)| ParameterDescriptor {
                name: field.name,
                key,
                offset: field.offset,
                length: field.length,
                kind: field.kind,
            })
            .collect();

        Ok(Self { descriptors })
    }

    pub fn descriptors(&self) -> &[ParameterDescriptor] {
        &self.descriptors
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParameterDescriptor> {
        self.descriptors.iter()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Find a descriptor by key
    pub fn get(&self, key: &str) -> Option<&ParameterDescriptor> {
        self.descriptors.iter().find(|d| d.key == key)
    }
}

/// Parse a number, tolerating surrounding whitespace and a `0x` prefix for hex
pub(crate) fn parse_number(
    text: &str,
    radix: u32,
    field: &'static str,
    line: usize,
) -> Result<u64, SchemaError> {
    let trimmed = text.trim();
    let digits = if radix == 16 {
        trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed)
    } else {
        trimmed
    };
    u64::from_str_radix(digits, radix).map_err(|_| SchemaError::InvalidNumber {
        line,
        field,
        value: text.to_string(),
    })
}
