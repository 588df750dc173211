//! CSV layouts for paramconfig images.
//!
//! Each data line is `;`-separated:
//! `descriptor;_;index;bit_width;repeat_count;hex_offset;...`
//!
//! The header line starts with `Descriptor` and ends with `Flashoffset`.
//! Offsets are relative to the end of the fixed paramconfig header.

use super::{parse_number, FieldLayout, ParameterKind, ParameterSchema, SchemaError};
use std::fs;
use std::path::Path;

/// Size of the header preceding the parameter area of a paramconfig image
pub const PARAMCONFIG_HEADER_LENGTH: u64 = 32;

/// Descriptors stored as NUL-padded text
pub const HFID_NAMES: &[&str] = &[
    "statinfo_manufacturer_sta_hfid",
    "statinfo_manufacturer_avln_hfid",
    "statinfo_user_sta_hfid",
    "statinfo_user_avln_hfid",
    "odm_private_string",
];

pub use super::xml::MAC_NAMES;

const MIN_FIELDS: usize = 6;

/// Kind of a CSV descriptor, by name
pub fn kind_for_name(name: &str) -> ParameterKind {
    if HFID_NAMES.contains(&name) {
        ParameterKind::Hfid
    } else if MAC_NAMES.contains(&name) {
        ParameterKind::Mac
    } else {
        ParameterKind::Raw
    }
}

fn is_header(line: &str) -> bool {
    line.starts_with("Descriptor") && line.ends_with("Flashoffset")
}

/// Load a CSV layout from a file
pub fn load_csv_layout(path: impl AsRef<Path>) -> Result<ParameterSchema, SchemaError> {
    let text = fs::read_to_string(path.as_ref())?;
    parse_csv_layout(&text)
}

/// Parse a CSV layout
pub fn parse_csv_layout(text: &str) -> Result<ParameterSchema, SchemaError> {
    let mut fields = Vec::new();

    for (index, raw_line) in text.lines().enumerate() {
        let line_no = index + 1;
        let line = raw_line.trim_end_matches('\r');
        if line.trim().is_empty() || is_header(line) {
            continue;
        }
        fields.push(parse_line(line, line_no)?);
    }

    ParameterSchema::from_fields(fields)
}

fn parse_line(line: &str, line_no: usize) -> Result<FieldLayout, SchemaError> {
    let columns: Vec<&str> = line.split(';').collect();
    if columns.len() < MIN_FIELDS {
        return Err(SchemaError::MalformedLine {
            line: line_no,
            expected: MIN_FIELDS,
            content: line.to_string(),
        });
    }

    let name = columns[0].trim();
    // The index column is validated but keys come from declaration order
    parse_number(columns[2], 10, "index", line_no)?;
    let bit_width = parse_number(columns[3], 10, "bit width", line_no)?;
    let repeat_count = parse_number(columns[4], 10, "repeat count", line_no)?;
    let flash_offset = parse_number(columns[5], 16, "flash offset", line_no)?;

    let out_of_range = |field: &'static str, value: String| SchemaError::InvalidNumber {
        line: line_no,
        field,
        value,
    };
    let offset = PARAMCONFIG_HEADER_LENGTH
        .checked_add(flash_offset)
        .ok_or_else(|| out_of_range("flash offset", columns[5].trim().to_string()))?;
    let length = bit_width
        .checked_mul(repeat_count)
        .and_then(|bits| usize::try_from(bits / 8).ok())
        .ok_or_else(|| out_of_range("length", format!("{} * {} bits", bit_width, repeat_count)))?;

    Ok(FieldLayout::new(name, offset, length, kind_for_name(name)))
}
