//! Structural diff of two parameter sets.
//!
//! Fields are matched by key. Entries come out in a fixed order: first every
//! left key that differs or is missing on the right, in left order, then
//! every key only present on the right, in right order.
//!
//! Raw fields are compared window by window. Windows are 16 bytes wide and
//! aligned to absolute image offsets, so a field starting at 0x12 has its
//! first window at 0x10 with two blank byte positions in front.

use crate::extract::{ParameterSet, ParameterValue};
use crate::schema::ParameterKind;
use serde::ser::{SerializeStruct, Serializer};
use serde::Serialize;
use std::collections::HashMap;

/// Window width in bytes
pub const WINDOW: usize = 16;

/// Hex characters per window
const WINDOW_CHARS: usize = WINDOW * 2;

/// How a key differs between the two sets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    LeftOnly,
    RightOnly,
    Modified,
}

/// One differing key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffEntry<'a> {
    pub key: &'a str,
    pub name: &'a str,
    pub kind: ParameterKind,
    pub offset: u64,
    pub length: usize,
    pub left: Option<&'a ParameterValue>,
    pub right: Option<&'a ParameterValue>,
}

/// A 16-byte slice of a raw field on both sides
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffWindow {
    /// Absolute offset of the window's first byte position
    pub offset: u64,
    /// Hex text, blank positions as spaces
    pub left: String,
    pub right: String,
    pub changed: bool,
}

/// What to show for one entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffBody<'a> {
    /// Aligned windows of a raw field
    Windows(Vec<DiffWindow>),
    /// Whole before/after values of a text field
    Whole { left: &'a str, right: &'a str },
}

impl<'a> DiffEntry<'a> {
    fn new(left: Option<&'a ParameterValue>, right: Option<&'a ParameterValue>) -> Option<Self> {
        let reference = left.or(right)?;
        let descriptor = &reference.descriptor;
        Some(Self {
            key: &descriptor.key,
            name: &descriptor.name,
            kind: descriptor.kind,
            offset: descriptor.offset,
            length: descriptor.length,
            left,
            right,
        })
    }

    pub fn change(&self) -> Change {
        match (self.left, self.right) {
            (Some(_), None) => Change::LeftOnly,
            (None, Some(_)) => Change::RightOnly,
            _ => Change::Modified,
        }
    }

    /// Data on the left side, empty when absent
    pub fn left_data(&self) -> &'a str {
        self.left.map(|v| v.data.as_str()).unwrap_or("")
    }

    /// Data on the right side, empty when absent
    pub fn right_data(&self) -> &'a str {
        self.right.map(|v| v.data.as_str()).unwrap_or("")
    }

    /// Aligned windows for raw fields, the whole values otherwise.
    ///
    /// In brief mode unchanged windows are left out.
    pub fn body(&self, brief: bool) -> DiffBody<'a> {
        match self.kind {
            ParameterKind::Raw => {
                let mut windows = align_windows(self.offset, self.left_data(), self.right_data());
                if brief {
                    windows.retain(|w| w.changed);
                }
                DiffBody::Windows(windows)
            }
            ParameterKind::Mac | ParameterKind::Hfid => DiffBody::Whole {
                left: self.left_data(),
                right: self.right_data(),
            },
        }
    }
}

impl Serialize for DiffEntry<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("DiffEntry", 2)?;
        state.serialize_field("param1", &self.left)?;
        state.serialize_field("param2", &self.right)?;
        state.end()
    }
}

/// Split two hex strings of a field at `offset` into aligned windows.
///
/// Both sides are shifted right by `offset % 16` blank byte positions and
/// blank-filled to the same width.
pub fn align_windows(offset: u64, left: &str, right: &str) -> Vec<DiffWindow> {
    let remainder = (offset % WINDOW as u64) as usize;
    let base = offset - remainder as u64;

    let pad = |data: &str| -> Vec<char> {
        std::iter::repeat(' ')
            .take(remainder * 2)
            .chain(data.chars())
            .collect()
    };
    let mut left = pad(left);
    let mut right = pad(right);
    let width = left.len().max(right.len());
    left.resize(width, ' ');
    right.resize(width, ' ');

    left.chunks(WINDOW_CHARS)
        .zip(right.chunks(WINDOW_CHARS))
        .enumerate()
        .map(|(index, (l, r))| DiffWindow {
            offset: base + (index * WINDOW) as u64,
            changed: l != r,
            left: l.iter().collect(),
            right: r.iter().collect(),
        })
        .collect()
}

/// Compare two parameter sets by key
pub fn diff<'a>(left: &'a ParameterSet, right: &'a ParameterSet) -> Vec<DiffEntry<'a>> {
    let left_index = index_by_key(left);
    let right_index = index_by_key(right);
    let mut entries = Vec::new();

    for value in left {
        match right_index.get(value.key()) {
            Some(other) if other.data == value.data => {}
            Some(other) => entries.extend(DiffEntry::new(Some(value), Some(*other))),
            None => entries.extend(DiffEntry::new(Some(value), None)),
        }
    }

    for value in right {
        if !left_index.contains_key(value.key()) {
            entries.extend(DiffEntry::new(None, Some(value)));
        }
    }

    tracing::info!(
        "{} of {}/{} keys differ",
        entries.len(),
        left.len(),
        right.len()
    );
    entries
}

fn index_by_key(set: &ParameterSet) -> HashMap<&str, &ParameterValue> {
    let mut index = HashMap::with_capacity(set.len());
    for value in set {
        index.entry(value.key()).or_insert(value);
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ParameterDescriptor;

    fn value(key: &str, offset: u64, length: usize, kind: ParameterKind, data: &str) -> ParameterValue {
        ParameterValue {
            descriptor: ParameterDescriptor {
                name: key.to_string(),
                key: key.to_string(),
                offset,
                length,
                kind,
            },
            data: data.to_string(),
            error: None,
        }
    }

    fn raw(key: &str, data: &str) -> ParameterValue {
        value(key, 0, data.len() / 2, ParameterKind::Raw, data)
    }

    #[test]
    fn test_diff_with_itself_is_empty() {
        let set = ParameterSet::new(vec![raw("A", "00"), raw("B", "0102")]);
        assert!(diff(&set, &set).is_empty());
    }

    #[test]
    fn test_diff_order_left_then_right_only() {
        let left = ParameterSet::new(vec![raw("A", "00"), raw("B", "01")]);
        let right = ParameterSet::new(vec![raw("B", "02"), raw("C", "03")]);

        let entries = diff(&left, &right);
        let summary: Vec<_> = entries.iter().map(|e| (e.key, e.change())).collect();
        assert_eq!(
            summary,
            vec![
                ("A", Change::LeftOnly),
                ("B", Change::Modified),
                ("C", Change::RightOnly),
            ]
        );
        assert_eq!(entries[1].left_data(), "01");
        assert_eq!(entries[1].right_data(), "02");
        assert_eq!(entries[2].left_data(), "");
    }

    #[test]
    fn test_right_only_keys_follow_all_left_entries() {
        let left = ParameterSet::new(vec![raw("B", "00"), raw("D", "00")]);
        let right = ParameterSet::new(vec![raw("A", "00"), raw("B", "11"), raw("C", "00")]);

        let keys: Vec<_> = diff(&left, &right).iter().map(|e| e.key).collect();
        assert_eq!(keys, vec!["B", "D", "A", "C"]);
    }

    #[test]
    fn test_modified_entries_always_differ() {
        let left = ParameterSet::new(vec![raw("A", "00"), raw("B", "01"), raw("C", "02")]);
        let right = ParameterSet::new(vec![raw("A", "00"), raw("B", "FF"), raw("C", "02")]);

        let entries = diff(&left, &right);
        assert_eq!(entries.len(), 1);
        for entry in entries {
            if let (Some(l), Some(r)) = (entry.left, entry.right) {
                assert_ne!(l.data, r.data);
            }
        }
    }

    #[test]
    fn test_windows_align_to_absolute_offsets() {
        // 20 bytes at 0x12: first window covers 0x10..0x20
        let left = "00".repeat(20);
        let mut right = left.clone();
        right.replace_range(38..40, "FF");

        let windows = align_windows(18, &left, &right);
        assert_eq!(windows.len(), 2);

        assert_eq!(windows[0].offset, 16);
        assert!(windows[0].left.starts_with("    00"));
        assert_eq!(windows[0].left.len(), 32);
        assert!(!windows[0].changed);

        assert_eq!(windows[1].offset, 32);
        assert_eq!(windows[1].left, "000000000000");
        assert_eq!(windows[1].right, "0000000000FF");
        assert!(windows[1].changed);
    }

    #[test]
    fn test_windows_for_one_sided_field() {
        let windows = align_windows(0, "AABB", "");
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].right, "    ");
        assert!(windows[0].changed);
    }

    #[test]
    fn test_brief_body_omits_unchanged_windows() {
        let left_data = "11".repeat(48);
        let mut right_data = left_data.clone();
        right_data.replace_range(34..36, "22");
        let left = ParameterSet::new(vec![value("blk", 0x100, 48, ParameterKind::Raw, &left_data)]);
        let right = ParameterSet::new(vec![value("blk", 0x100, 48, ParameterKind::Raw, &right_data)]);

        let entries = diff(&left, &right);
        match entries[0].body(false) {
            DiffBody::Windows(windows) => assert_eq!(windows.len(), 3),
            other => panic!("unexpected body: {other:?}"),
        }
        match entries[0].body(true) {
            DiffBody::Windows(windows) => {
                assert_eq!(windows.len(), 1);
                assert_eq!(windows[0].offset, 0x110);
            }
            other => panic!("unexpected body: {other:?}"),
        }
    }

    #[test]
    fn test_text_fields_are_not_windowed() {
        let left = ParameterSet::new(vec![value("HFID_User", 0x40, 64, ParameterKind::Hfid, "old")]);
        let right = ParameterSet::new(vec![value("HFID_User", 0x40, 64, ParameterKind::Hfid, "new")]);

        let entries = diff(&left, &right);
        assert_eq!(
            entries[0].body(true),
            DiffBody::Whole {
                left: "old",
                right: "new"
            }
        );
    }

    #[test]
    fn test_diff_json_keeps_absent_side_as_null() {
        let left = ParameterSet::new(vec![raw("A", "00")]);
        let right = ParameterSet::new(vec![]);

        let json = serde_json::to_value(diff(&left, &right)).unwrap();
        assert_eq!(json[0]["param1"]["key"], "A");
        assert!(json[0]["param2"].is_null());
        assert!(json[0].as_object().unwrap().contains_key("param2"));
    }
}
