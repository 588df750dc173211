//! Text rendering for dumps and diffs.
//!
//! JSON output goes through serde directly; this module only covers the
//! human-readable forms.

use crate::diff::{DiffBody, DiffEntry, DiffWindow};
use crate::extract::ParameterSet;

/// Characters of data per dump line
pub const DUMP_LINE_CHARS: usize = 64;

/// Bytes per hex dump line
pub const HEX_DUMP_BYTES: usize = 16;

const SEPARATOR_WIDTH: usize = 80;

/// Name-aligned dump: the name column is as wide as the longest name and the
/// data wraps at 64 characters, with the name on the first line only.
pub fn render_dump(set: &ParameterSet) -> String {
    let width = set.iter().map(|v| v.name().chars().count()).max().unwrap_or(0);
    let mut out = String::new();

    for value in set {
        let chars: Vec<char> = value.data.chars().collect();
        for (index, chunk) in chars.chunks(DUMP_LINE_CHARS).enumerate() {
            let name = if index == 0 { value.name() } else { "" };
            let chunk: String = chunk.iter().collect();
            out.push_str(&format!("{:<width$} {}\n", name, chunk, width = width));
        }
    }

    out
}

/// Space-separate the byte pairs of a hex window
fn spaced_pairs(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(2)
        .map(|pair| pair.iter().collect::<String>())
        .collect::<Vec<_>>()
        .join(" ")
}

fn render_window(window: &DiffWindow, out: &mut String) {
    let (minus, plus) = if window.changed { ('-', '+') } else { (' ', ' ') };
    out.push_str(&format!(
        "{} {:08X}: {}\n",
        minus,
        window.offset,
        spaced_pairs(&window.left)
    ));
    out.push_str(&format!(
        "{} {:8}  {}\n",
        plus,
        "",
        spaced_pairs(&window.right)
    ));
}

/// Render one diff entry: a separator, a `OFFSET LENGTH NAME` header, and the
/// aligned windows or whole before/after values
pub fn render_diff_entry(entry: &DiffEntry<'_>, brief: bool) -> String {
    let mut out = String::new();
    out.push_str(&"=".repeat(SEPARATOR_WIDTH));
    out.push('\n');
    out.push_str(&format!(
        "{:04X} {:4} {}\n",
        entry.offset, entry.length, entry.name
    ));

    match entry.body(brief) {
        DiffBody::Windows(windows) => {
            for window in &windows {
                render_window(window, &mut out);
            }
        }
        DiffBody::Whole { left, right } => {
            out.push_str(&format!("- {}\n", left));
            out.push_str(&format!("+ {}\n", right));
        }
    }

    out
}

/// Render a whole diff
pub fn render_diff(entries: &[DiffEntry<'_>], brief: bool) -> String {
    entries
        .iter()
        .map(|entry| render_diff_entry(entry, brief))
        .collect()
}

/// Classic hex dump, 16 bytes per line, addresses starting at `base`
pub fn hex_dump(bytes: &[u8], base: u64) -> String {
    let mut out = String::new();

    for (index, line) in bytes.chunks(HEX_DUMP_BYTES).enumerate() {
        let hex = line
            .iter()
            .map(|b| format!("{:02X}", b))
            .collect::<Vec<_>>()
            .join(" ");
        let ascii: String = line
            .iter()
            .map(|&b| if b.is_ascii_graphic() { b as char } else { '.' })
            .collect();
        let address = base + (index * HEX_DUMP_BYTES) as u64;
        out.push_str(&format!("{:08x}: {:48} | {}\n", address, hex, ascii));
    }

    out
}
