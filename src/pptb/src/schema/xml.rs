//! XML object layouts for PIB images.
//!
//! ```xml
//! <layout>
//!   <object name="MACAddress">
//!     <offset>000C</offset>
//!     <length>6</length>
//!   </object>
//! </layout>
//! ```
//!
//! Offsets are hexadecimal, lengths decimal. Objects are reported in document
//! order of their start tags, including nested ones.

use super::{parse_number, FieldLayout, ParameterKind, ParameterSchema, SchemaError};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::fs;
use std::path::Path;

/// Object names read back as human-friendly identifiers
pub const HFID_NAMES: &[&str] = &["HFID_Manufacturer", "HFID_User", "HFID_AVLN"];

/// Object names read back as MAC addresses
pub const MAC_NAMES: &[&str] = &["MACAddress", "SnifferReturnMACAddress", "CCo_MACAdd"];

/// Kind of an XML object, by name
pub fn kind_for_name(name: &str) -> ParameterKind {
    if HFID_NAMES.contains(&name) {
        ParameterKind::Hfid
    } else if MAC_NAMES.contains(&name) {
        ParameterKind::Mac
    } else {
        ParameterKind::Raw
    }
}

/// Load an XML layout from a file
pub fn load_xml_layout(path: impl AsRef<Path>) -> Result<ParameterSchema, SchemaError> {
    let text = fs::read_to_string(path.as_ref())?;
    parse_xml_layout(&text)
}

/// Parse an XML layout
pub fn parse_xml_layout(text: &str) -> Result<ParameterSchema, SchemaError> {
    let mut reader = Reader::from_str(text);
    reader.trim_text(true);

    let mut lines = LineCounter::new(text);
    let mut slots: Vec<Option<FieldLayout>> = Vec::new();
    let mut open: Vec<ObjectBuilder> = Vec::new();
    let mut capture: Option<Capture> = None;
    let mut depth = 0usize;

    loop {
        let position = reader.buffer_position();
        let event = match reader.read_event() {
            Ok(event) => event,
            Err(source) => {
                return Err(SchemaError::Xml {
                    line: lines.line_at(position),
                    source,
                })
            }
        };

        match event {
            Event::Start(e) => {
                depth += 1;
                match e.name().as_ref() {
                    b"object" => {
                        let line = lines.line_at(position);
                        let name = object_name(&e, line)?;
                        slots.push(None);
                        open.push(ObjectBuilder::new(slots.len() - 1, name, line, depth));
                    }
                    b"offset" if is_direct_child(&open, depth) => {
                        capture = Some(Capture::new(Child::Offset, depth))
                    }
                    b"length" if is_direct_child(&open, depth) => {
                        capture = Some(Capture::new(Child::Length, depth))
                    }
                    _ => {}
                }
            }
            Event::Empty(e) => match e.name().as_ref() {
                b"object" => {
                    let line = lines.line_at(position);
                    let object = object_name(&e, line)?;
                    return Err(SchemaError::MissingElement {
                        line,
                        object,
                        element: "offset".to_string(),
                    });
                }
                b"offset" | b"length" => {
                    if let Some(object) = direct_parent(&mut open, depth + 1) {
                        let child = if e.name().as_ref() == b"offset" {
                            Child::Offset
                        } else {
                            Child::Length
                        };
                        object.assign(Capture::new(child, depth + 1), lines.line_at(position))?;
                    }
                }
                _ => {}
            },
            Event::Text(t) => {
                if let Some(capture) = capture.as_mut() {
                    let text = t.unescape().map_err(|source| SchemaError::Xml {
                        line: lines.line_at(position),
                        source,
                    })?;
                    capture.text.push_str(&text);
                }
            }
            Event::End(e) => {
                match e.name().as_ref() {
                    b"offset" | b"length" => {
                        if capture.as_ref().is_some_and(|c| c.depth == depth) {
                            if let (Some(done), Some(object)) = (capture.take(), open.last_mut()) {
                                object.assign(done, lines.line_at(position))?;
                            }
                        }
                    }
                    b"object" => {
                        if let Some(object) = open.pop() {
                            let slot = object.slot;
                            slots[slot] = Some(object.finish()?);
                        }
                    }
                    _ => {}
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(object) = open.pop() {
        return Err(SchemaError::MissingElement {
            line: object.line,
            object: object.name,
            element: "/object".to_string(),
        });
    }

    ParameterSchema::from_fields(slots.into_iter().flatten().collect())
}

/// Whether an element at `child_depth` sits directly inside the innermost open object
fn is_direct_child(open: &[ObjectBuilder], child_depth: usize) -> bool {
    open.last().is_some_and(|object| object.depth + 1 == child_depth)
}

fn direct_parent(open: &mut [ObjectBuilder], child_depth: usize) -> Option<&mut ObjectBuilder> {
    open.last_mut().filter(|object| object.depth + 1 == child_depth)
}

fn object_name(e: &BytesStart<'_>, line: usize) -> Result<String, SchemaError> {
    let attr = e
        .try_get_attribute("name")
        .map_err(|source| SchemaError::Xml { line, source })?
        .ok_or_else(|| SchemaError::MissingAttribute {
            line,
            element: "object".to_string(),
            attribute: "name".to_string(),
        })?;
    let value = attr
        .unescape_value()
        .map_err(|source| SchemaError::Xml { line, source })?;
    Ok(value.into_owned())
}

#[derive(Debug, Clone, Copy)]
enum Child {
    Offset,
    Length,
}

struct Capture {
    child: Child,
    depth: usize,
    text: String,
}

impl Capture {
    fn new(child: Child, depth: usize) -> Self {
        Self {
            child,
            depth,
            text: String::new(),
        }
    }
}

struct ObjectBuilder {
    slot: usize,
    name: String,
    line: usize,
    /// Element depth of the `<object>` itself
    depth: usize,
    offset: Option<u64>,
    length: Option<usize>,
}

impl ObjectBuilder {
    fn new(slot: usize, name: String, line: usize, depth: usize) -> Self {
        Self {
            slot,
            name,
            line,
            depth,
            offset: None,
            length: None,
        }
    }

    /// Record a child value; the first `<offset>` and `<length>` win
    fn assign(&mut self, capture: Capture, line: usize) -> Result<(), SchemaError> {
        match capture.child {
            Child::Offset if self.offset.is_none() => {
                self.offset = Some(parse_number(&capture.text, 16, "offset", line)?)
            }
            Child::Length if self.length.is_none() => {
                let length = parse_number(&capture.text, 10, "length", line)?;
                let length = usize::try_from(length).map_err(|_| SchemaError::InvalidNumber {
                    line,
                    field: "length",
                    value: capture.text.trim().to_string(),
                })?;
                self.length = Some(length)
            }
            _ => tracing::debug!(
                "Ignoring repeated child of object '{}' on line {}",
                self.name,
                line
            ),
        }
        Ok(())
    }

    fn finish(self) -> Result<FieldLayout, SchemaError> {
        let missing = |element: &str| SchemaError::MissingElement {
            line: self.line,
            object: self.name.clone(),
            element: element.to_string(),
        };
        let offset = self.offset.ok_or_else(|| missing("offset"))?;
        let length = self.length.ok_or_else(|| missing("length"))?;
        let kind = kind_for_name(&self.name);
        Ok(FieldLayout::new(self.name, offset, length, kind))
    }
}

/// Maps byte positions to 1-based line numbers, scanning forward only
struct LineCounter<'a> {
    text: &'a [u8],
    scanned: usize,
    line: usize,
}

impl<'a> LineCounter<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text: text.as_bytes(),
            scanned: 0,
            line: 1,
        }
    }

    fn line_at(&mut self, position: usize) -> usize {
        let end = position.min(self.text.len());
        if end > self.scanned {
            self.line += self.text[self.scanned..end]
                .iter()
                .filter(|&&b| b == b'\n')
                .count();
            self.scanned = end;
        }
        // Leading whitespace is skipped before the event starts
        let rest = &self.text[end..];
        let skipped = rest
            .iter()
            .take_while(|b| b.is_ascii_whitespace())
            .filter(|&&b| b == b'\n')
            .count();
        self.line + skipped
    }
}
