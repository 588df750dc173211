//! Value extraction.
//!
//! Walks a schema in declaration order and reads every field from a
//! [`BlobSource`]. Bytes read directly from an image are decoded by kind:
//! raw and MAC fields become upper-case hex, HFID fields become text with all
//! NUL bytes removed. Helper output is kept as-is.
//!
//! Fields are independent. A failed or truncated read is recorded on that
//! field and extraction carries on with the next one.

use crate::schema::{ParameterDescriptor, ParameterKind, ParameterSchema};
use crate::source::{BlobSource, FieldError, FieldRead};
use serde::ser::{SerializeStruct, Serializer};
use serde::Serialize;

/// One extracted field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterValue {
    pub descriptor: ParameterDescriptor,
    /// Hex for raw fields read from an image, text otherwise
    pub data: String,
    /// Set when the field could not be read in full
    pub error: Option<FieldError>,
}

impl ParameterValue {
    pub fn key(&self) -> &str {
        &self.descriptor.key
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

impl Serialize for ParameterValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let fields = if self.error.is_some() { 7 } else { 6 };
        let mut state = serializer.serialize_struct("ParameterValue", fields)?;
        state.serialize_field("name", &self.descriptor.name)?;
        state.serialize_field("key", &self.descriptor.key)?;
        state.serialize_field("offset", &self.descriptor.offset)?;
        state.serialize_field("length", &self.descriptor.length)?;
        state.serialize_field("data", &self.data)?;
        state.serialize_field("type", &self.descriptor.kind)?;
        if let Some(error) = &self.error {
            state.serialize_field("error", &error.to_string())?;
        }
        state.end()
    }
}

/// Extracted values in schema order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ParameterSet {
    values: Vec<ParameterValue>,
}

impl ParameterSet {
    pub fn new(values: Vec<ParameterValue>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[ParameterValue] {
        &self.values
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ParameterValue> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Values whose read failed or came back short
    pub fn failures(&self) -> impl Iterator<Item = &ParameterValue> {
        self.values.iter().filter(|v| !v.is_ok())
    }
}

impl<'a> IntoIterator for &'a ParameterSet {
    type Item = &'a ParameterValue;
    type IntoIter = std::slice::Iter<'a, ParameterValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

/// Read every field of `schema` from `source`
pub fn extract(schema: &ParameterSchema, source: &dyn BlobSource) -> ParameterSet {
    tracing::info!(
        "Extracting {} fields from {}",
        schema.len(),
        source.origin()
    );

    let values = schema
        .iter()
        .map(|descriptor| extract_field(descriptor, source))
        .collect();

    ParameterSet { values }
}

fn extract_field(descriptor: &ParameterDescriptor, source: &dyn BlobSource) -> ParameterValue {
    let (data, error) = match source.read_at(descriptor.offset, descriptor.length, descriptor.kind)
    {
        Ok(FieldRead::Window(bytes)) => {
            let error = (bytes.len() < descriptor.length).then(|| FieldError::ShortRead {
                offset: descriptor.offset,
                length: descriptor.length,
                available: bytes.len(),
            });
            (decode_window(descriptor.kind, &bytes), error)
        }
        Ok(FieldRead::Rendered(bytes)) => (String::from_utf8_lossy(&bytes).into_owned(), None),
        Err(err) => (String::new(), Some(err)),
    };

    match &error {
        Some(err) => tracing::warn!("{} ({:#06X}): {}", descriptor.key, descriptor.offset, err),
        None => tracing::debug!(
            "{} ({:#06X}, {} bytes) = {}",
            descriptor.key,
            descriptor.offset,
            descriptor.length,
            data
        ),
    }

    ParameterValue {
        descriptor: descriptor.clone(),
        data,
        error,
    }
}

/// Decode bytes copied from an image window
pub fn decode_window(kind: ParameterKind, bytes: &[u8]) -> String {
    match kind {
        ParameterKind::Hfid => {
            let text: Vec<u8> = bytes.iter().copied().filter(|&b| b != 0).collect();
            String::from_utf8_lossy(&text).into_owned()
        }
        ParameterKind::Raw | ParameterKind::Mac => hex::encode_upper(bytes),
    }
}
