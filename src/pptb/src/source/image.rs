//! Directly addressable images

use super::{BlobSource, FieldError, FieldRead};
use crate::schema::ParameterKind;
use std::fs;
use std::path::Path;

/// An in-memory parameter image
#[derive(Debug, Clone)]
pub struct ImageBlob {
    bytes: Vec<u8>,
    origin: String,
}

impl ImageBlob {
    /// Wrap bytes read from somewhere else (e.g. an archive member)
    pub fn from_bytes(origin: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            origin: origin.into(),
        }
    }

    /// Read a whole image file
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        Ok(Self::from_bytes(path.display().to_string(), bytes))
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl BlobSource for ImageBlob {
    fn read_at(
        &self,
        offset: u64,
        length: usize,
        _kind: ParameterKind,
    ) -> Result<FieldRead, FieldError> {
        let size = self.bytes.len();
        let start = usize::try_from(offset).unwrap_or(usize::MAX).min(size);
        let end = start.saturating_add(length).min(size);
        Ok(FieldRead::Window(self.bytes[start..end].to_vec()))
    }

    fn origin(&self) -> &str {
        &self.origin
    }
}
