//! Blob sources.
//!
//! Every parameter image is read through [`BlobSource`], whatever its origin:
//! - `ImageBlob` holds a directly addressable image (raw paramconfig file or
//!   archive member)
//! - `HelperBlob` asks an external reader for each field of a PIB image

mod helper;
mod image;

pub use helper::{HelperBlob, PibHelper, ProcessHelper, DEFAULT_HELPER_TIMEOUT};
pub use image::ImageBlob;

use crate::schema::ParameterKind;
use std::process::ExitStatus;
use std::time::Duration;
use thiserror::Error;

/// Why a single field could not be read.
///
/// Field errors are recorded next to the value and never stop extraction of
/// the remaining fields.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    #[error("failed to start helper {program}: {reason}")]
    HelperSpawn { program: String, reason: String },

    #[error("helper exited with {status}: {stderr}")]
    HelperInvocation { status: ExitStatus, stderr: String },

    #[error("helper did not finish within {timeout:?}")]
    HelperTimeout { timeout: Duration },

    #[error("short read at {offset:#06X}: wanted {length} bytes, image has {available}")]
    ShortRead {
        offset: u64,
        length: usize,
        available: usize,
    },

    #[error("IO error: {0}")]
    Io(String),
}

impl From<std::io::Error> for FieldError {
    fn from(err: std::io::Error) -> Self {
        FieldError::Io(err.to_string())
    }
}

/// Bytes returned for one field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldRead {
    /// Bytes copied straight from the image window. Fewer bytes than
    /// requested means the image ended early.
    Window(Vec<u8>),
    /// Output of an external reader, already rendered for display
    Rendered(Vec<u8>),
}

/// Capability to read one field of a parameter image
pub trait BlobSource {
    /// Read `length` bytes at `offset` for a field of the given kind
    fn read_at(&self, offset: u64, length: usize, kind: ParameterKind)
        -> Result<FieldRead, FieldError>;

    /// Human-readable origin, used in log messages
    fn origin(&self) -> &str;
}
