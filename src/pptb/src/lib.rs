//! # pptb
//!
//! PLC parameter toolbox library - layout parsing, value extraction, and diffing.
//!
//! This library provides functionality to:
//! - Load XML (PIB) and CSV (paramconfig) layouts into a [`ParameterSchema`]
//! - Resolve GGL archives into a paramconfig image and its layout
//! - Extract typed values from an image or through an external PIB reader
//! - Diff two extractions by key with 16-byte aligned windows
//!
//! ## Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let old = pptb::resolve(Path::new("old.ggl"), None)?;
//! let new = pptb::resolve(Path::new("new.ggl"), None)?;
//!
//! let old_set = pptb::extract(&old.schema()?, &old.blob);
//! let new_set = pptb::extract(&new.schema()?, &new.blob);
//!
//! let entries = pptb::diff(&old_set, &new_set);
//! print!("{}", pptb::render_diff(&entries, true));
//! # Ok(())
//! # }
//! ```

pub mod archive;
pub mod diff;
pub mod extract;
pub mod render;
pub mod schema;
pub mod source;

// Re-export commonly used items
#[doc(inline)]
pub use archive::{is_archive, resolve, LayoutSource, ResolveError, ResolvedImage};
#[doc(inline)]
pub use diff::{align_windows, diff, Change, DiffBody, DiffEntry, DiffWindow, WINDOW};
#[doc(inline)]
pub use extract::{extract, ParameterSet, ParameterValue};
#[doc(inline)]
pub use render::{hex_dump, render_diff, render_dump};
#[doc(inline)]
pub use schema::{
    load_csv_layout, load_xml_layout, parse_csv_layout, parse_xml_layout, FieldLayout,
    ParameterDescriptor, ParameterKind, ParameterSchema, SchemaError,
};
#[doc(inline)]
pub use source::{
    BlobSource, FieldError, FieldRead, HelperBlob, ImageBlob, PibHelper, ProcessHelper,
    DEFAULT_HELPER_TIMEOUT,
};
