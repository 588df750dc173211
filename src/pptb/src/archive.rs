//! GGL archive resolution.
//!
//! A GGL file is a tar archive (optionally gzip-compressed) carrying exactly
//! one `paramconfig*` image and one `*.csv` layout. Anything that is not an
//! archive is treated as a raw paramconfig image, which then needs an
//! explicit layout file.
//!
//! Archives are only ever read.

use crate::schema::{load_csv_layout, parse_csv_layout, ParameterSchema, SchemaError};
use crate::source::ImageBlob;
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use thiserror::Error;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const PARAMCONFIG_PREFIX: &str = "paramconfig";
const LAYOUT_SUFFIX: &str = ".csv";

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error(
        "{} is not a GGL archive. A raw paramconfig image needs its layout file (.csv); \
         pass a GGL archive or specify the layout for this image",
        path.display()
    )]
    MissingLayout { path: PathBuf },

    #[error("{}: {detail}", path.display())]
    ArchiveContents { path: PathBuf, detail: String },

    #[error("IO error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ResolveError {
    fn io(path: &Path) -> impl FnOnce(io::Error) -> Self + '_ {
        move |source| ResolveError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Where the layout for a resolved image comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutSource {
    /// A `*.csv` member of the archive
    ArchiveMember { name: String, text: String },
    /// A layout file given alongside a raw image
    File(PathBuf),
}

impl LayoutSource {
    /// Parse the CSV layout
    pub fn load(&self) -> Result<ParameterSchema, SchemaError> {
        match self {
            LayoutSource::ArchiveMember { text, .. } => parse_csv_layout(text),
            LayoutSource::File(path) => load_csv_layout(path),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            LayoutSource::ArchiveMember { name, .. } => format!("archive member {}", name),
            LayoutSource::File(path) => path.display().to_string(),
        }
    }
}

/// A paramconfig image paired with its layout
#[derive(Debug, Clone)]
pub struct ResolvedImage {
    pub blob: ImageBlob,
    pub layout: LayoutSource,
}

impl ResolvedImage {
    /// Parse the layout into a schema
    pub fn schema(&self) -> Result<ParameterSchema, SchemaError> {
        self.layout.load()
    }
}

fn open_reader(path: &Path) -> io::Result<Box<dyn Read>> {
    let mut file = File::open(path)?;
    let gzip = has_gzip_magic(&mut file)?;
    file.seek(SeekFrom::Start(0))?;

    if gzip {
        Ok(Box::new(GzDecoder::new(BufReader::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

fn has_gzip_magic(reader: &mut impl Read) -> io::Result<bool> {
    let mut magic = [0u8; 2];
    match reader.read_exact(&mut magic) {
        Ok(()) => Ok(magic == GZIP_MAGIC),
        Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
        Err(err) => Err(err),
    }
}

/// Whether `path` is a (possibly gzip-compressed) tar archive.
///
/// Only the first header is checked; empty and non-tar files are not archives.
pub fn is_archive(path: &Path) -> io::Result<bool> {
    let mut archive = tar::Archive::new(open_reader(path)?);
    let is_tar = match archive.entries() {
        Ok(mut entries) => matches!(entries.next(), Some(Ok(_))),
        Err(_) => false,
    };
    Ok(is_tar)
}

struct Member {
    name: String,
    bytes: Vec<u8>,
}

fn pick_one(
    path: &Path,
    mut candidates: Vec<Member>,
    what: &str,
) -> Result<Member, ResolveError> {
    match candidates.len() {
        0 => Err(ResolveError::ArchiveContents {
            path: path.to_path_buf(),
            detail: format!("archive has no {} member", what),
        }),
        1 => Ok(candidates.remove(0)),
        _ => {
            let names: Vec<_> = candidates.iter().map(|m| m.name.as_str()).collect();
            Err(ResolveError::ArchiveContents {
                path: path.to_path_buf(),
                detail: format!(
                    "archive has more than one {} member: {}",
                    what,
                    names.join(", ")
                ),
            })
        }
    }
}

/// Pull the paramconfig image and its CSV layout out of a GGL archive
pub fn read_archive(path: &Path) -> Result<ResolvedImage, ResolveError> {
    let mut archive = tar::Archive::new(open_reader(path).map_err(ResolveError::io(path))?);
    let mut images = Vec::new();
    let mut layouts = Vec::new();

    for entry in archive.entries().map_err(ResolveError::io(path))? {
        let mut entry = entry.map_err(ResolveError::io(path))?;
        if entry.header().entry_type().is_dir() {
            continue;
        }
        let name = entry
            .path()
            .map_err(ResolveError::io(path))?
            .to_string_lossy()
            .into_owned();

        let wanted = if name.starts_with(PARAMCONFIG_PREFIX) {
            &mut images
        } else if name.ends_with(LAYOUT_SUFFIX) {
            &mut layouts
        } else {
            tracing::debug!("Skipping archive member {}", name);
            continue;
        };

        let mut bytes = Vec::new();
        entry
            .read_to_end(&mut bytes)
            .map_err(ResolveError::io(path))?;
        tracing::debug!("Archive member {} ({} bytes)", name, bytes.len());
        wanted.push(Member { name, bytes });
    }

    let image = pick_one(path, images, "paramconfig*")?;
    let layout = pick_one(path, layouts, "*.csv")?;
    let text = String::from_utf8(layout.bytes).map_err(|_| ResolveError::ArchiveContents {
        path: path.to_path_buf(),
        detail: format!("layout member {} is not valid UTF-8", layout.name),
    })?;

    let origin = format!("{}:{}", path.display(), image.name);
    Ok(ResolvedImage {
        blob: ImageBlob::from_bytes(origin, image.bytes),
        layout: LayoutSource::ArchiveMember {
            name: layout.name,
            text,
        },
    })
}

/// Resolve a GGL archive or a raw paramconfig image plus layout.
///
/// An archive always supplies its own layout; `explicit_layout` is only used
/// for raw images, and is required for them.
pub fn resolve(path: &Path, explicit_layout: Option<&Path>) -> Result<ResolvedImage, ResolveError> {
    if is_archive(path).map_err(ResolveError::io(path))? {
        tracing::info!("{} is a GGL archive", path.display());
        if let Some(layout) = explicit_layout {
            tracing::debug!(
                "Ignoring layout {}: archive provides its own",
                layout.display()
            );
        }
        return read_archive(path);
    }

    let layout = explicit_layout.ok_or_else(|| ResolveError::MissingLayout {
        path: path.to_path_buf(),
    })?;
    let blob = ImageBlob::open(path).map_err(ResolveError::io(path))?;

    Ok(ResolvedImage {
        blob,
        layout: LayoutSource::File(layout.to_path_buf()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::fs;

    const CSV: &str = "Descriptor;T;I;B;C;Flashoffset\nword;u;0;16;1;0\n";

    fn append(builder: &mut tar::Builder<impl io::Write>, name: &str, data: &[u8]) {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, name, data).unwrap();
    }

    fn write_ggl(path: &Path, members: &[(&str, &[u8])]) {
        let file = File::create(path).unwrap();
        let mut builder = tar::Builder::new(file);
        for (name, data) in members {
            append(&mut builder, name, data);
        }
        builder.finish().unwrap();
    }

    fn image() -> Vec<u8> {
        let mut bytes = vec![0u8; 32];
        bytes.extend_from_slice(&[0x12, 0x34]);
        bytes
    }

    #[test]
    fn test_resolve_archive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fw.ggl");
        let image = image();
        write_ggl(
            &path,
            &[
                ("README", &b"notes"[..]),
                ("paramconfig.bin", image.as_slice()),
                ("layout.csv", CSV.as_bytes()),
            ],
        );

        assert!(is_archive(&path).unwrap());
        let resolved = resolve(&path, None).unwrap();
        assert_eq!(resolved.blob.as_bytes(), image.as_slice());
        assert!(matches!(
            &resolved.layout,
            LayoutSource::ArchiveMember { name, .. } if name == "layout.csv"
        ));

        let schema = resolved.schema().unwrap();
        assert_eq!(schema.descriptors()[0].offset, 32);
        assert_eq!(schema.descriptors()[0].length, 2);
    }

    #[test]
    fn test_resolve_gzip_archive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fw.ggl");
        let encoder = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
        let mut builder = tar::Builder::new(encoder);
        append(&mut builder, "paramconfig.bin", &image());
        append(&mut builder, "layout.csv", CSV.as_bytes());
        builder.into_inner().unwrap().finish().unwrap();

        assert!(is_archive(&path).unwrap());
        assert_eq!(resolve(&path, None).unwrap().blob.len(), 34);
    }

    #[test]
    fn test_archive_without_layout_member() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fw.ggl");
        let image = image();
        write_ggl(&path, &[("paramconfig.bin", image.as_slice())]);

        let err = resolve(&path, None).unwrap_err();
        assert!(matches!(err, ResolveError::ArchiveContents { .. }));
        assert!(err.to_string().contains("*.csv"));
    }

    #[test]
    fn test_archive_with_two_images_is_ambiguous() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fw.ggl");
        write_ggl(
            &path,
            &[
                ("paramconfig.bin", &b"a"[..]),
                ("paramconfig_b.bin", &b"b"[..]),
                ("layout.csv", CSV.as_bytes()),
            ],
        );

        let err = resolve(&path, None).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("paramconfig.bin, paramconfig_b.bin"), "{message}");
    }

    #[test]
    fn test_raw_image_needs_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("paramconfig.bin");
        fs::write(&path, image()).unwrap();

        assert!(!is_archive(&path).unwrap());
        let err = resolve(&path, None).unwrap_err();
        assert!(matches!(err, ResolveError::MissingLayout { .. }));
        assert!(err.to_string().contains("layout file (.csv)"));
    }

    #[test]
    fn test_raw_image_with_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("paramconfig.bin");
        let layout = dir.path().join("layout.csv");
        fs::write(&path, image()).unwrap();
        fs::write(&layout, CSV).unwrap();

        let resolved = resolve(&path, Some(&layout)).unwrap();
        assert_eq!(resolved.layout, LayoutSource::File(layout.clone()));
        assert_eq!(resolved.schema().unwrap().len(), 1);
    }

    /// Hands out one byte per read call
    struct Trickle<'a>(&'a [u8]);

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match (self.0.split_first(), buf.first_mut()) {
                (Some((&byte, rest)), Some(slot)) => {
                    *slot = byte;
                    self.0 = rest;
                    Ok(1)
                }
                _ => Ok(0),
            }
        }
    }

    #[test]
    fn test_gzip_magic_survives_short_reads() {
        assert!(has_gzip_magic(&mut Trickle(&[0x1f, 0x8b, 0x08])).unwrap());
        assert!(!has_gzip_magic(&mut Trickle(&[0x1f, 0x00])).unwrap());
        assert!(!has_gzip_magic(&mut Trickle(&[0x1f])).unwrap());
        assert!(!has_gzip_magic(&mut Trickle(&[])).unwrap());
    }

    #[test]
    fn test_empty_file_is_not_an_archive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.bin");
        fs::write(&path, b"").unwrap();
        assert!(!is_archive(&path).unwrap());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = resolve(Path::new("/nonexistent/fw.ggl"), None).unwrap_err();
        assert!(matches!(err, ResolveError::Io { .. }));
    }
}
