//! Dump command handlers

use super::report_failures;
use anyhow::{bail, Context, Result};
use pptb::{
    extract, load_xml_layout, resolve, HelperBlob, ParameterSet, PibHelper, ResolvedImage,
};
use std::fs;
use std::path::Path;

/// Aligned listing, or pretty JSON with `all`
pub fn format_set(set: &ParameterSet, all: bool) -> Result<String> {
    if all {
        let json = serde_json::to_string_pretty(set).context("Failed to serialize parameters")?;
        Ok(json + "\n")
    } else {
        Ok(pptb::render_dump(set))
    }
}

/// Hex dump of `length` bytes at `offset` (to end of file when unset)
pub fn raw(file: &Path, offset: u64, length: Option<u64>) -> Result<String> {
    let bytes = fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let size = bytes.len() as u64;

    if offset > size {
        bail!(
            "Offset {:#X} is past the end of {} ({} bytes)",
            offset,
            file.display(),
            size
        );
    }
    let end = match length {
        Some(length) => offset.saturating_add(length).min(size),
        None => size,
    };

    // Both bounds are within the file, which is already in memory
    let window = &bytes[offset as usize..end as usize];
    Ok(pptb::hex_dump(window, offset))
}

/// Read a PIB image field by field through `helper`
pub fn read_pib<H: PibHelper>(file: &Path, helper: H, layout: &Path) -> Result<ParameterSet> {
    let schema = load_xml_layout(layout)
        .with_context(|| format!("Failed to load layout {}", layout.display()))?;
    let set = extract(&schema, &HelperBlob::new(file, helper));
    report_failures(&file.display().to_string(), &set);
    Ok(set)
}

/// Resolve a GGL archive or raw image and extract its parameters
pub fn read_ggl(file: &Path, layout: Option<&Path>) -> Result<ParameterSet> {
    let resolved = resolve(file, layout)?;
    extract_resolved(file, &resolved)
}

/// Load the layout of an already resolved image and extract its parameters
pub fn extract_resolved(file: &Path, resolved: &ResolvedImage) -> Result<ParameterSet> {
    tracing::info!("Layout for {}: {}", file.display(), resolved.layout.describe());

    let schema = resolved
        .schema()
        .with_context(|| format!("Failed to load {}", resolved.layout.describe()))?;
    let set = extract(&schema, &resolved.blob);
    report_failures(&file.display().to_string(), &set);
    Ok(set)
}

pub fn pib<H: PibHelper>(file: &Path, helper: H, layout: &Path, all: bool) -> Result<String> {
    format_set(&read_pib(file, helper, layout)?, all)
}

pub fn ggl(file: &Path, layout: Option<&Path>, all: bool) -> Result<String> {
    format_set(&read_ggl(file, layout)?, all)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pptb::{FieldError, ParameterKind, ResolveError};

    const XML: &str = r#"<root>
  <object name="MACAddress"><offset>0C</offset><length>6</length></object>
  <object name="Block"><offset>0x20</offset><length>2</length></object>
</root>"#;

    const CSV: &str = "Descriptor;Type;Index;Bits;Count;Flashoffset\nword;u16;0;16;1;0\nlabel;u8;1;8;2;2\n";

    #[test]
    fn test_raw_dump_window() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blob.bin");
        fs::write(&path, (0u8..40).collect::<Vec<_>>()).unwrap();

        let text = raw(&path, 0x10, Some(0x11)).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("00000010: 10 11 12"));
        assert!(lines[1].starts_with("00000020: 20 "));

        assert_eq!(raw(&path, 0, None).unwrap().lines().count(), 3);
        assert_eq!(raw(&path, 40, None).unwrap(), "");
        assert!(raw(&path, 41, None).is_err());
    }

    #[test]
    fn test_dump_pib_with_fake_reader() {
        let dir = tempfile::tempdir().unwrap();
        let layout = dir.path().join("layout.xml");
        fs::write(&layout, XML).unwrap();

        let reader = |_: &Path, offset: u64, kind: ParameterKind, _: usize| {
            Ok::<_, FieldError>(match kind {
                ParameterKind::Mac => b"00:B0:52:00:00:01".to_vec(),
                _ => format!("{:04X}", offset).into_bytes(),
            })
        };
        let text = pib(Path::new("device.pib"), reader, &layout, false).unwrap();
        assert_eq!(text, "MACAddress 00:B0:52:00:00:01\nBlock      0020\n");

        let json: serde_json::Value =
            serde_json::from_str(&pib(Path::new("device.pib"), reader, &layout, true).unwrap())
                .unwrap();
        assert_eq!(json[0]["type"], "MAC");
        assert_eq!(json[1]["offset"], 32);
    }

    #[test]
    fn test_dump_pib_bad_layout_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let layout = dir.path().join("layout.xml");
        fs::write(&layout, "<root><object><offset>0</offset></object></root>").unwrap();

        let reader = |_: &Path, _: u64, _: ParameterKind, _: usize| Ok::<_, FieldError>(Vec::new());
        let err = pib(Path::new("device.pib"), reader, &layout, false).unwrap_err();
        assert!(err.to_string().contains("Failed to load layout"));
    }

    #[test]
    fn test_dump_raw_image_with_layout() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("paramconfig.bin");
        let layout = dir.path().join("layout.csv");
        let mut bytes = vec![0u8; 32];
        bytes.extend_from_slice(&[0xbe, 0xef, 0x41, 0x42]);
        fs::write(&image, bytes).unwrap();
        fs::write(&layout, CSV).unwrap();

        let text = ggl(&image, Some(&layout), false).unwrap();
        assert_eq!(text, "word  BEEF\nlabel 4142\n");
    }

    #[test]
    fn test_dump_raw_image_without_layout() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("paramconfig.bin");
        fs::write(&image, [0u8; 8]).unwrap();

        let err = ggl(&image, None, false).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ResolveError>(),
            Some(ResolveError::MissingLayout { .. })
        ));
    }

    #[test]
    fn test_dump_short_image_still_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("paramconfig.bin");
        let layout = dir.path().join("layout.csv");
        fs::write(&image, [0u8; 33]).unwrap();
        fs::write(&layout, CSV).unwrap();

        let set = read_ggl(&image, Some(&layout)).unwrap();
        assert_eq!(set.values()[0].data, "00");
        assert_eq!(set.failures().count(), 2);
    }
}
