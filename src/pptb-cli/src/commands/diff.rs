//! Diff command handlers

use super::dump::{extract_resolved, read_pib};
use crate::file_io::write_json;
use anyhow::Result;
use pptb::{diff, render_diff, resolve, ParameterSet, PibHelper};
use std::path::Path;

/// Render the differences and optionally write the JSON report
fn compare(
    left: &ParameterSet,
    right: &ParameterSet,
    output: Option<&Path>,
    brief: bool,
) -> Result<String> {
    let entries = diff(left, right);
    if let Some(path) = output {
        write_json(path, &entries)?;
    }
    if entries.is_empty() {
        eprintln!("No differences");
    }
    Ok(render_diff(&entries, brief))
}

/// Compare two PIB images read with the same helper and layout
pub fn pib<H: PibHelper + Clone>(
    file: &Path,
    other: &Path,
    helper: H,
    layout: &Path,
    output: Option<&Path>,
    brief: bool,
) -> Result<String> {
    let left = read_pib(file, helper.clone(), layout)?;
    let right = read_pib(other, helper, layout)?;
    compare(&left, &right, output, brief)
}

/// Compare two GGL archives or raw images, each resolved on its own
pub fn ggl(
    file: &Path,
    other: &Path,
    layout: Option<&Path>,
    other_layout: Option<&Path>,
    output: Option<&Path>,
    brief: bool,
) -> Result<String> {
    // Both sides must resolve before either image is read
    let left_image = resolve(file, layout)?;
    let right_image = resolve(other, other_layout)?;

    let left = extract_resolved(file, &left_image)?;
    let right = extract_resolved(other, &right_image)?;
    compare(&left, &right, output, brief)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pptb::{FieldError, ParameterKind, ResolveError};
    use std::fs;

    const CSV: &str = "Descriptor;Type;Index;Bits;Count;Flashoffset\nword;u16;0;16;1;0\nblock;u8;1;8;20;2\n";

    fn write_image(path: &Path, tail: u8) {
        let mut bytes = vec![0u8; 32];
        bytes.extend_from_slice(&[0x12, 0x34]);
        bytes.extend_from_slice(&[0u8; 19]);
        bytes.push(tail);
        fs::write(path, bytes).unwrap();
    }

    #[test]
    fn test_diff_raw_images() {
        let dir = tempfile::tempdir().unwrap();
        let old = dir.path().join("old.bin");
        let new = dir.path().join("new.bin");
        let layout = dir.path().join("layout.csv");
        let report = dir.path().join("diff.json");
        write_image(&old, 0x00);
        write_image(&new, 0xff);
        fs::write(&layout, CSV).unwrap();

        let text = ggl(&old, &new, Some(&layout), Some(&layout), Some(&report), true).unwrap();
        let lines: Vec<_> = text.lines().collect();
        // block spans 0x22..0x36; only the window at 0x30 changed
        assert_eq!(lines[1], "0022   20 block");
        assert_eq!(lines.len(), 4);
        assert!(lines[2].starts_with("- 00000030:"));
        assert!(lines[3].ends_with("FF"));

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&report).unwrap()).unwrap();
        assert_eq!(json.as_array().unwrap().len(), 1);
        assert_eq!(json[0]["param1"]["key"], "block");
        assert!(json[0]["param2"]["data"].as_str().unwrap().ends_with("FF"));
    }

    #[test]
    fn test_diff_identical_images_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let old = dir.path().join("old.bin");
        let layout = dir.path().join("layout.csv");
        write_image(&old, 0x00);
        fs::write(&layout, CSV).unwrap();

        let text = ggl(&old, &old, Some(&layout), Some(&layout), None, false).unwrap();
        assert_eq!(text, "");
    }

    #[test]
    fn test_unresolvable_right_side_fails_before_reading_left() {
        let dir = tempfile::tempdir().unwrap();
        let old = dir.path().join("old.bin");
        let new = dir.path().join("new.bin");
        let bad_layout = dir.path().join("bad.csv");
        write_image(&old, 0x00);
        write_image(&new, 0xff);
        fs::write(&bad_layout, "word;u16;zz;16;1;0\n").unwrap();

        let err = ggl(&old, &new, Some(&bad_layout), None, None, false).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ResolveError>(),
            Some(ResolveError::MissingLayout { path }) if path == &new
        ));
    }

    #[test]
    fn test_diff_pib_with_fake_reader() {
        let dir = tempfile::tempdir().unwrap();
        let layout = dir.path().join("layout.xml");
        fs::write(
            &layout,
            r#"<root><object name="HFID_User"><offset>40</offset><length>64</length></object></root>"#,
        )
        .unwrap();

        let reader = |image: &Path, _: u64, _: ParameterKind, _: usize| {
            Ok::<_, FieldError>(image.to_string_lossy().into_owned().into_bytes())
        };
        let text = pib(
            Path::new("a.pib"),
            Path::new("b.pib"),
            reader,
            &layout,
            None,
            false,
        )
        .unwrap();
        assert!(text.ends_with("0040   64 HFID_User\n- a.pib\n+ b.pib\n"));
    }
}
