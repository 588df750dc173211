//! Report file output

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Write `value` as pretty-printed JSON to `path`
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize report")?;
    fs::write(path, json + "\n")
        .with_context(|| format!("Failed to write {}", path.display()))?;
    eprintln!("Report written to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        write_json(&path, &serde_json::json!({"a": [1, 2]})).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.ends_with("}\n"));
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["a"][1], 2);
    }

    #[test]
    fn test_write_json_to_missing_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("report.json");
        let err = write_json(&path, &[1]).unwrap_err();
        assert!(err.to_string().contains("Failed to write"));
    }
}
