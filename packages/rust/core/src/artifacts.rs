//! JSON artifact persistence.
//!
//! Files are written atomically (temp file, then rename) and their SHA-256
//! checksums are kept for the run summary.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};
use tracing::{debug, instrument};

use docgraph_shared::{DocGraphError, Result};

/// Metadata for one written file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactMeta {
    pub filename: String,
    pub sha256: String,
    pub size_bytes: usize,
}

/// Replace every character that is not ASCII alphanumeric with `_`.
pub fn safe_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Compact UTC timestamp used in file names, e.g. `20240131142501`.
pub fn file_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y%m%d%H%M%S").to_string()
}

/// Writes JSON files into one directory.
#[derive(Debug)]
pub struct ArtifactWriter {
    dir: PathBuf,
    checksums: BTreeMap<String, String>,
}

impl ArtifactWriter {
    /// Writer for `dir`, creating it if needed.
    pub fn create(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| DocGraphError::io(&dir, e))?;
        Ok(Self {
            dir,
            checksums: BTreeMap::new(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Checksums of every file written so far, by file name.
    pub fn checksums(&self) -> &BTreeMap<String, String> {
        &self.checksums
    }

    /// Write `data` to `filename`, replacing any existing file.
    pub fn write_json<T: Serialize>(&mut self, filename: &str, data: &T) -> Result<ArtifactMeta> {
        let content = serde_json::to_string_pretty(data)
            .map_err(|e| DocGraphError::validation(format!("JSON serialization failed: {e}")))?;

        let target = self.dir.join(filename);
        let temp = self.dir.join(format!(".{filename}.tmp"));
        std::fs::write(&temp, &content).map_err(|e| DocGraphError::io(&temp, e))?;
        std::fs::rename(&temp, &target).map_err(|e| DocGraphError::io(&target, e))?;

        let sha256 = format!("{:x}", Sha256::digest(content.as_bytes()));
        debug!(file = %filename, size = content.len(), "wrote artifact");

        self.checksums.insert(filename.to_string(), sha256.clone());
        Ok(ArtifactMeta {
            filename: filename.to_string(),
            sha256,
            size_bytes: content.len(),
        })
    }

    /// Write `data` to `<stem>.json`, or `<stem>_<n>.json` when that name is taken.
    pub fn write_unique_json<T: Serialize>(&mut self, stem: &str, data: &T) -> Result<ArtifactMeta> {
        let filename = self.unused_filename(stem);
        self.write_json(&filename, data)
    }

    fn unused_filename(&self, stem: &str) -> String {
        let taken = |name: &str| self.checksums.contains_key(name) || self.dir.join(name).exists();
        let first = format!("{stem}.json");
        if !taken(&first) {
            return first;
        }
        (1..)
            .map(|n| format!("{stem}_{n}.json"))
            .find(|name| !taken(name))
            .unwrap_or(first)
    }
}

/// Per-component artifact stem: `<safe_name>_<kind>_<timestamp>`.
pub fn component_stem(name: &str, kind: &str, at: DateTime<Utc>) -> String {
    format!("{}_{kind}_{}", safe_name(name), file_timestamp(at))
}

/// Read and deserialize a JSON file.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path).map_err(|e| DocGraphError::io(path, e))?;
    serde_json::from_str(&content)
        .map_err(|e| DocGraphError::parse(format!("{}: {e}", path.display())))
}

/// `*.json` files directly inside `dir`, sorted by name.
pub fn json_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|e| DocGraphError::io(dir, e))?;
    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();
    Ok(files)
}

/// Remove the regular files in `dir` (creating it when missing). Returns how many were removed.
#[instrument(skip_all, fields(dir = %dir.display()))]
pub fn clear_directory(dir: &Path) -> Result<usize> {
    if !dir.exists() {
        std::fs::create_dir_all(dir).map_err(|e| DocGraphError::io(dir, e))?;
        return Ok(0);
    }
    let entries = std::fs::read_dir(dir).map_err(|e| DocGraphError::io(dir, e))?;
    let mut removed = 0;
    for entry in entries {
        let path = entry.map_err(|e| DocGraphError::io(dir, e))?.path();
        if path.is_file() {
            std::fs::remove_file(&path).map_err(|e| DocGraphError::io(&path, e))?;
            removed += 1;
        }
    }
    debug!(removed, "cleared output directory");
    Ok(removed)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;

    pub(crate) fn temp_dir(prefix: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("{prefix}-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn safe_names_and_stems() {
        assert_eq!(safe_name("Forms / Text Field"), "Forms___Text_Field");
        let at = Utc.with_ymd_and_hms(2024, 1, 31, 14, 25, 1).unwrap();
        assert_eq!(component_stem("Button", "kg", at), "Button_kg_20240131142501");
    }

    #[test]
    fn writes_are_checksummed_and_never_collide() {
        let tmp = temp_dir("dg-artifacts");
        let mut writer = ArtifactWriter::create(tmp.join("out")).unwrap();

        let first = writer.write_unique_json("Button_kg", &serde_json::json!({"a": 1})).unwrap();
        let second = writer.write_unique_json("Button_kg", &serde_json::json!({"a": 2})).unwrap();
        assert_eq!(first.filename, "Button_kg.json");
        assert_eq!(second.filename, "Button_kg_1.json");
        assert_ne!(first.sha256, second.sha256);
        assert_eq!(first.sha256.len(), 64);
        assert_eq!(writer.checksums().len(), 2);

        let back: serde_json::Value = read_json(&writer.dir().join("Button_kg_1.json")).unwrap();
        assert_eq!(back["a"], 2);
        assert!(!writer.dir().join(".Button_kg.json.tmp").exists());

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn clearing_keeps_subdirectories() {
        let tmp = temp_dir("dg-clear");
        std::fs::write(tmp.join("old.json"), "{}").unwrap();
        std::fs::write(tmp.join("notes.txt"), "x").unwrap();
        std::fs::create_dir_all(tmp.join("nested")).unwrap();

        assert_eq!(json_files(&tmp).unwrap().len(), 1);
        assert_eq!(clear_directory(&tmp).unwrap(), 2);
        assert!(tmp.join("nested").is_dir());
        assert_eq!(clear_directory(&tmp.join("fresh")).unwrap(), 0);

        let _ = std::fs::remove_dir_all(&tmp);
    }
}
