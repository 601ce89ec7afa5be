use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{ClientError, Result};

pub fn get_app_data_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
        .ok_or_else(|| ClientError::storage("Could not find data directory"))?
        .join("Inmo");

    if !data_dir.exists() {
        fs::create_dir_all(&data_dir)?;
    }

    Ok(data_dir)
}

/// Reads a JSON document, returning `None` when the file does not exist.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path)
        .map_err(|e| ClientError::storage(format!("Failed to read {}: {}", path.display(), e)))?;
    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| ClientError::storage(format!("Failed to parse {}: {}", path.display(), e)))
}

/// Writes a JSON document through a sibling temp file so readers never see a
/// half-written file.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }

    let content = serde_json::to_string_pretty(value)
        .map_err(|e| ClientError::storage(format!("Failed to serialize {}: {}", path.display(), e)))?;
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, content)
        .map_err(|e| ClientError::storage(format!("Failed to write {}: {}", path.display(), e)))?;
    fs::rename(&tmp_path, path)
        .map_err(|e| ClientError::storage(format!("Failed to write {}: {}", path.display(), e)))?;
    Ok(())
}

pub fn remove_file_if_exists(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path)
            .map_err(|e| ClientError::storage(format!("Failed to remove {}: {}", path.display(), e)))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_missing_file_is_none() {
        let temp_dir = tempfile::tempdir().unwrap();
        let value: Option<serde_json::Value> =
            read_json(&temp_dir.path().join("missing.json")).unwrap();
        assert!(value.is_none());
    }

    #[test]
    fn test_write_then_read_and_remove() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("nested").join("doc.json");

        write_json(&path, &serde_json::json!({"a": 1})).unwrap();
        let value: Option<serde_json::Value> = read_json(&path).unwrap();
        assert_eq!(value, Some(serde_json::json!({"a": 1})));
        assert!(!path.with_extension("json.tmp").exists());

        remove_file_if_exists(&path).unwrap();
        assert!(!path.exists());
        remove_file_if_exists(&path).unwrap();
    }

    #[test]
    fn test_corrupt_file_is_storage_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("bad.json");
        std::fs::write(&path, "{not json").unwrap();
        let result: Result<Option<serde_json::Value>> = read_json(&path);
        assert!(matches!(result, Err(ClientError::Storage(_))));
    }
}
