use crate::Result;
use serde::{de::DeserializeOwned, Serialize};
use std::fs;
use std::path::Path;

/// Read and parse a JSON document
pub fn read_json<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Write a value as pretty-printed JSON, creating parent directories.
///
/// The document is written to a sibling temp file first and renamed over the
/// target, so a failed write never truncates the previous file.
pub fn write_json<T: Serialize, P: AsRef<Path>>(path: P, value: &T) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let content = serde_json::to_string_pretty(value)?;
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = Path::new(&tmp_name);

    fs::write(tmp_path, content)?;
    if let Err(err) = fs::rename(tmp_path, path) {
        let _ = fs::remove_file(tmp_path);
        return Err(err.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    #[test]
    fn test_write_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("values.json");

        let mut values = BTreeMap::new();
        values.insert("a".to_string(), 1u32);
        write_json(&path, &values).unwrap();

        let read: BTreeMap<String, u32> = read_json(&path).unwrap();
        assert_eq!(read, values);
        assert!(!dir.path().join("nested").join("values.json.tmp").exists());
    }

    #[test]
    fn test_output_is_indented() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("values.json");
        write_json(&path, &vec![1, 2]).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "[\n  1,\n  2\n]");
    }

    #[test]
    fn test_read_reports_malformed_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();

        let result: Result<BTreeMap<String, u32>> = read_json(&path);
        assert!(matches!(result, Err(Error::Serialization(_))));
    }

    #[test]
    fn test_read_reports_missing_file() {
        let dir = tempdir().unwrap();
        let result: Result<Vec<u32>> = read_json(dir.path().join("absent.json"));
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
