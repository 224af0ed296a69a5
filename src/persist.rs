//! Atomic file writes for the files plugup maintains

use crate::error::{PlugupError, PlugupResult};
use serde::Serialize;
use std::io::Write;
use std::path::Path;

/// Serialize `value` as key-sorted JSON indented by four spaces
pub(crate) fn to_sorted_json<T: Serialize>(value: &T) -> PlugupResult<String> {
    // Round-tripping through `Value` sorts object keys at every level.
    let value = serde_json::to_value(value)?;
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    value.serialize(&mut serializer)?;
    String::from_utf8(out).map_err(|e| PlugupError::Internal(format!("non UTF-8 JSON: {e}")))
}

/// Replace `path` with `contents` so readers never see a partial file
pub(crate) fn write_atomic(path: &Path, contents: &str) -> PlugupResult<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)
        .map_err(|e| PlugupError::io(format!("creating directory {}", dir.display()), e))?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .map_err(|e| PlugupError::io(format!("creating temp file in {}", dir.display()), e))?;
    tmp.write_all(contents.as_bytes())
        .map_err(|e| PlugupError::io(format!("writing {}", path.display()), e))?;
    tmp.persist(path)
        .map_err(|e| PlugupError::io(format!("replacing {}", path.display()), e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn sorted_json_orders_keys_and_indents() {
        let mut map = HashMap::new();
        map.insert("b", serde_json::json!({"z": 1, "a": 2}));
        map.insert("a", serde_json::json!({}));

        let json = to_sorted_json(&map).unwrap();
        assert_eq!(
            json,
            "{\n    \"a\": {},\n    \"b\": {\n        \"a\": 2,\n        \"z\": 1\n    }\n}"
        );
    }

    #[test]
    fn write_atomic_creates_parents_and_replaces() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("file.json");

        write_atomic(&path, "first").unwrap();
        write_atomic(&path, "second").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");
        let leftovers = std::fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(leftovers, 1);
    }
}
