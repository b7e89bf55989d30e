//! Loading JSON5 files into serde types

use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use serde::de::DeserializeOwned;

/// Returns None if the file does not exist
pub fn try_load_json5_file<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match std::fs::read_to_string(path) {
        Ok(s) => Ok(Some(serde_json5::from_str(&s).with_context(|| {
            anyhow!("decoding JSON5 from file {path:?}")
        })?)),
        Err(e) => match e.kind() {
            std::io::ErrorKind::NotFound => Ok(None),
            _ => bail!("loading file {path:?}: {e}"),
        },
    }
}

/// If `path` is given, the file must exist. Otherwise, `file_name`
/// is looked for in each of `search_dirs` in turn, and the first one
/// found is loaded; None if there is none.
pub fn load_json5_file<T: DeserializeOwned, D: AsRef<Path>>(
    path: Option<&Path>,
    file_name: &str,
    search_dirs: &[D],
) -> Result<Option<T>> {
    if let Some(path) = path {
        Ok(Some(try_load_json5_file(path)?.ok_or_else(|| {
            anyhow!("file with specified location {path:?} does not exist")
        })?))
    } else {
        for dir in search_dirs {
            let path = dir.as_ref().join(file_name);
            if let Some(value) = try_load_json5_file(&path)? {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }
}
