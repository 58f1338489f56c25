use std::fs::File;
use std::io::{BufReader, BufWriter, Write as _};
use std::path::Path;

use anyhow::Context as _;

use crate::foundation::error::{DeckreelError, DeckreelResult};

/// Parse a JSON document from a file on disk; `what` names it in errors.
pub fn read_json<T: serde::de::DeserializeOwned>(path: &Path, what: &str) -> DeckreelResult<T> {
    let f = File::open(path).map_err(|e| {
        DeckreelError::validation(format!("open {what} JSON '{}': {e}", path.display()))
    })?;
    serde_json::from_reader(BufReader::new(f)).map_err(|e| {
        DeckreelError::serde(format!("parse {what} JSON '{}': {e}", path.display()))
    })
}

/// Write `value` as pretty JSON, creating parent directories.
pub fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> DeckreelResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create directory '{}'", parent.display()))?;
    }
    let f = File::create(path).with_context(|| format!("create '{}'", path.display()))?;
    let mut w = BufWriter::new(f);
    serde_json::to_writer_pretty(&mut w, value)?;
    w.write_all(b"\n")
        .and_then(|_| w.flush())
        .with_context(|| format!("write '{}'", path.display()))?;
    Ok(())
}
