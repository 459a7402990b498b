// Raw collection file I/O

use crate::error::Result;
use std::io::Write;
use std::path::Path;

/// Create a directory (and its parents) if it does not exist yet.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Read a collection file as text.
pub fn read_collection(path: &Path) -> Result<String> {
    Ok(std::fs::read_to_string(path)?)
}

/// Overwrite a collection file.
///
/// The text is written to a temporary file next to the target and then
/// renamed over it, so readers see either the old or the new contents.
pub fn write_collection(path: &Path, text: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    ensure_dir(dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(text.as_bytes())?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
