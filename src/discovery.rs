use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

pub const CAPTURE_EXTENSION: &str = ".ansi";

/// Lists regular files directly inside `dir` whose name ends with `extension`,
/// sorted by file name.
pub fn find_files_with_extension(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("failed to read input directory '{}'", dir.display()))?;

    let mut matches = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| {
            format!("failed reading entries from directory '{}'", dir.display())
        })?;
        let file_type = entry.file_type().with_context(|| {
            format!("failed reading file metadata in directory '{}'", dir.display())
        })?;
        if !file_type.is_file() {
            continue;
        }

        let name = entry.file_name().to_string_lossy().to_string();
        if name.ends_with(extension) {
            matches.push(entry.path());
        }
    }

    matches.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(matches)
}
