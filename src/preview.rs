use std::path::{Path, PathBuf};

/// Screenshot opened after a batch so the author can eyeball the result.
pub const OVERVIEW_FILE_NAME: &str = "overview.svg";

pub fn overview_path(output_dir: &Path) -> PathBuf {
    output_dir.join(OVERVIEW_FILE_NAME)
}

/// Opens `path` with the system default viewer. Best effort: failures are logged
/// and otherwise ignored.
pub fn open_in_viewer(path: &Path) {
    if !path.is_file() {
        log::debug!("nothing to preview at {}", path.display());
        return;
    }
    match open::that(path) {
        Ok(()) => log::info!("opened {} in the default viewer", path.display()),
        Err(error) => log::warn!("could not open {}: {error}", path.display()),
    }
}
