use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::svg_export::{PLACEHOLDER_FONT_FAMILY, PLACEHOLDER_FONT_SOURCE};

pub const EMBEDDED_FONT_FAMILY: &str = "Cascadia Mono";
pub const DEFAULT_FONT_DIR_REL: &str = "assets";
pub const DEFAULT_FONT_FILE: &str = "CascadiaMono-Regular.woff2";

const WOFF2_SIGNATURE: &[u8; 4] = b"wOF2";

pub fn default_font_path(input_dir: &Path) -> PathBuf {
    input_dir.join(DEFAULT_FONT_DIR_REL).join(DEFAULT_FONT_FILE)
}

pub fn read_font_bytes(font_path: &Path) -> Result<Vec<u8>> {
    let bytes = fs::read(font_path)
        .with_context(|| format!("failed to read font file '{}'", font_path.display()))?;
    if !bytes.starts_with(WOFF2_SIGNATURE) {
        log::warn!(
            "font '{}' does not carry a woff2 signature; embedding it anyway",
            font_path.display()
        );
    }
    Ok(bytes)
}

pub fn font_data_uri_source(font_bytes: &[u8]) -> String {
    format!(
        r#"url("data:application/font-woff;charset=utf-8;base64,{}") format("woff2")"#,
        STANDARD.encode(font_bytes)
    )
}

/// Swaps the placeholder family name and its `local(...)` source for the embedded
/// font. Plain case-sensitive substring replacement; markup is not parsed.
pub fn embed_font_in_markup(markup: &str, font_bytes: &[u8]) -> String {
    markup
        .replace(PLACEHOLDER_FONT_FAMILY, EMBEDDED_FONT_FAMILY)
        .replace(PLACEHOLDER_FONT_SOURCE, &font_data_uri_source(font_bytes))
}

pub fn embed_font(svg_path: &Path, font_path: &Path) -> Result<()> {
    let font_bytes = read_font_bytes(font_path)?;
    let markup = fs::read_to_string(svg_path)
        .with_context(|| format!("failed to read svg '{}'", svg_path.display()))?;
    let updated = embed_font_in_markup(&markup, &font_bytes);
    fs::write(svg_path, updated)
        .with_context(|| format!("failed to write svg '{}'", svg_path.display()))?;
    log::debug!(
        "embedded {} ({} bytes) into {}",
        font_path.display(),
        font_bytes.len(),
        svg_path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::{embed_font, embed_font_in_markup, EMBEDDED_FONT_FAMILY};
    use crate::svg_export::{PLACEHOLDER_FONT_FAMILY, PLACEHOLDER_FONT_SOURCE};

    const FONT_BYTES: &[u8] = b"wOF2fake-font-payload";

    #[test]
    fn substitutes_family_and_source_once_each() {
        let markup = format!(
            "<style>@font-face {{ font-family: \"{PLACEHOLDER_FONT_FAMILY}\"; src: {PLACEHOLDER_FONT_SOURCE}; }}</style>"
        );
        let updated = embed_font_in_markup(&markup, FONT_BYTES);

        assert_eq!(updated.matches(PLACEHOLDER_FONT_FAMILY).count(), 0);
        assert_eq!(updated.matches(PLACEHOLDER_FONT_SOURCE).count(), 0);
        assert_eq!(updated.matches(EMBEDDED_FONT_FAMILY).count(), 1);
        assert_eq!(updated.matches("data:application/font-woff").count(), 1);
        assert!(updated.contains("base64,d09GMmZha2UtZm9udC1wYXlsb2Fk"));
        assert!(updated.contains(r#"format("woff2")"#));
    }

    #[test]
    fn markup_without_placeholders_is_unchanged() {
        let markup = "<svg><text>nothing to swap</text></svg>";
        assert_eq!(embed_font_in_markup(markup, FONT_BYTES), markup);
    }

    #[test]
    fn embed_font_rewrites_file_in_place() {
        let dir = tempdir().unwrap();
        let svg_path = dir.path().join("shot.svg");
        let font_path = dir.path().join("font.woff2");
        fs::write(&svg_path, format!("src: {PLACEHOLDER_FONT_SOURCE};")).unwrap();
        fs::write(&font_path, FONT_BYTES).unwrap();

        embed_font(&svg_path, &font_path).unwrap();
        let written = fs::read_to_string(&svg_path).unwrap();
        assert!(written.starts_with("src: url(\"data:"));
    }

    #[test]
    fn missing_font_names_the_path() {
        let dir = tempdir().unwrap();
        let svg_path = dir.path().join("shot.svg");
        fs::write(&svg_path, "<svg/>").unwrap();
        let err = embed_font(&svg_path, &dir.path().join("absent.woff2"))
            .unwrap_err()
            .to_string();
        assert!(err.contains("absent.woff2"), "unexpected error: {err}");
    }
}
