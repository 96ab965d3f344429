use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

/// Literal four-character line marker written by the capture tool.
const ESCAPED_LINE_BREAK: &str = r"\r\n";
/// Literal six-character escape marker written by the capture tool.
const ESCAPED_ESC: &str = r"\u001b";
const ESC: &str = "\u{1b}";

/// Reads a captured session and converts its escaped markers into real control
/// characters.
pub fn load_capture(path: &Path) -> Result<String> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read capture '{}'", path.display()))?;
    Ok(normalize_capture(&raw))
}

/// Drops literal `\r\n` markers and turns literal `\u001b` markers into ESC.
/// Anything else, including broken escape sequences, passes through untouched.
pub fn normalize_capture(raw: &str) -> String {
    raw.replace(ESCAPED_LINE_BREAK, "").replace(ESCAPED_ESC, ESC)
}
