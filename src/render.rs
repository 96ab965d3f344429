use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::ansi::decode;
use crate::layout::{row_count, wrap_lines, DEFAULT_COLUMNS};
use crate::svg_export::{export_svg, SvgGeometry};
use crate::theme::TerminalTheme;

#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub columns: usize,
    pub theme: TerminalTheme,
}

impl RenderOptions {
    pub fn with_theme(theme: TerminalTheme) -> Self {
        Self {
            columns: DEFAULT_COLUMNS,
            theme,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RenderedSvg {
    pub markup: String,
    pub geometry: SvgGeometry,
}

/// Renders normalized ANSI text at a fixed column width. The height is the number
/// of wrapped display rows. The window title is always empty.
pub fn render_svg(ansi_text: &str, options: &RenderOptions) -> RenderedSvg {
    let lines = decode(ansi_text);
    let rows = wrap_lines(&lines, options.columns);
    let geometry = SvgGeometry::new(options.columns, row_count(&rows));
    log::debug!(
        "laid out {} logical lines as {}x{} rows",
        lines.len(),
        geometry.columns,
        geometry.rows
    );
    for (index, row) in rows.iter().enumerate() {
        log::trace!("row {index}: {}", row.plain_text());
    }
    RenderedSvg {
        markup: export_svg(&rows, options.columns, &options.theme, ""),
        geometry,
    }
}

pub fn render_to_file(
    ansi_text: &str,
    output_path: &Path,
    options: &RenderOptions,
) -> Result<RenderedSvg> {
    let rendered = render_svg(ansi_text, options);
    write_svg(output_path, &rendered.markup)?;
    Ok(rendered)
}

/// Writes markup to `output_path`, creating missing parent directories.
pub fn write_svg(output_path: &Path, markup: &str) -> Result<()> {
    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed to create output directory '{}'", parent.display())
            })?;
        }
    }
    fs::write(output_path, markup)
        .with_context(|| format!("failed to write svg '{}'", output_path.display()))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::{render_svg, render_to_file, write_svg, RenderOptions};
    use crate::theme::TerminalTheme;

    fn options(columns: usize) -> RenderOptions {
        RenderOptions {
            columns,
            theme: TerminalTheme::bundled().unwrap(),
        }
    }

    #[test]
    fn height_follows_wrapped_row_count() {
        let short = render_svg("one line", &options(80));
        assert_eq!(short.geometry.rows, 1);

        let long_text = "word ".repeat(40);
        let wrapped = render_svg(&long_text, &options(20));
        assert_eq!(wrapped.geometry.rows, 10);
        assert!(wrapped.geometry.height() > short.geometry.height());
    }

    #[test]
    fn empty_capture_still_renders_one_row() {
        let rendered = render_svg("", &options(80));
        assert_eq!(rendered.geometry.rows, 1);
        assert!(rendered.markup.contains("viewBox"));
    }

    #[test]
    fn write_svg_creates_nested_directories() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("a").join("b").join("shot.svg");
        write_svg(&output, "<svg/>").unwrap();
        assert_eq!(fs::read_to_string(&output).unwrap(), "<svg/>");
    }

    #[test]
    fn render_to_file_creates_parent_directory() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("svg").join("demo.svg");
        let rendered = render_to_file("hi", &output, &options(80)).unwrap();
        let written = fs::read_to_string(&output).unwrap();
        assert_eq!(written, rendered.markup);
    }
}
