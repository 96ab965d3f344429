use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::capture::load_capture;
use crate::discovery::{find_files_with_extension, CAPTURE_EXTENSION};
use crate::error_codes::{CodedError, NO_ANSI_FILES};
use crate::font_embed::{default_font_path, embed_font_in_markup, read_font_bytes};
use crate::layout::DEFAULT_COLUMNS;
use crate::render::{render_svg, write_svg, RenderOptions};
use crate::theme::TerminalTheme;
use crate::trim::{trim_title_bar, TrimOutcome};

pub const DEFAULT_OUTPUT_DIR_NAME: &str = "svg";

#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub input_dir: PathBuf,
    pub output_dir: Option<PathBuf>,
    pub font_path: Option<PathBuf>,
    pub theme_path: Option<PathBuf>,
    pub columns: usize,
    pub extension: String,
}

impl BuildOptions {
    pub fn new(input_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            output_dir: None,
            font_path: None,
            theme_path: None,
            columns: DEFAULT_COLUMNS,
            extension: CAPTURE_EXTENSION.to_owned(),
        }
    }

    pub fn resolved_output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| self.input_dir.join(DEFAULT_OUTPUT_DIR_NAME))
    }

    pub fn resolved_font_path(&self) -> PathBuf {
        self.font_path
            .clone()
            .unwrap_or_else(|| default_font_path(&self.input_dir))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BuiltScreenshot {
    pub source: String,
    pub output: String,
    pub rows: usize,
    pub view_box_height: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BuildSummary {
    pub ok: bool,
    pub output_dir: String,
    pub screenshots: Vec<BuiltScreenshot>,
}

/// Output path for one capture: `<output_dir>/<stem>.svg`.
pub fn svg_output_path(output_dir: &Path, capture_path: &Path) -> PathBuf {
    let stem = capture_path
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_default();
    output_dir.join(format!("{stem}.svg"))
}

/// Renders every capture in the input directory. The first failing file aborts
/// the whole batch.
pub fn run_build(options: &BuildOptions) -> Result<BuildSummary> {
    let captures = find_files_with_extension(&options.input_dir, &options.extension)?;
    if captures.is_empty() {
        return Err(CodedError::new(
            NO_ANSI_FILES,
            format!(
                "no {} files were found in '{}'",
                options.extension,
                options.input_dir.display()
            ),
        )
        .into());
    }

    let theme = TerminalTheme::load(options.theme_path.as_deref())?;
    let render_options = RenderOptions {
        columns: options.columns,
        theme,
    };
    let font_path = options.resolved_font_path();
    let font_bytes = read_font_bytes(&font_path)?;
    let output_dir = options.resolved_output_dir();

    let mut screenshots = Vec::with_capacity(captures.len());
    for capture_path in &captures {
        let name = capture_path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        log::info!("Processing {name}");

        let built = build_one(capture_path, &output_dir, &render_options, &font_bytes)
            .with_context(|| format!("failed to process '{}'", capture_path.display()))?;
        screenshots.push(built);
    }

    Ok(BuildSummary {
        ok: true,
        output_dir: output_dir.to_string_lossy().to_string(),
        screenshots,
    })
}

fn build_one(
    capture_path: &Path,
    output_dir: &Path,
    render_options: &RenderOptions,
    font_bytes: &[u8],
) -> Result<BuiltScreenshot> {
    let ansi_text = load_capture(capture_path)?;
    let svg_path = svg_output_path(output_dir, capture_path);

    let rendered = render_svg(&ansi_text, render_options);
    let embedded = embed_font_in_markup(&rendered.markup, font_bytes);
    write_svg(&svg_path, &embedded)?;

    let view_box_height = match trim_title_bar(&svg_path)? {
        TrimOutcome::Trimmed {
            view_box_height, ..
        } => view_box_height,
        TrimOutcome::AlreadyTrimmed => rendered.geometry.height_px(),
    };

    Ok(BuiltScreenshot {
        source: capture_path.to_string_lossy().to_string(),
        output: svg_path.to_string_lossy().to_string(),
        rows: rendered.geometry.rows,
        view_box_height,
    })
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use tempfile::tempdir;

    use super::{run_build, svg_output_path, BuildOptions};
    use crate::error_codes::{find_coded_error, NO_ANSI_FILES};
    use crate::font_embed::default_font_path;
    use crate::svg_export::SvgGeometry;

    #[test]
    fn output_path_swaps_extension_into_svg_dir() {
        let path = svg_output_path(Path::new("/docs/img/svg"), Path::new("/docs/img/run.ansi"));
        assert_eq!(path, Path::new("/docs/img/svg/run.svg"));
    }

    #[test]
    fn empty_directory_reports_no_files() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("readme.md"), "#").unwrap();
        let err = run_build(&BuildOptions::new(dir.path())).unwrap_err();
        let coded = find_coded_error(&err).expect("expected coded error");
        assert_eq!(coded.code, NO_ANSI_FILES);
    }

    #[test]
    fn missing_font_aborts_before_rendering() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.ansi"), "hello").unwrap();
        let err = run_build(&BuildOptions::new(dir.path()))
            .unwrap_err()
            .to_string();
        assert!(err.contains("CascadiaMono-Regular.woff2"), "{err}");
        assert!(!dir.path().join("svg").exists());
    }

    #[test]
    fn builds_trimmed_svg_with_embedded_font() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("demo.ansi"), r"\u001b[33mready\u001b[0m\r\n").unwrap();
        let font_path = default_font_path(dir.path());
        fs::create_dir_all(font_path.parent().unwrap()).unwrap();
        fs::write(&font_path, b"wOF2payload").unwrap();

        let summary = run_build(&BuildOptions::new(dir.path())).unwrap();
        assert_eq!(summary.screenshots.len(), 1);
        let built = &summary.screenshots[0];
        assert!(built.view_box_height > 0.0);
        assert!(built.view_box_height < SvgGeometry::new(80, 1).height_px());

        let svg = fs::read_to_string(dir.path().join("svg").join("demo.svg")).unwrap();
        assert!(!svg.is_empty());
        assert!(!svg.contains("translate(26,22)"));
        assert!(svg.contains("Cascadia Mono"));
        assert!(!svg.contains("Fira Code"));
    }

    #[test]
    fn capture_with_xml_invalid_characters_still_builds() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("odd.ansi"), "x\u{fffe}y\u{ffff}\n").unwrap();
        let font_path = default_font_path(dir.path());
        fs::create_dir_all(font_path.parent().unwrap()).unwrap();
        fs::write(&font_path, b"wOF2payload").unwrap();

        let summary = run_build(&BuildOptions::new(dir.path())).unwrap();
        assert_eq!(summary.screenshots.len(), 1);
        let svg = fs::read_to_string(dir.path().join("svg").join("odd.svg")).unwrap();
        roxmltree::Document::parse(&svg).expect("built svg should parse");
    }
}
