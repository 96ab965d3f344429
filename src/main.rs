mod ansi;
mod capture;
mod discovery;
mod error_codes;
mod font_embed;
mod layout;
mod pipeline;
mod preview;
mod render;
mod svg_export;
mod theme;
mod trim;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Result;
use clap::builder::RangedU64ValueParser;
use clap::{Parser, Subcommand};

use crate::capture::load_capture;
use crate::error_codes::envelope_for;
use crate::font_embed::embed_font;
use crate::layout::{DEFAULT_COLUMNS, MAX_COLUMNS};
use crate::pipeline::{run_build, BuildOptions};
use crate::preview::{open_in_viewer, overview_path};
use crate::render::{render_to_file, RenderOptions};
use crate::theme::TerminalTheme;
use crate::trim::{trim_title_bar, TrimOutcome};

const VERSION: &str = match option_env!("DOCSHOT_GIT_HASH") {
    Some(hash) if !hash.is_empty() => hash,
    _ => env!("CARGO_PKG_VERSION"),
};

#[derive(Debug, Parser)]
#[command(name = "docshot")]
#[command(about = "Render recorded ANSI terminal captures into SVG screenshots")]
#[command(version = VERSION)]
struct Cli {
    /// Log per-stage detail.
    #[arg(short = 'v', long = "verbose", global = true)]
    verbose: bool,
    /// Print machine-readable JSON for results and errors.
    #[arg(long = "json", global = true)]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Render every `.ansi` capture in a directory into `<dir>/svg/`.
    Build {
        input_dir: PathBuf,
        #[arg(short = 'o', long = "output")]
        output: Option<PathBuf>,
        /// woff2 font to embed (default: `<input_dir>/assets/CascadiaMono-Regular.woff2`).
        #[arg(long = "font")]
        font: Option<PathBuf>,
        /// base24 YAML theme (default: bundled One Dark).
        #[arg(long = "theme")]
        theme: Option<PathBuf>,
        #[arg(long = "width", default_value_t = DEFAULT_COLUMNS, value_parser = column_parser())]
        width: usize,
        #[arg(long = "no-open")]
        no_open: bool,
    },
    /// Render a single capture without embedding a font or trimming.
    Render {
        input: PathBuf,
        #[arg(short = 'o', long = "output")]
        output: PathBuf,
        #[arg(long = "theme")]
        theme: Option<PathBuf>,
        #[arg(long = "width", default_value_t = DEFAULT_COLUMNS, value_parser = column_parser())]
        width: usize,
    },
    /// Embed a woff2 font into an exported SVG in place.
    EmbedFont {
        svg: PathBuf,
        #[arg(long = "font")]
        font: PathBuf,
    },
    /// Remove the window title bar from an exported SVG in place.
    Trim { svg: PathBuf },
}

fn column_parser() -> RangedU64ValueParser<usize> {
    RangedU64ValueParser::<usize>::new().range(1..=MAX_COLUMNS)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            if cli.json {
                match serde_json::to_string(&envelope_for(&error)) {
                    Ok(json) => eprintln!("{json}"),
                    Err(_) => eprintln!("Error: {error:#}"),
                }
            } else {
                eprintln!("Error: {error:#}");
            }
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Build {
            input_dir,
            output,
            font,
            theme,
            width,
            no_open,
        } => {
            let options = BuildOptions {
                output_dir: output.clone(),
                font_path: font.clone(),
                theme_path: theme.clone(),
                columns: *width,
                ..BuildOptions::new(input_dir)
            };
            run_build_command(&options, !*no_open, cli.json)
        }
        Commands::Render {
            input,
            output,
            theme,
            width,
        } => run_render(input, output, theme.as_deref(), *width),
        Commands::EmbedFont { svg, font } => {
            embed_font(svg, font)?;
            println!("Wrote {}", svg.display());
            Ok(())
        }
        Commands::Trim { svg } => run_trim(svg),
    }
}

fn run_build_command(options: &BuildOptions, open_overview: bool, json: bool) -> Result<()> {
    let summary = run_build(options)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        for screenshot in &summary.screenshots {
            println!("Wrote {}", screenshot.output);
        }
    }

    if open_overview {
        open_in_viewer(&overview_path(Path::new(&summary.output_dir)));
    }
    Ok(())
}

fn run_render(input: &Path, output: &Path, theme: Option<&Path>, width: usize) -> Result<()> {
    let ansi_text = load_capture(input)?;
    let options = RenderOptions {
        columns: width,
        ..RenderOptions::with_theme(TerminalTheme::load(theme)?)
    };
    let rendered = render_to_file(&ansi_text, output, &options)?;
    println!(
        "Wrote {} ({}x{})",
        output.display(),
        rendered.geometry.width_px(),
        rendered.geometry.height_px()
    );
    Ok(())
}

fn run_trim(svg: &Path) -> Result<()> {
    match trim_title_bar(svg)? {
        TrimOutcome::Trimmed {
            view_box_height, ..
        } => println!("Trimmed {} (height {view_box_height})", svg.display()),
        TrimOutcome::AlreadyTrimmed => println!("Already trimmed: {}", svg.display()),
    }
    Ok(())
}
