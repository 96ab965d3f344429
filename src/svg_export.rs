//! Serializes wrapped terminal rows as a terminal-window SVG.
//!
//! Geometry is kept in hundredths of a pixel so the same capture always yields
//! byte-identical markup. The layout (window chrome, title bar group, clip
//! paths, `Fira Code` font face) is the one the post-processing stages expect;
//! changing any of the constants below silently breaks [`crate::trim`] and
//! [`crate::font_embed`].

use std::collections::HashMap;
use std::fmt::Write as _;

use unicode_width::UnicodeWidthStr;

use crate::ansi::{Color, Line, Style};
use crate::theme::{Rgb, TerminalTheme};

/// Font family the exporter references; swapped out when the real font is embedded.
pub const PLACEHOLDER_FONT_FAMILY: &str = "Fira Code";
/// Font source the exporter references; replaced by a base64 data URI.
pub const PLACEHOLDER_FONT_SOURCE: &str = r#"local("FiraCode-Regular")"#;
/// Transform carried by the window-button group and nothing else.
pub const TITLE_BAR_TRANSFORM: &str = "translate(26,22)";

const CHAR_HEIGHT: i64 = 2000;
const CHAR_WIDTH: i64 = 1220;
const LINE_HEIGHT: i64 = 2440;
const MARGIN: i64 = 100;
const PADDING_TOP: i64 = 4000;
const PADDING_SIDE: i64 = 800;
const PADDING_BOTTOM: i64 = 800;
const BACKGROUND_Y_OFFSET: i64 = 150;
const BACKGROUND_EXTRA_HEIGHT: i64 = 25;
const DIM_BLEND: f32 = 0.4;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0001_0000_01b3;

const WINDOW_BUTTON_COLORS: [&str; 3] = ["#ff5f57", "#febc2e", "#28c840"];

/// Pixel geometry of one exported screenshot, in hundredths of a pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SvgGeometry {
    pub columns: usize,
    pub rows: usize,
    pub terminal_width: i64,
    pub terminal_height: i64,
}

impl SvgGeometry {
    pub fn new(columns: usize, rows: usize) -> Self {
        let columns = columns.max(1);
        let rows = rows.max(1);
        // Whole-pixel terminal width, rounded up.
        let text_width = columns as i64 * CHAR_WIDTH + PADDING_SIDE * 2;
        let terminal_width = (text_width + 99) / 100 * 100;
        let terminal_height = rows as i64 * LINE_HEIGHT + PADDING_TOP + PADDING_BOTTOM;
        Self {
            columns,
            rows,
            terminal_width,
            terminal_height,
        }
    }

    pub fn width(&self) -> i64 {
        self.terminal_width + MARGIN * 2
    }

    pub fn height(&self) -> i64 {
        self.terminal_height + MARGIN * 2
    }

    pub fn width_px(&self) -> f64 {
        self.width() as f64 / 100.0
    }

    pub fn height_px(&self) -> f64 {
        self.height() as f64 / 100.0
    }
}

/// Writes an integer count of hundredths of a pixel in its shortest decimal form.
pub fn format_hundredths(value: i64) -> String {
    let sign = if value < 0 { "-" } else { "" };
    let abs = value.unsigned_abs();
    let whole = abs / 100;
    let fraction = abs % 100;
    match fraction {
        0 => format!("{sign}{whole}"),
        f if f % 10 == 0 => format!("{sign}{whole}.{}", f / 10),
        f => format!("{sign}{whole}.{f:02}"),
    }
}

/// Characters allowed in XML 1.0 character data.
fn is_xml_char(ch: char) -> bool {
    matches!(
        ch,
        '\u{9}'
            | '\u{a}'
            | '\u{d}'
            | '\u{20}'..='\u{d7ff}'
            | '\u{e000}'..='\u{fffd}'
            | '\u{10000}'..='\u{10ffff}'
    )
}

/// Escapes text for an SVG `<text>` run. Characters XML cannot carry become U+FFFD.
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            _ if !is_xml_char(ch) => out.push('\u{fffd}'),
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            ' ' => out.push_str("&#160;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Resolves a decoded color against the theme and the xterm 256-color cube.
pub fn resolve_color(color: Color, theme: &TerminalTheme) -> Rgb {
    match color {
        Color::Standard(index) => theme.ansi(index),
        Color::Indexed(index) if index < 16 => theme.ansi(index),
        Color::Indexed(index) if index < 232 => {
            const LEVELS: [u8; 6] = [0, 95, 135, 175, 215, 255];
            let cube = index - 16;
            Rgb::new(
                LEVELS[usize::from(cube / 36)],
                LEVELS[usize::from(cube / 6 % 6)],
                LEVELS[usize::from(cube % 6)],
            )
        }
        Color::Indexed(index) => {
            let level = 8 + (index - 232) * 10;
            Rgb::new(level, level, level)
        }
        Color::Rgb(rgb) => rgb,
    }
}

/// Foreground and optional background after reverse video and dimming.
fn effective_colors(style: &Style, theme: &TerminalTheme) -> (Rgb, Option<Rgb>) {
    let mut fg = style
        .fg
        .map_or(theme.foreground, |color| resolve_color(color, theme));
    let mut bg = style.bg.map(|color| resolve_color(color, theme));
    if style.reverse {
        let swapped_fg = bg.unwrap_or(theme.background);
        bg = Some(fg);
        fg = swapped_fg;
    }
    if style.dim {
        fg = fg.blend(bg.unwrap_or(theme.background), DIM_BLEND);
    }
    (fg, bg.filter(|color| *color != theme.background))
}

fn css_rules(style: &Style, fg: Rgb) -> String {
    let mut rules = vec![format!("fill: {}", fg.hex())];
    if style.bold {
        rules.push("font-weight: bold".to_owned());
    }
    if style.italic {
        rules.push("font-style: italic".to_owned());
    }
    match (style.underline, style.strike) {
        (true, true) => rules.push("text-decoration: underline line-through".to_owned()),
        (true, false) => rules.push("text-decoration: underline".to_owned()),
        (false, true) => rules.push("text-decoration: line-through".to_owned()),
        (false, false) => {}
    }
    rules.join(";")
}

fn fnv1a64(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET_BASIS;
    for &byte in bytes {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

fn unique_id(rows: &[Line], theme: &TerminalTheme) -> String {
    let mut seed = String::new();
    for row in rows {
        for span in &row.spans {
            let _ = write!(seed, "{:?}{}", span.style, span.text);
        }
        seed.push('\n');
    }
    let _ = write!(seed, "{theme:?}");
    format!("terminal-{:016x}", fnv1a64(seed.as_bytes()))
}

/// Renders wrapped rows into SVG markup. `title` is written verbatim (escaped) into
/// the window chrome; pass an empty string for no title.
pub fn export_svg(rows: &[Line], columns: usize, theme: &TerminalTheme, title: &str) -> String {
    let geometry = SvgGeometry::new(columns, rows.len());
    let uid = unique_id(rows, theme);

    let mut class_rules: Vec<String> = Vec::new();
    let mut class_index: HashMap<String, usize> = HashMap::new();
    let mut backgrounds = String::new();
    let mut matrix = String::new();

    for (row_index, row) in rows.iter().enumerate() {
        let row_y = row_index as i64 * LINE_HEIGHT;
        let mut column = 0_i64;
        for span in &row.spans {
            let cells = span.text.width() as i64;
            let (fg, bg) = effective_colors(&span.style, theme);
            let x = column * CHAR_WIDTH;

            if let Some(bg) = bg {
                let _ = writeln!(
                    backgrounds,
                    r#"<rect fill="{}" x="{}" y="{}" width="{}" height="{}" shape-rendering="crispEdges"/>"#,
                    bg.hex(),
                    format_hundredths(x),
                    format_hundredths(row_y + BACKGROUND_Y_OFFSET),
                    format_hundredths(cells * CHAR_WIDTH),
                    format_hundredths(LINE_HEIGHT + BACKGROUND_EXTRA_HEIGHT),
                );
            }

            if !span.text.chars().all(|ch| ch == ' ') {
                let rules = css_rules(&span.style, fg);
                let class_number = match class_index.get(&rules) {
                    Some(&number) => number,
                    None => {
                        class_rules.push(rules.clone());
                        class_index.insert(rules, class_rules.len());
                        class_rules.len()
                    }
                };
                let _ = writeln!(
                    matrix,
                    r#"<text class="{uid}-r{class_number}" x="{}" y="{}" textLength="{}" clip-path="url(#{uid}-line-{row_index})">{}</text>"#,
                    format_hundredths(x),
                    format_hundredths(row_y + CHAR_HEIGHT),
                    format_hundredths(cells * CHAR_WIDTH),
                    escape_text(&span.text),
                );
            }
            column += cells;
        }
    }

    let mut styles = String::new();
    for (index, rules) in class_rules.iter().enumerate() {
        let _ = writeln!(styles, "    .{uid}-r{} {{ {rules} }}", index + 1);
    }

    let mut line_clips = String::new();
    for row_index in 0..geometry.rows {
        let _ = writeln!(
            line_clips,
            r#"    <clipPath id="{uid}-line-{row_index}">
    <rect x="0" y="{}" width="{}" height="{}"/>
            </clipPath>"#,
            format_hundredths(row_index as i64 * LINE_HEIGHT + BACKGROUND_Y_OFFSET),
            format_hundredths(geometry.columns as i64 * CHAR_WIDTH),
            format_hundredths(LINE_HEIGHT + BACKGROUND_EXTRA_HEIGHT),
        );
    }

    let width = format_hundredths(geometry.width());
    let height = format_hundredths(geometry.height());
    let terminal_x = format_hundredths(MARGIN + PADDING_SIDE);
    let terminal_y = format_hundredths(MARGIN + PADDING_TOP);
    let background = theme.background.hex();
    let foreground = theme.foreground.hex();

    let mut svg = String::new();
    let _ = write!(
        svg,
        r#"<svg class="docshot-terminal" viewBox="0 0 {width} {height}" xmlns="http://www.w3.org/2000/svg">
    <!-- Generated with docshot -->
    <style>

    @font-face {{
        font-family: "{family}";
        src: {source};
        font-style: normal;
        font-weight: 400;
    }}

    .{uid}-matrix {{
        font-family: {family}, monospace;
        font-size: {char_height}px;
        line-height: {line_height}px;
        font-variant-east-asian: full-width;
    }}

    .{uid}-title {{
        font-size: 18px;
        font-weight: bold;
        font-family: arial;
    }}

{styles}    </style>

    <defs>
    <clipPath id="{uid}-clip-terminal">
      <rect x="0" y="0" width="{terminal_width}" height="{terminal_height}" />
    </clipPath>
{line_clips}    </defs>

    <rect fill="{background}" stroke="rgba(255,255,255,0.35)" stroke-width="1" x="{margin}" y="{margin}" width="{terminal_width}" height="{terminal_height}" rx="8"/><text class="{uid}-title" fill="{foreground}" x="{title_x}" y="{title_y}" text-anchor="middle">{title}</text>
            <g transform="{title_bar}">
            <circle cx="0" cy="0" r="7" fill="{button_close}"/>
            <circle cx="22" cy="0" r="7" fill="{button_minimize}"/>
            <circle cx="44" cy="0" r="7" fill="{button_zoom}"/>
            </g>

    <g transform="translate({terminal_x}, {terminal_y})" clip-path="url(#{uid}-clip-terminal)">
    {backgrounds}
    <g class="{uid}-matrix">
    {matrix}
    </g>
    </g>
</svg>
"#,
        family = PLACEHOLDER_FONT_FAMILY,
        source = PLACEHOLDER_FONT_SOURCE,
        char_height = format_hundredths(CHAR_HEIGHT),
        line_height = format_hundredths(LINE_HEIGHT),
        terminal_width = format_hundredths(geometry.terminal_width),
        terminal_height = format_hundredths(geometry.terminal_height),
        margin = format_hundredths(MARGIN),
        title_x = format_hundredths(geometry.width() / 2),
        title_y = format_hundredths(MARGIN + CHAR_HEIGHT + 600),
        title = escape_text(title),
        title_bar = TITLE_BAR_TRANSFORM,
        button_close = WINDOW_BUTTON_COLORS[0],
        button_minimize = WINDOW_BUTTON_COLORS[1],
        button_zoom = WINDOW_BUTTON_COLORS[2],
    );
    svg
}

#[cfg(test)]
mod tests {
    use super::{
        escape_text, export_svg, format_hundredths, resolve_color, SvgGeometry,
        PLACEHOLDER_FONT_FAMILY, PLACEHOLDER_FONT_SOURCE, TITLE_BAR_TRANSFORM,
    };
    use crate::ansi::{decode, Color};
    use crate::layout::wrap_lines;
    use crate::theme::{Rgb, TerminalTheme};

    fn theme() -> TerminalTheme {
        TerminalTheme::bundled().unwrap()
    }

    #[test]
    fn hundredths_format_in_shortest_form() {
        assert_eq!(format_hundredths(7600), "76");
        assert_eq!(format_hundredths(7440), "74.4");
        assert_eq!(format_hundredths(2465), "24.65");
        assert_eq!(format_hundredths(-600), "-6");
        assert_eq!(format_hundredths(0), "0");
    }

    #[test]
    fn geometry_for_one_row_at_eighty_columns() {
        let geometry = SvgGeometry::new(80, 1);
        assert_eq!(format_hundredths(geometry.terminal_width), "992");
        assert_eq!(format_hundredths(geometry.width()), "994");
        assert_eq!(format_hundredths(geometry.terminal_height), "72.4");
        assert_eq!(format_hundredths(geometry.height()), "74.4");
        assert!(SvgGeometry::new(80, 3).height() > geometry.height());
    }

    #[test]
    fn xterm_palette_resolution() {
        let theme = theme();
        assert_eq!(resolve_color(Color::Standard(1), &theme), theme.normal[1]);
        assert_eq!(resolve_color(Color::Indexed(196), &theme), Rgb::new(255, 0, 0));
        assert_eq!(resolve_color(Color::Indexed(232), &theme), Rgb::new(8, 8, 8));
        assert_eq!(resolve_color(Color::Indexed(255), &theme), Rgb::new(238, 238, 238));
    }

    #[test]
    fn escapes_markup_and_spaces() {
        assert_eq!(escape_text("a <b> & c"), "a&#160;&lt;b&gt;&#160;&amp;&#160;c");
    }

    #[test]
    fn characters_outside_xml_are_replaced() {
        assert_eq!(escape_text("x\u{fffe}y\u{ffff}\u{1}"), "x\u{fffd}y\u{fffd}\u{fffd}");
        let rows = wrap_lines(&decode("x\u{fffe}y"), 80);
        let svg = export_svg(&rows, 80, &theme(), "\u{ffff}");
        roxmltree::Document::parse(&svg).expect("export should stay well-formed xml");
    }

    #[test]
    fn export_contains_the_markers_post_processing_relies_on() {
        let theme = theme();
        let rows = wrap_lines(&decode("\u{1b}[32mhello\u{1b}[0m world"), 80);
        let svg = export_svg(&rows, 80, &theme, "");

        assert!(svg.starts_with("<svg "));
        assert!(svg.contains(r#"viewBox="0 0 994 74.4""#));
        assert_eq!(svg.matches(TITLE_BAR_TRANSFORM).count(), 1);
        assert_eq!(svg.matches(r##"fill="#282c34""##).count(), 1);
        assert_eq!(svg.matches(PLACEHOLDER_FONT_SOURCE).count(), 1);
        assert!(svg.contains(PLACEHOLDER_FONT_FAMILY));
        assert!(svg.contains("translate(9, 41)"));
        assert!(svg.contains(">hello</text>"));
        assert!(svg.contains(">&#160;world</text>"));
        assert!(svg.contains("fill: #98c379"));
        roxmltree::Document::parse(&svg).expect("export should be well-formed xml");
    }

    #[test]
    fn background_colors_emit_rects() {
        let theme = theme();
        let rows = wrap_lines(&decode("\u{1b}[41m  \u{1b}[0m"), 80);
        let svg = export_svg(&rows, 80, &theme, "");
        assert!(svg.contains(&format!(r#"<rect fill="{}""#, theme.normal[1].hex())));
    }

    #[test]
    fn export_is_deterministic() {
        let theme = theme();
        let rows = wrap_lines(&decode("\u{1b}[1mbold\u{1b}[0m text"), 40);
        assert_eq!(
            export_svg(&rows, 40, &theme, ""),
            export_svg(&rows, 40, &theme, "")
        );
    }
}
