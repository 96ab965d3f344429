//! Decodes ANSI-escaped terminal output into lines of styled spans.
//!
//! Only SGR styling survives decoding. Cursor movement, screen clears, OSC and
//! other escape sequences are consumed and dropped, so a capture renders as the
//! plain scrollback a reader would have seen.

use unicode_width::UnicodeWidthStr;
use vte::{Params, Parser, Perform};

use crate::theme::Rgb;

const TAB_STOP: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    /// One of the sixteen theme colors (0-7 normal, 8-15 bright).
    Standard(u8),
    /// xterm 256-color palette index 16-255.
    Indexed(u8),
    Rgb(Rgb),
}

impl Color {
    fn from_index(index: u16) -> Option<Self> {
        let index = u8::try_from(index).ok()?;
        Some(if index < 16 {
            Color::Standard(index)
        } else {
            Color::Indexed(index)
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Style {
    pub fg: Option<Color>,
    pub bg: Option<Color>,
    pub bold: bool,
    pub dim: bool,
    pub italic: bool,
    pub underline: bool,
    pub strike: bool,
    pub reverse: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub text: String,
    pub style: Style,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Line {
    pub spans: Vec<Span>,
}

impl Line {
    pub fn plain_text(&self) -> String {
        self.spans.iter().map(|span| span.text.as_str()).collect()
    }

    pub fn width(&self) -> usize {
        self.spans.iter().map(|span| span.text.width()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.iter().all(|span| span.text.is_empty())
    }

    pub(crate) fn push(&mut self, text: &str, style: Style) {
        if text.is_empty() {
            return;
        }
        match self.spans.last_mut() {
            Some(last) if last.style == style => last.text.push_str(text),
            _ => self.spans.push(Span {
                text: text.to_owned(),
                style,
            }),
        }
    }
}

/// Parses `text` into logical lines. A trailing newline does not produce an
/// extra empty line.
pub fn decode(text: &str) -> Vec<Line> {
    let mut decoder = AnsiDecoder::default();
    let mut parser = Parser::new();
    parser.advance(&mut decoder, text.as_bytes());
    decoder.finish()
}

/// Characters other than `\n` and `\r` that end a line: VT, FF, the FS/GS/RS
/// separators, NEL and the Unicode line and paragraph separators.
fn is_line_separator(c: char) -> bool {
    matches!(
        c,
        '\u{0b}' | '\u{0c}' | '\u{1c}' | '\u{1d}' | '\u{1e}' | '\u{85}' | '\u{2028}' | '\u{2029}'
    )
}

#[derive(Default)]
struct AnsiDecoder {
    lines: Vec<Line>,
    current: Line,
    style: Style,
    after_carriage_return: bool,
}

impl AnsiDecoder {
    fn finish(mut self) -> Vec<Line> {
        if !self.current.is_empty() {
            self.lines.push(std::mem::take(&mut self.current));
        }
        self.lines
    }

    fn break_line(&mut self) {
        self.lines.push(std::mem::take(&mut self.current));
    }

    fn apply_sgr(&mut self, params: &Params) {
        if params.is_empty() {
            self.style = Style::default();
            return;
        }

        let mut values = Vec::new();
        for param in params.iter() {
            // Colon sub-parameters (38:2:r:g:b) arrive as one slice.
            if param.len() > 1 && matches!(param[0], 38 | 48 | 58) {
                self.apply_extended_color(param);
                continue;
            }
            values.extend_from_slice(param);
        }

        let mut index = 0;
        while index < values.len() {
            let code = values[index];
            index += 1;
            match code {
                0 => self.style = Style::default(),
                1 => self.style.bold = true,
                2 => self.style.dim = true,
                3 => self.style.italic = true,
                4 => self.style.underline = true,
                7 => self.style.reverse = true,
                9 => self.style.strike = true,
                21 | 22 => {
                    self.style.bold = false;
                    self.style.dim = false;
                }
                23 => self.style.italic = false,
                24 => self.style.underline = false,
                27 => self.style.reverse = false,
                29 => self.style.strike = false,
                30..=37 => self.style.fg = Some(Color::Standard((code - 30) as u8)),
                39 => self.style.fg = None,
                40..=47 => self.style.bg = Some(Color::Standard((code - 40) as u8)),
                49 => self.style.bg = None,
                90..=97 => self.style.fg = Some(Color::Standard((code - 90) as u8 + 8)),
                100..=107 => self.style.bg = Some(Color::Standard((code - 100) as u8 + 8)),
                38 | 48 | 58 => {
                    let consumed = self.apply_extended_color(&values[index - 1..]);
                    index += consumed.saturating_sub(1);
                }
                _ => {}
            }
        }
    }

    /// Applies `38/48 ; 5 ; n` or `38/48 ; 2 ; r ; g ; b` and returns how many values
    /// were consumed, including the leading selector.
    fn apply_extended_color(&mut self, values: &[u16]) -> usize {
        let Some(&target) = values.first() else {
            return 0;
        };
        let (color, consumed) = match values.get(1) {
            Some(5) => (values.get(2).and_then(|&n| Color::from_index(n)), 3),
            Some(2) => {
                let channel = |offset: usize| values.get(offset).map(|&v| v.min(255) as u8);
                let color = match (channel(2), channel(3), channel(4)) {
                    (Some(r), Some(g), Some(b)) => Some(Color::Rgb(Rgb::new(r, g, b))),
                    _ => None,
                };
                (color, 5)
            }
            _ => (None, 2),
        };

        match target {
            38 => {
                if color.is_some() {
                    self.style.fg = color;
                }
            }
            48 => {
                if color.is_some() {
                    self.style.bg = color;
                }
            }
            // Underline color has no effect on the rendered image.
            _ => {}
        }
        consumed.min(values.len())
    }
}

impl Perform for AnsiDecoder {
    fn print(&mut self, c: char) {
        self.after_carriage_return = false;
        if is_line_separator(c) {
            self.break_line();
            return;
        }
        let mut buffer = [0_u8; 4];
        let style = self.style;
        self.current.push(c.encode_utf8(&mut buffer), style);
    }

    fn execute(&mut self, byte: u8) {
        // `\r\n` is a single break.
        let after_carriage_return = std::mem::take(&mut self.after_carriage_return);
        match byte {
            b'\n' if after_carriage_return => {}
            b'\n' => self.break_line(),
            b'\r' => {
                self.break_line();
                self.after_carriage_return = true;
            }
            _ if is_line_separator(char::from(byte)) => self.break_line(),
            b'\t' => {
                let column = self.current.width();
                let pad = TAB_STOP - column % TAB_STOP;
                let style = self.style;
                self.current.push(&" ".repeat(pad), style);
            }
            _ => {}
        }
    }

    fn csi_dispatch(&mut self, params: &Params, intermediates: &[u8], ignore: bool, action: char) {
        self.after_carriage_return = false;
        if ignore || !intermediates.is_empty() {
            return;
        }
        if action == 'm' {
            self.apply_sgr(params);
        }
    }

    fn esc_dispatch(&mut self, _intermediates: &[u8], _ignore: bool, _byte: u8) {
        self.after_carriage_return = false;
    }

    fn osc_dispatch(&mut self, _params: &[&[u8]], _bell_terminated: bool) {
        self.after_carriage_return = false;
    }
}
