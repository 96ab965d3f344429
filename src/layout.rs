use unicode_width::UnicodeWidthChar;

use crate::ansi::{Line, Style};

pub const DEFAULT_COLUMNS: usize = 80;
/// Widest terminal the CLI accepts.
pub const MAX_COLUMNS: u64 = 1000;

#[derive(Clone, Copy)]
struct Cell {
    ch: char,
    style: Style,
    width: usize,
}

impl Cell {
    fn is_space(self) -> bool {
        self.ch == ' '
    }
}

/// Word-wraps logical lines into display rows no wider than `columns`.
///
/// Words that do not fit move to the next row; words wider than a whole row
/// are folded. Whitespace at a wrap point is dropped. Every logical line,
/// including an empty one, yields at least one row.
pub fn wrap_lines(lines: &[Line], columns: usize) -> Vec<Line> {
    let columns = columns.max(1);
    let mut rows = Vec::with_capacity(lines.len());
    for line in lines {
        wrap_line(line, columns, &mut rows);
    }
    rows
}

/// Number of display rows the capture occupies, never less than one.
pub fn row_count(rows: &[Line]) -> usize {
    rows.len().max(1)
}

fn wrap_line(line: &Line, columns: usize, rows: &mut Vec<Line>) {
    let cells = line
        .spans
        .iter()
        .flat_map(|span| {
            span.text.chars().map(move |ch| Cell {
                ch,
                style: span.style,
                width: ch.width().unwrap_or(0),
            })
        })
        .collect::<Vec<_>>();

    let mut row: Vec<Cell> = Vec::new();
    let mut row_width = 0;

    for word in split_words(&cells) {
        let core_len = word.iter().take_while(|cell| !cell.is_space()).count();
        let (core, trailing) = word.split_at(core_len);
        let core_width = core.iter().map(|cell| cell.width).sum::<usize>();

        if !row.is_empty() && row_width + core_width > columns {
            rows.push(finish_row(&mut row, true));
            row_width = 0;
        }

        for &cell in core {
            if row_width + cell.width > columns && !row.is_empty() {
                rows.push(finish_row(&mut row, true));
                row_width = 0;
            }
            row.push(cell);
            row_width += cell.width;
        }

        for &cell in trailing {
            if row_width + cell.width > columns {
                break;
            }
            row.push(cell);
            row_width += cell.width;
        }
    }

    rows.push(finish_row(&mut row, false));
}

/// Splits cells into words, each word being a run of non-space cells followed
/// by the spaces after it. Leading indentation forms its own word.
fn split_words(cells: &[Cell]) -> Vec<&[Cell]> {
    let mut words = Vec::new();
    let mut start = 0;
    let mut index = 0;
    while index < cells.len() {
        while index < cells.len() && !cells[index].is_space() {
            index += 1;
        }
        while index < cells.len() && cells[index].is_space() {
            index += 1;
        }
        words.push(&cells[start..index]);
        start = index;
    }
    words
}

fn finish_row(row: &mut Vec<Cell>, at_wrap: bool) -> Line {
    if at_wrap {
        while row.last().is_some_and(|cell| cell.is_space()) {
            row.pop();
        }
    }
    let mut line = Line::default();
    let mut buffer = [0_u8; 4];
    for cell in row.drain(..) {
        line.push(cell.ch.encode_utf8(&mut buffer), cell.style);
    }
    line
}
