//! Removes the window title bar from an exported screenshot and shrinks the
//! canvas to match.
//!
//! The document is parsed with `roxmltree` to locate elements, but edits are
//! spliced into the original text by byte range, so everything the trimmer
//! does not touch is written back byte-for-byte.

use std::fs;
use std::ops::Range;
use std::path::Path;
use std::sync::OnceLock;

use anyhow::{anyhow, Context, Result};
use regex::Regex;
use roxmltree::{Document, Node};

use crate::error_codes::{
    CodedError, INVALID_VIEWBOX, MALFORMED_TRANSFORM, MISSING_VIEWBOX, SVG_PARSE_FAILED,
};
use crate::svg_export::TITLE_BAR_TRANSFORM;

/// Vertical distance the content moves up once the title bar is gone.
pub const SHIFT_DISTANCE: f64 = 28.0;
/// The canvas keeps a little of the freed space as top padding.
pub const PADDING_CORRECTION: f64 = 4.0;
/// Fill of the window background rect in the bundled One Dark theme.
pub const BACKGROUND_FILL: &str = "#282c34";

#[derive(Debug, Clone, PartialEq)]
pub enum TrimOutcome {
    Trimmed {
        shifted_elements: usize,
        background_resized: bool,
        view_box_height: f64,
    },
    /// No title bar was found; the document was left untouched.
    AlreadyTrimmed,
}

struct Edit {
    range: Range<usize>,
    replacement: String,
}

fn translate_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"translate\((-?\d+),\s*(-?\d+)\)").expect("translate pattern is valid")
    })
}

/// Writes a number in its shortest form, rounded to four decimals (`76`, `50.4`).
pub fn format_number(value: f64) -> String {
    let rounded = (value * 10_000.0).round() / 10_000.0;
    if rounded == 0.0 {
        return "0".to_owned();
    }
    format!("{rounded}")
}

fn escape_attribute(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('"', "&quot;")
}

fn is_within<'a, 'input>(node: Node<'a, 'input>, container: Node<'a, 'input>) -> bool {
    node.ancestors().any(|ancestor| ancestor == container)
}

/// Rewrites `translate(x,y)` inside a transform value to `translate(x,y-28)`.
pub fn shift_transform(value: &str) -> Result<String> {
    let captures = translate_pattern().captures(value).ok_or_else(|| {
        CodedError::new(
            MALFORMED_TRANSFORM,
            format!("transform '{value}' does not contain translate(<int>,<int>)"),
        )
    })?;
    let whole = captures.get(0).map_or(0..0, |m| m.range());
    let x: i64 = captures[1]
        .parse()
        .with_context(|| format!("translate x out of range in '{value}'"))?;
    let y: i64 = captures[2]
        .parse()
        .with_context(|| format!("translate y out of range in '{value}'"))?;

    let shifted_y = y.checked_sub(SHIFT_DISTANCE as i64).ok_or_else(|| {
        CodedError::new(
            MALFORMED_TRANSFORM,
            format!("translate y in '{value}' cannot be shifted up by {SHIFT_DISTANCE}"),
        )
    })?;
    Ok(format!(
        "{}translate({x},{shifted_y}){}",
        &value[..whole.start],
        &value[whole.end..]
    ))
}

/// Trims `markup` and returns the new document text. A document without a title
/// bar is returned unchanged.
pub fn trim_markup(markup: &str) -> Result<(String, TrimOutcome)> {
    let document = Document::parse(markup)
        .map_err(|error| CodedError::new(SVG_PARSE_FAILED, error.to_string()))?;

    let Some(title_bar) = document.descendants().find(|node| {
        node.is_element() && node.attribute("transform") == Some(TITLE_BAR_TRANSFORM)
    }) else {
        log::info!("no title bar group found, leaving document as is");
        return Ok((markup.to_owned(), TrimOutcome::AlreadyTrimmed));
    };

    let mut edits = vec![Edit {
        range: title_bar.range(),
        replacement: String::new(),
    }];

    let remaining = document
        .descendants()
        .filter(|node| node.is_element() && !is_within(*node, title_bar))
        .collect::<Vec<_>>();

    let mut shifted_elements = 0;
    for node in &remaining {
        let Some(attribute) = node.attributes().find(|attr| attr.name() == "transform") else {
            continue;
        };
        let shifted = shift_transform(attribute.value())
            .with_context(|| format!("failed to shift <{}> element", node.tag_name().name()))?;
        edits.push(Edit {
            range: attribute.range_value(),
            replacement: escape_attribute(&shifted),
        });
        shifted_elements += 1;
    }

    let background = remaining.iter().find(|node| {
        node.attribute("fill") == Some(BACKGROUND_FILL) && node.attribute("height").is_some()
    });
    let background_resized = match background {
        Some(node) => {
            let attribute = node
                .attributes()
                .find(|attr| attr.name() == "height")
                .ok_or_else(|| anyhow!("background rect lost its height attribute"))?;
            let height: f64 = attribute.value().trim().parse().with_context(|| {
                format!("background rect height '{}' is not a number", attribute.value())
            })?;
            edits.push(Edit {
                range: attribute.range_value(),
                replacement: format_number(height - SHIFT_DISTANCE + PADDING_CORRECTION),
            });
            true
        }
        None => {
            log::warn!("no background rect with fill {BACKGROUND_FILL} found");
            false
        }
    };

    let svg = document
        .descendants()
        .find(|node| node.has_tag_name("svg"))
        .ok_or_else(|| CodedError::new(MISSING_VIEWBOX, "document has no <svg> element"))?;
    let view_box = svg
        .attributes()
        .find(|attr| attr.name() == "viewBox")
        .ok_or_else(|| CodedError::new(MISSING_VIEWBOX, "root <svg> has no viewBox"))?;
    let mut fields = view_box.value().split(' ').map(str::to_owned).collect::<Vec<_>>();
    if fields.len() != 4 {
        return Err(CodedError::new(
            INVALID_VIEWBOX,
            format!("viewBox '{}' must have four fields", view_box.value()),
        )
        .into());
    }
    let current_height: f64 = fields[3].parse().map_err(|_| {
        CodedError::new(
            INVALID_VIEWBOX,
            format!("viewBox height '{}' is not a number", fields[3]),
        )
    })?;
    let view_box_height =
        ((current_height - SHIFT_DISTANCE + PADDING_CORRECTION) * 10_000.0).round() / 10_000.0;
    fields[3] = format_number(view_box_height);
    edits.push(Edit {
        range: view_box.range_value(),
        replacement: fields.join(" "),
    });

    let trimmed = apply_edits(markup, edits)?;
    Ok((
        trimmed,
        TrimOutcome::Trimmed {
            shifted_elements,
            background_resized,
            view_box_height,
        },
    ))
}

fn apply_edits(markup: &str, mut edits: Vec<Edit>) -> Result<String> {
    edits.sort_by_key(|edit| std::cmp::Reverse(edit.range.start));
    let mut out = markup.to_owned();
    let mut floor = markup.len();
    for edit in edits {
        if edit.range.end > floor {
            return Err(anyhow!("overlapping svg edits at byte {}", edit.range.start));
        }
        floor = edit.range.start;
        out.replace_range(edit.range, &edit.replacement);
    }
    Ok(out)
}

/// Trims the svg at `svg_path` in place. Already-trimmed files are not rewritten.
pub fn trim_title_bar(svg_path: &Path) -> Result<TrimOutcome> {
    let markup = fs::read_to_string(svg_path)
        .with_context(|| format!("failed to read svg '{}'", svg_path.display()))?;
    let (trimmed, outcome) = trim_markup(&markup)
        .with_context(|| format!("failed to trim '{}'", svg_path.display()))?;
    if let TrimOutcome::Trimmed { .. } = outcome {
        fs::write(svg_path, trimmed)
            .with_context(|| format!("failed to write svg '{}'", svg_path.display()))?;
    }
    Ok(outcome)
}
