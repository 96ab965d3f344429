use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use serde_yaml::{Mapping, Value};

use crate::error_codes::{CodedError, THEME_INVALID_COLOR, THEME_KEY_MISSING};

const BUNDLED_THEME_NAME: &str = "onedark.yml";
const BUNDLED_THEME: &str = include_str!("../assets/onedark.yml");

const BACKGROUND_SLOT: &str = "base00";
const FOREGROUND_SLOT: &str = "base05";
const NORMAL_SLOTS: [&str; 8] = [
    "base01", "base08", "base0B", "base09", "base0D", "base0E", "base0C", "base06",
];
const BRIGHT_SLOTS: [&str; 8] = [
    "base02", "base12", "base14", "base13", "base16", "base17", "base15", "base07",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn parse_hex(raw: &str) -> Option<Self> {
        let hex = raw.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).ok();
        Some(Self::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }

    pub fn hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Mixes `self` toward `other`; `amount` 0.0 keeps `self`.
    pub fn blend(self, other: Rgb, amount: f32) -> Rgb {
        let mix = |a: u8, b: u8| {
            let value = f32::from(a) + (f32::from(b) - f32::from(a)) * amount;
            value.round().clamp(0.0, 255.0) as u8
        };
        Rgb::new(mix(self.r, other.r), mix(self.g, other.g), mix(self.b, other.b))
    }
}

/// Sixteen-color terminal palette plus default background and foreground.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalTheme {
    pub background: Rgb,
    pub foreground: Rgb,
    pub normal: [Rgb; 8],
    pub bright: [Rgb; 8],
}

impl TerminalTheme {
    /// Loads a base24 theme file, falling back to the bundled One Dark palette when
    /// no path is given or the file does not exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) if path.is_file() => {
                let text = fs::read_to_string(path)
                    .with_context(|| format!("failed to read theme '{}'", path.display()))?;
                Self::from_base24_yaml(&text)
                    .with_context(|| format!("failed to load theme '{}'", path.display()))
            }
            Some(path) => {
                log::warn!(
                    "theme '{}' not found, using bundled {}",
                    path.display(),
                    BUNDLED_THEME_NAME
                );
                Self::bundled()
            }
            None => Self::bundled(),
        }
    }

    pub fn bundled() -> Result<Self> {
        Self::from_base24_yaml(BUNDLED_THEME)
            .with_context(|| format!("failed to load bundled theme {BUNDLED_THEME_NAME}"))
    }

    pub fn from_base24_yaml(text: &str) -> Result<Self> {
        let document: Value = serde_yaml::from_str(text).map_err(|error| {
            let location = error
                .location()
                .map(|location| format!("line {}, column {}", location.line(), location.column()))
                .unwrap_or_else(|| "unknown location".to_owned());
            anyhow!("failed to parse theme yaml at {}: {}", location, error)
        })?;

        // Newer base24 files nest the slots under `palette`.
        let slots = match document.get("palette").and_then(Value::as_mapping) {
            Some(palette) => palette,
            None => document
                .as_mapping()
                .ok_or_else(|| anyhow!("theme yaml must be a mapping of base24 slots"))?,
        };

        let mut normal = [Rgb::new(0, 0, 0); 8];
        for (color, slot) in normal.iter_mut().zip(NORMAL_SLOTS) {
            *color = slot_color(slots, slot)?;
        }
        let mut bright = [Rgb::new(0, 0, 0); 8];
        for (color, slot) in bright.iter_mut().zip(BRIGHT_SLOTS) {
            *color = slot_color(slots, slot)?;
        }

        Ok(Self {
            background: slot_color(slots, BACKGROUND_SLOT)?,
            foreground: slot_color(slots, FOREGROUND_SLOT)?,
            normal,
            bright,
        })
    }

    /// Resolves one of the sixteen standard ANSI color indices.
    pub fn ansi(&self, index: u8) -> Rgb {
        match index {
            0..=7 => self.normal[usize::from(index)],
            _ => self.bright[usize::from(index.saturating_sub(8).min(7))],
        }
    }
}

fn slot_color(slots: &Mapping, slot: &str) -> Result<Rgb> {
    let value = slots.get(slot).ok_or_else(|| {
        CodedError::new(
            THEME_KEY_MISSING,
            format!("theme is missing base24 slot '{slot}'"),
        )
    })?;

    // An unquoted all-digit value such as 000000 arrives as a number.
    let raw = match value {
        Value::String(text) => text.clone(),
        Value::Number(number) => match number.as_u64() {
            Some(digits) => format!("{digits:06}"),
            None => number.to_string(),
        },
        other => format!("{other:?}"),
    };

    Rgb::parse_hex(&raw).ok_or_else(|| {
        CodedError::new(
            THEME_INVALID_COLOR,
            format!("theme slot '{slot}' has invalid hex color '{raw}'"),
        )
        .into()
    })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::{Rgb, TerminalTheme};
    use crate::error_codes::{find_coded_error, THEME_INVALID_COLOR, THEME_KEY_MISSING};

    #[test]
    fn bundled_theme_maps_base24_slots() {
        let theme = TerminalTheme::bundled().expect("bundled theme should load");
        assert_eq!(theme.background.hex(), "#282c34");
        assert_eq!(theme.foreground.hex(), "#abb2bf");
        assert_eq!(theme.normal[0].hex(), "#3f4451");
        assert_eq!(theme.normal[1].hex(), "#e06c75");
        assert_eq!(theme.normal[2].hex(), "#98c379");
        assert_eq!(theme.normal[7].hex(), "#e6e6e6");
        assert_eq!(theme.bright[0].hex(), "#4f5666");
        assert_eq!(theme.bright[1].hex(), "#ff7b86");
        assert_eq!(theme.bright[7].hex(), "#ffffff");
        assert_eq!(theme.ansi(9), theme.bright[1]);
    }

    #[test]
    fn missing_path_falls_back_to_bundled_theme() {
        let dir = tempdir().unwrap();
        let theme = TerminalTheme::load(Some(dir.path().join("absent.yml").as_path())).unwrap();
        assert_eq!(theme, TerminalTheme::bundled().unwrap());
    }

    #[test]
    fn missing_slot_is_a_key_error() {
        let err = TerminalTheme::from_base24_yaml("base00: \"000000\"\n").unwrap_err();
        let coded = find_coded_error(&err).expect("expected coded error");
        assert_eq!(coded.code, THEME_KEY_MISSING);
    }

    #[test]
    fn invalid_hex_is_reported() {
        let yaml = super::BUNDLED_THEME.replace("\"e06c75\"", "\"nothex\"");
        let err = TerminalTheme::from_base24_yaml(&yaml).unwrap_err();
        let coded = find_coded_error(&err).expect("expected coded error");
        assert_eq!(coded.code, THEME_INVALID_COLOR);
        assert!(coded.message.contains("base08"));
    }

    #[test]
    fn custom_theme_file_supports_palette_section_and_numeric_values() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("custom.yml");
        let mut yaml = String::from("system: base24\nname: Custom\npalette:\n");
        for slot in [
            "base00", "base01", "base02", "base03", "base04", "base05", "base06", "base07",
            "base08", "base09", "base0A", "base0B", "base0C", "base0D", "base0E", "base0F",
            "base10", "base11", "base12", "base13", "base14", "base15", "base16", "base17",
        ] {
            yaml.push_str(&format!("  {slot}: \"#112233\"\n"));
        }
        yaml = yaml.replace("base00: \"#112233\"", "base00: 000000");
        fs::write(&path, yaml).unwrap();

        let theme = TerminalTheme::load(Some(path.as_path())).unwrap();
        assert_eq!(theme.background, Rgb::new(0, 0, 0));
        assert_eq!(theme.foreground, Rgb::new(0x11, 0x22, 0x33));
    }

    #[test]
    fn blend_moves_toward_other_color() {
        let white = Rgb::new(255, 255, 255);
        let black = Rgb::new(0, 0, 0);
        assert_eq!(white.blend(black, 0.0), white);
        assert_eq!(white.blend(black, 1.0), black);
        assert_eq!(white.blend(black, 0.5), Rgb::new(128, 128, 128));
    }
}
