//! Configuration file support for lockstep
//!
//! Config file location: `~/.config/lockstep/config.toml` (XDG_CONFIG_HOME)
//!
//! Example config:
//! ```toml
//! [ui]
//! tab_width = 4
//! context_lines = 3
//! selected_marker = "▶"
//! line_numbers = true
//!
//! [colors]
//! inserted = "#A3BE8C"
//! deleted = "#BF616A"
//! changed = "#EBCB8B"
//! applied = "#81A1C1"
//! hunk_header = "#4C566A"
//! ```

use ratatui::style::Color;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub ui: UiConfig,
    pub colors: ColorConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Spaces substituted for a tab when painting
    pub tab_width: usize,
    /// Unchanged lines kept around each hunk
    pub context_lines: usize,
    /// Gutter marker on the selected difference
    pub selected_marker: String,
    pub line_numbers: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            tab_width: 4,
            context_lines: 3,
            selected_marker: "▶".to_string(),
            line_numbers: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ColorConfig {
    pub inserted: String,
    pub deleted: String,
    pub changed: String,
    pub applied: String,
    pub hunk_header: String,
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            inserted: "#A3BE8C".to_string(),
            deleted: "#BF616A".to_string(),
            changed: "#EBCB8B".to_string(),
            applied: "#81A1C1".to_string(),
            hunk_header: "#4C566A".to_string(),
        }
    }
}

/// Resolved settings threaded explicitly through construction; there is no
/// ambient settings singleton.
#[derive(Debug, Clone)]
pub struct Settings {
    pub tab_width: usize,
    pub context_lines: usize,
    pub selected_marker: String,
    pub line_numbers: bool,
    pub colors: ColorTable,
}

/// Color per difference type, applied state overriding the base color
#[derive(Debug, Clone, Copy)]
pub struct ColorTable {
    pub inserted: Color,
    pub deleted: Color,
    pub changed: Color,
    pub applied: Color,
    pub hunk_header: Color,
}

impl Config {
    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("lockstep").join("config.toml"))
    }

    /// Load the config file, falling back to defaults when it is missing
    /// or malformed.
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        let Ok(content) = std::fs::read_to_string(&path) else {
            return Self::default();
        };
        toml::from_str(&content).unwrap_or_default()
    }

    pub fn resolve(self) -> Settings {
        let defaults = ColorConfig::default();
        Settings {
            tab_width: self.ui.tab_width.max(1),
            context_lines: self.ui.context_lines,
            selected_marker: self.ui.selected_marker,
            line_numbers: self.ui.line_numbers,
            colors: ColorTable {
                inserted: parse_hex(&self.colors.inserted)
                    .unwrap_or_else(|| parse_hex(&defaults.inserted).unwrap_or(Color::Green)),
                deleted: parse_hex(&self.colors.deleted)
                    .unwrap_or_else(|| parse_hex(&defaults.deleted).unwrap_or(Color::Red)),
                changed: parse_hex(&self.colors.changed)
                    .unwrap_or_else(|| parse_hex(&defaults.changed).unwrap_or(Color::Yellow)),
                applied: parse_hex(&self.colors.applied)
                    .unwrap_or_else(|| parse_hex(&defaults.applied).unwrap_or(Color::Blue)),
                hunk_header: parse_hex(&self.colors.hunk_header)
                    .unwrap_or_else(|| parse_hex(&defaults.hunk_header).unwrap_or(Color::DarkGray)),
            },
        }
    }
}

/// Parse a `#rrggbb` hex color.
fn parse_hex(value: &str) -> Option<Color> {
    let hex = value.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some(Color::Rgb(r, g, b))
}
