//! mIRC color codes and the lookup tables that map Nagios tokens to them.
//!
//! Lookups never fail: a token missing from a table maps to [`Style::Plain`]
//! and renders as-is.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// mIRC color control character. Followed by a two-digit code to set a color,
/// or on its own to reset it.
pub const COLOR_CONTROL: char = '\x03';

/// The 16 standard mIRC colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IrcColor {
    White,
    Black,
    Blue,
    Green,
    Red,
    Brown,
    Purple,
    Orange,
    Yellow,
    LightGreen,
    Cyan,
    LightCyan,
    LightBlue,
    Pink,
    Grey,
    LightGrey,
}

impl IrcColor {
    /// Numeric mIRC code (0–15).
    pub fn code(&self) -> u8 {
        match self {
            Self::White => 0,
            Self::Black => 1,
            Self::Blue => 2,
            Self::Green => 3,
            Self::Red => 4,
            Self::Brown => 5,
            Self::Purple => 6,
            Self::Orange => 7,
            Self::Yellow => 8,
            Self::LightGreen => 9,
            Self::Cyan => 10,
            Self::LightCyan => 11,
            Self::LightBlue => 12,
            Self::Pink => 13,
            Self::Grey => 14,
            Self::LightGrey => 15,
        }
    }
}

/// How a text segment is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Style {
    /// No control codes.
    #[default]
    Plain,
    Color(IrcColor),
}

impl Style {
    /// Wrap `text` in this style. The closing bare color code resets the color.
    pub fn paint(&self, text: &str) -> String {
        match self {
            Self::Plain => text.to_string(),
            Self::Color(color) => {
                format!("{COLOR_CONTROL}{:02}{text}{COLOR_CONTROL}", color.code())
            }
        }
    }
}

/// Token → color table with a [`Style::Plain`] fallback.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColorTable(HashMap<String, IrcColor>);

impl ColorTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an entry (builder style).
    pub fn with(mut self, token: impl Into<String>, color: IrcColor) -> Self {
        self.0.insert(token.into(), color);
        self
    }

    /// Style for `token`; exact, case-sensitive match.
    pub fn style(&self, token: &str) -> Style {
        self.0
            .get(token)
            .copied()
            .map(Style::Color)
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn extend(&mut self, other: &ColorTable) {
        self.0
            .extend(other.0.iter().map(|(k, v)| (k.clone(), *v)));
    }
}

/// The three lookup tables used by the formatter.
///
/// `Palette::default()` is empty (the shape of a config override section);
/// [`Palette::standard`] carries the built-in colors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Palette {
    /// Keyed by notification type (`PROBLEM`, `RECOVERY`, ...).
    pub notification: ColorTable,
    /// Keyed by service state (`OK`, `WARNING`, ...).
    pub service: ColorTable,
    /// Keyed by host state (`UP`, `DOWN`, ...).
    pub host: ColorTable,
}

impl Palette {
    /// Built-in Nagios colors.
    pub fn standard() -> Self {
        use IrcColor::*;

        Self {
            notification: ColorTable::new()
                .with("PROBLEM", Red)
                .with("RECOVERY", LightGreen)
                .with("ACKNOWLEDGEMENT", Purple)
                .with("FLAPPINGSTART", Brown)
                .with("FLAPPINGSTOP", LightBlue)
                .with("FLAPPINGDISABLED", Black)
                .with("DOWNTIMESTART", Pink)
                .with("DOWNTIMEEND", LightCyan)
                .with("DOWNTIMECANCELLED", Black),
            service: ColorTable::new()
                .with("OK", LightGreen)
                .with("WARNING", Orange)
                .with("UNKNOWN", Grey)
                .with("CRITICAL", Red),
            host: ColorTable::new()
                .with("UP", LightGreen)
                .with("DOWN", Red)
                .with("UNREACHABLE", Orange),
        }
    }

    /// Overlay `overrides` on top of this palette, entry by entry.
    pub fn extend(&mut self, overrides: &Palette) {
        self.notification.extend(&overrides.notification);
        self.service.extend(&overrides.service);
        self.host.extend(&overrides.host);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paint_wraps_in_color_codes() {
        assert_eq!(Style::Color(IrcColor::Red).paint("PROBLEM"), "\x0304PROBLEM\x03");
        assert_eq!(Style::Color(IrcColor::LightBlue).paint("x"), "\x0312x\x03");
    }

    #[test]
    fn plain_style_leaves_text_alone() {
        assert_eq!(Style::Plain.paint("as is"), "as is");
    }

    #[test]
    fn lookup_miss_falls_back_to_plain() {
        let palette = Palette::standard();
        assert_eq!(palette.notification.style("CUSTOM"), Style::Plain);
        assert_eq!(palette.service.style("critical"), Style::Plain);
        assert_eq!(palette.host.style(""), Style::Plain);
    }

    #[test]
    fn standard_tables_match_nagios_tokens() {
        let palette = Palette::standard();
        assert_eq!(palette.notification.len(), 9);
        assert_eq!(palette.notification.style("RECOVERY"), Style::Color(IrcColor::LightGreen));
        assert_eq!(palette.service.style("WARNING"), Style::Color(IrcColor::Orange));
        assert_eq!(palette.service.style("UNKNOWN"), Style::Color(IrcColor::Grey));
        assert_eq!(palette.host.style("UNREACHABLE"), Style::Color(IrcColor::Orange));
    }

    #[test]
    fn overrides_replace_and_add_entries() {
        let mut palette = Palette::standard();
        let overrides = Palette {
            notification: ColorTable::new()
                .with("PROBLEM", IrcColor::Pink)
                .with("CUSTOM", IrcColor::Cyan),
            ..Palette::default()
        };
        palette.extend(&overrides);

        assert_eq!(palette.notification.style("PROBLEM"), Style::Color(IrcColor::Pink));
        assert_eq!(palette.notification.style("CUSTOM"), Style::Color(IrcColor::Cyan));
        assert_eq!(palette.notification.style("RECOVERY"), Style::Color(IrcColor::LightGreen));
        assert_eq!(palette.service.len(), 4);
    }

    #[test]
    fn palette_deserializes_from_color_names() {
        let palette: Palette = toml::from_str(
            r#"
[service]
CRITICAL = "light_blue"
"#,
        )
        .unwrap();
        assert_eq!(palette.service.style("CRITICAL"), Style::Color(IrcColor::LightBlue));
        assert!(palette.notification.is_empty());
    }
}
