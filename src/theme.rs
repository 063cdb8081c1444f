//! Theme loading: btop-style `theme[key]="value"` and hex → ratatui Color.

use crate::token::TokenKind;
use ratatui::style::Color;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// One Dark palette and UI colours loaded from a theme file.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Token colours by `TokenKind::color_index`: fire, water, grass, electric, psychic, dark, berry.
    pub tokens: [Color; 7],
    /// Board background.
    pub bg: Color,
    /// Grid / border.
    pub div_line: Color,
    /// Text (score, turn).
    pub main_fg: Color,
    /// Highlight / titles / cursor.
    pub title: Color,
    /// Inactive / secondary text, hint outline.
    pub inactive_fg: Color,
    /// Low HP, low time, invalid moves.
    pub warning: Color,
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

impl Default for Theme {
    fn default() -> Self {
        Self::onedark_default()
    }
}

const fn rgb(hex: u32) -> Color {
    Color::Rgb((hex >> 16) as u8, (hex >> 8) as u8, hex as u8)
}

const ONEDARK_TOKENS: [Color; 7] = [
    rgb(0xE06C75), // cpu_end / red
    rgb(0x61AFEF), // cpu_box / blue
    rgb(0x98C379), // mem_box / green
    rgb(0xE5C07B), // title / yellow
    rgb(0xC678DD), // net_box / magenta
    rgb(0x5C6370), // inactive_fg / grey
    rgb(0x56B6C2), // hi_fg / cyan
];

impl Theme {
    /// Hardcoded One Dark defaults: exact hex values from onedark.theme.
    pub fn onedark_default() -> Self {
        Self {
            tokens: ONEDARK_TOKENS,
            bg: rgb(0x31353F),
            div_line: rgb(0x3F444F),
            main_fg: rgb(0xABB2BF),
            title: rgb(0xE5C07B),
            inactive_fg: rgb(0x5C6370),
            warning: rgb(0xE06C75),
        }
    }

    /// Load theme from a btop-style file: `theme[key]="value"` or `theme[key]='value'`.
    /// Falls back to One Dark defaults if path is None or file is missing.
    /// `palette` selects colour variant: Normal (theme), HighContrast, or Colorblind.
    pub fn load(path: Option<&Path>, palette: crate::Palette) -> Result<Self, ThemeError> {
        let path = match path {
            Some(p) if p.exists() => p,
            _ => return Ok(Self::default_for_palette(palette)),
        };
        let s = std::fs::read_to_string(path)?;
        let map = parse_theme_file(&s);
        let mut theme = Self::from_map(&map);
        theme.apply_palette(palette);
        Ok(theme)
    }

    fn default_for_palette(palette: crate::Palette) -> Self {
        let mut t = Self::onedark_default();
        t.apply_palette(palette);
        t
    }

    /// Override token colours for high-contrast or colorblind.
    pub fn apply_palette(&mut self, palette: crate::Palette) {
        match palette {
            crate::Palette::Normal => {}
            crate::Palette::HighContrast => {
                self.tokens = [
                    rgb(0xFF0000), // red
                    rgb(0x0088FF), // blue
                    rgb(0x00FF00), // bright green
                    rgb(0xFFFF00), // yellow
                    rgb(0xFF00FF), // magenta
                    rgb(0xFFFFFF), // white
                    rgb(0x00FFFF), // cyan
                ];
            }
            crate::Palette::Colorblind => {
                // Paul Tol's vibrant set; glyphs carry the kind too
                self.tokens = [
                    rgb(0xEE7733), // orange
                    rgb(0x0077BB), // blue
                    rgb(0x009988), // teal
                    rgb(0xBBBB00), // yellow
                    rgb(0xEE3377), // magenta
                    rgb(0xBBBBBB), // grey
                    rgb(0x33BBEE), // cyan
                ];
            }
        }
    }

    fn from_map(map: &HashMap<String, String>) -> Self {
        let get = |key: &str| map.get(key).and_then(|v| parse_hex(v).ok());
        let base = Self::onedark_default();
        Self {
            tokens: [
                get("cpu_end").or_else(|| get("temp_end")).unwrap_or(base.tokens[0]),
                get("cpu_box").unwrap_or(base.tokens[1]),
                get("mem_box").or_else(|| get("cpu_start")).unwrap_or(base.tokens[2]),
                get("title").or_else(|| get("cpu_mid")).unwrap_or(base.tokens[3]),
                get("net_box").unwrap_or(base.tokens[4]),
                get("inactive_fg").unwrap_or(base.tokens[5]),
                get("hi_fg").or_else(|| get("proc_misc")).unwrap_or(base.tokens[6]),
            ],
            bg: get("meter_bg").unwrap_or(base.bg),
            div_line: get("div_line").unwrap_or(base.div_line),
            main_fg: get("main_fg").unwrap_or(base.main_fg),
            title: get("title").unwrap_or(base.title),
            inactive_fg: get("inactive_fg").unwrap_or(base.inactive_fg),
            warning: get("cpu_end").or_else(|| get("temp_end")).unwrap_or(base.warning),
        }
    }

    #[inline]
    pub fn token_color(&self, kind: TokenKind) -> Color {
        self.tokens[kind.color_index() as usize % self.tokens.len()]
    }
}

/// Parse btop-style theme file into key -> value map.
fn parse_theme_file(s: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in s.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some(stripped) = line.strip_prefix("theme[") else {
            continue;
        };
        let Some(end) = stripped.find(']') else {
            continue;
        };
        let key = stripped[..end].trim();
        let rest = stripped[end + 1..].trim();
        if let Some(value) = rest.strip_prefix('=') {
            let value = value.trim().trim_matches('"').trim_matches('\'');
            if !value.is_empty() {
                map.insert(key.to_string(), value.to_string());
            }
        }
    }
    map
}

/// Parse hex colour "#RRGGBB" or "#RGB" into ratatui Color.
pub fn parse_hex(s: &str) -> Result<Color, ThemeError> {
    let s = s.trim().trim_start_matches('#');
    let invalid = || ThemeError::InvalidHex(s.to_string());
    let channel = |digits: &str, scale: u8| {
        u8::from_str_radix(digits, 16)
            .map(|v| v * scale)
            .map_err(|_| invalid())
    };
    let (r, g, b) = match s.len() {
        6 => (channel(&s[0..2], 1)?, channel(&s[2..4], 1)?, channel(&s[4..6], 1)?),
        3 => (channel(&s[0..1], 17)?, channel(&s[1..2], 17)?, channel(&s[2..3], 17)?),
        _ => return Err(invalid()),
    };
    Ok(Color::Rgb(r, g, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_6() {
        let c = parse_hex("#98C379").unwrap();
        assert!(matches!(c, Color::Rgb(0x98, 0xC3, 0x79)));
    }

    #[test]
    fn test_parse_hex_3() {
        let c = parse_hex("#FFF").unwrap();
        assert!(matches!(c, Color::Rgb(255, 255, 255)));
    }

    #[test]
    fn test_parse_hex_rejects_garbage() {
        assert!(parse_hex("#12345").is_err());
        assert!(parse_hex("#GGHHII").is_err());
    }

    #[test]
    fn test_parse_theme_line() {
        let map = parse_theme_file(r##"theme[meter_bg]="#31353F""##);
        assert_eq!(map.get("meter_bg"), Some(&"#31353F".to_string()));
    }

    #[test]
    fn test_theme_file_overrides_token_colour() {
        let map = parse_theme_file("theme[cpu_end]=\"#FF0000\"\n# comment\ntheme[main_fg]='#000'");
        let theme = Theme::from_map(&map);
        assert_eq!(theme.token_color(TokenKind::Fire), Color::Rgb(255, 0, 0));
        assert_eq!(theme.main_fg, Color::Rgb(0, 0, 0));
        assert_eq!(theme.token_color(TokenKind::Water), ONEDARK_TOKENS[1]);
    }

    #[test]
    fn test_palettes_keep_kinds_distinct() {
        for palette in [crate::Palette::Normal, crate::Palette::HighContrast, crate::Palette::Colorblind] {
            let theme = Theme::default_for_palette(palette);
            for (i, a) in theme.tokens.iter().enumerate() {
                assert!(theme.tokens[i + 1..].iter().all(|b| b != a));
            }
        }
    }
}
