//! Tile palette: btop-style `theme[key]="value"` files and built-in palettes.

use ratatui::style::Color;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

use crate::Palette;
use tilepop::grid::MAX_TILE_KINDS;

/// One colour per tile type the core accepts.
pub const TILE_COLORS: usize = MAX_TILE_KINDS as usize;

#[derive(Debug, Clone)]
pub struct Theme {
    /// Ordinary tile colours by tile type.
    pub tiles: [Color; TILE_COLORS],
    pub hero: Color,
    /// Key and locked door share the "blacked out" look.
    pub locked: Color,
    pub bg: Color,
    pub div_line: Color,
    pub main_fg: Color,
    pub title: Color,
    pub inactive_fg: Color,
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

const fn rgb(hex: u32) -> Color {
    Color::Rgb((hex >> 16) as u8, (hex >> 8) as u8, hex as u8)
}

impl Default for Theme {
    fn default() -> Self {
        Self::onedark()
    }
}

impl Theme {
    /// One Dark colours.
    pub fn onedark() -> Self {
        Self {
            tiles: [
                rgb(0xE0_6C_75),
                rgb(0x98_C3_79),
                rgb(0x61_AF_EF),
                rgb(0xE5_C0_7B),
                rgb(0xC6_78_DD),
                rgb(0x56_B6_C2),
                rgb(0xD1_9A_66),
                rgb(0xBE_50_46),
                rgb(0x3E_A0_7A),
                rgb(0x82_89_97),
            ],
            hero: rgb(0xFF_FF_FF),
            locked: rgb(0x1E_21_27),
            bg: rgb(0x31_35_3F),
            div_line: rgb(0x3F_44_4F),
            main_fg: rgb(0xAB_B2_BF),
            title: rgb(0xE5_C0_7B),
            inactive_fg: rgb(0x5C_63_70),
        }
    }

    /// Load a btop theme file, falling back to One Dark when `path` is missing.
    pub fn load(path: Option<&Path>, palette: Palette) -> Result<Self, ThemeError> {
        let mut theme = match path {
            Some(p) if p.exists() => {
                let s = std::fs::read_to_string(p)?;
                Self::from_map(&parse_theme_file(&s))
            }
            _ => Self::onedark(),
        };
        theme.apply_palette(palette);
        Ok(theme)
    }

    pub fn apply_palette(&mut self, palette: Palette) {
        match palette {
            Palette::Normal => {}
            Palette::HighContrast => {
                self.tiles = [
                    rgb(0xFF_00_00),
                    rgb(0x00_FF_00),
                    rgb(0x00_88_FF),
                    rgb(0xFF_FF_00),
                    rgb(0xFF_00_FF),
                    rgb(0x00_FF_FF),
                    rgb(0xFF_88_00),
                    rgb(0xFF_FF_FF),
                    rgb(0x88_00_FF),
                    rgb(0x00_88_44),
                ];
                self.locked = Color::Black;
            }
            Palette::Colorblind => {
                self.tiles = [
                    rgb(0x00_77_BB),
                    rgb(0xEE_77_33),
                    rgb(0x00_99_88),
                    rgb(0xCC_33_11),
                    rgb(0xEE_33_77),
                    rgb(0xBB_BB_00),
                    rgb(0x33_BB_EE),
                    rgb(0x00_44_88),
                    rgb(0xDD_AA_33),
                    rgb(0x99_44_88),
                ];
            }
        }
    }

    fn from_map(map: &HashMap<String, String>) -> Self {
        let base = Self::onedark();
        let get = |key: &str, fallback: Color| {
            map.get(key)
                .and_then(|v| parse_hex(v).ok())
                .unwrap_or(fallback)
        };
        Self {
            tiles: [
                get("cpu_end", base.tiles[0]),
                get("mem_box", base.tiles[1]),
                get("cpu_box", base.tiles[2]),
                get("title", base.tiles[3]),
                get("net_box", base.tiles[4]),
                get("hi_fg", base.tiles[5]),
                get("proc_misc", base.tiles[6]),
                get("temp_end", base.tiles[7]),
                get("download_end", base.tiles[8]),
                get("upload_end", base.tiles[9]),
            ],
            hero: get("selected_fg", base.hero),
            locked: get("main_bg", base.locked),
            bg: get("meter_bg", base.bg),
            div_line: get("div_line", base.div_line),
            main_fg: get("main_fg", base.main_fg),
            title: get("title", base.title),
            inactive_fg: get("inactive_fg", base.inactive_fg),
        }
    }

    #[inline]
    pub fn tile_color(&self, tile: u8) -> Color {
        self.tiles[tile as usize % TILE_COLORS]
    }
}

/// `theme[key]="value"` lines into a key -> value map; comments and junk are skipped.
fn parse_theme_file(s: &str) -> HashMap<String, String> {
    s.lines()
        .map(str::trim)
        .filter(|l| !l.starts_with('#'))
        .filter_map(|l| l.strip_prefix("theme["))
        .filter_map(|rest| {
            let (key, value) = rest.split_once(']')?;
            let (_, value) = value.split_once('=')?;
            let value = value.trim().trim_matches('"').trim_matches('\'');
            (!value.is_empty()).then(|| (key.trim().to_string(), value.to_string()))
        })
        .collect()
}

/// `#RRGGBB` or `#RGB`.
pub fn parse_hex(s: &str) -> Result<Color, ThemeError> {
    let digits = s.trim().trim_start_matches('#');
    let bad = || ThemeError::InvalidHex(digits.to_string());
    let channel = |from: usize, len: usize| -> Result<u8, ThemeError> {
        let v = u8::from_str_radix(digits.get(from..from + len).ok_or_else(bad)?, 16)
            .map_err(|_| bad())?;
        Ok(if len == 1 { v * 17 } else { v })
    };
    match digits.len() {
        6 => Ok(Color::Rgb(channel(0, 2)?, channel(2, 2)?, channel(4, 2)?)),
        3 => Ok(Color::Rgb(channel(0, 1)?, channel(1, 1)?, channel(2, 1)?)),
        _ => Err(bad()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_long_and_short() {
        assert!(matches!(parse_hex("#98C379").unwrap(), Color::Rgb(0x98, 0xC3, 0x79)));
        assert!(matches!(parse_hex("#FFF").unwrap(), Color::Rgb(255, 255, 255)));
        assert!(parse_hex("#12").is_err());
        assert!(parse_hex("#GG0000").is_err());
    }

    #[test]
    fn test_theme_file_overrides_tiles() {
        let map = parse_theme_file("# comment\ntheme[cpu_end]=\"#010203\"\ntheme[bogus]=''\n");
        assert_eq!(map.len(), 1);
        let theme = Theme::from_map(&map);
        assert!(matches!(theme.tile_color(0), Color::Rgb(1, 2, 3)));
        assert_eq!(theme.tile_color(TILE_COLORS as u8), theme.tile_color(0));
    }

    #[test]
    fn test_every_tile_kind_has_its_own_colour() {
        for palette in [Palette::Normal, Palette::HighContrast, Palette::Colorblind] {
            let mut theme = Theme::onedark();
            theme.apply_palette(palette);
            let colours: Vec<Color> = (0..MAX_TILE_KINDS).map(|t| theme.tile_color(t)).collect();
            for (i, a) in colours.iter().enumerate() {
                for b in &colours[i + 1..] {
                    assert_ne!(a, b, "{palette:?}");
                }
            }
        }
    }
}
