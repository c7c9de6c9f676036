//! tilepop: flood-fill tile-matching puzzle in the terminal.

mod animation;
mod app;
mod input;
mod theme;
mod ui;

use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use app::App;
use clap::{Parser, ValueEnum};
use tilepop::GameConfig;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_file.as_deref())?;

    let theme = theme::Theme::load(args.theme.as_deref(), args.palette).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "theme not loaded, using One Dark");
        theme::Theme::default()
    });
    let config = args.game_config();
    config.validate()?;
    tracing::info!(size = config.field_size, kinds = config.tile_kinds, seed = ?config.seed, "starting");

    let mut app = App::new(&args, config, theme)?;
    app.run()?;
    Ok(())
}

/// File logging; a TUI owns stdout. `RUST_LOG` overrides the default `info` filter.
fn init_logging(path: Option<&std::path::Path>) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let log_file = std::fs::File::create(path)
        .with_context(|| format!("creating log file {}", path.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(Mutex::new(log_file))
        .with_ansi(false)
        .init();
    Ok(())
}

/// Flood-fill tile-matching puzzle in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "tilepop",
    version,
    about = "Tile-matching puzzle in the terminal. Pop connected groups of one colour before the clock runs out.",
    long_about = "tilepop is a terminal puzzle game.\n\n\
        Pick a tile: if it belongs to a group of more than THRESHOLD touching tiles of the same \
        colour (up/down/left/right), the whole group pops, the tiles above fall into the gaps \
        and new tiles drop in from the top. Every pop scores 10. Each round lasts TIME seconds.\n\n\
        CONTROLS:\n  Mouse click  Pick tile    Arrows / hjkl  Move cursor\n  Enter/Space  Pick / start P              Pause      Q / Esc  Quit\n\n\
        Use --theme to load a btop-style theme (e.g. onedark.theme)."
)]
pub struct Args {
    /// Grid is SIZE x SIZE tiles.
    #[arg(short, long, default_value = "8", value_name = "SIZE")]
    pub size: usize,

    /// Number of tile colours.
    #[arg(short, long, default_value = "4", value_name = "N")]
    pub kinds: u8,

    /// A group must be larger than this to pop.
    #[arg(long, default_value = "2", value_name = "N")]
    pub threshold: usize,

    /// Round length in seconds.
    #[arg(long, default_value = "10", value_name = "SECS")]
    pub time: u32,

    /// Seed for a reproducible board.
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,

    /// Stop after this many levels (plays forever if not set).
    #[arg(long, value_name = "N")]
    pub levels: Option<u32>,

    /// Disable fade and fall animations.
    #[arg(long)]
    pub no_animation: bool,

    /// Path to theme file (btop-style theme[key]=\"value\"). Uses One Dark if not set.
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<PathBuf>,

    /// Colour palette: normal (theme), high-contrast, or colorblind.
    #[arg(long, default_value = "normal")]
    pub palette: Palette,

    /// Write logs to this file (filter with RUST_LOG).
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Target render frames per second.
    #[arg(long, default_value = "60.0", value_name = "RATE", value_parser = parse_rate)]
    pub tick_rate: f64,
}

impl Args {
    fn game_config(&self) -> GameConfig {
        GameConfig {
            field_size: self.size,
            tile_kinds: self.kinds,
            match_threshold: self.threshold,
            countdown_secs: self.time,
            max_level: self.levels,
            seed: self.seed,
            ..GameConfig::default()
        }
    }

    pub fn frame_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate.clamp(1.0, 240.0))
    }
}

/// Finite, positive frames per second.
fn parse_rate(s: &str) -> Result<f64, String> {
    let rate: f64 = s.parse().map_err(|e| format!("{e}"))?;
    if rate.is_finite() && rate > 0.0 {
        Ok(rate)
    } else {
        Err(format!("rate must be a positive number, got {s}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Palette {
    #[default]
    Normal,

    #[value(alias = "highcontrast", alias = "contrast")]
    HighContrast,

    #[value(alias = "colourblind")]
    Colorblind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_map_onto_config() {
        let args = Args::parse_from(["tilepop", "--size", "6", "--kinds", "5", "--time", "30", "--seed", "7", "--levels", "3"]);
        let config = args.game_config();
        assert_eq!(config.field_size, 6);
        assert_eq!(config.tile_kinds, 5);
        assert_eq!(config.countdown_secs, 30);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.max_level, Some(3));
        assert_eq!(config.match_threshold, 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_tick_rate_rejects_non_finite() {
        for bad in ["NaN", "inf", "-5", "0"] {
            assert!(Args::try_parse_from(["tilepop", "--tick-rate", bad]).is_err(), "{bad}");
        }
        let args = Args::parse_from(["tilepop", "--tick-rate", "1000"]);
        assert_eq!(args.frame_duration(), Duration::from_secs_f64(1.0 / 240.0));
    }

    #[test]
    fn test_palette_aliases() {
        let args = Args::parse_from(["tilepop", "--palette", "colourblind"]);
        assert_eq!(args.palette, Palette::Colorblind);
    }
}
