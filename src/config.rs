// Copyright (c) 2026 rezky_nightky

use std::io::IsTerminal;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{bail, Context};
use clap::Parser;

use crate::charset::{build_chars, charset_from_str, locale_is_utf8, parse_user_hex_chars, Charset};
use crate::cloud::RainConfig;
use crate::colorfile::{load_color_file, ColorEntry};
use crate::rng::DEFAULT_SEED;
use crate::runtime::{BoldMode, ColorMode, ColorScheme, ShadingMode};

pub fn color_enabled_stdout() -> bool {
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    if matches!(std::env::var("CLICOLOR").ok().as_deref(), Some("0")) {
        return false;
    }
    std::io::stdout().is_terminal()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct U16Range {
    pub low: u16,
    pub high: u16,
}

impl FromStr for U16Range {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (a, b) = s
            .split_once(',')
            .ok_or_else(|| "expected: NUM1,NUM2".to_string())?;
        let low: u16 = a
            .trim()
            .parse()
            .map_err(|_| "invalid low value (min 1 max 65535)".to_string())?;
        let high: u16 = b
            .trim()
            .parse()
            .map_err(|_| "invalid high value (min 1 max 65535)".to_string())?;
        if low == 0 || high == 0 || low > high {
            return Err("range must be >0 and low <= high".to_string());
        }
        Ok(Self { low, high })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(name = "glyphfall", version, disable_version_flag = true)]
pub struct Args {
    #[arg(
        short = 'a',
        long = "async",
        help_heading = "GENERAL",
        help = "Give every column its own random speed"
    )]
    pub async_mode: bool,

    #[arg(
        short = 'b',
        long = "bold",
        default_value_t = 1,
        help_heading = "APPEARANCE",
        help = "Bold mode (min 0 max 2): 0=off, 1=random, 2=all"
    )]
    pub bold: u8,

    #[arg(
        short = 'C',
        long = "colorfile",
        help_heading = "APPEARANCE",
        help = "Read a user palette from FILE (overrides --color)"
    )]
    pub colorfile: Option<PathBuf>,

    #[arg(
        short = 'c',
        long = "color",
        default_value = "green",
        help_heading = "APPEARANCE",
        help = "Color theme: green, green2, green3, yellow, orange, red, blue, cyan, gold, rainbow, purple, pink, pink2, vaporwave, gray"
    )]
    pub color: String,

    #[arg(
        short = 'D',
        long = "defaultbg",
        help_heading = "APPEARANCE",
        help = "Use the terminal's default background"
    )]
    pub default_bg: bool,

    #[arg(
        short = 'd',
        long = "density",
        default_value_t = 1.0,
        help_heading = "PERFORMANCE",
        help = "Droplet density (min 0 max 100, exclusive)"
    )]
    pub density: f32,

    #[arg(
        short = 'F',
        long = "fullwidth",
        help_heading = "GENERAL",
        help = "Spawn droplets on even columns only, for double-width glyphs"
    )]
    pub fullwidth: bool,

    #[arg(
        short = 'f',
        long = "fps",
        default_value_t = 60.0,
        help_heading = "PERFORMANCE",
        help = "Target frame rate (must be > 0)"
    )]
    pub fps: f64,

    #[arg(
        short = 'G',
        long = "glitchpct",
        default_value_t = 10.0,
        help_heading = "GLITCH (ADVANCED)",
        help = "Percentage of cells that glitch (min 0 max 100)"
    )]
    pub glitch_pct: f32,

    #[arg(
        short = 'g',
        long = "glitchms",
        default_value = "300,400",
        help_heading = "GLITCH (ADVANCED)",
        help = "Time between glitches in ms: LOW,HIGH (min 1 max 65535)"
    )]
    pub glitch_ms: U16Range,

    #[arg(
        short = 'l',
        long = "lingerms",
        default_value = "1,3000",
        help_heading = "GLITCH (ADVANCED)",
        help = "Time a stopped droplet lingers in ms: LOW,HIGH (min 1 max 65535)"
    )]
    pub linger_ms: U16Range,

    #[arg(
        short = 'M',
        long = "shadingmode",
        default_value_t = 0,
        help_heading = "APPEARANCE",
        help = "Shading mode (min 0 max 1): 0=random, 1=distance-from-head"
    )]
    pub shading_mode: u8,

    #[arg(
        short = 'm',
        long = "message",
        help_heading = "GENERAL",
        help = "Message shown through the gaps in the rain"
    )]
    pub message: Option<String>,

    #[arg(
        short = 'p',
        long = "profile",
        help_heading = "GENERAL",
        help = "Write per-frame timings to time_profile.txt"
    )]
    pub profile: bool,

    #[arg(
        short = 'r',
        long = "rippct",
        default_value_t = 33.33333,
        help_heading = "GLITCH (ADVANCED)",
        help = "Percentage of droplets that die early (min 0 max 100)"
    )]
    pub rippct: f32,

    #[arg(
        short = 'S',
        long = "speed",
        default_value_t = 8.0,
        help_heading = "PERFORMANCE",
        help = "Characters per second (min 0 exclusive, max 1000000)"
    )]
    pub speed: f32,

    #[arg(
        short = 's',
        long = "screensaver",
        help_heading = "GENERAL",
        help = "Exit on the first key press"
    )]
    pub screensaver: bool,

    #[arg(
        long = "shortpct",
        default_value_t = 50.0,
        help_heading = "GLITCH (ADVANCED)",
        help = "Percentage of short droplets (min 0 max 100)"
    )]
    pub shortpct: f32,

    #[arg(
        long = "charset",
        help_heading = "CHARSET",
        help = "Comma separated presets: ascii, extended, english, digits, punc, binary, hex, katakana, greek, cyrillic, arabic, hebrew, devanagari, braille, runic"
    )]
    pub charset: Option<String>,

    #[arg(
        long = "chars",
        help_heading = "CHARSET",
        help = "Code point ranges as hex pairs: LO,HI[,LO,HI...]"
    )]
    pub chars: Option<String>,

    #[arg(
        long = "colormode",
        help_heading = "APPEARANCE",
        help = "Force color mode (allowed: 0, 16, 32, 256). Default: detected from COLORTERM/TERM"
    )]
    pub colormode: Option<u16>,

    #[arg(
        long = "maxdpc",
        default_value_t = 3,
        help_heading = "PERFORMANCE",
        help = "Max droplets per column (min 1 max 3)"
    )]
    pub max_droplets_per_column: u8,

    #[arg(
        long = "noglitch",
        help_heading = "GLITCH (ADVANCED)",
        help = "Disable glitch effects"
    )]
    pub noglitch: bool,

    #[arg(
        long = "info",
        short = 'i',
        help_heading = "HELP",
        help = "Print build info and exit"
    )]
    pub info: bool,

    #[arg(
        long = "version",
        short = 'V',
        help_heading = "HELP",
        help = "Print version and exit"
    )]
    pub version: bool,
}

/// Everything the main loop needs, validated.
#[derive(Clone, Debug)]
pub struct Settings {
    pub rain: RainConfig,
    pub chars: Vec<char>,
    pub color_mode: ColorMode,
    pub scheme: ColorScheme,
    pub user_colors: Vec<ColorEntry>,
    pub default_background: bool,
    pub fps: f64,
    pub screensaver: bool,
    pub profile: bool,
}

fn require_f32_range(name: &str, v: f32, min: f32, max: f32) -> anyhow::Result<f32> {
    if !v.is_finite() {
        bail!("failed to apply {} {} (must be a finite number)", name, v);
    }
    if v < min || v > max {
        bail!("failed to apply {} {} (min {} max {})", name, v, min, max);
    }
    Ok(v)
}

fn require_f32_open(name: &str, v: f32, min: f32, max: f32) -> anyhow::Result<f32> {
    require_f32_range(name, v, min, max)?;
    if v <= min {
        bail!("failed to apply {} {} (must be greater than {})", name, v, min);
    }
    Ok(v)
}

fn require_u8_range(name: &str, v: u8, min: u8, max: u8) -> anyhow::Result<u8> {
    if v < min || v > max {
        bail!("failed to apply {} {} (min {} max {})", name, v, min, max);
    }
    Ok(v)
}

pub fn detect_color_mode_auto() -> ColorMode {
    let colorterm = std::env::var("COLORTERM")
        .unwrap_or_default()
        .to_ascii_lowercase();
    if colorterm.contains("truecolor") || colorterm.contains("24bit") {
        return ColorMode::TrueColor;
    }

    let term = std::env::var("TERM").unwrap_or_default().to_ascii_lowercase();
    if term == "dumb" {
        return ColorMode::Mono;
    }
    if term.contains("256color") {
        return ColorMode::Color256;
    }

    ColorMode::Color16
}

fn parse_color_mode(v: u16) -> anyhow::Result<ColorMode> {
    Ok(match v {
        0 => ColorMode::Mono,
        16 => ColorMode::Color16,
        32 => ColorMode::TrueColor,
        256 => ColorMode::Color256,
        _ => bail!("--colormode must be one of 0, 16, 32, or 256"),
    })
}

impl Settings {
    pub fn from_args(args: &Args) -> anyhow::Result<Self> {
        let color_mode = match args.colormode {
            Some(v) => parse_color_mode(v)?,
            None => detect_color_mode_auto(),
        };

        let bold_mode = match require_u8_range("--bold", args.bold, 0, 2)? {
            0 => BoldMode::Off,
            2 => BoldMode::All,
            _ => BoldMode::Random,
        };
        let shading_mode = match require_u8_range("--shadingmode", args.shading_mode, 0, 1)? {
            1 => ShadingMode::DistanceFromHead,
            _ => ShadingMode::Random,
        };

        if !args.fps.is_finite() || args.fps <= 0.0 {
            bail!("failed to apply --fps {} (must be greater than 0)", args.fps);
        }

        let density = require_f32_open("--density", args.density, 0.0, 100.0)?;
        if density >= 100.0 {
            bail!("failed to apply --density {} (must be less than 100)", density);
        }
        let speed = require_f32_open("--speed", args.speed, 0.0, 1_000_000.0)?;
        let glitch_pct = require_f32_range("--glitchpct", args.glitch_pct, 0.0, 100.0)?;
        let rip_pct = require_f32_range("--rippct", args.rippct, 0.0, 100.0)?;
        let short_pct = require_f32_range("--shortpct", args.shortpct, 0.0, 100.0)?;
        let max_dpc = require_u8_range("--maxdpc", args.max_droplets_per_column, 1, 3)?;

        let (scheme, user_colors) = match &args.colorfile {
            Some(path) => {
                let entries = load_color_file(path)?;
                (ColorScheme::User, entries)
            }
            None => {
                let scheme = ColorScheme::from_name(&args.color)
                    .with_context(|| format!("invalid color: {}", args.color))?;
                (scheme, Vec::new())
            }
        };

        let charset = match &args.charset {
            Some(spec) => charset_from_str(spec)?,
            None => Charset::none(),
        };
        let user_ranges = match &args.chars {
            Some(spec) => parse_user_hex_chars(spec)?,
            None => Vec::new(),
        };
        let chars = build_chars(&charset, &user_ranges, !locale_is_utf8());

        let mut rain = RainConfig {
            async_mode: args.async_mode,
            chars_per_sec: speed,
            droplet_density: density,
            glitchy: true,
            glitch_pct: glitch_pct / 100.0,
            glitch_low_ms: args.glitch_ms.low,
            glitch_high_ms: args.glitch_ms.high,
            linger_low_ms: args.linger_ms.low,
            linger_high_ms: args.linger_ms.high,
            die_early_pct: rip_pct / 100.0,
            short_pct: short_pct / 100.0,
            max_droplets_per_column: max_dpc,
            full_width: args.fullwidth,
            bold_mode,
            shading_mode,
            message: args.message.clone().filter(|m| !m.is_empty()),
            seed: DEFAULT_SEED,
        };
        if args.noglitch {
            rain.glitchy = false;
            rain.glitch_pct = 0.0;
            rain.glitch_low_ms = u16::MAX;
            rain.glitch_high_ms = u16::MAX;
        }

        Ok(Self {
            rain,
            chars,
            color_mode,
            scheme,
            user_colors,
            default_background: args.default_bg,
            fps: args.fps,
            screensaver: args.screensaver,
            profile: args.profile,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(argv: &[&str]) -> anyhow::Result<Settings> {
        let mut full = vec!["glyphfall", "--colormode", "256", "--charset", "binary"];
        full.extend_from_slice(argv);
        let args = Args::try_parse_from(full)?;
        Settings::from_args(&args)
    }

    #[test]
    fn defaults_match_the_documented_values() {
        let s = settings(&[]).unwrap();
        assert_eq!(s.rain.chars_per_sec, 8.0);
        assert_eq!(s.rain.droplet_density, 1.0);
        assert!((s.rain.glitch_pct - 0.1).abs() < 1e-6);
        assert_eq!((s.rain.glitch_low_ms, s.rain.glitch_high_ms), (300, 400));
        assert_eq!((s.rain.linger_low_ms, s.rain.linger_high_ms), (1, 3000));
        assert_eq!(s.rain.max_droplets_per_column, 3);
        assert_eq!(s.rain.bold_mode, BoldMode::Random);
        assert_eq!(s.scheme, ColorScheme::Green);
        assert_eq!(s.color_mode, ColorMode::Color256);
        assert_eq!(s.chars, vec!['0', '1']);
        assert_eq!(s.fps, 60.0);
    }

    #[test]
    fn percentages_become_fractions() {
        let s = settings(&["-G", "50", "-r", "25", "--shortpct", "0"]).unwrap();
        assert!((s.rain.glitch_pct - 0.5).abs() < 1e-6);
        assert!((s.rain.die_early_pct - 0.25).abs() < 1e-6);
        assert_eq!(s.rain.short_pct, 0.0);
    }

    #[test]
    fn noglitch_disables_glitching_entirely() {
        let s = settings(&["--noglitch"]).unwrap();
        assert!(!s.rain.glitchy);
        assert_eq!(s.rain.glitch_pct, 0.0);
        assert_eq!(s.rain.glitch_low_ms, u16::MAX);
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        for argv in [
            &["-G", "101"][..],
            &["-d", "0"],
            &["-d", "100"],
            &["-S", "0"],
            &["--maxdpc", "4"],
            &["-b", "3"],
            &["-M", "2"],
            &["-f", "0"],
        ] {
            let err = settings(argv).unwrap_err();
            assert!(err.to_string().contains("failed to apply"), "{argv:?}: {err}");
        }
    }

    #[test]
    fn reversed_or_zero_windows_fail_to_parse() {
        assert!(settings(&["-g", "400,300"]).is_err());
        assert!(settings(&["-l", "0,10"]).is_err());
        assert!(settings(&["-l", "1"]).is_err());
    }

    #[test]
    fn colormode_accepts_only_known_values() {
        let args = Args::try_parse_from(["glyphfall", "--colormode", "32"]).unwrap();
        assert_eq!(Settings::from_args(&args).unwrap().color_mode, ColorMode::TrueColor);
        let args = Args::try_parse_from(["glyphfall", "--colormode", "8"]).unwrap();
        assert!(Settings::from_args(&args).is_err());
    }

    #[test]
    fn unknown_color_and_charset_are_errors() {
        assert!(settings(&["-c", "plaid"]).is_err());
        let args = Args::try_parse_from(["glyphfall", "--charset", "klingon"]).unwrap();
        assert!(Settings::from_args(&args).is_err());
    }

    #[test]
    fn user_chars_extend_the_selection() {
        let s = settings(&["--chars", "41,42"]).unwrap();
        assert_eq!(s.chars, vec!['0', '1', 'A', 'B']);
        assert!(settings(&["--chars", "41"]).is_err());
    }

    #[test]
    fn missing_colorfile_is_reported() {
        let err = settings(&["-C", "/nonexistent/glyphfall.colors"]).unwrap_err();
        assert!(err.to_string().contains("could not read color file"));
    }

    #[test]
    fn message_and_flags_flow_through() {
        let s = settings(&["-m", "wake up", "-a", "-F", "-s", "-D", "-M", "1", "-b", "2"]).unwrap();
        assert_eq!(s.rain.message.as_deref(), Some("wake up"));
        assert!(s.rain.async_mode);
        assert!(s.rain.full_width);
        assert!(s.screensaver);
        assert!(s.default_background);
        assert_eq!(s.rain.shading_mode, ShadingMode::DistanceFromHead);
        assert_eq!(s.rain.bold_mode, BoldMode::All);
    }
}
