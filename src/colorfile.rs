// Copyright (c) 2026 rezky_nightky

use std::path::Path;

use thiserror::Error;

pub const LATEST_VERSION: u64 = 1;
pub const MAX_COLORS: usize = 256;
const VERSION_TAG: &str = "neo_color_version";

/// One palette entry. `rgb` components are in `0..=1000`; `None` keeps
/// the terminal's own definition of `index`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColorEntry {
    pub index: u8,
    pub rgb: Option<(u16, u16, u16)>,
}

#[derive(Debug, Error)]
pub enum ColorFileError {
    #[error("could not read color file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid color file version on line {line}")]
    BadVersion { line: usize },
    #[error("color file version ({found}) on line {line} is newer than supported (1)")]
    UnsupportedVersion { found: u64, line: usize },
    #[error("color file must have at least two colors (found {found})")]
    TooFewColors { found: usize },
    #[error("color file has too many lines at line {line} (max 256)")]
    TooManyColors { line: usize },
    #[error("bad color value ({value}) on line {line} (max 255)")]
    BadIndex { value: String, line: usize },
    #[error("bad RGB component value ({value}) on line {line}")]
    BadComponent { value: String, line: usize },
    #[error("color file line {line} does not have four components")]
    ComponentCount { line: usize },
}

fn is_skipped(line: &str) -> bool {
    match line.chars().next() {
        None => true,
        Some(c) => matches!(c, '#' | ';' | '/' | '*' | '@'),
    }
}

fn parse_version(line: &str, line_no: usize) -> Result<u64, ColorFileError> {
    let tok = line
        .split_whitespace()
        .nth(1)
        .ok_or(ColorFileError::BadVersion { line: line_no })?;
    let version: u64 = tok
        .parse()
        .map_err(|_| ColorFileError::BadVersion { line: line_no })?;
    if version == 0 {
        return Err(ColorFileError::BadVersion { line: line_no });
    }
    if version > LATEST_VERSION {
        return Err(ColorFileError::UnsupportedVersion {
            found: version,
            line: line_no,
        });
    }
    Ok(version)
}

fn parse_entry(line: &str, line_no: usize) -> Result<ColorEntry, ColorFileError> {
    let mut parts = line.split(',').map(str::trim);
    let first = parts.next().unwrap_or_default();
    let index = first
        .parse::<u16>()
        .ok()
        .and_then(|v| u8::try_from(v).ok())
        .ok_or_else(|| ColorFileError::BadIndex {
            value: first.to_string(),
            line: line_no,
        })?;

    let rest: Vec<&str> = parts.collect();
    if rest.is_empty() {
        return Ok(ColorEntry { index, rgb: None });
    }
    if rest.len() != 3 || rest.iter().any(|p| p.is_empty()) {
        return Err(ColorFileError::ComponentCount { line: line_no });
    }

    let mut rgb = [0u16; 3];
    for (slot, tok) in rgb.iter_mut().zip(&rest) {
        *slot = tok
            .parse::<u16>()
            .ok()
            .filter(|&v| v <= 1000)
            .ok_or_else(|| ColorFileError::BadComponent {
                value: tok.to_string(),
                line: line_no,
            })?;
    }
    Ok(ColorEntry {
        index,
        rgb: Some((rgb[0], rgb[1], rgb[2])),
    })
}

/// Parse palette file contents. The first entry is the background, the
/// rest are color pairs from dimmest to brightest.
pub fn parse_color_str(text: &str) -> Result<Vec<ColorEntry>, ColorFileError> {
    let mut entries = Vec::new();
    let mut seen_content = false;

    for (i, raw) in text.lines().enumerate() {
        let line_no = i + 1;
        let line = raw.trim();
        if is_skipped(line) {
            continue;
        }

        if !seen_content {
            seen_content = true;
            if line.contains(VERSION_TAG) {
                parse_version(line, line_no)?;
                continue;
            }
        }

        if entries.len() == MAX_COLORS {
            return Err(ColorFileError::TooManyColors { line: line_no });
        }
        entries.push(parse_entry(line, line_no)?);
    }

    if entries.len() < 2 {
        return Err(ColorFileError::TooFewColors {
            found: entries.len(),
        });
    }
    Ok(entries)
}

pub fn load_color_file(path: &Path) -> Result<Vec<ColorEntry>, ColorFileError> {
    let text = std::fs::read_to_string(path).map_err(|source| ColorFileError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_color_str(&text)
}
