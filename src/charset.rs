// Copyright (c) 2026 rezky_nightky

use std::collections::BTreeSet;

use anyhow::{bail, Context};

/// A named block of code points. Declaration order is expansion order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CharsetTag {
    Binary,
    Hex,
    EnglishLetters,
    EnglishDigits,
    EnglishPunctuation,
    Katakana,
    Greek,
    Cyrillic,
    Arabic,
    Hebrew,
    Devanagari,
    Braille,
    Runic,
}

impl CharsetTag {
    fn ranges(self) -> &'static [(u32, u32)] {
        match self {
            CharsetTag::Binary => &[(0x30, 0x31)],
            CharsetTag::Hex => &[(0x30, 0x39), (0x41, 0x46)],
            CharsetTag::EnglishLetters => &[(0x41, 0x5A), (0x61, 0x7A)],
            CharsetTag::EnglishDigits => &[(0x30, 0x39)],
            CharsetTag::EnglishPunctuation => &[(0x21, 0x2F), (0x3A, 0x40), (0x5B, 0x60), (0x7B, 0x7E)],
            CharsetTag::Katakana => &[(0xFF64, 0xFF9F)],
            CharsetTag::Greek => &[(0x0370, 0x03FF)],
            CharsetTag::Cyrillic => &[(0x0410, 0x044F)],
            CharsetTag::Arabic => &[(0x0627, 0x0649)],
            CharsetTag::Hebrew => &[(0x0590, 0x05FF), (0xFB1D, 0xFB4F)],
            CharsetTag::Devanagari => &[(0x0900, 0x097F)],
            CharsetTag::Braille => &[(0x2800, 0x28FF)],
            CharsetTag::Runic => &[(0x16A0, 0x16FF)],
        }
    }
}

/// Union of charset tags.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Charset(BTreeSet<CharsetTag>);

impl Charset {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn of(tags: &[CharsetTag]) -> Self {
        Self(tags.iter().copied().collect())
    }

    /// Letters, digits and punctuation.
    pub fn ascii() -> Self {
        Self::of(&[
            CharsetTag::EnglishLetters,
            CharsetTag::EnglishDigits,
            CharsetTag::EnglishPunctuation,
        ])
    }

    /// Digits, punctuation and half-width katakana.
    pub fn extended() -> Self {
        Self::of(&[
            CharsetTag::EnglishDigits,
            CharsetTag::EnglishPunctuation,
            CharsetTag::Katakana,
        ])
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[cfg(test)]
    pub fn contains(&self, tag: CharsetTag) -> bool {
        self.0.contains(&tag)
    }

    pub fn union(mut self, other: &Charset) -> Self {
        self.0.extend(other.0.iter().copied());
        self
    }

    pub fn tags(&self) -> impl Iterator<Item = CharsetTag> + '_ {
        self.0.iter().copied()
    }
}

/// Parse `--chars`: comma separated hex code points taken in pairs as
/// inclusive ranges.
pub fn parse_user_hex_chars(s: &str) -> anyhow::Result<Vec<(char, char)>> {
    let mut points = Vec::new();
    for (i, part) in s.split(',').enumerate() {
        let part = part.trim();
        let part = part
            .strip_prefix("0x")
            .or_else(|| part.strip_prefix("0X"))
            .unwrap_or(part);
        let v = u32::from_str_radix(part, 16)
            .ok()
            .filter(|&v| v != 0)
            .with_context(|| format!("invalid unicode char at index {}", i + 1))?;
        let ch = char::from_u32(v)
            .with_context(|| format!("invalid unicode char at index {}", i + 1))?;
        points.push(ch);
    }

    if points.len() % 2 != 0 {
        bail!("--chars: odd number of unicode chars given (must be even)");
    }

    let mut ranges = Vec::with_capacity(points.len() / 2);
    for pair in points.chunks_exact(2) {
        if pair[0] > pair[1] {
            bail!(
                "--chars: range {:X}..{:X} is reversed",
                pair[0] as u32,
                pair[1] as u32
            );
        }
        ranges.push((pair[0], pair[1]));
    }
    Ok(ranges)
}

fn preset(name: &str) -> Option<Charset> {
    use CharsetTag::*;
    let cs = match name {
        "ascii" => Charset::ascii(),
        "extended" => Charset::extended(),
        "english" => Charset::of(&[EnglishLetters]),
        "digits" | "dec" | "decimal" => Charset::of(&[EnglishDigits]),
        "punc" => Charset::of(&[EnglishPunctuation]),
        "bin" | "binary" => Charset::of(&[Binary]),
        "hex" | "hexadecimal" => Charset::of(&[Hex]),
        "katakana" => Charset::of(&[Katakana]),
        "greek" => Charset::of(&[Greek]),
        "cyrillic" => Charset::of(&[Cyrillic]),
        "arabic" => Charset::of(&[Arabic]),
        "hebrew" => Charset::of(&[Hebrew]),
        "devanagari" => Charset::of(&[Devanagari]),
        "braille" => Charset::of(&[Braille]),
        "runic" => Charset::of(&[Runic]),
        _ => return None,
    };
    Some(cs)
}

/// Parse `--charset`. Several names separated by commas are combined.
pub fn charset_from_str(spec: &str) -> anyhow::Result<Charset> {
    let mut out = Charset::none();
    for name in spec.split(',') {
        let name = name.trim().to_ascii_lowercase();
        if name.is_empty() {
            continue;
        }
        match preset(&name) {
            Some(cs) => out = out.union(&cs),
            None => bail!("unsupported charset specified: {}", name),
        }
    }
    Ok(out)
}

fn push_range(out: &mut Vec<char>, start: u32, end: u32) {
    out.extend((start..=end).filter_map(char::from_u32));
}

/// Expand the selected tags, then the user ranges. With nothing selected
/// the locale default is used.
pub fn build_chars(charset: &Charset, user_ranges: &[(char, char)], default_to_ascii: bool) -> Vec<char> {
    let fallback;
    let charset = if charset.is_empty() && user_ranges.is_empty() {
        fallback = if default_to_ascii {
            Charset::ascii()
        } else {
            Charset::extended()
        };
        &fallback
    } else {
        charset
    };

    let mut out: Vec<char> = Vec::new();
    for tag in charset.tags() {
        for &(start, end) in tag.ranges() {
            push_range(&mut out, start, end);
        }
    }
    for &(a, b) in user_ranges {
        push_range(&mut out, a as u32, b as u32);
    }
    out
}

/// Whether the environment's locale suggests a UTF-8 terminal.
pub fn locale_is_utf8() -> bool {
    ["LC_ALL", "LC_CTYPE", "LANG"]
        .iter()
        .filter_map(|k| std::env::var(k).ok())
        .find(|v| !v.is_empty())
        .is_some_and(|v| {
            let v = v.to_ascii_lowercase();
            v.contains("utf-8") || v.contains("utf8")
        })
}
