// Copyright (c) 2026 rezky_nightky

use crossterm::style::Color;

use crate::colorfile::ColorEntry;
use crate::runtime::{ColorMode, ColorScheme};

/// Resolved colors for every pair of the active palette.
#[derive(Clone, Debug, PartialEq)]
pub struct Palette {
    /// `colors[0]` is pair 1 (tail), the last entry pair N (head).
    pub colors: Vec<Color>,
    pub bg: Option<Color>,
    pub mono: bool,
}

impl Palette {
    pub fn num_pairs(&self) -> u8 {
        self.colors.len().clamp(1, u8::MAX as usize) as u8
    }

    /// Foreground for `pair`, `None` for the terminal default.
    pub fn fg(&self, pair: u8) -> Option<Color> {
        if self.mono {
            return None;
        }
        let idx = (pair.max(1) - 1) as usize;
        self.colors
            .get(idx)
            .or_else(|| self.colors.last())
            .copied()
    }
}

struct Builtin {
    c256: &'static [u8],
    c16: &'static [u8],
    /// Truecolor redefinitions of 256-color indices, components in 0..=1000.
    rgb: &'static [(u8, u16, u16, u16)],
}

const GREEN: Builtin = Builtin {
    c256: &[234, 22, 28, 35, 78, 84, 159],
    c16: &[10, 15],
    rgb: &[
        (234, 71, 141, 83),
        (22, 149, 243, 161),
        (28, 188, 596, 318),
        (35, 188, 714, 397),
        (78, 227, 925, 561),
        (84, 271, 973, 667),
        (159, 667, 1000, 941),
    ],
};

const GREEN2: Builtin = Builtin {
    c256: &[28, 34, 76, 84, 120, 157, 231],
    c16: &[8, 2, 10, 15],
    rgb: &[
        (28, 16, 180, 59),
        (34, 59, 246, 117),
        (76, 46, 512, 172),
        (84, 262, 749, 332),
        (120, 520, 945, 578),
        (157, 676, 969, 758),
        (231, 906, 1000, 898),
    ],
};

const GREEN3: Builtin = Builtin {
    c256: &[22, 28, 34, 70, 76, 82, 157],
    c16: &[2, 15],
    rgb: &[
        (22, 0, 373, 0),
        (28, 0, 529, 0),
        (34, 0, 686, 0),
        (70, 373, 686, 0),
        (76, 373, 843, 0),
        (82, 373, 1000, 0),
        (157, 686, 1000, 686),
    ],
};

const GOLD: Builtin = Builtin {
    c256: &[58, 94, 172, 178, 228, 230, 231],
    c16: &[8, 3, 11, 15],
    rgb: &[
        (58, 839, 545, 216),
        (94, 905, 694, 447),
        (172, 945, 831, 635),
        (178, 1000, 922, 565),
        (228, 1000, 953, 796),
        (230, 976, 976, 968),
    ],
};

const YELLOW: Builtin = Builtin {
    c256: &[100, 142, 184, 226, 227, 229, 230],
    c16: &[8, 11, 15],
    rgb: &[],
};

const ORANGE: Builtin = Builtin {
    c256: &[52, 94, 130, 166, 202, 208, 231],
    c16: &[1, 7],
    rgb: &[],
};

const RED: Builtin = Builtin {
    c256: &[234, 52, 88, 124, 160, 196, 217],
    c16: &[1, 9, 15],
    rgb: &[],
};

const BLUE: Builtin = Builtin {
    c256: &[234, 17, 18, 20, 21, 75, 159],
    c16: &[4, 12, 15],
    rgb: &[],
};

const CYAN: Builtin = Builtin {
    c256: &[24, 25, 31, 32, 38, 45, 159],
    c16: &[6, 14, 15],
    rgb: &[],
};

const RAINBOW: Builtin = Builtin {
    c256: &[196, 208, 226, 46, 21, 93, 201],
    c16: &[9, 1, 11, 10, 12, 13],
    rgb: &[],
};

const PURPLE: Builtin = Builtin {
    c256: &[60, 61, 62, 63, 69, 111, 225],
    c16: &[5, 7],
    rgb: &[],
};

const PINK: Builtin = Builtin {
    c256: &[133, 139, 176, 212, 218, 224, 231],
    c16: &[13, 15],
    rgb: &[],
};

const PINK2: Builtin = Builtin {
    c256: &[145, 181, 217, 218, 224, 225, 231],
    c16: &[5, 13, 15],
    rgb: &[],
};

const VAPORWAVE: Builtin = Builtin {
    c256: &[
        53, 54, 55, 134, 177, 219, 214, 220, 227, 229, 87, 123, 159, 195, 231,
    ],
    c16: &[5, 13, 11, 14, 15],
    rgb: &[],
};

const GRAY: Builtin = Builtin {
    c256: &[234, 237, 240, 243, 246, 249, 251, 252, 231],
    c16: &[8, 7, 15],
    rgb: &[],
};

fn builtin(scheme: ColorScheme) -> &'static Builtin {
    match scheme {
        ColorScheme::User | ColorScheme::Green => &GREEN,
        ColorScheme::Green2 => &GREEN2,
        ColorScheme::Green3 => &GREEN3,
        ColorScheme::Gold => &GOLD,
        ColorScheme::Yellow => &YELLOW,
        ColorScheme::Orange => &ORANGE,
        ColorScheme::Red => &RED,
        ColorScheme::Blue => &BLUE,
        ColorScheme::Cyan => &CYAN,
        ColorScheme::Rainbow => &RAINBOW,
        ColorScheme::Purple => &PURPLE,
        ColorScheme::Pink => &PINK,
        ColorScheme::Pink2 => &PINK2,
        ColorScheme::Vaporwave => &VAPORWAVE,
        ColorScheme::Gray => &GRAY,
    }
}

/// The sixteen standard terminal colors by their conventional index.
fn ansi16(idx: u8) -> Color {
    match idx {
        0 => Color::Black,
        1 => Color::DarkRed,
        2 => Color::DarkGreen,
        3 => Color::DarkYellow,
        4 => Color::DarkBlue,
        5 => Color::DarkMagenta,
        6 => Color::DarkCyan,
        7 => Color::Grey,
        8 => Color::DarkGrey,
        9 => Color::Red,
        10 => Color::Green,
        11 => Color::Yellow,
        12 => Color::Blue,
        13 => Color::Magenta,
        14 => Color::Cyan,
        15 => Color::White,
        n => Color::AnsiValue(n),
    }
}

fn scale_1000(v: u16) -> u8 {
    ((v.min(1000) as u32 * 255 + 500) / 1000) as u8
}

fn rgb_1000(r: u16, g: u16, b: u16) -> Color {
    Color::Rgb {
        r: scale_1000(r),
        g: scale_1000(g),
        b: scale_1000(b),
    }
}

fn indexed(mode: ColorMode, idx: u8) -> Color {
    if mode == ColorMode::Color16 {
        ansi16(idx)
    } else {
        Color::AnsiValue(idx)
    }
}

fn default_bg(mode: ColorMode, default_background: bool) -> Option<Color> {
    if default_background {
        return None;
    }
    match mode {
        ColorMode::Mono => None,
        ColorMode::Color16 => Some(Color::Black),
        ColorMode::TrueColor => Some(Color::Rgb { r: 0, g: 0, b: 0 }),
        ColorMode::Color256 => Some(Color::AnsiValue(16)),
    }
}

pub fn build_palette(scheme: ColorScheme, mode: ColorMode, default_background: bool) -> Palette {
    let def = builtin(scheme);

    let colors = match mode {
        ColorMode::Color16 => def.c16.iter().map(|&i| ansi16(i)).collect(),
        ColorMode::Color256 | ColorMode::Mono => {
            def.c256.iter().map(|&i| Color::AnsiValue(i)).collect()
        }
        ColorMode::TrueColor => def
            .c256
            .iter()
            .map(|&i| match def.rgb.iter().find(|e| e.0 == i) {
                Some(&(_, r, g, b)) => rgb_1000(r, g, b),
                None => Color::AnsiValue(i),
            })
            .collect(),
    };

    Palette {
        colors,
        bg: default_bg(mode, default_background),
        mono: mode == ColorMode::Mono,
    }
}

/// Palette from a color file: the first entry is the background, the rest
/// are pairs 1..N.
pub fn build_user_palette(entries: &[ColorEntry], mode: ColorMode) -> Palette {
    let resolve = |e: &ColorEntry| match (mode, e.rgb) {
        (ColorMode::TrueColor, Some((r, g, b))) => rgb_1000(r, g, b),
        _ => indexed(mode, e.index),
    };

    let bg = match (mode, entries.first()) {
        (ColorMode::Mono, _) | (_, None) => None,
        (_, Some(e)) => Some(resolve(e)),
    };
    let mut colors: Vec<Color> = entries.iter().skip(1).map(resolve).collect();
    if colors.is_empty() {
        colors.push(indexed(mode, 15));
    }

    Palette {
        colors,
        bg,
        mono: mode == ColorMode::Mono,
    }
}
