// Copyright (c) 2026 rezky_nightky

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColorMode {
    Mono,
    Color16,
    Color256,
    TrueColor,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShadingMode {
    Random,
    DistanceFromHead,
}

impl ShadingMode {
    pub fn toggled(self) -> Self {
        match self {
            ShadingMode::Random => ShadingMode::DistanceFromHead,
            ShadingMode::DistanceFromHead => ShadingMode::Random,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoldMode {
    Off,
    Random,
    All,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColorScheme {
    User,
    Green,
    Green2,
    Green3,
    Yellow,
    Orange,
    Red,
    Blue,
    Cyan,
    Gold,
    Rainbow,
    Purple,
    Pink,
    Pink2,
    Vaporwave,
    Gray,
}

impl ColorScheme {
    pub fn from_name(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "green" => Some(ColorScheme::Green),
            "green2" => Some(ColorScheme::Green2),
            "green3" => Some(ColorScheme::Green3),
            "yellow" => Some(ColorScheme::Yellow),
            "orange" => Some(ColorScheme::Orange),
            "red" => Some(ColorScheme::Red),
            "blue" => Some(ColorScheme::Blue),
            "cyan" => Some(ColorScheme::Cyan),
            "gold" => Some(ColorScheme::Gold),
            "rainbow" => Some(ColorScheme::Rainbow),
            "purple" => Some(ColorScheme::Purple),
            "pink" => Some(ColorScheme::Pink),
            "pink2" => Some(ColorScheme::Pink2),
            "vaporwave" => Some(ColorScheme::Vaporwave),
            "gray" | "grey" => Some(ColorScheme::Gray),
            _ => None,
        }
    }
}
