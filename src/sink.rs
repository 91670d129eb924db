// Copyright (c) 2026 rezky_nightky

/// Where a character sits within its droplet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CharLoc {
    Middle,
    Tail,
    Head,
}

/// Color pair plus boldness for one cell. Pair 1 is the dimmest (tail)
/// color, pair N the brightest (head) color of the active palette.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CharAttr {
    pub pair: u8,
    pub bold: bool,
}

impl CharAttr {
    pub const BLANK: CharAttr = CharAttr {
        pair: 1,
        bold: false,
    };
}

/// Surface the engine draws onto. Coordinates are (line, col).
pub trait RenderSink {
    fn clear(&mut self);
    fn put(&mut self, line: u16, col: u16, ch: char, attr: CharAttr);
    /// Character currently shown at the cell, `' '` for blank or off-grid.
    fn char_at(&self, line: u16, col: u16) -> char;
    /// (lines, cols)
    #[allow(dead_code)]
    fn dimensions(&self) -> (u16, u16);

    fn erase(&mut self, line: u16, col: u16) {
        self.put(line, col, ' ', CharAttr::BLANK);
    }
}
