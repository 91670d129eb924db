// Copyright (c) 2026 rezky_nightky

use crate::sink::CharAttr;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cell {
    pub ch: char,
    pub pair: u8,
    pub bold: bool,
}

impl Cell {
    pub const BLANK: Cell = Cell {
        ch: ' ',
        pair: 1,
        bold: false,
    };

    pub fn new(ch: char, attr: CharAttr) -> Self {
        Self {
            ch,
            pair: attr.pair,
            bold: attr.bold,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.ch == ' ' || self.ch == '\0'
    }
}
