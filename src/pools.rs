// Copyright (c) 2026 rezky_nightky

use crate::rng::RandomSource;

pub const CHAR_POOL_SIZE: usize = 2048;
pub const GLITCH_POOL_SIZE: usize = 1024;

/// Pre-sampled characters. A droplet reads the primary pool at
/// `(char_pool_idx + line) % CHAR_POOL_SIZE`; glitches overwrite primary
/// entries with the next glitch-pool entry.
#[derive(Clone, Debug)]
pub struct CharPools {
    chars: Vec<char>,
    glitch: Vec<char>,
    glitch_idx: usize,
}

impl CharPools {
    pub fn new(charset: &[char], rng: &mut RandomSource) -> Self {
        let fallback = ['0', '1'];
        let src: &[char] = if charset.is_empty() {
            &fallback
        } else {
            charset
        };

        let chars = (0..CHAR_POOL_SIZE)
            .map(|_| src[rng.index(src.len())])
            .collect();
        let glitch = (0..GLITCH_POOL_SIZE)
            .map(|_| src[rng.index(src.len())])
            .collect();
        Self {
            chars,
            glitch,
            glitch_idx: 0,
        }
    }

    pub fn get(&self, line: u16, char_pool_idx: u16) -> char {
        self.chars[(char_pool_idx as usize + line as usize) % CHAR_POOL_SIZE]
    }

    /// Replace the character a droplet shows at `line` with the next glitch
    /// character. The glitch cursor is shared across droplets and wraps.
    pub fn glitch(&mut self, line: u16, char_pool_idx: u16) {
        let i = (char_pool_idx as usize + line as usize) % CHAR_POOL_SIZE;
        self.chars[i] = self.glitch[self.glitch_idx];
        self.glitch_idx = (self.glitch_idx + 1) % GLITCH_POOL_SIZE;
    }

    #[cfg(test)]
    pub fn glitch_cursor(&self) -> usize {
        self.glitch_idx
    }
}
