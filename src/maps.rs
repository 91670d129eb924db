// Copyright (c) 2026 rezky_nightky

use crate::rng::RandomSource;

/// Per-cell baseline color pair and glitch candidacy, both column-major
/// (`col * lines + line`) so a droplet walks contiguous memory.
#[derive(Clone, Debug, Default)]
pub struct CellMaps {
    lines: u16,
    cols: u16,
    color: Vec<u8>,
    glitch: Vec<bool>,
}

impl CellMaps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resize(&mut self, lines: u16, cols: u16) {
        self.lines = lines;
        self.cols = cols;
        let size = lines as usize * cols as usize;
        self.color.clear();
        self.color.resize(size, 1);
        self.glitch.clear();
        self.glitch.resize(size, false);
    }

    fn idx(&self, line: u16, col: u16) -> Option<usize> {
        if line >= self.lines || col >= self.cols {
            return None;
        }
        Some(col as usize * self.lines as usize + line as usize)
    }

    pub fn fill_color(&mut self, rng: &mut RandomSource) {
        for v in &mut self.color {
            *v = rng.color_pair();
        }
    }

    /// Each cell is a glitch candidate with probability `pct`.
    pub fn fill_glitch(&mut self, rng: &mut RandomSource, pct: f32) {
        for v in &mut self.glitch {
            *v = rng.chance() < pct;
        }
    }

    pub fn clear_glitch(&mut self) {
        self.glitch.fill(false);
    }

    pub fn color_pair(&self, line: u16, col: u16) -> u8 {
        debug_assert!(line < self.lines && col < self.cols);
        self.idx(line, col).map(|i| self.color[i]).unwrap_or(1)
    }

    pub fn is_glitched(&self, line: u16, col: u16) -> bool {
        self.idx(line, col).map(|i| self.glitch[i]).unwrap_or(false)
    }

    #[cfg(test)]
    pub fn glitched_count(&self) -> usize {
        self.glitch.iter().filter(|&&g| g).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::{RandomParams, RandomSource};

    fn rng(num_pairs: u8) -> RandomSource {
        RandomSource::new(
            11,
            &RandomParams {
                lines: 10,
                cols: 12,
                char_pool_size: 2048,
                glitch_ms: (300, 400),
                linger_ms: (1, 3000),
                num_pairs,
            },
        )
    }

    #[test]
    fn color_map_avoids_head_and_tail_pairs() {
        let mut r = rng(7);
        let mut m = CellMaps::new();
        m.resize(10, 12);
        m.fill_color(&mut r);
        for col in 0..12 {
            for line in 0..10 {
                let p = m.color_pair(line, col);
                assert!((2..=5).contains(&p), "pair {} at {},{}", p, line, col);
            }
        }
    }

    #[test]
    fn glitch_probability_extremes() {
        let mut r = rng(7);
        let mut m = CellMaps::new();
        m.resize(10, 12);
        m.fill_glitch(&mut r, 0.0);
        assert_eq!(m.glitched_count(), 0);
        m.fill_glitch(&mut r, 1.0);
        assert_eq!(m.glitched_count(), 120);
        m.clear_glitch();
        assert_eq!(m.glitched_count(), 0);
    }

    #[test]
    fn out_of_grid_reads_are_neutral() {
        let mut m = CellMaps::new();
        m.resize(3, 3);
        assert!(!m.is_glitched(3, 0));
        assert!(!m.is_glitched(0, 3));
    }
}
