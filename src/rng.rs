// Copyright (c) 2026 rezky_nightky

use rand::{
    distr::{uniform::SampleUniform, Distribution, Uniform},
    rngs::StdRng,
    SeedableRng,
};

pub const DEFAULT_SEED: u64 = 0x1234567;

/// Inputs every derived distribution depends on.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RandomParams {
    pub lines: u16,
    pub cols: u16,
    pub char_pool_size: u16,
    pub glitch_ms: (u16, u16),
    pub linger_ms: (u16, u16),
    pub num_pairs: u8,
}

fn inclusive<T: SampleUniform + PartialOrd + Copy>(a: T, b: T) -> Uniform<T> {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    Uniform::new_inclusive(lo, hi).expect("ordered finite bounds")
}

/// Baseline pairs stay inside `[2, N-2]` so the extremes remain
/// distinguishable as tail and head colors.
pub fn color_pair_bounds(num_pairs: u8) -> (u8, u8) {
    match num_pairs {
        0..=2 => (1, 1),
        3 => (2, 2),
        n => (2, n - 2),
    }
}

/// Seeded generator plus every distribution the simulation samples from.
/// Owned by the engine and handed by `&mut` to whatever needs randomness.
pub struct RandomSource {
    rng: StdRng,
    chance: Uniform<f32>,
    line: Uniform<u16>,
    cp_idx: Uniform<u16>,
    len: Uniform<u16>,
    col: Uniform<u16>,
    glitch_ms: Uniform<u16>,
    linger_ms: Uniform<u16>,
    speed: Uniform<f32>,
    color_pair: Uniform<u8>,
}

impl RandomSource {
    pub fn new(seed: u64, params: &RandomParams) -> Self {
        let mut src = Self {
            rng: StdRng::seed_from_u64(seed),
            chance: Uniform::new(0.0, 1.0).expect("valid range"),
            line: inclusive(0, 0),
            cp_idx: inclusive(0, 0),
            len: inclusive(1, 1),
            col: inclusive(0, 0),
            glitch_ms: inclusive(1, 1),
            linger_ms: inclusive(1, 1),
            speed: inclusive(0.333_333_3, 1.0),
            color_pair: inclusive(1, 1),
        };
        src.rebuild(params);
        src
    }

    /// Reseed and rebuild every distribution for new parameters.
    pub fn reseed(&mut self, seed: u64, params: &RandomParams) {
        self.rng = StdRng::seed_from_u64(seed);
        self.rebuild(params);
    }

    fn rebuild(&mut self, p: &RandomParams) {
        let max_line = p.lines.saturating_sub(2);
        self.line = inclusive(0, max_line);
        self.len = inclusive(1, max_line.max(1));
        self.col = inclusive(0, p.cols.saturating_sub(1));
        self.cp_idx = inclusive(0, p.char_pool_size.saturating_sub(1));
        self.set_glitch_window(p.glitch_ms.0, p.glitch_ms.1);
        self.set_linger_window(p.linger_ms.0, p.linger_ms.1);
        self.set_num_pairs(p.num_pairs);
    }

    pub fn set_glitch_window(&mut self, low_ms: u16, high_ms: u16) {
        self.glitch_ms = inclusive(low_ms, high_ms);
    }

    pub fn set_linger_window(&mut self, low_ms: u16, high_ms: u16) {
        self.linger_ms = inclusive(low_ms, high_ms);
    }

    pub fn set_num_pairs(&mut self, num_pairs: u8) {
        let (lo, hi) = color_pair_bounds(num_pairs);
        self.color_pair = inclusive(lo, hi);
    }

    pub fn chance(&mut self) -> f32 {
        self.chance.sample(&mut self.rng)
    }

    pub fn line(&mut self) -> u16 {
        self.line.sample(&mut self.rng)
    }

    pub fn char_pool_idx(&mut self) -> u16 {
        self.cp_idx.sample(&mut self.rng)
    }

    pub fn length(&mut self) -> u16 {
        self.len.sample(&mut self.rng)
    }

    pub fn col(&mut self) -> u16 {
        self.col.sample(&mut self.rng)
    }

    pub fn glitch_ms(&mut self) -> u16 {
        self.glitch_ms.sample(&mut self.rng)
    }

    pub fn linger_ms(&mut self) -> u16 {
        self.linger_ms.sample(&mut self.rng)
    }

    pub fn speed_pct(&mut self) -> f32 {
        self.speed.sample(&mut self.rng)
    }

    pub fn color_pair(&mut self) -> u8 {
        self.color_pair.sample(&mut self.rng)
    }

    /// Uniform index in `0..n`; `n` must be non-zero.
    pub fn index(&mut self, n: usize) -> usize {
        debug_assert!(n > 0);
        inclusive(0usize, n.saturating_sub(1)).sample(&mut self.rng)
    }
}
