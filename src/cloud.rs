// Copyright (c) 2026 rezky_nightky

use std::time::{Duration, Instant};

use log::{debug, trace};

use crate::droplet::{Droplet, DropletParams};
use crate::maps::CellMaps;
use crate::message::Message;
use crate::pools::{CharPools, CHAR_POOL_SIZE};
use crate::rng::{RandomParams, RandomSource, DEFAULT_SEED};
use crate::runtime::{BoldMode, ShadingMode};
use crate::sink::{CharAttr, CharLoc, RenderSink};

/// Slowest fall speed the engine accepts, in characters per second.
pub const MIN_CHARS_PER_SEC: f32 = 0.25;

/// Window between the last glitch event and the next scheduled one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GlitchClock {
    pub last: Instant,
    pub next: Instant,
}

impl GlitchClock {
    pub fn new(last: Instant, next: Instant) -> Self {
        Self { last, next }
    }

    fn fraction(&self, now: Instant) -> Option<f64> {
        let between = self.next.saturating_duration_since(self.last).as_secs_f64();
        if between <= 0.0 {
            return None;
        }
        let since = now.saturating_duration_since(self.last).as_secs_f64();
        Some(since / between)
    }

    /// First quarter of the interval.
    pub fn is_bright(&self, now: Instant) -> bool {
        if now < self.last {
            return false;
        }
        self.fraction(now).is_some_and(|f| f <= 0.25)
    }

    /// Last quarter of the interval, or overdue.
    pub fn is_dim(&self, now: Instant) -> bool {
        if now > self.next {
            return true;
        }
        self.fraction(now).map_or(true, |f| f >= 0.75)
    }

    pub fn is_due(&self, now: Instant) -> bool {
        now >= self.next
    }

    fn shift(&mut self, by: Duration) {
        self.last += by;
        self.next += by;
    }
}

/// Read-only view of engine state a droplet needs while drawing.
pub struct DrawCtx<'a> {
    pub num_pairs: u8,
    pub shading_distance: bool,
    pub bold_mode: BoldMode,
    pub glitchy: bool,
    pub glitch_clock: GlitchClock,
    pub maps: &'a CellMaps,
    pub pools: &'a CharPools,
}

impl<'a> DrawCtx<'a> {
    /// Context over separately borrowed maps and pools.
    pub fn new(
        cfg: &RainConfig,
        num_pairs: u8,
        glitch_clock: GlitchClock,
        maps: &'a CellMaps,
        pools: &'a CharPools,
    ) -> Self {
        Self {
            num_pairs,
            shading_distance: cfg.shading_mode == ShadingMode::DistanceFromHead,
            bold_mode: cfg.bold_mode,
            glitchy: cfg.glitchy,
            glitch_clock,
            maps,
            pools,
        }
    }

    pub fn is_glitched(&self, line: u16, col: u16) -> bool {
        self.glitchy && self.maps.is_glitched(line, col)
    }

    pub fn char_at(&self, line: u16, char_pool_idx: u16) -> char {
        self.pools.get(line, char_pool_idx)
    }

    /// Color pair and bold flag for one cell.
    #[allow(clippy::too_many_arguments)]
    pub fn get_attr(
        &self,
        line: u16,
        col: u16,
        val: char,
        loc: CharLoc,
        now: Instant,
        head_put_line: u16,
        length: u16,
    ) -> CharAttr {
        let n = self.num_pairs.max(1) as i32;

        let mut bold = false;
        if self.bold_mode == BoldMode::Random {
            bold = ((line as u32) ^ (val as u32)) % 2 == 1;
        }

        let mut pair = self.maps.color_pair(line, col) as i32;

        if self.shading_distance {
            let dist = head_put_line.saturating_sub(line) as f32;
            let len = length.max(1) as f32;
            pair = n - (dist / len * (n - 1) as f32).round() as i32;
        }

        if self.is_glitched(line, col) {
            if self.glitch_clock.is_bright(now) {
                pair += 1;
                bold = true;
            } else if self.glitch_clock.is_dim(now) {
                pair -= 1;
                bold = false;
            }
        }

        match loc {
            CharLoc::Tail => {
                pair = 1;
                bold = false;
            }
            CharLoc::Head => {
                pair = n;
                bold = true;
            }
            CharLoc::Middle => {
                pair = pair.min(n - 1).max(1);
            }
        }

        match self.bold_mode {
            BoldMode::Off => bold = false,
            BoldMode::All => bold = true,
            BoldMode::Random => {}
        }

        CharAttr {
            pair: pair.clamp(1, n) as u8,
            bold,
        }
    }
}

/// Everything the engine needs to know about how the rain should look.
/// Values are expected to be validated by the caller.
#[derive(Clone, Debug, PartialEq)]
pub struct RainConfig {
    pub async_mode: bool,
    pub chars_per_sec: f32,
    pub droplet_density: f32,
    pub glitchy: bool,
    pub glitch_pct: f32,
    pub glitch_low_ms: u16,
    pub glitch_high_ms: u16,
    pub linger_low_ms: u16,
    pub linger_high_ms: u16,
    pub die_early_pct: f32,
    pub short_pct: f32,
    pub max_droplets_per_column: u8,
    pub full_width: bool,
    pub bold_mode: BoldMode,
    pub shading_mode: ShadingMode,
    pub message: Option<String>,
    pub seed: u64,
}

impl Default for RainConfig {
    fn default() -> Self {
        Self {
            async_mode: false,
            chars_per_sec: 8.0,
            droplet_density: 1.0,
            glitchy: true,
            glitch_pct: 0.1,
            glitch_low_ms: 300,
            glitch_high_ms: 400,
            linger_low_ms: 1,
            linger_high_ms: 3000,
            die_early_pct: 0.333_333_3,
            short_pct: 0.5,
            max_droplets_per_column: 3,
            full_width: false,
            bold_mode: BoldMode::Random,
            shading_mode: ShadingMode::Random,
            message: None,
            seed: DEFAULT_SEED,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColumnStatus {
    pub max_speed_pct: f32,
    pub num_droplets: u8,
    pub can_spawn: bool,
}

impl Default for ColumnStatus {
    fn default() -> Self {
        Self {
            max_speed_pct: 1.0,
            num_droplets: 0,
            can_spawn: true,
        }
    }
}

/// What one tick did, for logging and tests.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickStats {
    pub spawn_attempts: usize,
    pub spawned: usize,
    pub died: usize,
    pub glitched_cells: usize,
}

pub struct Cloud {
    cfg: RainConfig,

    lines: u16,
    cols: u16,
    num_pairs: u8,

    droplets: Vec<Droplet>,
    col_stat: Vec<ColumnStatus>,
    droplets_per_sec: f32,

    rng: RandomSource,
    maps: CellMaps,
    pools: CharPools,
    message: Option<Message>,

    glitch_clock: GlitchClock,
    last_spawn_time: Instant,
    pause_time: Option<Instant>,
    paused: bool,

    force_draw_everything: bool,
}

impl Cloud {
    pub fn new(
        mut cfg: RainConfig,
        chars: &[char],
        num_pairs: u8,
        lines: u16,
        cols: u16,
        now: Instant,
    ) -> Self {
        cfg.chars_per_sec = cfg.chars_per_sec.max(MIN_CHARS_PER_SEC);
        if !cfg.glitchy {
            cfg.glitch_pct = 0.0;
        }

        let params = RandomParams {
            lines,
            cols,
            char_pool_size: CHAR_POOL_SIZE as u16,
            glitch_ms: (cfg.glitch_low_ms, cfg.glitch_high_ms),
            linger_ms: (cfg.linger_low_ms, cfg.linger_high_ms),
            num_pairs,
        };
        let mut rng = RandomSource::new(cfg.seed, &params);
        let pools = CharPools::new(chars, &mut rng);
        let message = cfg.message.as_deref().map(Message::new);

        let mut cloud = Self {
            cfg,
            lines,
            cols,
            num_pairs: num_pairs.max(1),
            droplets: Vec::new(),
            col_stat: Vec::new(),
            droplets_per_sec: 0.0,
            rng,
            maps: CellMaps::new(),
            pools,
            message,
            glitch_clock: GlitchClock::new(now, now),
            last_spawn_time: now,
            pause_time: None,
            paused: false,
            force_draw_everything: true,
        };
        cloud.reset(lines, cols, now);
        cloud
    }

    pub fn config(&self) -> &RainConfig {
        &self.cfg
    }

    #[cfg(test)]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    fn random_params(&self) -> RandomParams {
        RandomParams {
            lines: self.lines,
            cols: self.cols,
            char_pool_size: CHAR_POOL_SIZE as u16,
            glitch_ms: (self.cfg.glitch_low_ms, self.cfg.glitch_high_ms),
            linger_ms: (self.cfg.linger_low_ms, self.cfg.linger_high_ms),
            num_pairs: self.num_pairs,
        }
    }

    /// Throw away all simulation state and start over on a `lines x cols`
    /// grid.
    pub fn reset(&mut self, lines: u16, cols: u16, now: Instant) {
        self.lines = lines;
        self.cols = cols;

        let pool_size = (1.5 * cols as f32).ceil() as usize;
        self.droplets.clear();
        self.droplets.resize_with(pool_size, Droplet::new);

        let params = self.random_params();
        self.rng.reseed(self.cfg.seed, &params);

        self.maps.resize(lines, cols);
        self.fill_glitch_map();
        self.maps.fill_color(&mut self.rng);

        self.recalc_droplets_per_sec();

        self.col_stat.clear();
        self.col_stat.resize(cols as usize, ColumnStatus::default());
        self.set_column_speeds();

        if let Some(msg) = self.message.as_mut() {
            msg.layout(lines, cols);
        }

        let next = now + Duration::from_millis(self.rng.glitch_ms() as u64);
        self.glitch_clock = GlitchClock::new(now, next);
        self.last_spawn_time = now;
        self.force_draw_everything = true;
        if self.paused {
            // resume must only skip time spent paused after this reset
            self.pause_time = Some(now);
        }

        debug!(
            "reset: {}x{} grid, {} droplet slots, {:.2} droplets/sec",
            cols, lines, pool_size, self.droplets_per_sec
        );
    }

    fn recalc_droplets_per_sec(&mut self) {
        let droplet_seconds = self.lines.max(1) as f32 / self.cfg.chars_per_sec;
        self.droplets_per_sec = self.cols as f32 * self.cfg.droplet_density / droplet_seconds;
    }

    fn fill_glitch_map(&mut self) {
        if self.cfg.glitchy {
            self.maps.fill_glitch(&mut self.rng, self.cfg.glitch_pct);
        } else {
            self.maps.clear_glitch();
        }
    }

    fn set_column_speeds(&mut self) {
        for cs in &mut self.col_stat {
            cs.max_speed_pct = if self.cfg.async_mode {
                self.rng.speed_pct()
            } else {
                1.0
            };
        }
    }

    fn update_droplet_speeds(&mut self) {
        for d in &mut self.droplets {
            if !d.is_alive() {
                continue;
            }
            if let Some(cs) = self.col_stat.get(d.col() as usize) {
                d.set_chars_per_sec(cs.max_speed_pct * self.cfg.chars_per_sec);
            }
        }
    }

    pub fn set_async(&mut self, on: bool) {
        self.cfg.async_mode = on;
        self.set_column_speeds();
        self.update_droplet_speeds();
    }

    pub fn set_chars_per_sec(&mut self, cps: f32) {
        self.cfg.chars_per_sec = cps.max(MIN_CHARS_PER_SEC);
        self.recalc_droplets_per_sec();
        self.set_column_speeds();
        self.update_droplet_speeds();
    }

    pub fn set_droplet_density(&mut self, density: f32) {
        self.cfg.droplet_density = density;
        self.recalc_droplets_per_sec();
    }

    pub fn set_glitch_pct(&mut self, pct: f32) {
        self.cfg.glitch_pct = pct.clamp(0.0, 1.0);
        self.fill_glitch_map();
    }

    pub fn set_glitch_times(&mut self, low_ms: u16, high_ms: u16) {
        self.cfg.glitch_low_ms = low_ms;
        self.cfg.glitch_high_ms = high_ms;
        self.rng.set_glitch_window(low_ms, high_ms);
    }

    pub fn set_linger_times(&mut self, low_ms: u16, high_ms: u16) {
        self.cfg.linger_low_ms = low_ms;
        self.cfg.linger_high_ms = high_ms;
        self.rng.set_linger_window(low_ms, high_ms);
    }

    pub fn set_max_droplets_per_column(&mut self, v: u8) {
        self.cfg.max_droplets_per_column = v;
    }

    pub fn set_shading_mode(&mut self, sm: ShadingMode) {
        self.cfg.shading_mode = sm;
        self.force_draw_everything = true;
        debug!("shading mode: {:?}", sm);
    }

    /// Switch to a palette with `num_pairs` pairs and recolor the grid.
    pub fn set_num_pairs(&mut self, num_pairs: u8) {
        self.num_pairs = num_pairs.max(1);
        self.rng.set_num_pairs(self.num_pairs);
        self.maps.fill_color(&mut self.rng);
        self.force_draw_everything = true;
        debug!("palette switched: {} color pairs", self.num_pairs);
    }

    pub fn force_draw_everything(&mut self) {
        self.force_draw_everything = true;
    }

    /// Freeze or resume. On resume every clock is pushed forward by the
    /// time spent paused.
    pub fn toggle_pause(&mut self, now: Instant) {
        self.paused = !self.paused;
        if self.paused {
            self.pause_time = Some(now);
            debug!("paused");
            return;
        }

        let Some(pt) = self.pause_time.take() else {
            return;
        };
        let elapsed = now.saturating_duration_since(pt);
        self.last_spawn_time += elapsed;
        self.glitch_clock.shift(elapsed);
        for d in &mut self.droplets {
            if d.is_alive() {
                d.increment_time(elapsed);
            }
        }
        debug!("resumed after {:?}", elapsed);
    }

    fn draw_ctx(&self) -> DrawCtx<'_> {
        DrawCtx::new(
            &self.cfg,
            self.num_pairs,
            self.glitch_clock,
            &self.maps,
            &self.pools,
        )
    }

    /// Attribute the cell at `(line, col)` would be drawn with.
    #[allow(clippy::too_many_arguments)]
    pub fn get_attr(
        &self,
        line: u16,
        col: u16,
        val: char,
        loc: CharLoc,
        now: Instant,
        head_put_line: u16,
        length: u16,
    ) -> CharAttr {
        self.draw_ctx()
            .get_attr(line, col, val, loc, now, head_put_line, length)
    }

    fn message_attr(&self) -> CharAttr {
        CharAttr {
            pair: self.num_pairs,
            bold: self.cfg.bold_mode != BoldMode::Off,
        }
    }

    fn droplet_params(&mut self, col: u16) -> DropletParams {
        let mut end_line = self.lines.saturating_sub(1);
        if self.rng.chance() < self.cfg.die_early_pct {
            end_line = self.rng.line();
        }
        let char_pool_idx = self.rng.char_pool_idx();

        let mut length = self.lines;
        if self.rng.chance() < self.cfg.short_pct {
            length = self.rng.length();
        }

        // only droplets that stop before their full length linger
        let mut time_to_linger = Duration::from_millis(1);
        if end_line <= length {
            time_to_linger = Duration::from_millis(self.rng.linger_ms() as u64);
        }

        let speed_pct = self
            .col_stat
            .get(col as usize)
            .map_or(1.0, |cs| cs.max_speed_pct);

        DropletParams {
            col,
            end_line,
            char_pool_idx,
            length,
            chars_per_sec: speed_pct * self.cfg.chars_per_sec,
            time_to_linger,
        }
    }

    /// Returns `(attempts, spawned)`.
    fn spawn_droplets(&mut self, now: Instant) -> (usize, usize) {
        let elapsed = now
            .saturating_duration_since(self.last_spawn_time)
            .as_secs_f32();
        let to_spawn = ((elapsed * self.droplets_per_sec) as usize).min(self.droplets.len());
        if to_spawn == 0 {
            return (0, 0);
        }

        let mut idx = 0usize;
        let mut spawned = 0usize;

        for _ in 0..to_spawn {
            let mut col = self.rng.col();
            if self.cfg.full_width {
                col &= !1;
            }

            let Some(cs) = self.col_stat.get(col as usize) else {
                continue;
            };
            if !cs.can_spawn || cs.num_droplets >= self.cfg.max_droplets_per_column {
                continue;
            }

            let Some(free) = (idx..self.droplets.len()).find(|&i| !self.droplets[i].is_alive())
            else {
                break;
            };
            idx = free;

            let params = self.droplet_params(col);
            self.droplets[free].spawn(params, now);

            let cs = &mut self.col_stat[col as usize];
            cs.can_spawn = false;
            cs.num_droplets += 1;
            spawned += 1;
        }

        if spawned > 0 {
            self.last_spawn_time = now;
        }
        trace!("spawn: {} attempts, {} spawned", to_spawn, spawned);
        (to_spawn, spawned)
    }

    /// Run one simulation step at `now` and draw it into `sink`.
    pub fn rain<S: RenderSink + ?Sized>(&mut self, sink: &mut S, now: Instant) -> TickStats {
        let mut stats = TickStats::default();
        if self.paused {
            return stats;
        }

        (stats.spawn_attempts, stats.spawned) = self.spawn_droplets(now);

        if self.force_draw_everything {
            sink.clear();
        }

        let time_for_glitch = self.cfg.glitchy && self.glitch_clock.is_due(now);
        let lines = self.lines;
        let draw_everything = self.force_draw_everything;

        for d in &mut self.droplets {
            if !d.is_alive() {
                continue;
            }
            let col = d.col();

            if d.advance(now, lines) {
                if let Some(cs) = self.col_stat.get_mut(col as usize) {
                    cs.can_spawn = true;
                }
            }

            if time_for_glitch {
                for line in d.first_visible_line()..=d.head_put_line() {
                    if self.maps.is_glitched(line, col) {
                        self.pools.glitch(line, d.char_pool_idx());
                        stats.glitched_cells += 1;
                    }
                }
            }

            let ctx = DrawCtx::new(
                &self.cfg,
                self.num_pairs,
                self.glitch_clock,
                &self.maps,
                &self.pools,
            );
            d.draw(&ctx, sink, now, draw_everything);

            if !d.is_alive() {
                stats.died += 1;
                if let Some(cs) = self.col_stat.get_mut(col as usize) {
                    debug_assert!(cs.num_droplets > 0);
                    cs.num_droplets = cs.num_droplets.saturating_sub(1);
                    if d.tail_put_line().map_or(true, |t| t <= lines / 4) {
                        cs.can_spawn = true;
                    }
                }
            }
        }

        if self.message.is_some() {
            let attr = self.message_attr();
            if let Some(msg) = self.message.as_mut() {
                msg.draw(sink, attr);
            }
        }

        if time_for_glitch {
            let next = now + Duration::from_millis(self.rng.glitch_ms() as u64);
            self.glitch_clock = GlitchClock::new(now, next);
            trace!("glitch: {} cells substituted", stats.glitched_cells);
        }

        self.force_draw_everything = false;
        stats
    }

    #[cfg(test)]
    fn droplets(&self) -> &[Droplet] {
        &self.droplets
    }

    #[cfg(test)]
    fn column_status(&self) -> &[ColumnStatus] {
        &self.col_stat
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;
    use crate::frame::Frame;

    const LINES: u16 = 20;
    const COLS: u16 = 30;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn make_cloud(cfg: RainConfig, now: Instant) -> (Cloud, Frame) {
        let cloud = Cloud::new(cfg, &['0', '1'], 7, LINES, COLS, now);
        (cloud, Frame::new(COLS, LINES))
    }

    type Snapshot = Vec<(bool, u16, u16, Option<u16>, u16)>;

    fn snapshot(cloud: &Cloud) -> Snapshot {
        cloud
            .droplets()
            .iter()
            .map(|d| {
                (
                    d.is_alive(),
                    d.col(),
                    d.head_put_line(),
                    d.tail_put_line(),
                    d.end_line(),
                )
            })
            .collect()
    }

    fn run(cloud: &mut Cloud, frame: &mut Frame, start: Instant, steps: u64) -> Instant {
        let mut t = start;
        for _ in 0..steps {
            t += ms(16);
            cloud.rain(frame, t);
        }
        t
    }

    #[test]
    fn glitch_envelope_quarters() {
        let t0 = Instant::now();
        let clock = GlitchClock::new(t0, t0 + ms(300));

        assert!(clock.is_bright(t0 + ms(50)));
        assert!(!clock.is_dim(t0 + ms(50)));

        assert!(!clock.is_bright(t0 + ms(150)));
        assert!(!clock.is_dim(t0 + ms(150)));

        assert!(!clock.is_bright(t0 + ms(250)));
        assert!(clock.is_dim(t0 + ms(250)));

        assert!(clock.is_dim(t0 + ms(301)));
    }

    #[test]
    fn droplet_invariants_hold_over_many_ticks() {
        let t0 = Instant::now();
        let cfg = RainConfig {
            async_mode: true,
            chars_per_sec: 20.0,
            ..RainConfig::default()
        };
        let (mut cloud, mut frame) = make_cloud(cfg, t0);

        let mut t = t0;
        for _ in 0..600 {
            t += ms(16);
            cloud.rain(&mut frame, t);
            for d in cloud.droplets() {
                if d.col() == u16::MAX {
                    continue;
                }
                let tail = d.tail_put_line();
                assert!(tail.unwrap_or(0) <= d.head_put_line());
                assert!(d.head_put_line() <= d.end_line());
                if tail == Some(d.head_put_line()) {
                    assert!(!d.is_alive());
                }
            }
        }
    }

    #[test]
    fn column_counts_never_exceed_cap() {
        let t0 = Instant::now();
        for cap in 1..=3u8 {
            let cfg = RainConfig {
                max_droplets_per_column: cap,
                droplet_density: 4.0,
                chars_per_sec: 30.0,
                ..RainConfig::default()
            };
            let (mut cloud, mut frame) = make_cloud(cfg, t0);
            let mut t = t0;
            for _ in 0..400 {
                t += ms(16);
                cloud.rain(&mut frame, t);

                let mut alive = vec![0u8; COLS as usize];
                for d in cloud.droplets().iter().filter(|d| d.is_alive()) {
                    alive[d.col() as usize] += 1;
                }
                for (col, cs) in cloud.column_status().iter().enumerate() {
                    assert!(cs.num_droplets <= cap);
                    assert_eq!(cs.num_droplets, alive[col]);
                }
            }
        }
    }

    #[test]
    fn same_seed_and_timestamps_give_same_trajectories() {
        let t0 = Instant::now();
        let cfg = RainConfig {
            async_mode: true,
            ..RainConfig::default()
        };
        let (mut a, mut fa) = make_cloud(cfg.clone(), t0);
        let (mut b, mut fb) = make_cloud(cfg, t0);

        let mut t = t0;
        for _ in 0..300 {
            t += ms(16);
            let sa = a.rain(&mut fa, t);
            let sb = b.rain(&mut fb, t);
            assert_eq!(sa, sb);
            assert_eq!(snapshot(&a), snapshot(&b));
        }
    }

    #[test]
    fn consecutive_resets_are_identical() {
        let t0 = Instant::now();
        let cfg = RainConfig {
            async_mode: true,
            ..RainConfig::default()
        };
        let (mut cloud, mut frame) = make_cloud(cfg, t0);
        run(&mut cloud, &mut frame, t0, 50);

        cloud.reset(LINES, COLS, t0);
        let pool_a = cloud.droplets().len();
        let cols_a = cloud.column_status().to_vec();

        cloud.reset(LINES, COLS, t0);
        assert_eq!(cloud.droplets().len(), pool_a);
        assert_eq!(cloud.column_status(), cols_a.as_slice());
        assert_eq!(pool_a, 45);
        assert!(cloud.droplets().iter().all(|d| !d.is_alive()));
    }

    #[test]
    fn pause_does_not_advance_droplets() {
        let t0 = Instant::now();
        let cfg = RainConfig::default();
        let (mut a, mut fa) = make_cloud(cfg.clone(), t0);
        let (mut b, mut fb) = make_cloud(cfg, t0);

        let t1 = run(&mut a, &mut fa, t0, 60);
        run(&mut b, &mut fb, t0, 60);
        assert_eq!(snapshot(&a), snapshot(&b));

        let gap = ms(2_500);
        a.toggle_pause(t1);
        let stats = a.rain(&mut fa, t1 + ms(1_000));
        assert_eq!(stats, TickStats::default());
        a.toggle_pause(t1 + gap);

        let mut ta = t1 + gap;
        let mut tb = t1;
        for _ in 0..60 {
            ta += ms(16);
            tb += ms(16);
            let sa = a.rain(&mut fa, ta);
            let sb = b.rain(&mut fb, tb);
            assert_eq!(sa, sb);
            assert_eq!(snapshot(&a), snapshot(&b));
        }
    }

    #[test]
    fn paused_tick_leaves_frame_untouched() {
        let t0 = Instant::now();
        let (mut cloud, mut frame) = make_cloud(RainConfig::default(), t0);
        let t = run(&mut cloud, &mut frame, t0, 30);
        frame.clear_dirty();

        cloud.toggle_pause(t);
        cloud.rain(&mut frame, t + ms(500));
        assert!(!frame.has_changes());
        assert!(cloud.is_paused());
    }

    #[test]
    fn spawn_count_follows_elapsed_time() {
        let t0 = Instant::now();
        // 10 cols * 1.0 density / (10 lines / 10 cps) = 10 droplets/sec
        let cfg = RainConfig {
            chars_per_sec: 10.0,
            ..RainConfig::default()
        };
        let mut cloud = Cloud::new(cfg, &['x'], 7, 10, 10, t0);
        let mut frame = Frame::new(10, 10);

        let stats = cloud.rain(&mut frame, t0 + ms(350));
        assert_eq!(stats.spawn_attempts, 3);
        assert!(stats.spawned <= 3);
    }

    #[test]
    fn nothing_spawns_before_a_whole_droplet_is_due() {
        let t0 = Instant::now();
        let cfg = RainConfig {
            chars_per_sec: 10.0,
            ..RainConfig::default()
        };
        let mut cloud = Cloud::new(cfg, &['x'], 7, 10, 10, t0);
        let mut frame = Frame::new(10, 10);

        // 50ms at 10/sec is half a droplet; the remainder carries over
        assert_eq!(cloud.rain(&mut frame, t0 + ms(50)).spawn_attempts, 0);
        assert_eq!(cloud.rain(&mut frame, t0 + ms(120)).spawn_attempts, 1);
    }

    #[test]
    fn full_width_spawns_on_even_columns_only() {
        let t0 = Instant::now();
        let cfg = RainConfig {
            full_width: true,
            droplet_density: 3.0,
            ..RainConfig::default()
        };
        let (mut cloud, mut frame) = make_cloud(cfg, t0);
        let mut t = t0;
        for _ in 0..200 {
            t += ms(16);
            cloud.rain(&mut frame, t);
            for d in cloud.droplets().iter().filter(|d| d.is_alive()) {
                assert_eq!(d.col() % 2, 0);
            }
        }
    }

    #[test]
    fn early_death_reenables_column() {
        let t0 = Instant::now();
        // every droplet dies early and short, so tails rarely pass a quarter
        let cfg = RainConfig {
            die_early_pct: 1.0,
            chars_per_sec: 40.0,
            max_droplets_per_column: 1,
            linger_low_ms: 1,
            linger_high_ms: 1,
            ..RainConfig::default()
        };
        let (mut cloud, mut frame) = make_cloud(cfg, t0);
        let mut t = t0;
        let mut deaths = 0;
        for _ in 0..400 {
            t += ms(16);
            deaths += cloud.rain(&mut frame, t).died;
            for cs in cloud.column_status() {
                if cs.num_droplets == 0 {
                    assert!(cs.can_spawn);
                }
            }
        }
        assert!(deaths > 0);
    }

    #[test]
    fn glitch_event_substitutes_glitched_cells() {
        let t0 = Instant::now();
        let cfg = RainConfig {
            glitch_pct: 1.0,
            glitch_low_ms: 100,
            glitch_high_ms: 100,
            ..RainConfig::default()
        };
        let (mut cloud, mut frame) = make_cloud(cfg, t0);

        let mut t = t0;
        let mut glitched = 0;
        for _ in 0..120 {
            t += ms(16);
            glitched += cloud.rain(&mut frame, t).glitched_cells;
        }
        assert!(glitched > 0);
        assert!(cloud.glitch_clock.next > t0 + ms(100));
    }

    #[test]
    fn noglitch_never_substitutes() {
        let t0 = Instant::now();
        let cfg = RainConfig {
            glitchy: false,
            glitch_pct: 0.0,
            glitch_low_ms: u16::MAX,
            glitch_high_ms: u16::MAX,
            ..RainConfig::default()
        };
        let (mut cloud, mut frame) = make_cloud(cfg, t0);
        let mut t = t0;
        for _ in 0..120 {
            t += ms(16);
            assert_eq!(cloud.rain(&mut frame, t).glitched_cells, 0);
        }
    }

    fn attr_cloud(bold_mode: BoldMode, shading_mode: ShadingMode, glitch_pct: f32) -> Cloud {
        let cfg = RainConfig {
            bold_mode,
            shading_mode,
            glitch_pct,
            ..RainConfig::default()
        };
        Cloud::new(cfg, &['a'], 7, LINES, COLS, Instant::now())
    }

    #[test]
    fn tail_and_head_overrides() {
        let cloud = attr_cloud(BoldMode::Random, ShadingMode::Random, 0.0);
        let now = Instant::now();
        let tail = cloud.get_attr(3, 4, 'a', CharLoc::Tail, now, 10, 10);
        assert_eq!(tail, CharAttr { pair: 1, bold: false });
        let head = cloud.get_attr(10, 4, 'a', CharLoc::Head, now, 10, 10);
        assert_eq!(head, CharAttr { pair: 7, bold: true });
    }

    #[test]
    fn middle_cells_stay_below_head_pair() {
        let cloud = attr_cloud(BoldMode::Off, ShadingMode::Random, 0.0);
        let now = Instant::now();
        for line in 0..LINES {
            for col in 0..COLS {
                let a = cloud.get_attr(line, col, 'a', CharLoc::Middle, now, 19, 20);
                assert!((1..=6).contains(&a.pair));
                assert!((2..=5).contains(&a.pair));
                assert!(!a.bold);
            }
        }
    }

    #[test]
    fn distance_shading_fades_away_from_head() {
        let cloud = attr_cloud(BoldMode::Off, ShadingMode::DistanceFromHead, 0.0);
        let now = Instant::now();
        // right below the head: 7 - round(1/12*6) = 6
        let near = cloud.get_attr(11, 0, 'a', CharLoc::Middle, now, 12, 12);
        assert_eq!(near.pair, 6);
        // half a length away: 7 - round(6/12*6) = 4
        let mid = cloud.get_attr(6, 0, 'a', CharLoc::Middle, now, 12, 12);
        assert_eq!(mid.pair, 4);
        // a full length away: 7 - 6 = 1
        let far = cloud.get_attr(0, 0, 'a', CharLoc::Middle, now, 12, 12);
        assert_eq!(far.pair, 1);
    }

    #[test]
    fn glitched_cells_brighten_then_dim() {
        let mut cloud = attr_cloud(BoldMode::Random, ShadingMode::DistanceFromHead, 1.0);
        let t0 = Instant::now();
        cloud.glitch_clock = GlitchClock::new(t0, t0 + ms(300));

        // line 6 of a 12-long droplet with head at 12 has baseline pair 4
        let bright = cloud.get_attr(6, 0, 'b', CharLoc::Middle, t0 + ms(50), 12, 12);
        assert_eq!(bright, CharAttr { pair: 5, bold: true });

        let dim = cloud.get_attr(6, 0, 'b', CharLoc::Middle, t0 + ms(250), 12, 12);
        assert_eq!(dim, CharAttr { pair: 3, bold: false });

        let steady = cloud.get_attr(6, 0, 'b', CharLoc::Middle, t0 + ms(150), 12, 12);
        assert_eq!(steady.pair, 4);
    }

    #[test]
    fn bold_mode_has_the_last_word() {
        let now = Instant::now();
        let all = attr_cloud(BoldMode::All, ShadingMode::Random, 0.0);
        assert!(all.get_attr(0, 0, 'a', CharLoc::Tail, now, 5, 5).bold);

        let off = attr_cloud(BoldMode::Off, ShadingMode::Random, 0.0);
        assert!(!off.get_attr(5, 0, 'a', CharLoc::Head, now, 5, 5).bold);

        // random: parity of line ^ char
        let random = attr_cloud(BoldMode::Random, ShadingMode::Random, 0.0);
        let odd = random.get_attr(0, 0, 'a', CharLoc::Middle, now, 5, 5);
        let even = random.get_attr(1, 0, 'a', CharLoc::Middle, now, 5, 5);
        assert!(odd.bold);
        assert!(!even.bold);
    }

    #[test]
    fn single_pair_palette_does_not_panic() {
        let now = Instant::now();
        let cloud = Cloud::new(RainConfig::default(), &['a'], 1, LINES, COLS, now);
        let a = cloud.get_attr(3, 3, 'a', CharLoc::Middle, now, 10, 10);
        assert_eq!(a.pair, 1);
    }

    #[test]
    fn message_shows_through_blank_cells() {
        let t0 = Instant::now();
        let cfg = RainConfig {
            message: Some("hi".to_string()),
            droplet_density: 0.0,
            ..RainConfig::default()
        };
        let mut cloud = Cloud::new(cfg, &['0'], 7, 25, 80, t0);
        let mut frame = Frame::new(80, 25);
        cloud.rain(&mut frame, t0 + ms(16));
        assert_eq!(frame.char_at(12, 39), 'h');
        assert_eq!(frame.char_at(12, 40), 'i');
        assert_eq!(frame.get(39, 12).unwrap().pair, 7);
    }

    #[test]
    fn speed_has_a_floor() {
        let t0 = Instant::now();
        let (mut cloud, _) = make_cloud(RainConfig::default(), t0);
        cloud.set_chars_per_sec(0.01);
        assert_eq!(cloud.config().chars_per_sec, MIN_CHARS_PER_SEC);
    }

    #[test]
    fn live_setters_take_effect() {
        let t0 = Instant::now();
        let cfg = RainConfig {
            droplet_density: 4.0,
            chars_per_sec: 30.0,
            ..RainConfig::default()
        };
        let (mut cloud, mut frame) = make_cloud(cfg, t0);
        cloud.set_max_droplets_per_column(1);
        cloud.set_glitch_times(50, 60);
        cloud.set_linger_times(10, 20);
        assert_eq!((cloud.config().glitch_low_ms, cloud.config().glitch_high_ms), (50, 60));
        assert_eq!((cloud.config().linger_low_ms, cloud.config().linger_high_ms), (10, 20));

        let mut t = t0;
        for _ in 0..300 {
            t += ms(16);
            cloud.rain(&mut frame, t);
            assert!(cloud.column_status().iter().all(|cs| cs.num_droplets <= 1));
        }
    }

    #[test]
    fn reset_while_paused_resumes_from_the_reset() {
        let t0 = Instant::now();
        let (mut cloud, mut frame) = make_cloud(RainConfig::default(), t0);

        cloud.toggle_pause(t0);
        cloud.reset(LINES, COLS, t0 + ms(10_000));
        assert!(cloud.is_paused());

        let resume = t0 + ms(20_000);
        cloud.toggle_pause(resume);
        assert!(!cloud.is_paused());
        assert_eq!(cloud.last_spawn_time, resume);
        assert_eq!(cloud.glitch_clock.last, resume);

        let mut t = resume;
        let mut spawned = 0;
        for _ in 0..60 {
            t += ms(16);
            spawned += cloud.rain(&mut frame, t).spawned;
        }
        assert!(spawned > 0);
    }

    fn visible_cells(cloud: &Cloud) -> Vec<(usize, u16, u16, char)> {
        let mut out = Vec::new();
        for (slot, d) in cloud.droplets().iter().enumerate() {
            if !d.is_alive() {
                continue;
            }
            for line in d.first_visible_line()..=d.head_put_line() {
                out.push((slot, line, d.col(), cloud.pools.get(line, d.char_pool_idx())));
            }
        }
        out
    }

    #[test]
    fn glitch_event_redraws_substituted_cells() {
        let t0 = Instant::now();
        let cfg = RainConfig {
            chars_per_sec: 20.0,
            droplet_density: 2.0,
            glitch_pct: 1.0,
            glitch_low_ms: 100,
            glitch_high_ms: 100,
            max_droplets_per_column: 1,
            ..RainConfig::default()
        };
        let (mut cloud, mut frame) = make_cloud(cfg, t0);

        let mut t = t0;
        let mut changed = 0;
        for _ in 0..1000 {
            let before = visible_cells(&cloud);
            t += ms(16);
            if cloud.rain(&mut frame, t).glitched_cells == 0 {
                continue;
            }

            // same droplet, same cell, new pool character now on screen
            let after = visible_cells(&cloud);
            changed += after
                .iter()
                .filter(|a| {
                    before
                        .iter()
                        .any(|b| a.0 == b.0 && a.1 == b.1 && a.2 == b.2 && a.3 != b.3)
                        && frame.char_at(a.1, a.2) == a.3
                })
                .count();
            if changed > 0 {
                break;
            }
        }
        assert!(changed > 0);

        // next tick falls in the bright quarter of the new interval
        t += ms(16);
        cloud.rain(&mut frame, t);
        for d in cloud.droplets().iter().filter(|d| d.is_alive()) {
            for line in d.first_visible_line()..=d.head_put_line() {
                if d.tail_put_line().is_some() && line == d.first_visible_line() {
                    continue;
                }
                let cell = frame.get(d.col(), line).unwrap();
                assert!(cell.bold, "line {line} col {}", d.col());
                assert!(cell.pair >= 2);
            }
        }
    }

    #[test]
    fn settled_cells_are_not_rewritten_without_a_forced_redraw() {
        let t0 = Instant::now();
        let cfg = RainConfig {
            glitchy: false,
            glitch_pct: 0.0,
            chars_per_sec: 10.0,
            die_early_pct: 0.0,
            short_pct: 0.0,
            max_droplets_per_column: 1,
            ..RainConfig::default()
        };
        let (mut cloud, mut frame) = make_cloud(cfg, t0);

        let mut t = t0;
        for _ in 0..10 {
            t += ms(100);
            cloud.rain(&mut frame, t);
        }
        let settled: Vec<(u16, u16)> = cloud
            .droplets()
            .iter()
            .filter(|d| d.is_alive() && d.head_put_line() >= 3)
            .map(|d| (d.col(), d.head_put_line() - 2))
            .collect();
        assert!(!settled.is_empty());

        frame.clear_dirty();
        t += ms(100);
        cloud.rain(&mut frame, t);
        for &(col, line) in &settled {
            let idx = frame.index(col, line).unwrap();
            assert!(!frame.dirty_indices().contains(&idx));
        }

        cloud.force_draw_everything();
        t += ms(100);
        cloud.rain(&mut frame, t);
        assert!(frame.is_dirty_all());
        for &(col, line) in &settled {
            assert_ne!(frame.char_at(line, col), ' ');
        }
    }
}
