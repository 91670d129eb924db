// Copyright (c) 2026 rezky_nightky

use std::time::{Duration, Instant};

use crate::cloud::DrawCtx;
use crate::sink::{CharLoc, RenderSink};

/// How long the head keeps its head color after it stops moving.
const HEAD_BRIGHT_AFTER_STOP: Duration = Duration::from_millis(100);

/// Randomized parameters a droplet is filled with when it spawns.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DropletParams {
    pub col: u16,
    pub end_line: u16,
    pub char_pool_idx: u16,
    pub length: u16,
    pub chars_per_sec: f32,
    pub time_to_linger: Duration,
}

/// One falling stream of characters bound to a column.
///
/// The head moves down until it reaches `end_line`; the tail starts
/// following once the droplet is `length` long (or the head has stopped),
/// optionally lingering after the head stops. The droplet dies when the
/// tail catches the head.
#[derive(Clone, Debug)]
pub struct Droplet {
    is_alive: bool,
    is_head_crawling: bool,
    is_tail_crawling: bool,
    bound_col: u16,
    head_put_line: u16,
    head_cur_line: u16,
    tail_put_line: Option<u16>,
    tail_cur_line: u16,
    end_line: u16,
    char_pool_idx: u16,
    length: u16,
    chars_per_sec: f32,
    last_time: Option<Instant>,
    head_stop_time: Option<Instant>,
    time_to_linger: Duration,
}

impl Default for Droplet {
    fn default() -> Self {
        Self::new()
    }
}

impl Droplet {
    /// An inert slot.
    pub fn new() -> Self {
        Self {
            is_alive: false,
            is_head_crawling: false,
            is_tail_crawling: false,
            bound_col: u16::MAX,
            head_put_line: 0,
            head_cur_line: 0,
            tail_put_line: None,
            tail_cur_line: 0,
            end_line: u16::MAX,
            char_pool_idx: 0,
            length: u16::MAX,
            chars_per_sec: 0.0,
            last_time: None,
            head_stop_time: None,
            time_to_linger: Duration::ZERO,
        }
    }

    /// Reinitialise this slot with fresh parameters and start it moving.
    pub fn spawn(&mut self, p: DropletParams, now: Instant) {
        *self = Self {
            is_alive: true,
            is_head_crawling: true,
            is_tail_crawling: true,
            bound_col: p.col,
            end_line: p.end_line,
            char_pool_idx: p.char_pool_idx,
            length: p.length,
            chars_per_sec: p.chars_per_sec,
            time_to_linger: p.time_to_linger,
            last_time: Some(now),
            ..Self::new()
        };
    }

    pub fn is_alive(&self) -> bool {
        self.is_alive
    }

    pub fn col(&self) -> u16 {
        self.bound_col
    }

    pub fn head_put_line(&self) -> u16 {
        self.head_put_line
    }

    pub fn tail_put_line(&self) -> Option<u16> {
        self.tail_put_line
    }

    #[cfg(test)]
    pub fn end_line(&self) -> u16 {
        self.end_line
    }

    pub fn char_pool_idx(&self) -> u16 {
        self.char_pool_idx
    }

    pub fn set_chars_per_sec(&mut self, cps: f32) {
        self.chars_per_sec = cps;
    }

    /// First line a glitch or redraw should touch: just below the tail.
    pub fn first_visible_line(&self) -> u16 {
        self.tail_put_line.map_or(0, |t| t.saturating_add(1))
    }

    /// Move head and tail by however many whole characters the elapsed
    /// time is worth. Returns `true` when the tail has just crossed the
    /// quarter-screen line, freeing the column for another spawn.
    pub fn advance(&mut self, now: Instant, lines: u16) -> bool {
        let Some(last) = self.last_time else {
            self.last_time = Some(now);
            return false;
        };

        let elapsed = now.saturating_duration_since(last).as_secs_f32();
        let chars = (self.chars_per_sec * elapsed).round();
        if chars < 1.0 {
            // lastTime must stay put or slow droplets never move
            return false;
        }
        let chars = chars.min(u16::MAX as f32) as u16;
        let mut release_column = false;

        if self.is_head_crawling {
            self.head_put_line = self.head_put_line.saturating_add(chars).min(self.end_line);

            if self.head_put_line == self.end_line {
                self.is_head_crawling = false;
                if self.head_stop_time.is_none() {
                    self.head_stop_time = Some(now);
                    if !self.time_to_linger.is_zero() {
                        self.is_tail_crawling = false;
                    }
                }
            }
        }

        if self.is_tail_crawling
            && (self.head_put_line >= self.length || self.head_put_line >= self.end_line)
        {
            let tail = match self.tail_put_line {
                Some(t) => t.saturating_add(chars),
                None => chars,
            };
            let tail = tail.min(self.end_line).min(self.head_put_line);
            self.tail_put_line = Some(tail);

            let thresh = lines / 4;
            if self.tail_cur_line <= thresh && tail > thresh {
                release_column = true;
            }
        }

        if !self.is_tail_crawling {
            if let Some(stop) = self.head_stop_time {
                if now.saturating_duration_since(stop) >= self.time_to_linger {
                    self.is_tail_crawling = true;
                }
            }
        }

        if self.tail_put_line == Some(self.head_put_line) {
            self.is_alive = false;
        }

        debug_assert!(self.tail_put_line.unwrap_or(0) <= self.head_put_line);
        debug_assert!(self.head_put_line <= self.end_line);

        self.last_time = Some(now);
        release_column
    }

    fn is_head_bright(&self, now: Instant) -> bool {
        if self.is_head_crawling {
            return true;
        }
        self.head_stop_time
            .is_some_and(|t| now.saturating_duration_since(t) <= HEAD_BRIGHT_AFTER_STOP)
    }

    /// Erase cells the tail has vacated and (re)draw the visible body.
    pub fn draw<S: RenderSink + ?Sized>(
        &mut self,
        ctx: &DrawCtx<'_>,
        sink: &mut S,
        now: Instant,
        draw_everything: bool,
    ) {
        let col = self.bound_col;

        if let Some(tp) = self.tail_put_line {
            for line in self.tail_cur_line..=tp {
                sink.erase(line, col);
            }
            self.tail_cur_line = tp;
        }

        let head_bright = self.is_head_bright(now);
        for line in self.first_visible_line()..=self.head_put_line {
            let glitched = ctx.is_glitched(line, col);

            let mut loc = CharLoc::Middle;
            if self.tail_put_line.is_some_and(|t| line == t.saturating_add(1)) {
                loc = CharLoc::Tail;
            }
            if line == self.head_put_line && head_bright {
                loc = CharLoc::Head;
            }

            // Interior cells already on screen only change if something
            // about their attribute can have changed.
            if loc == CharLoc::Middle
                && line < self.head_cur_line
                && !glitched
                && line != self.end_line
                && !ctx.shading_distance
                && !draw_everything
            {
                continue;
            }

            let ch = ctx.char_at(line, self.char_pool_idx);
            let attr = ctx.get_attr(line, col, ch, loc, now, self.head_put_line, self.length);
            sink.put(line, col, ch, attr);
        }
        self.head_cur_line = self.head_put_line;
    }

    /// Shift the internal clocks forward, e.g. by the time spent paused.
    pub fn increment_time(&mut self, by: Duration) {
        if let Some(t) = self.last_time.as_mut() {
            *t += by;
        }
        if let Some(t) = self.head_stop_time.as_mut() {
            *t += by;
        }
    }

    #[cfg(test)]
    pub(crate) fn timestamps(&self) -> (Option<Instant>, Option<Instant>) {
        (self.last_time, self.head_stop_time)
    }

    #[cfg(test)]
    pub(crate) fn is_lingering(&self) -> bool {
        self.is_alive && !self.is_head_crawling && !self.is_tail_crawling
    }
}
