// Copyright (c) 2026 rezky_nightky

use crate::sink::{CharAttr, RenderSink};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MsgChr {
    /// Target (line, col), `None` when the layout runs off the bottom.
    pub pos: Option<(u16, u16)>,
    pub val: char,
    /// Drawn this frame. Recomputed every frame.
    pub visible: bool,
}

/// Fixed text laid out in the middle half of the screen and shown only
/// through cells the rain has left blank.
#[derive(Clone, Debug)]
pub struct Message {
    chars: Vec<MsgChr>,
}

impl Message {
    pub fn new(text: &str) -> Self {
        Self {
            chars: text
                .chars()
                .filter(|c| !c.is_control())
                .map(|val| MsgChr {
                    pos: None,
                    val,
                    visible: false,
                })
                .collect(),
        }
    }

    #[cfg(test)]
    pub fn chars(&self) -> &[MsgChr] {
        &self.chars
    }

    /// Wrap the text inside columns `cols/4 ..= 3*cols/4`, centered
    /// vertically. A row shorter than the band is centered horizontally.
    pub fn layout(&mut self, lines: u16, cols: u16) {
        let first_col = cols / 4;
        let last_col = 3 * cols / 4;
        let per_line = (last_col - first_col + 1) as usize;
        let total = self.chars.len();
        let msg_lines = (total / per_line + 1) as u16;
        let first_line = (lines / 2).saturating_sub(msg_lines / 2);

        for (i, mc) in self.chars.iter_mut().enumerate() {
            let row = i / per_line;
            let row_start = row * per_line;
            let row_len = (total - row_start).min(per_line);
            let offset = (per_line - row_len) / 2;

            let line = first_line as usize + row;
            let col = first_col as usize + offset + (i - row_start);
            mc.visible = false;
            mc.pos = if line < lines as usize && col < cols as usize {
                Some((line as u16, col as u16))
            } else {
                None
            };
        }
    }

    pub fn draw<S: RenderSink + ?Sized>(&mut self, sink: &mut S, attr: CharAttr) {
        for mc in &mut self.chars {
            let Some((line, col)) = mc.pos else {
                mc.visible = false;
                continue;
            };
            let shown = sink.char_at(line, col);
            mc.visible = shown == ' ' || shown == mc.val;
            if mc.visible {
                sink.put(line, col, mc.val, attr);
            }
        }
    }
}
