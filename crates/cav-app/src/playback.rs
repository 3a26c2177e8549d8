//! Playback over recorded history.
//!
//! Playback and live simulation are mutually exclusive over the same
//! history store: while playback is active the stepping worker advances the
//! playback cursor instead of the engine.

/// Cursor over recorded samples.
#[derive(Debug, Clone, Default)]
pub struct PlaybackController {
    active: bool,
    index: usize,
}

impl PlaybackController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn start(&mut self) {
        self.active = true;
    }

    pub fn stop(&mut self) {
        self.active = false;
    }

    /// Clamp `index` to `[0, len - 1]`; an empty history pins the cursor at
    /// zero.
    pub fn seek(&mut self, index: usize, len: usize) {
        self.index = if len == 0 { 0 } else { index.min(len - 1) };
    }

    /// Advance one sample while active, saturating at the last entry.
    pub fn advance(&mut self, len: usize) {
        if self.active && len > 0 && self.index + 1 < len {
            self.index += 1;
        }
    }
}
