//! Frame index state machine.
//!
//! [`Navigator`] owns the current frame index and the frame count of the
//! loaded video. Every movement clamps into `[0, total_frames - 1]` instead of
//! failing: a stale slider position or a key held past the last frame is an
//! ordinary UI condition, not an error.
//!
//! With `total_frames == 0` (no video) the navigator is idle: movements are
//! no-ops and the index stays at zero.
//!
//! # Example
//!
//! ```
//! use framepick::Navigator;
//!
//! let mut navigator = Navigator::new();
//! navigator.on_video_loaded(120);
//! navigator.jump(10);
//! navigator.step(-1);
//! assert_eq!(navigator.current_index(), 9);
//!
//! // A shorter video pulls the index back into range.
//! navigator.seek(100);
//! navigator.on_video_loaded(50);
//! assert_eq!(navigator.current_index(), 49);
//! ```

/// Number of frames moved by [`Navigator::jump_forward`] and
/// [`Navigator::jump_backward`].
pub const JUMP_SIZE: i64 = 10;

/// Current frame index bounded by the loaded video's frame count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Navigator {
    current_index: u64,
    total_frames: u64,
}

impl Navigator {
    /// A navigator with no video loaded.
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the frame that should be displayed.
    pub fn current_index(&self) -> u64 {
        self.current_index
    }

    /// Frame count of the loaded video, `0` when none.
    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    /// `true` once a video with at least one frame is loaded.
    pub fn is_ready(&self) -> bool {
        self.total_frames > 0
    }

    /// Index of the last frame, if any.
    pub fn last_index(&self) -> Option<u64> {
        self.total_frames.checked_sub(1)
    }

    /// Move by `delta` frames.
    pub fn step(&mut self, delta: i64) -> u64 {
        let target = (self.current_index as i64).saturating_add(delta);
        self.seek(target)
    }

    /// Move by `delta` frames. Same clamping as [`step`](Self::step); kept
    /// separate so callers can tell page moves from single steps.
    pub fn jump(&mut self, delta: i64) -> u64 {
        self.step(delta)
    }

    pub fn jump_forward(&mut self) -> u64 {
        self.jump(JUMP_SIZE)
    }

    pub fn jump_backward(&mut self) -> u64 {
        self.jump(-JUMP_SIZE)
    }

    /// Move to an absolute index, clamping negative or oversized values.
    pub fn seek(&mut self, absolute_index: i64) -> u64 {
        if let Some(last) = self.last_index() {
            self.current_index = if absolute_index <= 0 {
                0
            } else {
                (absolute_index as u64).min(last)
            };
        }
        self.current_index
    }

    /// Adopt the frame count of a newly opened video and pull the current
    /// index back into range.
    pub fn on_video_loaded(&mut self, total_frames: u64) -> u64 {
        self.total_frames = total_frames;
        self.current_index = match self.last_index() {
            Some(last) => self.current_index.min(last),
            None => 0,
        };
        self.current_index
    }

    /// Forget the video.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
