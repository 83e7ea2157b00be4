//! Maps normalized scroll progress onto the frame sequence.
//!
//! Progress is supplied by whoever observes the pinned section scrolling;
//! everything here is a pure function of that value.

/// Frame position derived from one progress update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackState {
    pub position: f64, // continuous, kept for smooth tweening
    pub index: usize,
}

impl PlaybackState {
    pub const START: PlaybackState = PlaybackState { position: 0.0, index: 0 };
}

/// Clamps progress into [0, 1]. NaN maps to 0.
pub fn clamp_progress(progress: f64) -> f64 {
    if progress.is_nan() {
        0.0
    } else {
        progress.clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ScrollMapper {
    frame_count: usize,
}

impl ScrollMapper {
    pub fn new(frame_count: usize) -> Self {
        Self { frame_count }
    }

    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    fn last_index(&self) -> usize {
        self.frame_count.saturating_sub(1)
    }

    pub fn map(&self, progress: f64) -> PlaybackState {
        let last = self.last_index();
        let position = clamp_progress(progress) * last as f64;
        PlaybackState {
            position,
            index: self.index_for(position),
        }
    }

    /// Floors and clamps a continuous frame position.
    pub fn index_for(&self, position: f64) -> usize {
        if position.is_nan() || position <= 0.0 {
            return 0;
        }
        (position.floor() as usize).min(self.last_index())
    }

    /// `frame / frame_count`, the progress used for overlay fade thresholds.
    ///
    /// This is not where [`map`](Self::map) switches to `frame`; that happens
    /// at `frame / (frame_count - 1)`.
    pub fn progress_for_frame(&self, frame: usize) -> f64 {
        if self.frame_count == 0 {
            return 0.0;
        }
        frame as f64 / self.frame_count as f64
    }
}

/// Opacity of an overlay that fades out between two progress thresholds.
pub fn fade_out(progress: f64, start: f64, end: f64) -> f64 {
    let p = clamp_progress(progress);
    if p <= start {
        1.0
    } else if p >= end {
        0.0
    } else {
        1.0 - (p - start) / (end - start)
    }
}

/// Zoom applied on narrow viewports once progress passes `threshold`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomCurve {
    pub threshold: f64,
    pub max_zoom: f64,
}

impl Default for ZoomCurve {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            max_zoom: 1.25,
        }
    }
}

impl ZoomCurve {
    pub fn factor(&self, progress: f64, narrow: bool) -> f64 {
        let p = clamp_progress(progress);
        if !narrow || p <= self.threshold || self.threshold >= 1.0 {
            return 1.0;
        }
        let t = (p - self.threshold) / (1.0 - self.threshold);
        1.0 + t * (self.max_zoom - 1.0)
    }
}

/// Width of the top progress bar, in percent.
pub fn progress_bar_percent(progress: f64) -> f64 {
    clamp_progress(progress) * 100.0
}

/// Height of the invisible spacer that drives the pinned section.
pub fn spacer_height(scroll_duration: f64, viewport_height: f64) -> f64 {
    scroll_duration * viewport_height
}

/// Keeps only the most recent of a burst of pending progress updates.
///
/// Updates that are not coalesced are applied one by one, in order.
pub fn coalesce<I: IntoIterator<Item = f64>>(pending: I) -> Option<f64> {
    pending.into_iter().last()
}
