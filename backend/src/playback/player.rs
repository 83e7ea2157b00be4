use std::sync::{Arc, Mutex};

use crate::playback::mapper::{self, PlaybackState, ScrollMapper, ZoomCurve};
use crate::playback::preloader::FrameSet;
use crate::playback::renderer::{Canvas, DeviceClass, DrawRect, FitMode, Viewport};
use crate::utils::debounce::{Debouncer, RESIZE_DEBOUNCE};

// The hero title fades out while these frames scroll by
const OVERLAY_FADE_START_FRAME: usize = 100;
const OVERLAY_FADE_END_FRAME: usize = 115;

/// Scroll-driven playback of a preloaded frame set onto a canvas.
pub struct Player {
    frames: FrameSet,
    mapper: ScrollMapper,
    canvas: Canvas,
    zoom: ZoomCurve,
    progress: f64,
    state: PlaybackState,
}

impl Player {
    /// Takes a fully preloaded set and shows its first frame.
    pub fn new(frames: FrameSet, viewport: Viewport) -> Self {
        let mapper = ScrollMapper::new(frames.len());
        let mut player = Self {
            frames,
            mapper,
            canvas: Canvas::new(viewport),
            zoom: ZoomCurve::default(),
            progress: 0.0,
            state: PlaybackState::START,
        };
        player.redraw();
        player
    }

    pub fn on_scroll(&mut self, progress: f64) -> PlaybackState {
        self.progress = mapper::clamp_progress(progress);
        self.state = self.mapper.map(self.progress);
        self.redraw();
        self.state
    }

    /// Applies only the newest of several queued progress updates.
    pub fn on_scroll_coalesced<I: IntoIterator<Item = f64>>(&mut self, pending: I) -> PlaybackState {
        match mapper::coalesce(pending) {
            Some(progress) => self.on_scroll(progress),
            None => self.state,
        }
    }

    /// New geometry, same frame.
    pub fn on_resize(&mut self, viewport: Viewport) {
        self.canvas.resize(viewport);
        self.redraw();
    }

    pub fn redraw(&mut self) -> Option<DrawRect> {
        let mode = FitMode::from(self.device_class());
        let zoom = self.zoom_factor();
        self.canvas.draw(self.frames.image(self.state.index), mode, zoom)
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn frames(&self) -> &FrameSet {
        &self.frames
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn device_class(&self) -> DeviceClass {
        self.canvas.viewport().device_class()
    }

    pub fn zoom_factor(&self) -> f64 {
        self.zoom
            .factor(self.progress, self.device_class() == DeviceClass::Narrow)
    }

    pub fn overlay_opacity(&self) -> f64 {
        mapper::fade_out(
            self.progress,
            self.mapper.progress_for_frame(OVERLAY_FADE_START_FRAME),
            self.mapper.progress_for_frame(OVERLAY_FADE_END_FRAME),
        )
    }

    pub fn progress_bar_percent(&self) -> f64 {
        mapper::progress_bar_percent(self.progress)
    }
}

/// Forwards viewport changes to `player` once resizing settles.
pub fn resize_debouncer(player: Arc<Mutex<Player>>) -> Debouncer<Viewport> {
    Debouncer::spawn(RESIZE_DEBOUNCE, move |viewport: Viewport| match player.lock() {
        Ok(mut player) => player.on_resize(viewport),
        Err(_) => tracing::error!("Player lock poisoned, dropping resize"),
    })
}
