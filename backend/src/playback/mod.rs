//! Scroll-driven image sequence playback: preload the frames, map scroll
//! progress to a frame, draw it onto a canvas sized to the viewport.

pub mod mapper;
pub mod player;
pub mod preloader;
pub mod renderer;

pub use mapper::{PlaybackState, ScrollMapper};
pub use player::Player;
pub use preloader::{FrameSet, HttpFrameFetcher, LoadProgress, Preloader};
pub use renderer::{Canvas, DeviceClass, FitMode, Viewport};
