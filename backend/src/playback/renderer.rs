use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};

pub const MAX_PIXEL_RATIO: f64 = 2.0;
/// Viewports narrower than this (css px) count as narrow devices.
pub const NARROW_BREAKPOINT: f64 = 768.0;

const BACKGROUND: Rgba<u8> = Rgba([0, 0, 0, 255]);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceClass {
    Narrow,
    Wide,
}

/// Which canvas dimension the frame is stretched to cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitMode {
    FillWidth,
    FillHeight,
}

impl From<DeviceClass> for FitMode {
    fn from(class: DeviceClass) -> Self {
        match class {
            DeviceClass::Wide => FitMode::FillWidth,
            DeviceClass::Narrow => FitMode::FillHeight,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub css_width: f64,
    pub css_height: f64,
    pub device_pixel_ratio: f64,
}

impl Viewport {
    pub fn new(css_width: f64, css_height: f64, device_pixel_ratio: f64) -> Self {
        Self { css_width, css_height, device_pixel_ratio }
    }

    /// Device pixel ratio capped at [`MAX_PIXEL_RATIO`]. Bogus ratios count as 1.
    pub fn pixel_ratio(&self) -> f64 {
        if self.device_pixel_ratio.is_finite() && self.device_pixel_ratio > 0.0 {
            self.device_pixel_ratio.min(MAX_PIXEL_RATIO)
        } else {
            1.0
        }
    }

    pub fn device_class(&self) -> DeviceClass {
        if self.css_width < NARROW_BREAKPOINT {
            DeviceClass::Narrow
        } else {
            DeviceClass::Wide
        }
    }
}

/// Where a frame lands on the canvas, in css pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Scales an image to the canvas keeping its aspect ratio, centred, then zooms about the centre.
pub fn fit_rect(
    canvas_width: f64,
    canvas_height: f64,
    image_width: u32,
    image_height: u32,
    mode: FitMode,
    zoom: f64,
) -> Option<DrawRect> {
    if image_width == 0 || image_height == 0 || canvas_width <= 0.0 || canvas_height <= 0.0 {
        return None;
    }
    let ratio = image_width as f64 / image_height as f64;
    let (width, height) = match mode {
        FitMode::FillWidth => (canvas_width, canvas_width / ratio),
        FitMode::FillHeight => (canvas_height * ratio, canvas_height),
    };
    let zoom = if zoom.is_finite() && zoom > 0.0 { zoom } else { 1.0 };
    let (width, height) = (width * zoom, height * zoom);
    Some(DrawRect {
        x: (canvas_width - width) / 2.0,
        y: (canvas_height - height) / 2.0,
        width,
        height,
    })
}

/// The part of a frame that lands on the backing store, and where it goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibleRegion {
    pub src_x: u32,
    pub src_y: u32,
    pub src_width: u32,
    pub src_height: u32,
    pub dest_x: u32,
    pub dest_y: u32,
    pub dest_width: u32,
    pub dest_height: u32,
}

// One axis of `visible_region`: (src offset, src len, dest offset, dest len)
fn visible_span(origin: f64, extent: f64, scale: f64, backing: u32, source: u32) -> Option<(u32, u32, u32, u32)> {
    let start = origin * scale;
    let end = start + extent * scale;
    let dest_start = start.max(0.0).round();
    let dest_end = end.min(backing as f64).round();
    if dest_end <= dest_start || end <= start || source == 0 {
        return None;
    }
    let source_per_px = source as f64 / (end - start);
    let src_start = ((dest_start - start) * source_per_px)
        .floor()
        .clamp(0.0, source as f64 - 1.0);
    let src_end = ((dest_end - start) * source_per_px)
        .ceil()
        .clamp(src_start + 1.0, source as f64);
    Some((
        src_start as u32,
        (src_end - src_start) as u32,
        dest_start as u32,
        (dest_end - dest_start) as u32,
    ))
}

/// Inverse of [`fit_rect`]: which source pixels end up on a backing store of
/// `backing` size, given the css rect and pixel `scale`.
///
/// The destination never exceeds the backing store. Sampling snaps to whole
/// source pixels at the canvas edges.
pub fn visible_region(rect: &DrawRect, scale: f64, backing: (u32, u32), image: (u32, u32)) -> Option<VisibleRegion> {
    let (src_x, src_width, dest_x, dest_width) = visible_span(rect.x, rect.width, scale, backing.0, image.0)?;
    let (src_y, src_height, dest_y, dest_height) = visible_span(rect.y, rect.height, scale, backing.1, image.1)?;
    Some(VisibleRegion {
        src_x,
        src_y,
        src_width,
        src_height,
        dest_x,
        dest_y,
        dest_width,
        dest_height,
    })
}

/// Software stand-in for the page's 2d canvas.
///
/// The backing store is `css size * pixel ratio`; drawing happens in css
/// pixels and is scaled by the ratio recomputed on each resize.
pub struct Canvas {
    viewport: Viewport,
    scale: f64,
    surface: RgbaImage,
}

impl Canvas {
    pub fn new(viewport: Viewport) -> Self {
        let mut canvas = Self {
            viewport,
            scale: 1.0,
            surface: RgbaImage::new(0, 0),
        };
        canvas.resize(viewport);
        canvas
    }

    pub fn resize(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        // Reset rather than multiply, a second resize must not compound the ratio
        self.scale = viewport.pixel_ratio();
        let (width, height) = self.backing_size();
        self.surface = RgbaImage::from_pixel(width, height, BACKGROUND);
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn backing_size(&self) -> (u32, u32) {
        let px = |css: f64| (css.max(0.0) * self.scale).round() as u32;
        (px(self.viewport.css_width), px(self.viewport.css_height))
    }

    pub fn surface(&self) -> &RgbaImage {
        &self.surface
    }

    pub fn clear(&mut self) {
        for pixel in self.surface.pixels_mut() {
            *pixel = BACKGROUND;
        }
    }

    /// Draws `frame` scaled per `mode`. Missing or empty frames are skipped and
    /// leave the canvas untouched.
    pub fn draw(&mut self, frame: Option<&RgbaImage>, mode: FitMode, zoom: f64) -> Option<DrawRect> {
        let frame = frame?;
        let rect = fit_rect(
            self.viewport.css_width,
            self.viewport.css_height,
            frame.width(),
            frame.height(),
            mode,
            zoom,
        )?;

        let region = visible_region(&rect, self.scale, self.surface.dimensions(), frame.dimensions());

        self.clear();
        // Only the on-screen part is scaled, so the cost is bounded by the backing store
        if let Some(r) = region {
            let crop = imageops::crop_imm(frame, r.src_x, r.src_y, r.src_width, r.src_height).to_image();
            let scaled = imageops::resize(&crop, r.dest_width, r.dest_height, FilterType::Triangle);
            imageops::overlay(&mut self.surface, &scaled, r.dest_x as i64, r.dest_y as i64);
        }
        Some(rect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);

    #[test]
    fn pixel_ratio_is_capped() {
        assert_eq!(Viewport::new(100.0, 100.0, 3.0).pixel_ratio(), 2.0);
        assert_eq!(Viewport::new(100.0, 100.0, 1.5).pixel_ratio(), 1.5);
        assert_eq!(Viewport::new(100.0, 100.0, 0.0).pixel_ratio(), 1.0);
        assert_eq!(Viewport::new(100.0, 100.0, f64::NAN).pixel_ratio(), 1.0);
    }

    #[test]
    fn device_class_by_width() {
        assert_eq!(Viewport::new(375.0, 812.0, 3.0).device_class(), DeviceClass::Narrow);
        assert_eq!(Viewport::new(1440.0, 900.0, 1.0).device_class(), DeviceClass::Wide);
        assert_eq!(FitMode::from(DeviceClass::Narrow), FitMode::FillHeight);
    }

    #[test]
    fn fill_width_centres_vertically() {
        // 16:9 frame on a square canvas
        let rect = fit_rect(160.0, 160.0, 16, 9, FitMode::FillWidth, 1.0).unwrap();
        assert_eq!(rect.width, 160.0);
        assert_eq!(rect.height, 90.0);
        assert_eq!(rect.x, 0.0);
        assert_eq!(rect.y, 35.0);
    }

    #[test]
    fn fill_height_crops_sides() {
        let rect = fit_rect(100.0, 200.0, 16, 9, FitMode::FillHeight, 1.0).unwrap();
        assert_eq!(rect.height, 200.0);
        assert!((rect.width - 355.555).abs() < 0.01);
        assert!(rect.x < 0.0);
        assert_eq!(rect.y, 0.0);
    }

    #[test]
    fn zoom_scales_about_the_centre() {
        let rect = fit_rect(100.0, 100.0, 1, 1, FitMode::FillWidth, 2.0).unwrap();
        assert_eq!(rect.width, 200.0);
        assert_eq!(rect.x, -50.0);
        assert_eq!(rect.y, -50.0);
    }

    #[test]
    fn zero_sized_inputs_have_no_rect() {
        assert!(fit_rect(100.0, 100.0, 0, 10, FitMode::FillWidth, 1.0).is_none());
        assert!(fit_rect(0.0, 100.0, 10, 10, FitMode::FillWidth, 1.0).is_none());
    }

    #[test]
    fn backing_store_tracks_pixel_ratio_without_accumulating() {
        let mut canvas = Canvas::new(Viewport::new(100.0, 50.0, 2.0));
        assert_eq!(canvas.backing_size(), (200, 100));
        canvas.resize(Viewport::new(100.0, 50.0, 2.0));
        canvas.resize(Viewport::new(100.0, 50.0, 2.0));
        assert_eq!(canvas.scale(), 2.0);
        assert_eq!(canvas.surface().dimensions(), (200, 100));
        canvas.resize(Viewport::new(120.0, 60.0, 3.0));
        assert_eq!(canvas.surface().dimensions(), (240, 120));
    }

    #[test]
    fn draws_letterboxed_frame() {
        let mut canvas = Canvas::new(Viewport::new(100.0, 100.0, 1.0));
        let frame = RgbaImage::from_pixel(20, 10, RED);
        let rect = canvas.draw(Some(&frame), FitMode::FillWidth, 1.0).unwrap();
        assert_eq!(rect.y, 25.0);

        let surface = canvas.surface();
        assert_eq!(*surface.get_pixel(50, 50), RED);
        assert_eq!(*surface.get_pixel(50, 5), BACKGROUND);
        assert_eq!(*surface.get_pixel(50, 95), BACKGROUND);
    }

    #[test]
    fn tall_frame_scales_only_the_visible_rows() {
        // 540x960 portrait frame on a 1920x1080 canvas at 2x, filling width
        let rect = fit_rect(1920.0, 1080.0, 540, 960, FitMode::FillWidth, 1.0).unwrap();
        let region = visible_region(&rect, 2.0, (3840, 2160), (540, 960)).unwrap();
        assert_eq!((region.dest_x, region.dest_y), (0, 0));
        assert_eq!((region.dest_width, region.dest_height), (3840, 2160));
        assert_eq!(region.src_width, 540);
        assert!(region.src_height < 320, "src_height = {}", region.src_height);
        let centre = region.src_y + region.src_height / 2;
        assert!((centre as i64 - 480).abs() <= 1);
    }

    #[test]
    fn scaled_area_never_exceeds_the_backing_store() {
        let backing = (3840u32, 2160u32);
        for (iw, ih, mode, zoom) in [
            (1u32, 100_000u32, FitMode::FillWidth, 1.0),
            (100_000, 1, FitMode::FillHeight, 1.0),
            (1920, 1080, FitMode::FillHeight, 1.25),
            (16, 9, FitMode::FillWidth, 1.0),
        ] {
            let rect = fit_rect(1920.0, 1080.0, iw, ih, mode, zoom).unwrap();
            let r = visible_region(&rect, 2.0, backing, (iw, ih)).unwrap();
            assert!(r.dest_x + r.dest_width <= backing.0);
            assert!(r.dest_y + r.dest_height <= backing.1);
            assert!(r.src_x + r.src_width <= iw);
            assert!(r.src_y + r.src_height <= ih);
        }
    }

    #[test]
    fn cropped_draw_shows_the_middle_of_a_tall_frame() {
        // Three 30px bands: green, red, blue. Filling width only the red band fits.
        let mut frame = RgbaImage::from_pixel(30, 90, RED);
        for (_, y, pixel) in frame.enumerate_pixels_mut() {
            if y < 30 {
                *pixel = Rgba([0, 255, 0, 255]);
            } else if y >= 60 {
                *pixel = Rgba([0, 0, 255, 255]);
            }
        }
        let mut canvas = Canvas::new(Viewport::new(100.0, 100.0, 1.0));
        let rect = canvas.draw(Some(&frame), FitMode::FillWidth, 1.0).unwrap();
        assert_eq!(rect.y, -100.0);

        let surface = canvas.surface();
        for y in [0, 50, 99] {
            assert_eq!(*surface.get_pixel(50, y), RED, "row {}", y);
        }
    }

    #[test]
    fn zoomed_frame_keeps_its_centre() {
        let mut canvas = Canvas::new(Viewport::new(100.0, 100.0, 2.0));
        let mut frame = RgbaImage::from_pixel(10, 10, BACKGROUND);
        frame.put_pixel(5, 5, RED);
        frame.put_pixel(4, 4, RED);
        frame.put_pixel(4, 5, RED);
        frame.put_pixel(5, 4, RED);
        canvas.draw(Some(&frame), FitMode::FillWidth, 1.25).unwrap();
        assert_eq!(*canvas.surface().get_pixel(100, 100), RED);
        assert_eq!(*canvas.surface().get_pixel(2, 2), BACKGROUND);
    }

    #[test]
    fn skips_missing_and_empty_frames() {
        let mut canvas = Canvas::new(Viewport::new(10.0, 10.0, 1.0));
        let frame = RgbaImage::from_pixel(10, 10, RED);
        canvas.draw(Some(&frame), FitMode::FillWidth, 1.0).unwrap();

        assert!(canvas.draw(None, FitMode::FillWidth, 1.0).is_none());
        assert!(canvas.draw(Some(&RgbaImage::new(0, 0)), FitMode::FillWidth, 1.0).is_none());
        // Previous frame is still on screen
        assert_eq!(*canvas.surface().get_pixel(5, 5), RED);
    }
}
