//! Square crop geometry in source pixels.

use portrait_core::constants::{MAX_ZOOM, MIN_ZOOM, ZOOM_STEP};

/// A square region of the source image.
///
/// Always lies inside the source and is never empty.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropRegion {
    pub x: u32,
    pub y: u32,
    pub size: u32,
    pub zoom: f32,
}

/// Clamp to the zoom range and snap to the zoom step.
pub fn normalize_zoom(zoom: f32) -> f32 {
    if !zoom.is_finite() {
        return MIN_ZOOM;
    }
    let snapped = (zoom / ZOOM_STEP).round() * ZOOM_STEP;
    snapped.clamp(MIN_ZOOM, MAX_ZOOM)
}

/// Editable crop: a centre point and a zoom over a fixed source size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Viewport {
    width: u32,
    height: u32,
    center_x: f64,
    center_y: f64,
    zoom: f32,
    side: u32,
}

impl Viewport {
    /// Centred square covering the short edge at zoom 1.
    pub(crate) fn centered(width: u32, height: u32) -> Self {
        let mut viewport = Viewport {
            width,
            height,
            center_x: width as f64 / 2.0,
            center_y: height as f64 / 2.0,
            zoom: MIN_ZOOM,
            side: 0,
        };
        viewport.side = viewport.side_for(MIN_ZOOM);
        viewport
    }

    fn short_edge(&self) -> u32 {
        self.width.min(self.height)
    }

    fn side_for(&self, zoom: f32) -> u32 {
        let short = self.short_edge();
        ((short as f64 / zoom as f64).floor() as u32).clamp(1, short.max(1))
    }

    pub(crate) fn set_zoom(&mut self, zoom: f32) {
        self.zoom = normalize_zoom(zoom);
        self.side = self.side_for(self.zoom);
        self.clamp_center();
    }

    pub(crate) fn pan(&mut self, dx: f64, dy: f64) {
        if dx.is_finite() {
            self.center_x += dx;
        }
        if dy.is_finite() {
            self.center_y += dy;
        }
        self.clamp_center();
    }

    /// Select an explicit square, as a crop box drag would.
    ///
    /// The side is bounded by the zoom range and the box is moved back inside
    /// the image if needed.
    pub(crate) fn select(&mut self, x: u32, y: u32, size: u32) {
        let min_side = self.side_for(MAX_ZOOM);
        let side = size.clamp(min_side, self.short_edge().max(1));
        self.side = side;
        self.zoom = (self.short_edge() as f32 / side as f32).clamp(MIN_ZOOM, MAX_ZOOM);
        self.center_x = x as f64 + side as f64 / 2.0;
        self.center_y = y as f64 + side as f64 / 2.0;
        self.clamp_center();
    }

    fn clamp_center(&mut self) {
        let half = self.side as f64 / 2.0;
        self.center_x = self.center_x.clamp(half, self.width as f64 - half);
        self.center_y = self.center_y.clamp(half, self.height as f64 - half);
    }

    pub(crate) fn region(&self) -> CropRegion {
        let max_x = self.width.saturating_sub(self.side);
        let max_y = self.height.saturating_sub(self.side);
        let half = self.side as f64 / 2.0;
        let x = ((self.center_x - half).round().max(0.0) as u32).min(max_x);
        let y = ((self.center_y - half).round().max(0.0) as u32).min(max_y);

        CropRegion {
            x,
            y,
            size: self.side,
            zoom: self.zoom,
        }
    }
}
