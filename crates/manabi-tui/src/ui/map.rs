//! Map pane: a coordinate canvas with checkpoint circles and the user marker.
//!
//! There are no tiles; the canvas is a plain lat/lng plot around the
//! viewport center.

use ratatui::{
    layout::Rect,
    style::Color,
    symbols::Marker,
    text::Span,
    widgets::{
        canvas::{Canvas, Circle, Points},
        Block, Borders,
    },
    Frame,
};

use manabi_core::LatLng;

use crate::app::App;

use super::styles;

/// Meters per degree of latitude (and of longitude at the equator).
const METERS_PER_DEGREE: f64 = 111_320.0;

pub const MIN_ZOOM: u8 = 10;
pub const MAX_ZOOM: u8 = 19;

/// Terminal cells are roughly twice as tall as they are wide.
const CELL_ASPECT: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub west: f64,
    pub east: f64,
    pub south: f64,
    pub north: f64,
}

/// What part of the world the map pane shows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub center: LatLng,
    pub zoom: u8,
}

impl Viewport {
    pub fn new(center: LatLng, zoom: u8) -> Self {
        Self {
            center,
            zoom: zoom.clamp(MIN_ZOOM, MAX_ZOOM),
        }
    }

    pub fn zoom_in(&mut self) {
        self.zoom = (self.zoom + 1).min(MAX_ZOOM);
    }

    pub fn zoom_out(&mut self) {
        self.zoom = self.zoom.saturating_sub(1).max(MIN_ZOOM);
    }

    /// Geographic bounds for a pane of the given size. The longitude span
    /// follows web-map zoom levels; the latitude span keeps the plot roughly
    /// isotropic on screen.
    pub fn bounds(&self, area: Rect) -> Bounds {
        let lng_span = 360.0 / 2f64.powi(self.zoom as i32);
        let aspect = (area.height.max(1) as f64 * CELL_ASPECT) / area.width.max(1) as f64;
        let lat_span = lng_span * self.center.lat.to_radians().cos() * aspect;
        Bounds {
            west: self.center.lng - lng_span / 2.0,
            east: self.center.lng + lng_span / 2.0,
            south: self.center.lat - lat_span / 2.0,
            north: self.center.lat + lat_span / 2.0,
        }
    }

    /// Coordinate under a terminal cell inside `area`, or None outside it.
    pub fn unproject(&self, area: Rect, column: u16, row: u16) -> Option<LatLng> {
        let inside = column >= area.x
            && column < area.x + area.width
            && row >= area.y
            && row < area.y + area.height;
        if !inside {
            return None;
        }

        let b = self.bounds(area);
        let fx = (column - area.x) as f64 + 0.5;
        let fy = (row - area.y) as f64 + 0.5;
        let lng = b.west + fx / area.width as f64 * (b.east - b.west);
        let lat = b.north - fy / area.height as f64 * (b.north - b.south);
        Some(LatLng::new(lat, lng))
    }
}

/// Degrees of longitude covering `meters` at latitude `lat`.
fn meters_to_lng_degrees(meters: f64, lat: f64) -> f64 {
    meters / (METERS_PER_DEGREE * lat.to_radians().cos().max(1e-6))
}

pub fn render_map(frame: &mut Frame, app: &App, area: Rect) {
    let title = if app.is_tap_armed() {
        Span::styled(" Map - tap to set location ", styles::prompt_style())
    } else {
        Span::styled(" Map ", styles::heading_style())
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(styles::map_border_style(app.is_tap_armed()));

    let inner = block.inner(area);
    app.map_area.set(Some(inner));

    let bounds = app.viewport.bounds(inner);
    let checkpoints = app.session.checkpoints();
    let unlocked: Vec<&str> = app
        .session
        .view()
        .map(|view| view.unlocked().iter().map(|r| r.checkpoint.name.as_str()).collect())
        .unwrap_or_default();
    let fix = app.session.last_fix();

    let canvas = Canvas::default()
        .block(block)
        .marker(Marker::Braille)
        .x_bounds([bounds.west, bounds.east])
        .y_bounds([bounds.south, bounds.north])
        .paint(move |ctx| {
            for cp in checkpoints {
                let color = if unlocked.contains(&cp.name.as_str()) {
                    styles::UNLOCKED
                } else {
                    styles::RADIUS
                };
                ctx.draw(&Circle {
                    x: cp.location.lng,
                    y: cp.location.lat,
                    radius: meters_to_lng_degrees(cp.radius_m, cp.location.lat),
                    color,
                });
                ctx.draw(&Points {
                    coords: &[(cp.location.lng, cp.location.lat)],
                    color,
                });
            }
            ctx.layer();
            for cp in checkpoints {
                ctx.print(
                    cp.location.lng,
                    cp.location.lat,
                    Span::styled(cp.name.clone(), styles::place_style()),
                );
            }
            if let Some(fix) = fix {
                ctx.print(fix.lng, fix.lat, Span::styled("@", styles::you_marker_style()));
            }
        })
        .background_color(Color::Reset);

    frame.render_widget(canvas, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    const CENTER: LatLng = LatLng { lat: 36.34, lng: 139.45 };

    #[test]
    fn test_zoom_is_clamped() {
        let mut v = Viewport::new(CENTER, 25);
        assert_eq!(v.zoom, MAX_ZOOM);
        v.zoom_in();
        assert_eq!(v.zoom, MAX_ZOOM);

        let mut v = Viewport::new(CENTER, MIN_ZOOM);
        v.zoom_out();
        assert_eq!(v.zoom, MIN_ZOOM);
    }

    #[test]
    fn test_bounds_are_centered() {
        let v = Viewport::new(CENTER, 15);
        let b = v.bounds(Rect::new(0, 0, 80, 40));
        assert!(((b.west + b.east) / 2.0 - CENTER.lng).abs() < 1e-9);
        assert!(((b.south + b.north) / 2.0 - CENTER.lat).abs() < 1e-9);
        assert!((b.east - b.west - 360.0 / 32768.0).abs() < 1e-12);
    }

    #[test]
    fn test_unproject_center_and_corners() {
        let v = Viewport::new(CENTER, 15);
        let area = Rect::new(10, 5, 81, 41);

        // Middle cell maps to the center
        let mid = v.unproject(area, 10 + 40, 5 + 20).unwrap();
        assert!((mid.lat - CENTER.lat).abs() < 1e-9);
        assert!((mid.lng - CENTER.lng).abs() < 1e-9);

        // Top-left is north-west of center
        let nw = v.unproject(area, 10, 5).unwrap();
        assert!(nw.lat > CENTER.lat && nw.lng < CENTER.lng);

        // Outside the pane
        assert!(v.unproject(area, 9, 5).is_none());
        assert!(v.unproject(area, 10, 46).is_none());
    }

    #[test]
    fn test_meters_to_degrees() {
        let at_equator = meters_to_lng_degrees(METERS_PER_DEGREE, 0.0);
        assert!((at_equator - 1.0).abs() < 1e-9);
        assert!(meters_to_lng_degrees(120.0, 36.34) > meters_to_lng_degrees(120.0, 0.0));
    }
}
