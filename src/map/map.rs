use std::collections::BTreeMap;

use egui::emath::lerp;
use egui::{pos2, vec2, Align2, Color32, FontId, Pos2, Rangef, Rect, Response, Sense, Stroke, Ui, Vec2};
use lru::LruCache;

use super::facade::{Avatar, MapFacade, MarkerContent, MarkerGlyph, MarkerId, PopupContent};
use super::map_tile::{self, Coordinate, MapTile, TileKey, MAX_ZOOM};
use super::offset::OFFSET_RADIUS;

/// Length of an animated fly-to, in seconds.
const FLIGHT_SECONDS: f64 = 1.2;
const AVATAR_RADIUS: f32 = 16.0;
const SATELLITE_RADIUS: f32 = 6.0;
/// Distance in points between a cluster's lead avatar and its satellites.
const SATELLITE_RING: f32 = 24.0;
const POPUP_MAX_HEIGHT: f32 = 176.0;

struct PlacedMarker {
    position: Coordinate,
    content: MarkerContent,
    popup: Option<PopupContent>,
    popup_open: bool,
}

struct Flight {
    from: (Coordinate, f64),
    to: (Coordinate, f64),
    started: Option<f64>,
}

/// What happened to the map during one frame.
pub struct MapResponse {
    pub clicked: Option<MarkerId>,
    pub missing_tiles: Vec<TileKey>,
    /// True on the first frame the map was laid out.
    pub just_loaded: bool,
}

/// An interactive raster map drawn with egui. Owns its viewport and markers;
/// tiles are borrowed from the caller's cache each frame.
pub struct MapView {
    id: egui::Id,
    center: Coordinate,
    zoom: f64,
    loaded: bool,
    flight: Option<Flight>,
    markers: BTreeMap<MarkerId, PlacedMarker>,
    next_marker: u64,
}

impl MapView {
    pub fn new(id_source: impl std::hash::Hash, center: Coordinate, zoom: f64) -> Self {
        Self {
            id: egui::Id::new(id_source),
            center,
            zoom: zoom.clamp(0.0, MAX_ZOOM),
            loaded: false,
            flight: None,
            markers: BTreeMap::new(),
            next_marker: 0,
        }
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    pub fn show(&mut self, ui: &mut Ui, tile_cache: &mut LruCache<TileKey, MapTile>, size: Vec2) -> MapResponse {
        let (rect, response) = ui.allocate_exact_size(size, Sense::click_and_drag());
        let now = ui.input(|i| i.time);

        self.advance_flight(now, ui.ctx());
        self.handle_input(ui, &response);

        let painter = ui.painter_at(rect);
        painter.rect(rect, 0.0, Color32::from_gray(230), Stroke::new(1.0, Color32::WHITE));

        let mut missing_tiles = Vec::new();
        for (key, tile_rect) in map_tile::visible_tiles(self.center, self.zoom, rect) {
            if let Some(tile) = tile_cache.get_mut(&key) {
                let texture = tile.texture(ui.ctx());
                painter.image(
                    texture.id(),
                    tile_rect,
                    Rect::from_min_max(pos2(0.0, 0.0), pos2(1.0, 1.0)),
                    Color32::WHITE,
                );
            } else {
                painter.rect_filled(tile_rect, 0.0, Color32::from_gray(200));
                if !missing_tiles.contains(&key) {
                    missing_tiles.push(key);
                }
            }
        }

        let mut clicked = None;
        let mut open_popups = Vec::new();
        for (&marker, placed) in &self.markers {
            let anchor = map_tile::to_screen(placed.position, self.center, self.zoom, rect);
            if !rect.expand(AVATAR_RADIUS * 4.0).contains(anchor) {
                continue;
            }
            let hit_rect = paint_marker(&painter, anchor, &placed.content);
            let marker_response = ui.interact(hit_rect.intersect(rect), self.id.with(("marker", marker.0)), Sense::click());
            if marker_response.clicked() {
                clicked = Some(marker);
            }
            if placed.popup_open {
                if let Some(popup) = &placed.popup {
                    open_popups.push((marker, hit_rect.right_top(), popup));
                }
            }
        }

        for (marker, pos, popup) in open_popups {
            show_popup(ui.ctx(), self.id.with(("popup", marker.0)), pos, popup);
        }

        let just_loaded = !self.loaded && rect.width() > 0.0 && rect.height() > 0.0;
        if just_loaded {
            log::debug!("map loaded at {:?} zoom {}", self.center, self.zoom);
            self.loaded = true;
        }

        MapResponse {
            clicked,
            missing_tiles,
            just_loaded,
        }
    }

    fn handle_input(&mut self, ui: &Ui, response: &Response) {
        if response.dragged() {
            self.flight = None;
            self.center = map_tile::pan(self.center, self.zoom, response.drag_delta());
        }
        if !response.hovered() {
            return;
        }

        let mut zoomed = false;
        // Pinch / touch
        let zoom_delta = ui.input(|i| i.zoom_delta()) - 1.0;
        if zoom_delta.abs() > f32::EPSILON {
            let step = lerp(Rangef::new(0.0, 1.0), zoom_delta.abs()) * zoom_delta.signum();
            self.flight = None;
            self.zoom = (self.zoom + step as f64).clamp(0.0, MAX_ZOOM);
            zoomed = true;
        }

        // Scroll wheel, normalized with tanh
        let scroll = ui.input(|i| i.smooth_scroll_delta).y;
        if scroll.abs() > f32::EPSILON && !zoomed {
            self.flight = None;
            self.zoom = (self.zoom + (scroll / 10.0).tanh() as f64).clamp(0.0, MAX_ZOOM);
        }
    }

    fn advance_flight(&mut self, now: f64, ctx: &egui::Context) {
        let Some(flight) = &mut self.flight else {
            return;
        };
        let started = *flight.started.get_or_insert(now);
        let t = ((now - started) / FLIGHT_SECONDS).clamp(0.0, 1.0);
        if t >= 1.0 {
            (self.center, self.zoom) = flight.to;
            self.flight = None;
            return;
        }
        // Smoothstep easing
        let eased = t * t * (3.0 - 2.0 * t);
        self.center = flight.from.0.lerp(flight.to.0, eased);
        self.zoom = flight.from.1 + (flight.to.1 - flight.from.1) * eased;
        ctx.request_repaint();
    }
}

impl MapFacade for MapView {
    fn is_loaded(&self) -> bool {
        self.loaded
    }

    fn add_marker(&mut self, position: Coordinate, content: MarkerContent) -> MarkerId {
        self.next_marker += 1;
        let marker = MarkerId(self.next_marker);
        self.markers.insert(
            marker,
            PlacedMarker {
                position,
                content,
                popup: None,
                popup_open: false,
            },
        );
        marker
    }

    fn remove_marker(&mut self, marker: MarkerId) {
        self.markers.remove(&marker);
    }

    fn set_content(&mut self, marker: MarkerId, content: MarkerContent) {
        if let Some(placed) = self.markers.get_mut(&marker) {
            placed.content = content;
        }
    }

    fn set_popup(&mut self, marker: MarkerId, popup: Option<PopupContent>) {
        if let Some(placed) = self.markers.get_mut(&marker) {
            placed.popup_open &= popup.is_some();
            placed.popup = popup;
        }
    }

    fn toggle_popup(&mut self, marker: MarkerId) {
        if let Some(placed) = self.markers.get_mut(&marker) {
            placed.popup_open = placed.popup.is_some() && !placed.popup_open;
        }
    }

    fn fly_to(&mut self, center: Coordinate, zoom: f64) {
        self.flight = Some(Flight {
            from: (self.center, self.zoom),
            to: (center, zoom.clamp(0.0, MAX_ZOOM)),
            started: None,
        });
    }

    fn set_zoom(&mut self, zoom: f64) {
        self.flight = None;
        self.zoom = zoom.clamp(0.0, MAX_ZOOM);
    }

    fn zoom(&self) -> f64 {
        self.zoom
    }

    fn center(&self) -> Coordinate {
        self.center
    }
}

pub(crate) fn paint_avatar(painter: &egui::Painter, center: Pos2, radius: f32, avatar: &Avatar) {
    let (fill, stroke) = match avatar {
        Avatar::Photo { .. } => (Color32::from_rgb(219, 234, 254), Stroke::new(2.0, Color32::from_rgb(96, 165, 250))),
        Avatar::Initial(_) => (Color32::from_gray(209), Stroke::new(1.0, Color32::WHITE)),
    };
    painter.circle(center, radius, fill, stroke);
    painter.text(
        center,
        Align2::CENTER_CENTER,
        avatar.initial(),
        FontId::proportional(radius),
        Color32::from_gray(75),
    );
}

/// Draws a marker anchored at `anchor` and returns the area that reacts to clicks.
fn paint_marker(painter: &egui::Painter, anchor: Pos2, content: &MarkerContent) -> Rect {
    let mut bounds = Rect::from_center_size(anchor, Vec2::splat(AVATAR_RADIUS * 2.0));

    let (avatar, subtitle) = match &content.glyph {
        MarkerGlyph::Single { avatar, city, .. } => (avatar, city.as_deref()),
        MarkerGlyph::Cluster { lead, satellites, .. } => {
            let scale = SATELLITE_RING / OFFSET_RADIUS as f32;
            for satellite in satellites {
                let (dx, dy) = satellite.offset;
                // Latitude grows northwards, screen y grows downwards.
                let pos = anchor + vec2(dx as f32 * scale, -dy as f32 * scale);
                paint_avatar(painter, pos, SATELLITE_RADIUS, &satellite.avatar);
                bounds = bounds.union(Rect::from_center_size(pos, Vec2::splat(SATELLITE_RADIUS * 2.0)));
            }
            (lead, None)
        }
    };
    paint_avatar(painter, anchor, AVATAR_RADIUS, avatar);

    let title = painter.layout_no_wrap(content.label(), FontId::proportional(12.0), Color32::BLACK);
    let detail = subtitle.map(|s| painter.layout_no_wrap(s.to_string(), FontId::proportional(11.0), Color32::DARK_GRAY));
    let text_width = title.size().x.max(detail.as_ref().map_or(0.0, |d| d.size().x));
    let text_height = title.size().y + detail.as_ref().map_or(0.0, |d| d.size().y);

    let card = Rect::from_min_size(
        pos2(bounds.right() + 4.0, anchor.y - text_height / 2.0 - 4.0),
        vec2(text_width + 12.0, text_height + 8.0),
    );
    painter.rect(card, 6.0, Color32::WHITE, Stroke::new(1.0, Color32::from_gray(210)));
    let text_origin = card.min + vec2(6.0, 4.0);
    let title_height = title.size().y;
    painter.galley(text_origin, title, Color32::BLACK);
    if let Some(detail) = detail {
        painter.galley(text_origin + vec2(0.0, title_height), detail, Color32::DARK_GRAY);
    }

    bounds.union(card)
}

fn show_popup(ctx: &egui::Context, id: egui::Id, pos: Pos2, popup: &PopupContent) {
    egui::Area::new(id)
        .fixed_pos(pos + vec2(8.0, 0.0))
        .order(egui::Order::Foreground)
        .show(ctx, |ui| {
            egui::Frame::popup(ui.style()).show(ui, |ui| {
                egui::ScrollArea::vertical()
                    .max_height(POPUP_MAX_HEIGHT)
                    .show(ui, |ui| {
                        for row in &popup.rows {
                            ui.horizontal(|ui| {
                                let (avatar_rect, _) = ui.allocate_exact_size(Vec2::splat(AVATAR_RADIUS * 2.0), Sense::hover());
                                paint_avatar(ui.painter(), avatar_rect.center(), AVATAR_RADIUS, &row.avatar);
                                ui.vertical(|ui| {
                                    ui.strong(&row.name);
                                    if let Some(city) = &row.city {
                                        ui.small(city);
                                    }
                                });
                            });
                        }
                    });
            });
        });
}
