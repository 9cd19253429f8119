use std::f64::consts::PI;

/// Edge length, in points, of one raster tile at its native zoom.
pub const TILE_SIZE: f64 = 512.0;
pub const MAX_ZOOM: f64 = 22.0;
/// Latitude limit of the Web Mercator projection.
pub const MAX_LATITUDE: f64 = 85.051_128_78;

/// (zoom, x, y)
pub type TileKey = (u32, u32, u32);

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Coordinate {
    pub lng: f64,
    pub lat: f64,
}

impl Coordinate {
    pub const fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }

    /// Linear interpolation, used for animated fly-to transitions.
    pub fn lerp(self, other: Coordinate, t: f64) -> Coordinate {
        Coordinate {
            lng: self.lng + (other.lng - self.lng) * t,
            lat: self.lat + (other.lat - self.lat) * t,
        }
    }
}

/// Size of the whole world, in points, at a (possibly fractional) zoom.
pub fn world_size(zoom: f64) -> f64 {
    TILE_SIZE * 2.0_f64.powf(zoom)
}

/// Projects onto the unit square, x east and y south.
pub fn project(coordinate: Coordinate) -> (f64, f64) {
    let lat = coordinate.lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    let x = (coordinate.lng + 180.0) / 360.0;
    let y = (1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / PI) / 2.0;
    (x, y)
}

pub fn unproject(x: f64, y: f64) -> Coordinate {
    let lng = x * 360.0 - 180.0;
    let lat = (PI * (1.0 - 2.0 * y)).sinh().atan().to_degrees();
    Coordinate::new(wrap_longitude(lng), lat.clamp(-MAX_LATITUDE, MAX_LATITUDE))
}

pub fn wrap_longitude(lng: f64) -> f64 {
    if (-180.0..=180.0).contains(&lng) {
        lng
    } else {
        (lng + 180.0).rem_euclid(360.0) - 180.0
    }
}

/// Screen position of `coordinate` in a viewport centred on `center`.
pub fn to_screen(coordinate: Coordinate, center: Coordinate, zoom: f64, viewport: egui::Rect) -> egui::Pos2 {
    let size = world_size(zoom);
    let (cx, cy) = project(center);
    let (px, py) = project(coordinate);
    let mut dx = (px - cx) * size;
    // Take the shorter way around the antimeridian.
    if dx > size / 2.0 {
        dx -= size;
    } else if dx < -size / 2.0 {
        dx += size;
    }
    let dy = (py - cy) * size;
    viewport.center() + egui::vec2(dx as f32, dy as f32)
}

/// The new center after dragging the map by `delta` points.
pub fn pan(center: Coordinate, zoom: f64, delta: egui::Vec2) -> Coordinate {
    let size = world_size(zoom);
    let (cx, cy) = project(center);
    let x = cx - delta.x as f64 / size;
    let y = (cy - delta.y as f64 / size).clamp(0.0, 1.0);
    unproject(x, y)
}

/// Tiles covering `viewport`, with the screen rect each one should fill.
pub fn visible_tiles(center: Coordinate, zoom: f64, viewport: egui::Rect) -> Vec<(TileKey, egui::Rect)> {
    let z = zoom.floor().clamp(0.0, MAX_ZOOM) as u32;
    let n = 2u32.pow(z);
    let tile_span = world_size(zoom) / n as f64;
    let (cx, cy) = project(center);
    let center_px = (cx * world_size(zoom), cy * world_size(zoom));

    let half_w = viewport.width() as f64 / 2.0;
    let half_h = viewport.height() as f64 / 2.0;
    let min_x = ((center_px.0 - half_w) / tile_span).floor() as i64;
    let max_x = ((center_px.0 + half_w) / tile_span).floor() as i64;
    let min_y = ((center_px.1 - half_h) / tile_span).floor().max(0.0) as i64;
    let max_y = ((center_px.1 + half_h) / tile_span).floor().min(n as f64 - 1.0) as i64;

    let mut tiles = Vec::new();
    for ty in min_y..=max_y {
        for tx in min_x..=max_x {
            let left = viewport.center().x as f64 + tx as f64 * tile_span - center_px.0;
            let top = viewport.center().y as f64 + ty as f64 * tile_span - center_px.1;
            let rect = egui::Rect::from_min_size(
                egui::pos2(left as f32, top as f32),
                egui::vec2(tile_span as f32, tile_span as f32),
            );
            let x = tx.rem_euclid(n as i64) as u32;
            tiles.push(((z, x, ty as u32), rect));
        }
    }
    tiles
}

/// A decoded raster tile, uploaded to the GPU the first time it is drawn.
pub struct MapTile {
    pub key: TileKey,
    size: [usize; 2],
    rgba: Vec<u8>,
    texture: Option<egui::TextureHandle>,
}

impl MapTile {
    pub fn new(key: TileKey, size: [usize; 2], rgba: Vec<u8>) -> Self {
        Self {
            key,
            size,
            rgba,
            texture: None,
        }
    }

    pub fn texture(&mut self, ctx: &egui::Context) -> &egui::TextureHandle {
        let (z, x, y) = self.key;
        let (size, rgba) = (self.size, &self.rgba);
        self.texture.get_or_insert_with(|| {
            let image = egui::ColorImage::from_rgba_unmultiplied(size, rgba);
            ctx.load_texture(format!("tile_{}_{}_zoom{}", x, y, z), image, egui::TextureOptions::LINEAR)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_project_round_trip_sample() {
        let berlin = Coordinate::new(13.405, 52.52);
        let (x, y) = project(berlin);
        let back = unproject(x, y);
        assert_relative_eq!(back.lng, berlin.lng, epsilon = 1e-9);
        assert_relative_eq!(back.lat, berlin.lat, epsilon = 1e-9);
        assert_eq!(project(Coordinate::default()), (0.5, 0.5));
    }

    #[test]
    fn test_center_maps_to_viewport_center() {
        let viewport = egui::Rect::from_min_size(egui::pos2(10.0, 20.0), egui::vec2(800.0, 600.0));
        let center = Coordinate::new(-73.9, 40.7);
        let pos = to_screen(center, center, 5.0, viewport);
        assert_relative_eq!(pos.x, viewport.center().x, epsilon = 1e-3);
        assert_relative_eq!(pos.y, viewport.center().y, epsilon = 1e-3);
    }

    #[test]
    fn test_visible_tiles_at_zoom_zero() {
        let viewport = egui::Rect::from_min_size(egui::Pos2::ZERO, egui::vec2(256.0, 256.0));
        let tiles = visible_tiles(Coordinate::default(), 0.0, viewport);
        assert_eq!(tiles.len(), 1);
        assert_eq!(tiles[0].0, (0, 0, 0));
    }

    #[test]
    fn test_visible_tiles_wrap_longitude() {
        let viewport = egui::Rect::from_min_size(egui::Pos2::ZERO, egui::vec2(1024.0, 512.0));
        let tiles = visible_tiles(Coordinate::new(180.0, 0.0), 1.0, viewport);
        assert!(tiles.iter().all(|((z, x, y), _)| *z == 1 && *x < 2 && *y < 2));
    }

    #[test]
    fn test_pan_moves_opposite_to_drag() {
        let moved = pan(Coordinate::default(), 2.0, egui::vec2(100.0, 0.0));
        assert!(moved.lng < 0.0);
        assert_relative_eq!(moved.lat, 0.0, epsilon = 1e-9);
    }
}
