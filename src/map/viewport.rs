use super::facade::MapFacade;
use super::map_tile::{Coordinate, MAX_ZOOM};

/// Zoom change applied by one press of the zoom buttons.
pub const ZOOM_STEP: f64 = 1.0;
/// Zoom used when a single-member marker is clicked.
pub const FOCUS_ZOOM: f64 = 5.5;
/// Zoom used when a search hit is clicked.
pub const SEARCH_FOCUS_ZOOM: f64 = 12.0;
/// Key that flies the map back to its home view.
pub const RESET_KEY: egui::Key = egui::Key::Escape;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportState {
    pub center: Coordinate,
    pub zoom: f64,
}

/// Viewport commands issued on user interaction. Every command is a silent
/// no-op while no loaded map is attached.
#[derive(Debug, Clone)]
pub struct ViewportController {
    home: ViewportState,
    state: ViewportState,
}

impl ViewportController {
    pub fn new(default_zoom: f64) -> Self {
        let home = ViewportState {
            center: Coordinate::default(),
            zoom: default_zoom,
        };
        Self { home, state: home }
    }

    pub fn home(&self) -> ViewportState {
        self.home
    }

    /// The last view this controller observed on the map.
    pub fn state(&self) -> ViewportState {
        self.state
    }

    pub fn zoom_in<M: MapFacade + ?Sized>(&mut self, map: Option<&mut M>) {
        self.step_zoom(map, ZOOM_STEP);
    }

    pub fn zoom_out<M: MapFacade + ?Sized>(&mut self, map: Option<&mut M>) {
        self.step_zoom(map, -ZOOM_STEP);
    }

    pub fn focus<M: MapFacade + ?Sized>(&mut self, map: Option<&mut M>, lng: f64, lat: f64, zoom: f64) {
        let Some(map) = ready(map) else {
            return;
        };
        if !lng.is_finite() || !lat.is_finite() {
            log::debug!("ignoring focus on non-finite coordinate ({}, {})", lng, lat);
            return;
        }
        map.fly_to(Coordinate::new(lng, lat), zoom.clamp(0.0, MAX_ZOOM));
        self.observe(map);
    }

    pub fn reset<M: MapFacade + ?Sized>(&mut self, map: Option<&mut M>) {
        let Some(map) = ready(map) else {
            return;
        };
        map.fly_to(self.home.center, self.home.zoom);
        self.observe(map);
    }

    /// Returns true if `key` was the reset key and a reset was issued.
    pub fn on_key<M: MapFacade + ?Sized>(&mut self, map: Option<&mut M>, key: egui::Key) -> bool {
        if key != RESET_KEY {
            return false;
        }
        self.reset(map);
        true
    }

    fn step_zoom<M: MapFacade + ?Sized>(&mut self, map: Option<&mut M>, delta: f64) {
        let Some(map) = ready(map) else {
            return;
        };
        let zoom = (map.zoom() + delta).clamp(0.0, MAX_ZOOM);
        map.set_zoom(zoom);
        self.observe(map);
    }

    fn observe<M: MapFacade + ?Sized>(&mut self, map: &M) {
        self.state = ViewportState {
            center: map.center(),
            zoom: map.zoom(),
        };
    }
}

fn ready<M: MapFacade + ?Sized>(map: Option<&mut M>) -> Option<&mut M> {
    match map {
        Some(map) if map.is_loaded() => Some(map),
        Some(_) => {
            log::trace!("viewport command ignored: map not loaded");
            None
        }
        None => {
            log::trace!("viewport command ignored: no map attached");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::facade::testing::RecordingMap;

    #[test]
    fn test_no_map_is_noop() {
        let mut viewport = ViewportController::new(1.4);
        let before = viewport.state();
        viewport.zoom_in(None::<&mut RecordingMap>);
        viewport.zoom_out(None::<&mut RecordingMap>);
        viewport.reset(None::<&mut RecordingMap>);
        viewport.focus(None::<&mut RecordingMap>, 10.0, 10.0, FOCUS_ZOOM);
        assert_eq!(viewport.state(), before);
    }

    #[test]
    fn test_unloaded_map_is_noop() {
        let mut map = RecordingMap::default();
        let mut viewport = ViewportController::new(1.4);
        viewport.zoom_in(Some(&mut map));
        viewport.reset(Some(&mut map));
        assert_eq!(map.zoom, 0.0);
        assert!(map.flights.is_empty());
    }

    #[test]
    fn test_zoom_steps_and_clamps() {
        let mut map = RecordingMap::loaded();
        let mut viewport = ViewportController::new(1.4);
        viewport.zoom_in(Some(&mut map));
        assert_eq!(map.zoom, 1.4 + ZOOM_STEP);
        assert_eq!(viewport.state().zoom, map.zoom);

        map.zoom = 0.5;
        viewport.zoom_out(Some(&mut map));
        assert_eq!(map.zoom, 0.0);

        map.zoom = MAX_ZOOM;
        viewport.zoom_in(Some(&mut map));
        assert_eq!(map.zoom, MAX_ZOOM);
    }

    #[test]
    fn test_focus_and_reset() {
        let mut map = RecordingMap::loaded();
        let mut viewport = ViewportController::new(1.5);
        viewport.focus(Some(&mut map), -122.4, 37.8, FOCUS_ZOOM);
        assert_eq!(map.flights, [(Coordinate::new(-122.4, 37.8), FOCUS_ZOOM)]);

        assert!(viewport.on_key(Some(&mut map), egui::Key::Escape));
        assert_eq!(map.flights.last(), Some(&(Coordinate::default(), 1.5)));
        assert_eq!(viewport.state(), viewport.home());

        assert!(!viewport.on_key(Some(&mut map), egui::Key::Enter));
        assert_eq!(map.flights.len(), 2);
    }
}
