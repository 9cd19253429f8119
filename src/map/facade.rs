use super::entity::Entity;
use super::map_tile::Coordinate;

/// Handle to a marker owned by a [`MapFacade`]. Handles are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkerId(pub u64);

#[derive(Debug, Clone, PartialEq)]
pub enum Avatar {
    Photo { url: String, initial: char },
    Initial(char),
}

impl Avatar {
    pub fn of(entity: &Entity) -> Self {
        match &entity.avatar_url {
            Some(url) => Avatar::Photo {
                url: url.clone(),
                initial: entity.initial(),
            },
            None => Avatar::Initial(entity.initial()),
        }
    }

    pub fn initial(&self) -> char {
        match self {
            Avatar::Photo { initial, .. } | Avatar::Initial(initial) => *initial,
        }
    }
}

/// A small avatar drawn around a collapsed marker, `offset` in degrees from
/// the shared coordinate.
#[derive(Debug, Clone, PartialEq)]
pub struct Satellite {
    pub avatar: Avatar,
    pub offset: (f64, f64),
}

#[derive(Debug, Clone, PartialEq)]
pub enum MarkerGlyph {
    Single {
        avatar: Avatar,
        name: String,
        city: Option<String>,
    },
    Cluster {
        lead: Avatar,
        count: usize,
        satellites: Vec<Satellite>,
    },
}

/// What a marker shows, as data for the map to lay out.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerContent {
    pub glyph: MarkerGlyph,
}

impl MarkerContent {
    pub fn label(&self) -> String {
        match &self.glyph {
            MarkerGlyph::Single { name, .. } => name.clone(),
            MarkerGlyph::Cluster { count, .. } => format!("Members ({})", count),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PopupRow {
    pub id: String,
    pub avatar: Avatar,
    pub name: String,
    pub city: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PopupContent {
    pub rows: Vec<PopupRow>,
}

/// The slice of a map engine the marker and viewport logic drive.
///
/// Creating and destroying the map belong to the implementor (constructor
/// and `Drop`); the load signal is exposed through [`MapFacade::is_loaded`].
pub trait MapFacade {
    fn is_loaded(&self) -> bool;

    fn add_marker(&mut self, position: Coordinate, content: MarkerContent) -> MarkerId;
    /// Detaches the marker and its popup. Unknown ids are ignored.
    fn remove_marker(&mut self, marker: MarkerId);
    fn set_content(&mut self, marker: MarkerId, content: MarkerContent);
    fn set_popup(&mut self, marker: MarkerId, popup: Option<PopupContent>);
    fn toggle_popup(&mut self, marker: MarkerId);

    fn fly_to(&mut self, center: Coordinate, zoom: f64);
    fn set_zoom(&mut self, zoom: f64);
    fn zoom(&self) -> f64;
    fn center(&self) -> Coordinate;
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::BTreeMap;

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    pub struct PlacedMarker {
        pub position: Coordinate,
        pub content: MarkerContent,
        pub popup: Option<PopupContent>,
        pub popup_open: bool,
    }

    /// In-memory map that records every call made against it.
    #[derive(Debug, Default)]
    pub struct RecordingMap {
        pub loaded: bool,
        pub markers: BTreeMap<MarkerId, PlacedMarker>,
        pub added: usize,
        pub removed: usize,
        pub content_updates: usize,
        pub flights: Vec<(Coordinate, f64)>,
        pub center: Coordinate,
        pub zoom: f64,
        next_id: u64,
    }

    impl RecordingMap {
        pub fn loaded() -> Self {
            Self {
                loaded: true,
                zoom: 1.4,
                ..Default::default()
            }
        }

        pub fn only_marker(&self) -> &PlacedMarker {
            assert_eq!(self.markers.len(), 1, "expected exactly one marker");
            self.markers.values().next().unwrap()
        }
    }

    impl MapFacade for RecordingMap {
        fn is_loaded(&self) -> bool {
            self.loaded
        }

        fn add_marker(&mut self, position: Coordinate, content: MarkerContent) -> MarkerId {
            self.next_id += 1;
            self.added += 1;
            let id = MarkerId(self.next_id);
            self.markers.insert(
                id,
                PlacedMarker {
                    position,
                    content,
                    popup: None,
                    popup_open: false,
                },
            );
            id
        }

        fn remove_marker(&mut self, marker: MarkerId) {
            if self.markers.remove(&marker).is_some() {
                self.removed += 1;
            }
        }

        fn set_content(&mut self, marker: MarkerId, content: MarkerContent) {
            if let Some(placed) = self.markers.get_mut(&marker) {
                placed.content = content;
                self.content_updates += 1;
            }
        }

        fn set_popup(&mut self, marker: MarkerId, popup: Option<PopupContent>) {
            if let Some(placed) = self.markers.get_mut(&marker) {
                if popup.is_none() {
                    placed.popup_open = false;
                }
                placed.popup = popup;
            }
        }

        fn toggle_popup(&mut self, marker: MarkerId) {
            if let Some(placed) = self.markers.get_mut(&marker) {
                if placed.popup.is_some() {
                    placed.popup_open = !placed.popup_open;
                }
            }
        }

        fn fly_to(&mut self, center: Coordinate, zoom: f64) {
            self.flights.push((center, zoom));
            self.center = center;
            self.zoom = zoom;
        }

        fn set_zoom(&mut self, zoom: f64) {
            self.zoom = zoom;
        }

        fn zoom(&self) -> f64 {
            self.zoom
        }

        fn center(&self) -> Coordinate {
            self.center
        }
    }
}
