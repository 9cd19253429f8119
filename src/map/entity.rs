use serde::{Deserialize, Serialize};

use super::map_tile::Coordinate;

/// Where a member lives. Coordinates are optional because the hosted index
/// does not guarantee them for every record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lng: Option<f64>,
    pub lat: Option<f64>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
}

/// A member of the directory, as shown on the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "SearchHit", into = "SearchHit")]
pub struct Entity {
    pub id: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub location: Location,
}

impl Entity {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>, lng: f64, lat: f64) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            avatar_url: None,
            location: Location {
                lng: Some(lng),
                lat: Some(lat),
                ..Default::default()
            },
        }
    }

    pub fn with_avatar(mut self, url: impl Into<String>) -> Self {
        self.avatar_url = Some(url.into());
        self
    }

    pub fn with_city(mut self, city: impl Into<String>) -> Self {
        self.location.city = Some(city.into());
        self
    }

    /// The entity's position, or `None` if it cannot be placed on the map.
    pub fn coordinate(&self) -> Option<Coordinate> {
        let (lng, lat) = (self.location.lng?, self.location.lat?);
        if !lng.is_finite() || !lat.is_finite() {
            return None;
        }
        if !(-180.0..=180.0).contains(&lng) || !(-90.0..=90.0).contains(&lat) {
            return None;
        }
        Some(Coordinate::new(lng, lat))
    }

    /// Fallback glyph for members without a photo.
    pub fn initial(&self) -> char {
        self.display_name
            .chars()
            .next()
            .map(|c| c.to_uppercase().next().unwrap_or(c))
            .unwrap_or('?')
    }

    /// "State, Country" when both are known, otherwise the city.
    pub fn region_label(&self) -> Option<String> {
        match (&self.location.state, &self.location.country) {
            (Some(state), Some(country)) if !state.is_empty() && !country.is_empty() => {
                Some(format!("{}, {}", state, country))
            }
            _ => self.location.city.clone(),
        }
    }
}

/// Wire shape of a hit from the hosted index, which flattens the location
/// fields into dotted keys.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(rename = "objectID")]
    object_id: String,
    #[serde(rename = "fullName", default)]
    full_name: String,
    #[serde(default)]
    photo: Option<String>,
    #[serde(rename = "location.lng", default)]
    lng: Option<f64>,
    #[serde(rename = "location.lat", default)]
    lat: Option<f64>,
    #[serde(rename = "location.city", default)]
    city: Option<String>,
    #[serde(rename = "location.state", default)]
    state: Option<String>,
    #[serde(rename = "location.country", default)]
    country: Option<String>,
}

impl From<SearchHit> for Entity {
    fn from(hit: SearchHit) -> Self {
        Self {
            id: hit.object_id,
            display_name: hit.full_name,
            avatar_url: hit.photo.filter(|url| !url.is_empty()),
            location: Location {
                lng: hit.lng,
                lat: hit.lat,
                city: hit.city,
                state: hit.state,
                country: hit.country,
            },
        }
    }
}

impl From<Entity> for SearchHit {
    fn from(entity: Entity) -> Self {
        Self {
            object_id: entity.id,
            full_name: entity.display_name,
            photo: entity.avatar_url,
            lng: entity.location.lng,
            lat: entity.location.lat,
            city: entity.location.city,
            state: entity.location.state,
            country: entity.location.country,
        }
    }
}
