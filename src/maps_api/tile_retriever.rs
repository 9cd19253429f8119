use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::error::TileError;
use crate::map::map_tile::{MapTile, TileKey};

const FIRST_RETRY: Duration = Duration::from_secs(2);
const MAX_RETRY: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct TileRetriever {
    client: reqwest::Client,
    access_token: String,
    style: String,
    tile_size: u32,
}

impl TileRetriever {
    pub fn new(access_token: String, style: String, tile_size: u32) -> Self {
        Self {
            client: reqwest::Client::new(),
            access_token,
            style,
            tile_size,
        }
    }

    /// Mapbox static tiles URL for one raster tile of the configured style.
    pub fn tile_url(&self, (zoom, x, y): TileKey) -> String {
        format!(
            "https://api.mapbox.com/styles/v1/{}/tiles/{}/{}/{}/{}?access_token={}",
            self.style, self.tile_size, zoom, x, y, self.access_token
        )
    }

    /// Asynchronously fetches a tile and decodes it into a MapTile.
    pub async fn fetch_tile(&self, key: TileKey) -> Result<MapTile, TileError> {
        let (zoom, x, y) = key;
        log::trace!("fetching tile ({}, {}, {})", zoom, x, y);

        let response = self.client.get(self.tile_url(key)).send().await?;
        if !response.status().is_success() {
            return Err(TileError::Status(response.status()));
        }
        let bytes = response.bytes().await?;

        let image = image::load_from_memory(&bytes)?.to_rgba8();
        let size = [image.width() as usize, image.height() as usize];
        Ok(MapTile::new(key, size, image.into_raw()))
    }
}

/// Tiles whose last fetch failed, and when each may be requested again.
/// The delay doubles per consecutive failure, up to a minute.
#[derive(Debug, Default)]
pub struct TileFailures {
    failed: HashMap<TileKey, (u32, Instant)>,
}

impl TileFailures {
    pub fn record(&mut self, key: TileKey, now: Instant) -> Duration {
        let attempts = self.failed.get(&key).map_or(0, |(attempts, _)| *attempts) + 1;
        let delay = FIRST_RETRY.saturating_mul(1 << (attempts - 1).min(5)).min(MAX_RETRY);
        self.failed.insert(key, (attempts, now + delay));
        delay
    }

    pub fn clear(&mut self, key: &TileKey) {
        self.failed.remove(key);
    }

    pub fn may_retry(&self, key: &TileKey, now: Instant) -> bool {
        self.failed.get(key).map_or(true, |(_, retry_at)| now >= *retry_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_tile_backs_off() {
        let mut failures = TileFailures::default();
        let key = (3, 4, 5);
        let start = Instant::now();
        assert!(failures.may_retry(&key, start));

        assert_eq!(failures.record(key, start), Duration::from_secs(2));
        assert!(!failures.may_retry(&key, start + Duration::from_secs(1)));
        assert!(failures.may_retry(&key, start + Duration::from_secs(2)));
        assert!(failures.may_retry(&(3, 4, 6), start));

        assert_eq!(failures.record(key, start), Duration::from_secs(4));
        for _ in 0..10 {
            failures.record(key, start);
        }
        assert_eq!(failures.record(key, start), MAX_RETRY);

        failures.clear(&key);
        assert!(failures.may_retry(&key, start));
    }

    #[test]
    fn test_tile_url() {
        let retriever = TileRetriever::new("pk.abc".into(), "mapbox/streets-v11".into(), 512);
        assert_eq!(
            retriever.tile_url((3, 4, 5)),
            "https://api.mapbox.com/styles/v1/mapbox/streets-v11/tiles/512/3/4/5?access_token=pk.abc"
        );
    }
}
