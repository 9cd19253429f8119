use crate::error::ConfigurationError;

pub const DEFAULT_INDEX_NAME: &str = "maps_search";
pub const DEFAULT_MAP_STYLE: &str = "mapbox/streets-v11";
pub const DEFAULT_ZOOM: f64 = 1.4;

/// Settings read once at startup and treated as read-only afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub map_access_token: String,
    pub map_style: String,
    pub default_zoom: f64,
    pub search_app_id: String,
    pub search_api_key: String,
    pub search_index: String,
}

impl Config {
    /// Loads `.env` (if present) and then reads the process environment.
    pub fn from_env() -> Result<Self, ConfigurationError> {
        // A missing .env file is fine, the variables may come from the shell.
        let _ = dotenv::dotenv();
        Self::from_lookup(|name| dotenv::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigurationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .ok_or(ConfigurationError::Missing(name))
        };
        let optional = |name: &str, default: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let default_zoom = match lookup("MAP_DEFAULT_ZOOM") {
            Some(raw) if !raw.trim().is_empty() => raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|zoom| zoom.is_finite() && *zoom >= 0.0)
                .ok_or(ConfigurationError::Invalid {
                    name: "MAP_DEFAULT_ZOOM",
                    value: raw,
                })?,
            _ => DEFAULT_ZOOM,
        };

        Ok(Self {
            map_access_token: required("MAP_BOX_API_TOKEN")?,
            map_style: optional("MAP_STYLE", DEFAULT_MAP_STYLE),
            default_zoom,
            search_app_id: required("ALGOLIA_APP_ID")?,
            search_api_key: required("ALGOLIA_SEARCH_API_KEY")?,
            search_index: optional("ALGOLIA_INDEX_NAME", DEFAULT_INDEX_NAME),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    const FULL: &[(&str, &str)] = &[
        ("MAP_BOX_API_TOKEN", "pk.token"),
        ("ALGOLIA_APP_ID", "APP"),
        ("ALGOLIA_SEARCH_API_KEY", "key"),
    ];

    #[test]
    fn test_defaults_applied() {
        let config = Config::from_lookup(env(FULL)).unwrap();
        assert_eq!(config.map_access_token, "pk.token");
        assert_eq!(config.search_index, DEFAULT_INDEX_NAME);
        assert_eq!(config.map_style, DEFAULT_MAP_STYLE);
        assert_eq!(config.default_zoom, DEFAULT_ZOOM);
    }

    #[test]
    fn test_missing_credentials_are_fatal() {
        let err = Config::from_lookup(env(&FULL[1..])).unwrap_err();
        assert_eq!(err, ConfigurationError::Missing("MAP_BOX_API_TOKEN"));

        let err = Config::from_lookup(env(&[
            ("MAP_BOX_API_TOKEN", "pk.token"),
            ("ALGOLIA_APP_ID", "APP"),
            ("ALGOLIA_SEARCH_API_KEY", "   "),
        ]))
        .unwrap_err();
        assert_eq!(err, ConfigurationError::Missing("ALGOLIA_SEARCH_API_KEY"));
    }

    #[test]
    fn test_default_zoom_override() {
        let mut pairs = FULL.to_vec();
        pairs.push(("MAP_DEFAULT_ZOOM", "1.5"));
        assert_eq!(Config::from_lookup(env(&pairs)).unwrap().default_zoom, 1.5);

        let mut pairs = FULL.to_vec();
        pairs.push(("MAP_DEFAULT_ZOOM", "far"));
        assert!(matches!(
            Config::from_lookup(env(&pairs)),
            Err(ConfigurationError::Invalid { name: "MAP_DEFAULT_ZOOM", .. })
        ));
    }
}
