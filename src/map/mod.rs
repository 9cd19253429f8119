pub mod entity;
pub mod facade;
pub mod geo_key;
pub mod grouper;
#[allow(clippy::module_inception)]
pub mod map;
pub mod map_tile;
pub mod markers;
pub mod offset;
pub mod viewport;
