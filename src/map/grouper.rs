use std::collections::HashMap;

use super::entity::Entity;
use super::geo_key::GeoKey;
use super::map_tile::Coordinate;

/// Entities that share one exact location, in the order they were encountered.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationGroup {
    pub key: GeoKey,
    pub members: Vec<Entity>,
}

impl LocationGroup {
    pub fn coordinate(&self) -> Coordinate {
        self.key.coordinate()
    }

    /// The member whose avatar represents the whole group.
    pub fn lead(&self) -> &Entity {
        &self.members[0]
    }

    pub fn member_ids(&self) -> Vec<String> {
        self.members.iter().map(|m| m.id.clone()).collect()
    }
}

/// The result of one grouping pass. Iteration follows first appearance in
/// the input list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Grouping {
    groups: Vec<LocationGroup>,
    index: HashMap<GeoKey, usize>,
    /// Entities left out because they had no usable coordinate.
    pub skipped: usize,
}

impl Grouping {
    pub fn get(&self, key: &GeoKey) -> Option<&LocationGroup> {
        self.index.get(key).map(|&i| &self.groups[i])
    }

    pub fn contains(&self, key: &GeoKey) -> bool {
        self.index.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LocationGroup> {
        self.groups.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = GeoKey> + '_ {
        self.groups.iter().map(|g| g.key)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Buckets `entities` by exact location in a single pass.
///
/// Entities with a missing, non-finite, or out-of-range coordinate are
/// dropped rather than failing the whole pass.
pub fn group(entities: &[Entity]) -> Grouping {
    let mut grouping = Grouping::default();

    for entity in entities {
        let Some(coordinate) = entity.coordinate() else {
            log::debug!("skipping {} ({}): no usable coordinate", entity.id, entity.display_name);
            grouping.skipped += 1;
            continue;
        };
        let key = GeoKey::from(coordinate);
        match grouping.index.get(&key) {
            Some(&i) => grouping.groups[i].members.push(entity.clone()),
            None => {
                grouping.index.insert(key, grouping.groups.len());
                grouping.groups.push(LocationGroup {
                    key,
                    members: vec![entity.clone()],
                });
            }
        }
    }

    grouping
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::entity::Location;

    fn ids(group: &LocationGroup) -> Vec<&str> {
        group.members.iter().map(|m| m.id.as_str()).collect()
    }

    #[test]
    fn test_groups_by_exact_location() {
        let entities = vec![
            Entity::new("A", "Ada", 0.0, 0.0),
            Entity::new("B", "Bob", 0.0, 0.0),
            Entity::new("C", "Cy", 5.0, 5.0),
        ];
        let grouping = group(&entities);
        assert_eq!(grouping.len(), 2);
        assert_eq!(ids(grouping.get(&GeoKey::new(0.0, 0.0)).unwrap()), ["A", "B"]);
        assert_eq!(ids(grouping.get(&GeoKey::new(5.0, 5.0)).unwrap()), ["C"]);
    }

    #[test]
    fn test_preserves_input_order() {
        let entities = vec![
            Entity::new("z", "Zed", 1.0, 1.0),
            Entity::new("y", "Yu", 2.0, 2.0),
            Entity::new("x", "Xi", 1.0, 1.0),
        ];
        let grouping = group(&entities);
        let keys: Vec<GeoKey> = grouping.keys().collect();
        assert_eq!(keys, [GeoKey::new(1.0, 1.0), GeoKey::new(2.0, 2.0)]);
        assert_eq!(ids(grouping.get(&keys[0]).unwrap()), ["z", "x"]);
        assert_eq!(grouping.get(&keys[0]).unwrap().lead().id, "z");
    }

    #[test]
    fn test_idempotent() {
        let entities = vec![
            Entity::new("A", "Ada", 3.0, 4.0),
            Entity::new("B", "Bob", -3.0, 4.0),
            Entity::new("C", "Cy", 3.0, 4.0),
        ];
        assert_eq!(group(&entities), group(&entities));
    }

    #[test]
    fn test_skips_unplaceable_entities() {
        let mut missing = Entity::new("m", "Missing", 0.0, 0.0);
        missing.location = Location::default();
        let entities = vec![
            missing,
            Entity::new("n", "NaN", f64::NAN, 1.0),
            Entity::new("i", "Inf", 1.0, f64::INFINITY),
            Entity::new("ok", "Fine", 1.0, 1.0),
        ];
        let grouping = group(&entities);
        assert_eq!(grouping.len(), 1);
        assert_eq!(grouping.skipped, 3);
    }

    #[test]
    fn test_empty_input() {
        let grouping = group(&[]);
        assert!(grouping.is_empty());
        assert_eq!(grouping.skipped, 0);
    }
}
