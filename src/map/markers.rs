//! Keeps the markers on a map in step with the current member list.
//!
//! Each [`LocationGroup`] is drawn as one collapsed marker. A group with more
//! than one member also carries a popup listing everyone at that location.
//! Every reconciliation is a full pass keyed by [`GeoKey`]: stale markers are
//! removed first, surviving ones are rebuilt in place when their members
//! change, and new ones are created last.

use std::collections::HashMap;

use crate::error::MapError;

use super::entity::Entity;
use super::facade::{Avatar, MapFacade, MarkerContent, MarkerGlyph, MarkerId, PopupContent, PopupRow, Satellite};
use super::geo_key::GeoKey;
use super::grouper::{self, Grouping, LocationGroup};
use super::offset;
use super::viewport::{ViewportController, FOCUS_ZOOM};

/// Upper bound on avatars fanned around a collapsed marker.
pub const MAX_SATELLITES: usize = 8;

/// The map-side projection of one location group.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedMarker {
    pub group_key: GeoKey,
    pub marker: MarkerId,
    pub has_popup: bool,
    /// Member ids the current content was built from, in group order.
    pub rendered_member_ids: Vec<String>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileReport {
    pub created: usize,
    pub updated: usize,
    pub removed: usize,
    pub unchanged: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    Focused(GeoKey),
    PopupToggled(GeoKey),
    /// The marker is not (or no longer) managed here.
    Ignored,
}

pub struct MarkerLifecycleManager<M: MapFacade> {
    map: Option<M>,
    viewport: ViewportController,
    grouping: Grouping,
    rendered: HashMap<GeoKey, RenderedMarker>,
    // Click bindings, dropped together with their marker.
    bindings: HashMap<MarkerId, GeoKey>,
    pending: bool,
}

impl<M: MapFacade> MarkerLifecycleManager<M> {
    pub fn new(viewport: ViewportController) -> Self {
        Self {
            map: None,
            viewport,
            grouping: Grouping::default(),
            rendered: HashMap::new(),
            bindings: HashMap::new(),
            pending: false,
        }
    }

    /// Takes ownership of `map`, returning any previously attached map after
    /// clearing its markers.
    pub fn attach(&mut self, map: M) -> Option<M> {
        let previous = self.detach();
        self.map = Some(map);
        self.pending = true;
        previous
    }

    /// Removes every marker from the attached map and hands the map back.
    pub fn detach(&mut self) -> Option<M> {
        self.teardown();
        self.map.take()
    }

    pub fn map(&self) -> Option<&M> {
        self.map.as_ref()
    }

    pub fn map_mut(&mut self) -> Option<&mut M> {
        self.map.as_mut()
    }

    pub fn grouping(&self) -> &Grouping {
        &self.grouping
    }

    pub fn rendered(&self) -> impl Iterator<Item = &RenderedMarker> {
        self.rendered.values()
    }

    pub fn rendered_for(&self, key: &GeoKey) -> Option<&RenderedMarker> {
        self.rendered.get(key)
    }

    /// Regroups `entities` and reconciles the map against the result.
    ///
    /// Before the map has loaded this returns [`MapError::NotReady`]; the
    /// grouping is kept and applied by [`Self::on_map_loaded`].
    pub fn set_entities(&mut self, entities: &[Entity]) -> Result<ReconcileReport, MapError> {
        self.grouping = grouper::group(entities);
        if self.grouping.skipped > 0 {
            log::debug!("{} entities without a usable location were not placed", self.grouping.skipped);
        }
        self.reconcile()
    }

    /// Applies a grouping that arrived before the map was ready.
    pub fn on_map_loaded(&mut self) -> Result<ReconcileReport, MapError> {
        if !self.pending {
            return Ok(ReconcileReport::default());
        }
        self.reconcile()
    }

    fn reconcile(&mut self) -> Result<ReconcileReport, MapError> {
        let Some(map) = self.map.as_mut().filter(|map| map.is_loaded()) else {
            self.pending = true;
            return Err(MapError::NotReady);
        };
        self.pending = false;

        let mut report = ReconcileReport::default();

        let stale: Vec<GeoKey> = self
            .rendered
            .keys()
            .filter(|key| !self.grouping.contains(key))
            .copied()
            .collect();
        for key in stale {
            if let Some(rendered) = self.rendered.remove(&key) {
                self.bindings.remove(&rendered.marker);
                map.remove_marker(rendered.marker);
                report.removed += 1;
            }
        }

        for group in self.grouping.iter() {
            let member_ids = group.member_ids();
            match self.rendered.get_mut(&group.key) {
                Some(rendered) if rendered.rendered_member_ids == member_ids => report.unchanged += 1,
                Some(rendered) => {
                    let popup = popup_content(group);
                    map.set_content(rendered.marker, marker_content(group)?);
                    if popup.is_some() || rendered.has_popup {
                        rendered.has_popup = popup.is_some();
                        map.set_popup(rendered.marker, popup);
                    }
                    rendered.rendered_member_ids = member_ids;
                    report.updated += 1;
                }
                None => {
                    let marker = map.add_marker(group.coordinate(), marker_content(group)?);
                    let popup = popup_content(group);
                    let has_popup = popup.is_some();
                    if has_popup {
                        map.set_popup(marker, popup);
                    }
                    self.bindings.insert(marker, group.key);
                    self.rendered.insert(
                        group.key,
                        RenderedMarker {
                            group_key: group.key,
                            marker,
                            has_popup,
                            rendered_member_ids: member_ids,
                        },
                    );
                    report.created += 1;
                }
            }
        }

        log::debug!(
            "reconciled {} groups: {} created, {} updated, {} removed",
            self.grouping.len(),
            report.created,
            report.updated,
            report.removed
        );
        Ok(report)
    }

    /// A lone member flies the map to it; a shared location toggles its popup.
    pub fn handle_click(&mut self, marker: MarkerId) -> ClickOutcome {
        let Some(&key) = self.bindings.get(&marker) else {
            return ClickOutcome::Ignored;
        };
        let Some(group) = self.grouping.get(&key) else {
            return ClickOutcome::Ignored;
        };
        if group.members.len() > 1 {
            if let Some(map) = self.map.as_mut() {
                map.toggle_popup(marker);
            }
            ClickOutcome::PopupToggled(key)
        } else {
            self.viewport.focus(self.map.as_mut(), key.lng(), key.lat(), FOCUS_ZOOM);
            ClickOutcome::Focused(key)
        }
    }

    pub fn focus_entity(&mut self, entity: &Entity, zoom: f64) {
        if let Some(coordinate) = entity.coordinate() {
            self.viewport.focus(self.map.as_mut(), coordinate.lng, coordinate.lat, zoom);
        }
    }

    pub fn zoom_in(&mut self) {
        self.viewport.zoom_in(self.map.as_mut());
    }

    pub fn zoom_out(&mut self) {
        self.viewport.zoom_out(self.map.as_mut());
    }

    pub fn reset_view(&mut self) {
        self.viewport.reset(self.map.as_mut());
    }

    pub fn on_key(&mut self, key: egui::Key) -> bool {
        self.viewport.on_key(self.map.as_mut(), key)
    }

    /// Removes every rendered marker. Returns how many were removed.
    pub fn teardown(&mut self) -> usize {
        let count = self.rendered.len();
        for (_, rendered) in self.rendered.drain() {
            if let Some(map) = self.map.as_mut() {
                map.remove_marker(rendered.marker);
            }
        }
        self.bindings.clear();
        if count > 0 {
            log::debug!("tore down {} markers", count);
        }
        count
    }
}

impl<M: MapFacade> Drop for MarkerLifecycleManager<M> {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn marker_content(group: &LocationGroup) -> Result<MarkerContent, MapError> {
    let lead = group.lead();
    let glyph = if group.members.len() == 1 {
        MarkerGlyph::Single {
            avatar: Avatar::of(lead),
            name: lead.display_name.clone(),
            city: lead.location.city.clone(),
        }
    } else {
        let shown = group.members.len().min(MAX_SATELLITES);
        let satellites = group
            .members
            .iter()
            .take(shown)
            .enumerate()
            .map(|(i, member)| {
                Ok(Satellite {
                    avatar: Avatar::of(member),
                    offset: offset::offset(i, shown)?,
                })
            })
            .collect::<Result<Vec<_>, MapError>>()?;
        MarkerGlyph::Cluster {
            lead: Avatar::of(lead),
            count: group.members.len(),
            satellites,
        }
    };
    Ok(MarkerContent { glyph })
}

fn popup_content(group: &LocationGroup) -> Option<PopupContent> {
    if group.members.len() < 2 {
        return None;
    }
    let rows = group
        .members
        .iter()
        .map(|member| PopupRow {
            id: member.id.clone(),
            avatar: Avatar::of(member),
            name: member.display_name.clone(),
            city: member.location.city.clone(),
        })
        .collect();
    Some(PopupContent { rows })
}
