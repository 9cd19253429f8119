use crate::error::LookupError;
use crate::map::entity::Entity;

/// The member list behind the map, plus load and error state.
///
/// `members` is what the map draws and falls back to everyone when a query
/// has no hits. `hits` is the raw result of the latest query and feeds the
/// hit list under the search box.
#[derive(Debug, Default)]
pub struct MemberDirectory {
    initial_members: Vec<Entity>,
    members: Vec<Entity>,
    hits: Vec<Entity>,
    loading: bool,
    load_failed: bool,
    error: Option<String>,
    revision: u64,
}

impl MemberDirectory {
    pub fn loading() -> Self {
        Self {
            loading: true,
            ..Default::default()
        }
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// True when the initial full-directory load failed and nothing could be shown.
    pub fn load_failed(&self) -> bool {
        self.load_failed
    }

    /// The members currently on display.
    pub fn members(&self) -> &[Entity] {
        &self.members
    }

    pub fn initial_members(&self) -> &[Entity] {
        &self.initial_members
    }

    /// Hits of the latest query, empty when it matched nobody or was cleared.
    pub fn hits(&self) -> &[Entity] {
        &self.hits
    }

    /// Bumped every time [`Self::members`] changes.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn apply_directory(&mut self, result: Result<Vec<Entity>, LookupError>) {
        self.loading = false;
        match result {
            Ok(members) => {
                log::info!("loaded {} members", members.len());
                self.initial_members = members.clone();
                self.set_members(members);
                self.load_failed = false;
                self.error = None;
            }
            Err(err) => {
                log::warn!("failed to load members: {}", err);
                self.load_failed = true;
                self.error = Some(err.to_string());
            }
        }
    }

    /// An empty result (including a cleared query) shows everyone again on the
    /// map but leaves no hits; a failed lookup leaves the current members and
    /// hits in place.
    pub fn apply_search(&mut self, result: Result<Vec<Entity>, LookupError>) {
        match result {
            Ok(hits) if hits.is_empty() => {
                self.hits.clear();
                let all = self.initial_members.clone();
                self.set_members(all);
                self.error = None;
            }
            Ok(hits) => {
                self.hits = hits.clone();
                self.set_members(hits);
                self.error = None;
            }
            Err(err) => {
                self.error = Some(err.to_string());
            }
        }
    }

    fn set_members(&mut self, members: Vec<Entity>) {
        self.members = members;
        self.revision += 1;
    }
}
