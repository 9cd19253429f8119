use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::LookupError;
use crate::map::entity::Entity;

use super::search::{SearchIndex, SearchRequest, DEFAULT_PAGE_SIZE};

/// Quiet period before a typed query is sent to the index.
pub const DEBOUNCE: Duration = Duration::from_millis(300);

#[derive(Debug)]
pub enum SearchOutcome {
    /// The initial full-directory load.
    Directory(Result<Vec<Entity>, LookupError>),
    /// Hits for the latest query. A cleared query yields `Ok` with no hits.
    Query {
        query: String,
        result: Result<Vec<Entity>, LookupError>,
    },
}

struct Envelope {
    generation: Option<u64>,
    outcome: SearchOutcome,
}

/// Turns search-box input into member lists. Only the most recent query
/// ever produces an outcome.
pub struct SearchAdapter {
    index: Arc<dyn SearchIndex>,
    runtime: Handle,
    generation: Arc<AtomicU64>,
    in_flight: Option<JoinHandle<()>>,
    sender: mpsc::UnboundedSender<Envelope>,
    receiver: mpsc::UnboundedReceiver<Envelope>,
    repaint: Option<egui::Context>,
}

impl SearchAdapter {
    pub fn new(index: Arc<dyn SearchIndex>, runtime: Handle) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            index,
            runtime,
            generation: Arc::new(AtomicU64::new(0)),
            in_flight: None,
            sender,
            receiver,
            repaint: None,
        }
    }

    /// Wakes the UI whenever an outcome is ready.
    pub fn with_repaint(mut self, ctx: egui::Context) -> Self {
        self.repaint = Some(ctx);
        self
    }

    /// Fetches every member, without debounce.
    pub fn load_all(&self) {
        let index = self.index.clone();
        let sender = self.sender.clone();
        let repaint = self.repaint.clone();
        self.runtime.spawn(async move {
            let request = SearchRequest {
                query: String::new(),
                page_size: Some(DEFAULT_PAGE_SIZE),
            };
            let result = index.search(request).await;
            deliver(&sender, repaint.as_ref(), None, SearchOutcome::Directory(result));
        });
    }

    /// Supersedes any earlier query. Blank input resolves immediately with
    /// no hits; anything else is looked up after the debounce delay.
    pub fn submit(&mut self, query: &str) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(previous) = self.in_flight.take() {
            previous.abort();
        }

        let query = query.trim().to_string();
        if query.is_empty() {
            deliver(
                &self.sender,
                self.repaint.as_ref(),
                Some(generation),
                SearchOutcome::Query {
                    query,
                    result: Ok(Vec::new()),
                },
            );
            return;
        }

        let index = self.index.clone();
        let sender = self.sender.clone();
        let repaint = self.repaint.clone();
        let current = self.generation.clone();
        self.in_flight = Some(self.runtime.spawn(async move {
            tokio::time::sleep(DEBOUNCE).await;
            if current.load(Ordering::SeqCst) != generation {
                return;
            }
            let result = index.search(SearchRequest::new(query.clone())).await;
            if current.load(Ordering::SeqCst) != generation {
                log::trace!("dropping superseded results for {:?}", query);
                return;
            }
            deliver(&sender, repaint.as_ref(), Some(generation), SearchOutcome::Query { query, result });
        }));
    }

    /// Drains finished outcomes, skipping any that belong to a stale query.
    pub fn poll(&mut self) -> Vec<SearchOutcome> {
        let latest = self.generation.load(Ordering::SeqCst);
        let mut outcomes = Vec::new();
        while let Ok(envelope) = self.receiver.try_recv() {
            match envelope.generation {
                Some(generation) if generation != latest => continue,
                _ => outcomes.push(envelope.outcome),
            }
        }
        outcomes
    }
}

fn deliver(
    sender: &mpsc::UnboundedSender<Envelope>,
    repaint: Option<&egui::Context>,
    generation: Option<u64>,
    outcome: SearchOutcome,
) {
    if sender.send(Envelope { generation, outcome }).is_err() {
        log::debug!("search outcome dropped: adapter is gone");
        return;
    }
    if let Some(ctx) = repaint {
        ctx.request_repaint();
    }
}
