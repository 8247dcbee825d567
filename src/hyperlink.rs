//! OSC 8 hyperlink registry
//!
//! Text styles carry a small [`HyperlinkId`] instead of the URI. The
//! registry interns URIs by value and, once it has grown past its limit,
//! drops every entry no line refers to any more. Ids are never reused, so a
//! snapshot holding a pruned id simply finds no URI for it.

use std::collections::{HashMap, HashSet};

use crate::style::HyperlinkId;

/// Entries kept before the first pruning pass
pub const DEFAULT_PRUNE_THRESHOLD: usize = 1024;

#[derive(Debug, Clone)]
pub struct HyperlinkRegistry {
    ids: HashMap<String, HyperlinkId>,
    uris: HashMap<HyperlinkId, String>,
    next_id: HyperlinkId,
    threshold: usize,
    min_threshold: usize,
}

impl Default for HyperlinkRegistry {
    fn default() -> Self {
        Self::with_threshold(DEFAULT_PRUNE_THRESHOLD)
    }
}

impl HyperlinkRegistry {
    pub fn with_threshold(threshold: usize) -> Self {
        let threshold = threshold.max(1);
        Self {
            ids: HashMap::new(),
            uris: HashMap::new(),
            next_id: 1,
            threshold,
            min_threshold: threshold,
        }
    }

    /// Id for `uri`, the same one every time while the entry is alive
    pub fn intern(&mut self, uri: &str) -> HyperlinkId {
        if let Some(&id) = self.ids.get(uri) {
            return id;
        }
        let id = self.next_id;
        self.next_id = self.next_id.saturating_add(1);
        self.ids.insert(uri.to_string(), id);
        self.uris.insert(id, uri.to_string());
        id
    }

    pub fn get(&self, id: HyperlinkId) -> Option<&str> {
        self.uris.get(&id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.uris.len()
    }

    pub fn is_empty(&self) -> bool {
        self.uris.is_empty()
    }

    /// True once the registry has grown enough to be worth a pruning pass
    pub fn needs_pruning(&self) -> bool {
        self.uris.len() >= self.threshold
    }

    /// Forget every entry whose id is not in `live`.
    ///
    /// The next pass is scheduled at twice the surviving size, so a session
    /// where most links stay visible is not rescanned on every new link.
    pub fn retain_live(&mut self, live: &HashSet<HyperlinkId>) {
        let before = self.uris.len();
        self.uris.retain(|id, _| live.contains(id));
        self.ids.retain(|_, id| live.contains(id));
        self.threshold = (self.uris.len() * 2).max(self.min_threshold);
        log::debug!("hyperlink registry pruned from {} to {} entries", before, self.uris.len());
    }
}
