//! Append-only per-identity box timelines.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use circle_models::{BoundingBox, IdentityId, SeedSet, TempTrack};

/// Accepted boxes for one identity, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History {
    boxes: Vec<BoundingBox>,
}

impl History {
    /// Most recently accepted box.
    pub fn last(&self) -> Option<&BoundingBox> {
        self.boxes.last()
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    pub fn boxes(&self) -> &[BoundingBox] {
        &self.boxes
    }

    fn push(&mut self, bbox: BoundingBox) {
        self.boxes.push(bbox);
    }
}

/// Histories for every identity in a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistoryBook {
    entries: BTreeMap<IdentityId, History>,
}

impl HistoryBook {
    /// Start every identity's history with its seed box.
    pub fn from_seeds(seeds: &SeedSet) -> Self {
        let mut book = Self::default();
        book.merge(&seeds.to_temp_track());
        book
    }

    /// Append the box of every identity present in `track`.
    ///
    /// Each call adds exactly one entry per identity in the track, so it
    /// must run once per emitted frame.
    pub fn merge(&mut self, track: &TempTrack) {
        for (id, bbox) in track.iter() {
            self.entries.entry(id.clone()).or_default().push(*bbox);
        }
    }

    pub fn get(&self, id: &IdentityId) -> Option<&History> {
        self.entries.get(id)
    }

    /// Last accepted box for an identity.
    pub fn last_box(&self, id: &IdentityId) -> Option<&BoundingBox> {
        self.entries.get(id).and_then(History::last)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&IdentityId, &History)> {
        self.entries.iter()
    }

    pub fn identity_count(&self) -> usize {
        self.entries.len()
    }

    /// Length of the longest history.
    pub fn max_len(&self) -> usize {
        self.entries.values().map(History::len).max().unwrap_or(0)
    }
}
