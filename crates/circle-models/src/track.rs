//! Per-frame identity → box maps.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::bbox::BoundingBox;
use crate::error::{ModelError, ModelResult};
use crate::identity::IdentityId;

/// In-flight, unmerged box proposals for the frame currently being resolved.
///
/// Iteration is in identity-label order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct TempTrack(BTreeMap<IdentityId, BoundingBox>);

impl TempTrack {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn get(&self, id: &IdentityId) -> Option<&BoundingBox> {
        self.0.get(id)
    }

    /// Set the proposal for an identity, returning the previous one.
    pub fn set(&mut self, id: IdentityId, bbox: BoundingBox) -> Option<BoundingBox> {
        self.0.insert(id, bbox)
    }

    pub fn contains(&self, id: &IdentityId) -> bool {
        self.0.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &IdentityId> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&IdentityId, &BoundingBox)> {
        self.0.iter()
    }
}

impl FromIterator<(IdentityId, BoundingBox)> for TempTrack {
    fn from_iter<T: IntoIterator<Item = (IdentityId, BoundingBox)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Initial box per identity, supplied once at session start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(try_from = "BTreeMap<IdentityId, BoundingBox>")]
pub struct SeedSet(BTreeMap<IdentityId, BoundingBox>);

impl SeedSet {
    /// Build a seed set, rejecting empty input, blank or repeated labels,
    /// and degenerate boxes.
    pub fn from_pairs(
        pairs: impl IntoIterator<Item = (IdentityId, BoundingBox)>,
    ) -> ModelResult<Self> {
        let mut seeds = BTreeMap::new();
        for (id, bbox) in pairs {
            if id.as_str().trim().is_empty() {
                return Err(ModelError::EmptyIdentity);
            }
            if bbox.is_degenerate() {
                return Err(ModelError::DegenerateSeed {
                    identity: id.to_string(),
                    width: bbox.width,
                    height: bbox.height,
                });
            }
            if seeds.contains_key(&id) {
                return Err(ModelError::DuplicateIdentity(id.to_string()));
            }
            seeds.insert(id, bbox);
        }

        if seeds.is_empty() {
            return Err(ModelError::EmptySeedSet);
        }
        Ok(Self(seeds))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&IdentityId, &BoundingBox)> {
        self.0.iter()
    }

    /// The seeds as the first-frame track proposal.
    pub fn to_temp_track(&self) -> TempTrack {
        self.0.iter().map(|(id, b)| (id.clone(), *b)).collect()
    }
}

impl TryFrom<BTreeMap<IdentityId, BoundingBox>> for SeedSet {
    type Error = ModelError;

    fn try_from(map: BTreeMap<IdentityId, BoundingBox>) -> Result<Self, Self::Error> {
        Self::from_pairs(map)
    }
}
