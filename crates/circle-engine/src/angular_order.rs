//! Fixed circular seating order of identities.
//!
//! The order is computed once from the seed boxes and shared read-only by
//! conflict resolution and reconciliation. It is never re-derived during a
//! session; `verify_order` only reports whether the live geometry still
//! agrees with it.

use std::cmp::Ordering;
use std::sync::Arc;

use circle_models::{BoundingBox, FrameSize, IdentityId, TempTrack};

use crate::geometry::{angle_of, angles_of, forward_span};

/// Circular permutation of all identities, ascending by seed angle.
///
/// Cloning shares the underlying sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AngularOrder {
    order: Arc<[IdentityId]>,
}

impl AngularOrder {
    /// Sort identities by the angle of their seed box.
    ///
    /// Equal angles fall back to label order so the result is deterministic.
    pub fn from_seeds(seeds: &TempTrack, frame: FrameSize) -> Self {
        Self {
            order: sort_by_angle(seeds, frame).into(),
        }
    }

    pub fn as_slice(&self) -> &[IdentityId] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, id: &IdentityId) -> bool {
        self.position(id).is_some()
    }

    /// Index of an identity in the circular sequence.
    pub fn position(&self, id: &IdentityId) -> Option<usize> {
        self.order.iter().position(|other| other == id)
    }

    /// Circular predecessor and successor of an identity.
    pub fn neighbors(&self, id: &IdentityId) -> Option<(&IdentityId, &IdentityId)> {
        let len = self.order.len();
        let idx = self.position(id)?;
        let prev = &self.order[(idx + len - 1) % len];
        let next = &self.order[(idx + 1) % len];
        Some((prev, next))
    }

    /// Identities strictly between `from` and `to`, walking forward.
    ///
    /// When `from == to` the walk covers the whole circle except `from`.
    pub fn between(&self, from: &IdentityId, to: &IdentityId) -> Vec<IdentityId> {
        let Some(start) = self.position(from) else {
            return Vec::new();
        };
        let len = self.order.len();
        (1..len)
            .map(|step| &self.order[(start + step) % len])
            .take_while(|id| *id != to)
            .cloned()
            .collect()
    }

    /// Whether `candidate` may be assigned to `id` without breaking the
    /// seating order.
    ///
    /// True iff the candidate's angle lies strictly inside the open arc that
    /// runs forward from the predecessor's current angle to the successor's.
    /// With two identities the single neighbour bounds a full turn; a lone
    /// identity is always valid.
    pub fn is_angularly_valid(
        &self,
        id: &IdentityId,
        candidate: &BoundingBox,
        current: &TempTrack,
        frame: FrameSize,
    ) -> bool {
        if self.order.len() == 1 {
            return self.contains(id);
        }
        let Some((prev, next)) = self.neighbors(id) else {
            return false;
        };
        let (Some(prev_box), Some(next_box)) = (current.get(prev), current.get(next)) else {
            return false;
        };

        let start = angle_of(prev_box, frame);
        let end = angle_of(next_box, frame);
        let span = if prev == next {
            360.0
        } else {
            forward_span(start, end)
        };
        let offset = forward_span(start, angle_of(candidate, frame));

        offset > 0.0 && offset < span
    }

    /// Check that sorting the current boxes by angle yields a rotation of
    /// this order.
    pub fn verify_order(&self, current: &TempTrack, frame: FrameSize) -> bool {
        if current.len() != self.order.len() || !current.ids().all(|id| self.contains(id)) {
            return false;
        }
        let live = sort_by_angle(current, frame);
        let Some(start) = live.first().and_then(|first| self.position(first)) else {
            return self.order.is_empty();
        };
        let len = self.order.len();
        live.iter()
            .enumerate()
            .all(|(i, id)| *id == self.order[(start + i) % len])
    }
}

fn sort_by_angle(track: &TempTrack, frame: FrameSize) -> Vec<IdentityId> {
    let mut entries: Vec<(IdentityId, f64)> = angles_of(track, frame).into_iter().collect();
    entries.sort_by(|(a_id, a), (b_id, b)| {
        a.partial_cmp(b)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a_id.cmp(b_id))
    });
    entries.into_iter().map(|(id, _)| id).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> FrameSize {
        FrameSize::new(640, 640).unwrap()
    }

    fn seeds() -> TempTrack {
        [
            ("a", [300.0, 183.0, 57.0, 49.0]),
            ("b", [139.0, 201.0, 53.0, 45.0]),
            ("c", [94.0, 296.0, 77.0, 98.0]),
            ("d", [317.0, 472.0, 48.0, 63.0]),
            ("e", [427.0, 443.0, 61.0, 43.0]),
            ("f", [421.0, 230.0, 63.0, 39.0]),
        ]
        .into_iter()
        .map(|(id, b)| (IdentityId::from(id), BoundingBox::from(b)))
        .collect()
    }

    fn labels(order: &AngularOrder) -> Vec<&str> {
        order.as_slice().iter().map(|id| id.as_str()).collect()
    }

    /// Box of side 20 centered at the given bearing, 200px from the center.
    fn at_angle(deg: f64) -> BoundingBox {
        let rad = deg.to_radians();
        let cx = 320.0 + 200.0 * rad.cos();
        let cy = 320.0 - 200.0 * rad.sin();
        BoundingBox::new(cx - 10.0, cy - 10.0, 20.0, 20.0)
    }

    #[test]
    fn test_seed_order_for_six_children() {
        let order = AngularOrder::from_seeds(&seeds(), frame());
        assert_eq!(labels(&order), vec!["f", "a", "b", "c", "d", "e"]);
    }

    #[test]
    fn test_seed_order_is_deterministic() {
        let first = AngularOrder::from_seeds(&seeds(), frame());
        for _ in 0..10 {
            assert_eq!(AngularOrder::from_seeds(&seeds(), frame()), first);
        }
    }

    #[test]
    fn test_order_is_permutation_of_identities() {
        let order = AngularOrder::from_seeds(&seeds(), frame());
        let mut sorted: Vec<&str> = labels(&order);
        sorted.sort();
        assert_eq!(sorted, vec!["a", "b", "c", "d", "e", "f"]);
    }

    #[test]
    fn test_neighbors_wrap_around() {
        let order = AngularOrder::from_seeds(&seeds(), frame());
        let (prev, next) = order.neighbors(&"f".into()).unwrap();
        assert_eq!(prev.as_str(), "e");
        assert_eq!(next.as_str(), "a");
    }

    #[test]
    fn test_between_walks_forward() {
        let order = AngularOrder::from_seeds(&seeds(), frame());
        let slice = order.between(&"d".into(), &"a".into());
        let slice: Vec<&str> = slice.iter().map(|id| id.as_str()).collect();
        assert_eq!(slice, vec!["e", "f"]);

        let full = order.between(&"b".into(), &"b".into());
        assert_eq!(full.len(), 5);
        assert!(!full.contains(&"b".into()));

        assert!(order.between(&"a".into(), &"b".into()).is_empty());
    }

    #[test]
    fn test_angular_validity_inside_neighbor_arc() {
        let current = seeds();
        let order = AngularOrder::from_seeds(&current, frame());
        // a sits between f (~28deg) and b (~148deg)
        assert!(order.is_angularly_valid(&"a".into(), &at_angle(90.0), &current, frame()));
        assert!(order.is_angularly_valid(&"a".into(), &at_angle(30.0), &current, frame()));
        assert!(!order.is_angularly_valid(&"a".into(), &at_angle(200.0), &current, frame()));
        assert!(!order.is_angularly_valid(&"a".into(), &at_angle(10.0), &current, frame()));
    }

    #[test]
    fn test_angular_validity_across_zero() {
        let current = seeds();
        let order = AngularOrder::from_seeds(&current, frame());
        // f sits between e (~314deg) and a (~86deg), across 0
        assert!(order.is_angularly_valid(&"f".into(), &at_angle(350.0), &current, frame()));
        assert!(order.is_angularly_valid(&"f".into(), &at_angle(5.0), &current, frame()));
        assert!(!order.is_angularly_valid(&"f".into(), &at_angle(180.0), &current, frame()));
    }

    #[test]
    fn test_angular_validity_uses_current_not_seed_geometry() {
        let mut current = seeds();
        let order = AngularOrder::from_seeds(&current, frame());
        assert!(!order.is_angularly_valid(&"a".into(), &at_angle(170.0), &current, frame()));

        // b drifts further round; the arc for a widens
        current.set("b".into(), at_angle(190.0));
        assert!(order.is_angularly_valid(&"a".into(), &at_angle(170.0), &current, frame()));
    }

    #[test]
    fn test_angular_validity_small_circles() {
        let f = frame();
        let single: TempTrack = [(IdentityId::from("solo"), at_angle(0.0))].into_iter().collect();
        let order = AngularOrder::from_seeds(&single, f);
        assert!(order.is_angularly_valid(&"solo".into(), &at_angle(123.0), &single, f));

        let pair: TempTrack = [
            (IdentityId::from("x"), at_angle(0.0)),
            (IdentityId::from("y"), at_angle(180.0)),
        ]
        .into_iter()
        .collect();
        let order = AngularOrder::from_seeds(&pair, f);
        assert!(order.is_angularly_valid(&"x".into(), &at_angle(90.0), &pair, f));
        assert!(!order.is_angularly_valid(&"x".into(), &at_angle(180.0), &pair, f));
    }

    #[test]
    fn test_unknown_identity_is_never_valid() {
        let current = seeds();
        let order = AngularOrder::from_seeds(&current, frame());
        assert!(!order.is_angularly_valid(&"z".into(), &at_angle(90.0), &current, frame()));
    }

    #[test]
    fn test_verify_order_accepts_rotation() {
        let current = seeds();
        let order = AngularOrder::from_seeds(&current, frame());
        assert!(order.verify_order(&current, frame()));

        // Rotate everyone by the same amount: still a rotation of the order
        let rotated: TempTrack = current
            .iter()
            .map(|(id, b)| {
                let angle = angle_of(b, frame()) + 100.0;
                (id.clone(), at_angle(angle))
            })
            .collect();
        assert!(order.verify_order(&rotated, frame()));
    }

    #[test]
    fn test_verify_order_detects_swap() {
        let mut current = seeds();
        let order = AngularOrder::from_seeds(&current, frame());
        let a = *current.get(&"a".into()).unwrap();
        let b = *current.get(&"b".into()).unwrap();
        current.set("a".into(), b);
        current.set("b".into(), a);

        assert!(!order.verify_order(&current, frame()));
        // The order value itself is untouched by the probe
        assert_eq!(labels(&order), vec!["f", "a", "b", "c", "d", "e"]);
    }
}
