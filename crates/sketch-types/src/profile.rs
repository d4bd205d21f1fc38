use serde::{Deserialize, Serialize};

use crate::entity::EntityId;

/// One segment of a closed profile, carrying solved coordinates in
/// traversal order so the downstream kernel can consume endpoint geometry
/// directly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ProfileSegment {
    Line {
        entity: EntityId,
        start: (f64, f64),
        end: (f64, f64),
    },
    Arc {
        entity: EntityId,
        center: (f64, f64),
        start: (f64, f64),
        end: (f64, f64),
    },
}

impl ProfileSegment {
    pub fn entity(&self) -> EntityId {
        match self {
            ProfileSegment::Line { entity, .. } | ProfileSegment::Arc { entity, .. } => *entity,
        }
    }

    pub fn start(&self) -> (f64, f64) {
        match self {
            ProfileSegment::Line { start, .. } | ProfileSegment::Arc { start, .. } => *start,
        }
    }

    pub fn end(&self) -> (f64, f64) {
        match self {
            ProfileSegment::Line { end, .. } | ProfileSegment::Arc { end, .. } => *end,
        }
    }
}

/// A closed loop of profile segments. Consecutive segment endpoints match,
/// and the last segment's end matches the first segment's start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosedProfile {
    pub segments: Vec<ProfileSegment>,
    /// Whether the loop winds counter-clockwise (outer boundary) or
    /// clockwise (hole).
    pub is_outer: bool,
}

impl ClosedProfile {
    /// Verify that consecutive endpoints match within `tol`.
    pub fn is_closed(&self, tol: f64) -> bool {
        if self.segments.is_empty() {
            return false;
        }
        let n = self.segments.len();
        (0..n).all(|i| {
            let (ex, ey) = self.segments[i].end();
            let (sx, sy) = self.segments[(i + 1) % n].start();
            (ex - sx).abs() <= tol && (ey - sy).abs() <= tol
        })
    }
}
