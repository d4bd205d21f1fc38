use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a point within one sketch.
pub type PointId = u32;
/// Identifier of a curve entity (line or arc) within one sketch.
pub type EntityId = u32;

/// A sketch point in the working plane's local 2D frame.
///
/// Coordinates are scratch state seeded from the caller's literal values;
/// the solver overwrites them with the solved positions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SketchPoint {
    pub id: PointId,
    pub x: f64,
    pub y: f64,
    /// Fixed points contribute no unknowns; their coordinates are constants
    /// in every residual that references them.
    pub fixed: bool,
    /// Construction geometry is excluded from profile traversal.
    pub construction: bool,
}

impl SketchPoint {
    pub fn position(&self) -> (f64, f64) {
        (self.x, self.y)
    }
}

/// A curve entity in a sketch. Endpoints and centers are references to
/// points owned by the sketch, never inline coordinates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SketchEntity {
    Line {
        id: EntityId,
        start: PointId,
        end: PointId,
    },
    /// A circular arc. The radius is not stored: it is derived from the
    /// solved center-to-endpoint distance, and consistency of the two
    /// endpoints is enforced by the residuals of a diameter constraint.
    Arc {
        id: EntityId,
        center: PointId,
        start: PointId,
        end: PointId,
    },
}

impl SketchEntity {
    pub fn id(&self) -> EntityId {
        match self {
            SketchEntity::Line { id, .. } | SketchEntity::Arc { id, .. } => *id,
        }
    }

    /// Traversal endpoints (start, end) of this entity.
    pub fn endpoints(&self) -> (PointId, PointId) {
        match self {
            SketchEntity::Line { start, end, .. } | SketchEntity::Arc { start, end, .. } => {
                (*start, *end)
            }
        }
    }
}

/// Handle to a point, tagged with the owning sketch so that constraint
/// operations can reject operands from a different sketch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointHandle {
    pub sketch: Uuid,
    pub id: PointId,
}

/// Handle to a line. Carries its endpoint handles so call sites can chain
/// constraint additions without re-querying the sketch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineHandle {
    pub sketch: Uuid,
    pub id: EntityId,
    pub start: PointHandle,
    pub end: PointHandle,
}

/// Handle to an arc, with its center and endpoint handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArcHandle {
    pub sketch: Uuid,
    pub id: EntityId,
    pub center: PointHandle,
    pub start: PointHandle,
    pub end: PointHandle,
}
