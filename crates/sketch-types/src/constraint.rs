use serde::{Deserialize, Serialize};

use crate::entity::{EntityId, PointId};

/// A typed relation over sketch geometry.
///
/// Constraints are pure data: evaluation happens in the solver against the
/// unknown vector, and only the solver writes solved coordinates back.
/// The order in which constraints are added has no effect on the solved
/// result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Constraint {
    /// Two points occupy the same location.
    Coincident { a: PointId, b: PointId },
    /// The line's endpoints share the same y.
    Horizontal { line: EntityId },
    /// The line's endpoints share the same x.
    Vertical { line: EntityId },
    /// Perpendicular distance from a point to the line's infinite
    /// extension equals `value`.
    PointLineDistance {
        point: PointId,
        line: EntityId,
        value: f64,
    },
    /// Both arc endpoints lie at distance `value / 2` from the center.
    Diameter { arc: EntityId, value: f64 },
    /// The arc's center coincides with a reference point.
    Concentric { arc: EntityId, point: PointId },
}

impl Constraint {
    /// Number of scalar residual rows this constraint contributes.
    pub fn residual_dim(&self) -> usize {
        match self {
            Constraint::Coincident { .. }
            | Constraint::Diameter { .. }
            | Constraint::Concentric { .. } => 2,
            Constraint::Horizontal { .. }
            | Constraint::Vertical { .. }
            | Constraint::PointLineDistance { .. } => 1,
        }
    }

    /// Human-readable constraint name, useful for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Constraint::Coincident { .. } => "Coincident",
            Constraint::Horizontal { .. } => "Horizontal",
            Constraint::Vertical { .. } => "Vertical",
            Constraint::PointLineDistance { .. } => "PointLineDistance",
            Constraint::Diameter { .. } => "Diameter",
            Constraint::Concentric { .. } => "Concentric",
        }
    }
}
