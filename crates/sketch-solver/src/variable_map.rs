use std::collections::HashMap;

use nalgebra::DVector;
use sketch_types::{PointId, SketchPoint};

/// Where a point coordinate lives during solving.
#[derive(Debug, Clone, Copy)]
pub enum Var {
    /// Slot in the unknown vector.
    Free(usize),
    /// Coordinate of a fixed point, constant during solving.
    Pinned(f64),
}

impl Var {
    /// Current value of this coordinate under the unknown vector `u`.
    pub fn value(&self, u: &DVector<f64>) -> f64 {
        match self {
            Var::Free(slot) => u[*slot],
            Var::Pinned(v) => *v,
        }
    }

    pub fn slot(&self) -> Option<usize> {
        match self {
            Var::Free(slot) => Some(*slot),
            Var::Pinned(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Assignment {
    /// First of two consecutive slots (x, then y).
    Slots(usize),
    Constants(f64, f64),
}

/// Assigns each free point's coordinates two consecutive slots in the
/// unknown vector, seeded from the point's current (caller-supplied)
/// coordinates. Fixed points resolve to constants and contribute no
/// unknowns.
///
/// Coincident points are deliberately not merged into one slot: the
/// observed seed coordinates of "coincident" points differ slightly, and
/// coincidence is reconciled by residuals rather than assumed structurally.
#[derive(Debug)]
pub struct VariableMap {
    assignments: HashMap<PointId, Assignment>,
    initial: Vec<f64>,
}

impl VariableMap {
    pub fn build(points: &[SketchPoint]) -> Self {
        let mut assignments = HashMap::new();
        let mut initial = Vec::new();
        for point in points {
            if point.fixed {
                assignments.insert(point.id, Assignment::Constants(point.x, point.y));
            } else {
                assignments.insert(point.id, Assignment::Slots(initial.len()));
                initial.push(point.x);
                initial.push(point.y);
            }
        }
        Self {
            assignments,
            initial,
        }
    }

    /// Number of unknowns.
    pub fn len(&self) -> usize {
        self.initial.len()
    }

    pub fn is_empty(&self) -> bool {
        self.initial.is_empty()
    }

    /// Seed vector for the solver.
    pub fn initial(&self) -> DVector<f64> {
        DVector::from_column_slice(&self.initial)
    }

    /// The x coordinate of a point. Panics on an unmapped id; the sketch
    /// owner guarantees all referenced points exist.
    pub fn x(&self, id: PointId) -> Var {
        match self.assignments[&id] {
            Assignment::Slots(base) => Var::Free(base),
            Assignment::Constants(x, _) => Var::Pinned(x),
        }
    }

    /// The y coordinate of a point.
    pub fn y(&self, id: PointId) -> Var {
        match self.assignments[&id] {
            Assignment::Slots(base) => Var::Free(base + 1),
            Assignment::Constants(_, y) => Var::Pinned(y),
        }
    }

    /// Copy the solved vector back into the owning points. Fixed points are
    /// left untouched.
    pub fn write_back(&self, u: &DVector<f64>, points: &mut [SketchPoint]) {
        for point in points.iter_mut() {
            if let Some(Assignment::Slots(base)) = self.assignments.get(&point.id) {
                point.x = u[*base];
                point.y = u[base + 1];
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(id: PointId, x: f64, y: f64, fixed: bool) -> SketchPoint {
        SketchPoint {
            id,
            x,
            y,
            fixed,
            construction: false,
        }
    }

    #[test]
    fn free_points_get_consecutive_slots() {
        let points = vec![point(1, 3.0, 4.0, false), point(2, -1.0, 2.0, false)];
        let map = VariableMap::build(&points);
        assert_eq!(map.len(), 4);
        let u = map.initial();
        assert_eq!(map.x(1).value(&u), 3.0);
        assert_eq!(map.y(1).value(&u), 4.0);
        assert_eq!(map.x(2).value(&u), -1.0);
        assert_eq!(map.y(2).value(&u), 2.0);
    }

    #[test]
    fn fixed_points_contribute_no_unknowns() {
        let points = vec![point(1, 0.0, 0.0, true), point(2, 5.0, 5.0, false)];
        let map = VariableMap::build(&points);
        assert_eq!(map.len(), 2);
        assert!(map.x(1).slot().is_none());
        let u = map.initial();
        assert_eq!(map.x(1).value(&u), 0.0);
        assert_eq!(map.x(2).value(&u), 5.0);
    }

    #[test]
    fn write_back_skips_fixed_points() {
        let mut points = vec![point(1, 0.0, 0.0, true), point(2, 5.0, 5.0, false)];
        let map = VariableMap::build(&points);
        let u = DVector::from_column_slice(&[7.0, 8.0]);
        map.write_back(&u, &mut points);
        assert_eq!(points[0].position(), (0.0, 0.0));
        assert_eq!(points[1].position(), (7.0, 8.0));
    }
}
