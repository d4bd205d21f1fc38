use std::collections::HashMap;

use nalgebra::{DMatrix, DVector};
use sketch_types::{Constraint, EntityId, PointId, SketchEntity, SolveError};

use crate::variable_map::{Var, VariableMap};

/// Below this separation a direction is considered degenerate and the row's
/// gradient is damped to zero instead of emitting NaN.
const DEGENERATE_EPS: f64 = 1e-12;

/// One scalar residual row with its analytic sparse gradient. Zero when the
/// owning constraint is satisfied.
#[derive(Debug, Clone, Copy)]
enum Row {
    /// `a - b`: one coordinate axis of a coincidence, or a horizontal /
    /// vertical alignment.
    CoordDiff { a: Var, b: Var },
    /// `hypot(p - c) - target`: one endpoint of a diameter constraint.
    RadialDistance {
        px: Var,
        py: Var,
        cx: Var,
        cy: Var,
        target: f64,
    },
    /// `|cross(b - a, p - a)| / |b - a| - target`: perpendicular distance
    /// from a point to the infinite line through a and b. The absolute
    /// value lets either side of the line satisfy the constraint; the seed
    /// coordinates select the side.
    PointLine {
        px: Var,
        py: Var,
        ax: Var,
        ay: Var,
        bx: Var,
        by: Var,
        target: f64,
    },
}

impl Row {
    fn residual(&self, u: &DVector<f64>) -> f64 {
        match self {
            Row::CoordDiff { a, b } => a.value(u) - b.value(u),
            Row::RadialDistance {
                px,
                py,
                cx,
                cy,
                target,
            } => {
                let dx = px.value(u) - cx.value(u);
                let dy = py.value(u) - cy.value(u);
                dx.hypot(dy) - target
            }
            Row::PointLine {
                px,
                py,
                ax,
                ay,
                bx,
                by,
                target,
            } => {
                let (ax, ay) = (ax.value(u), ay.value(u));
                let (bx, by) = (bx.value(u), by.value(u));
                let (px, py) = (px.value(u), py.value(u));
                let len = (bx - ax).hypot(by - ay);
                if len < DEGENERATE_EPS {
                    return -target;
                }
                let cross = (bx - ax) * (py - ay) - (by - ay) * (px - ax);
                cross.abs() / len - target
            }
        }
    }

    /// Write the nonzero partial derivatives of this row into `out` as
    /// (slot, value) pairs. Pinned coordinates contribute nothing.
    fn gradient(&self, u: &DVector<f64>, out: &mut Vec<(usize, f64)>) {
        match self {
            Row::CoordDiff { a, b } => {
                push(out, *a, 1.0);
                push(out, *b, -1.0);
            }
            Row::RadialDistance { px, py, cx, cy, .. } => {
                let dx = px.value(u) - cx.value(u);
                let dy = py.value(u) - cy.value(u);
                let dist = dx.hypot(dy);
                if dist < DEGENERATE_EPS {
                    return;
                }
                push(out, *px, dx / dist);
                push(out, *py, dy / dist);
                push(out, *cx, -dx / dist);
                push(out, *cy, -dy / dist);
            }
            Row::PointLine {
                px,
                py,
                ax,
                ay,
                bx,
                by,
                ..
            } => {
                let (axv, ayv) = (ax.value(u), ay.value(u));
                let (bxv, byv) = (bx.value(u), by.value(u));
                let (pxv, pyv) = (px.value(u), py.value(u));
                let dx = bxv - axv;
                let dy = byv - ayv;
                let len = dx.hypot(dy);
                if len < DEGENERATE_EPS {
                    return;
                }
                let cross = dx * (pyv - ayv) - dy * (pxv - axv);
                // Treat a point exactly on the line as lying on the
                // positive side, so the row stays smooth through zero.
                let sign = if cross < 0.0 { -1.0 } else { 1.0 };

                // r = sign * cross / len - target
                // d(cross)/dv per coordinate, d(len)/dv only for a and b.
                let dc_dpx = -dy;
                let dc_dpy = dx;
                let dc_dax = byv - pyv;
                let dc_day = pxv - bxv;
                let dc_dbx = pyv - ayv;
                let dc_dby = axv - pxv;

                let dl_dax = -dx / len;
                let dl_day = -dy / len;
                let dl_dbx = dx / len;
                let dl_dby = dy / len;

                let len_sq = len * len;
                push(out, *px, sign * dc_dpx / len);
                push(out, *py, sign * dc_dpy / len);
                push(out, *ax, sign * (dc_dax * len - cross * dl_dax) / len_sq);
                push(out, *ay, sign * (dc_day * len - cross * dl_day) / len_sq);
                push(out, *bx, sign * (dc_dbx * len - cross * dl_dbx) / len_sq);
                push(out, *by, sign * (dc_dby * len - cross * dl_dby) / len_sq);
            }
        }
    }
}

fn push(out: &mut Vec<(usize, f64)>, var: Var, value: f64) {
    if let Some(slot) = var.slot() {
        out.push((slot, value));
    }
}

/// The assembled residual system `F(u): R^n -> R^m` for one sketch, with
/// one scalar row per constraint equation.
#[derive(Debug)]
pub struct ResidualSystem {
    rows: Vec<Row>,
    unknowns: usize,
}

impl ResidualSystem {
    pub fn build(
        entities: &[SketchEntity],
        constraints: &[Constraint],
        map: &VariableMap,
    ) -> Result<Self, SolveError> {
        let by_id: HashMap<EntityId, &SketchEntity> =
            entities.iter().map(|e| (e.id(), e)).collect();

        let mut rows = Vec::new();
        for constraint in constraints {
            match constraint {
                Constraint::Coincident { a, b } => {
                    push_coincidence(&mut rows, map, *a, *b);
                }
                Constraint::Horizontal { line } => {
                    let (start, end) = line_points(&by_id, *line)?;
                    rows.push(Row::CoordDiff {
                        a: map.y(end),
                        b: map.y(start),
                    });
                }
                Constraint::Vertical { line } => {
                    let (start, end) = line_points(&by_id, *line)?;
                    rows.push(Row::CoordDiff {
                        a: map.x(end),
                        b: map.x(start),
                    });
                }
                Constraint::PointLineDistance { point, line, value } => {
                    let (start, end) = line_points(&by_id, *line)?;
                    rows.push(Row::PointLine {
                        px: map.x(*point),
                        py: map.y(*point),
                        ax: map.x(start),
                        ay: map.y(start),
                        bx: map.x(end),
                        by: map.y(end),
                        target: *value,
                    });
                }
                Constraint::Diameter { arc, value } => {
                    let (center, start, end) = arc_points(&by_id, *arc)?;
                    let radius = value / 2.0;
                    for endpoint in [start, end] {
                        rows.push(Row::RadialDistance {
                            px: map.x(endpoint),
                            py: map.y(endpoint),
                            cx: map.x(center),
                            cy: map.y(center),
                            target: radius,
                        });
                    }
                }
                Constraint::Concentric { arc, point } => {
                    let (center, _, _) = arc_points(&by_id, *arc)?;
                    push_coincidence(&mut rows, map, center, *point);
                }
            }
        }

        Ok(Self {
            rows,
            unknowns: map.len(),
        })
    }

    pub fn rows(&self) -> usize {
        self.rows.len()
    }

    pub fn unknowns(&self) -> usize {
        self.unknowns
    }

    /// Evaluate `F(u)` into `f` (length = rows).
    pub fn residual_into(&self, u: &DVector<f64>, f: &mut DVector<f64>) {
        for (i, row) in self.rows.iter().enumerate() {
            f[i] = row.residual(u);
        }
    }

    /// Evaluate the Jacobian of `F` at `u` into `j` (rows x unknowns).
    pub fn jacobian_into(&self, u: &DVector<f64>, j: &mut DMatrix<f64>, scratch: &mut Vec<(usize, f64)>) {
        j.fill(0.0);
        for (i, row) in self.rows.iter().enumerate() {
            scratch.clear();
            row.gradient(u, scratch);
            for (slot, value) in scratch.iter() {
                j[(i, *slot)] += *value;
            }
        }
    }
}

fn push_coincidence(rows: &mut Vec<Row>, map: &VariableMap, a: PointId, b: PointId) {
    rows.push(Row::CoordDiff {
        a: map.x(a),
        b: map.x(b),
    });
    rows.push(Row::CoordDiff {
        a: map.y(a),
        b: map.y(b),
    });
}

fn line_points(
    by_id: &HashMap<EntityId, &SketchEntity>,
    id: EntityId,
) -> Result<(PointId, PointId), SolveError> {
    match by_id.get(&id) {
        Some(SketchEntity::Line { start, end, .. }) => Ok((*start, *end)),
        Some(_) => Err(SolveError::invalid_geometry(format!(
            "entity {id} is not a line"
        ))),
        None => Err(SolveError::invalid_geometry(format!(
            "unknown entity {id} referenced by a constraint"
        ))),
    }
}

fn arc_points(
    by_id: &HashMap<EntityId, &SketchEntity>,
    id: EntityId,
) -> Result<(PointId, PointId, PointId), SolveError> {
    match by_id.get(&id) {
        Some(SketchEntity::Arc {
            center, start, end, ..
        }) => Ok((*center, *start, *end)),
        Some(_) => Err(SolveError::invalid_geometry(format!(
            "entity {id} is not an arc"
        ))),
        None => Err(SolveError::invalid_geometry(format!(
            "unknown entity {id} referenced by a constraint"
        ))),
    }
}
