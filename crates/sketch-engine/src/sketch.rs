use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use sketch_solver::{extract_profiles, solve_sketch, SolverConfig};
use sketch_types::{
    ArcHandle, ClosedProfile, Constraint, EntityId, LineHandle, PlaneDatum, PointHandle, PointId,
    SketchEntity, SketchPoint, SolveError, SolveReport, SolveState,
};

/// Seed separations below this are treated as degenerate geometry.
const DEGENERATE_SEED: f64 = 1e-9;

/// A 2D sketch on a working plane: primitives, constraints, and solve
/// state. The only object exposed to callers.
///
/// Primitives and constraints are added while the sketch is `Unsolved`;
/// `solve()` transitions to `Solved` (coordinates overwritten in place) or
/// `Failed` (seed coordinates kept, typed error returned). A solved or
/// failed sketch rejects further mutation until an explicit `reset()`.
///
/// A sketch exclusively owns its primitives and constraints, so
/// independent sketches can be solved concurrently; within one sketch,
/// `solve()` takes `&mut self` and callers serialize access.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sketch {
    id: Uuid,
    plane: PlaneDatum,
    points: Vec<SketchPoint>,
    entities: Vec<SketchEntity>,
    constraints: Vec<Constraint>,
    state: SolveState,
    config: SolverConfig,
    origin: PointId,
    next_id: u32,
}

impl Sketch {
    /// Create an empty sketch on the given working plane. The sketch owns
    /// a fixed construction point at (0, 0), its origin.
    pub fn new(plane: PlaneDatum) -> Self {
        Self::with_config(plane, SolverConfig::default())
    }

    pub fn with_config(plane: PlaneDatum, config: SolverConfig) -> Self {
        let mut sketch = Self {
            id: Uuid::new_v4(),
            plane,
            points: Vec::new(),
            entities: Vec::new(),
            constraints: Vec::new(),
            state: SolveState::Unsolved,
            config,
            origin: 0,
            next_id: 0,
        };
        sketch.origin = sketch.push_point(0.0, 0.0, true, true);
        sketch
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn plane(&self) -> &PlaneDatum {
        &self.plane
    }

    pub fn state(&self) -> &SolveState {
        &self.state
    }

    /// The fixed construction point at (0, 0).
    pub fn origin(&self) -> PointHandle {
        self.point_handle(self.origin)
    }

    // ── Primitive factories ─────────────────────────────────────────────

    /// Add a free point at approximate coordinates.
    pub fn add_point(&mut self, x: f64, y: f64) -> Result<PointHandle, SolveError> {
        self.editable()?;
        check_finite(&[x, y])?;
        let id = self.push_point(x, y, false, false);
        Ok(self.point_handle(id))
    }

    /// Add a free construction point (excluded from profile output).
    pub fn add_construction_point(&mut self, x: f64, y: f64) -> Result<PointHandle, SolveError> {
        self.editable()?;
        check_finite(&[x, y])?;
        let id = self.push_point(x, y, false, true);
        Ok(self.point_handle(id))
    }

    /// Add a pinned construction point. Fixed points contribute no
    /// unknowns to the solve.
    pub fn add_fixed_point(&mut self, x: f64, y: f64) -> Result<PointHandle, SolveError> {
        self.editable()?;
        check_finite(&[x, y])?;
        let id = self.push_point(x, y, true, true);
        Ok(self.point_handle(id))
    }

    /// Add a line with fresh endpoints at approximate coordinates.
    pub fn add_line(
        &mut self,
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
    ) -> Result<LineHandle, SolveError> {
        self.editable()?;
        check_finite(&[x1, y1, x2, y2])?;
        let start = self.push_point(x1, y1, false, false);
        let end = self.push_point(x2, y2, false, false);
        self.push_line(start, end)
    }

    /// Add a line between two existing points.
    pub fn add_line_between(
        &mut self,
        start: PointHandle,
        end: PointHandle,
    ) -> Result<LineHandle, SolveError> {
        self.editable()?;
        let start = self.check_point(start)?;
        let end = self.check_point(end)?;
        if start == end {
            return Err(SolveError::invalid_geometry(
                "line endpoints are the same point",
            ));
        }
        self.push_line(start, end)
    }

    /// Add an arc with a fresh construction center and fresh endpoints at
    /// approximate coordinates.
    pub fn add_arc(
        &mut self,
        cx: f64,
        cy: f64,
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
    ) -> Result<ArcHandle, SolveError> {
        self.editable()?;
        check_finite(&[cx, cy, x1, y1, x2, y2])?;
        let center = self.push_point(cx, cy, false, true);
        let start = self.push_point(x1, y1, false, false);
        let end = self.push_point(x2, y2, false, false);
        self.push_arc(center, start, end)
    }

    /// Add an arc centered on an existing point, as the lock-wing channel
    /// does with both arcs sharing the sketch origin.
    pub fn add_arc_about(
        &mut self,
        center: PointHandle,
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
    ) -> Result<ArcHandle, SolveError> {
        self.editable()?;
        check_finite(&[x1, y1, x2, y2])?;
        let center = self.check_point(center)?;
        let start = self.push_point(x1, y1, false, false);
        let end = self.push_point(x2, y2, false, false);
        self.push_arc(center, start, end)
    }

    // ── Constraint registry ─────────────────────────────────────────────

    /// The two points occupy the same location.
    pub fn coincident(&mut self, a: PointHandle, b: PointHandle) -> Result<(), SolveError> {
        self.editable()?;
        let a = self.check_point(a)?;
        let b = self.check_point(b)?;
        if a == b {
            return Err(SolveError::invalid_geometry(
                "coincidence of a point with itself",
            ));
        }
        self.constraints.push(Constraint::Coincident { a, b });
        Ok(())
    }

    /// The line's endpoints share the same y.
    pub fn horizontal(&mut self, line: LineHandle) -> Result<(), SolveError> {
        self.editable()?;
        let line = self.check_line(line)?;
        self.constraints.push(Constraint::Horizontal { line });
        Ok(())
    }

    /// The line's endpoints share the same x.
    pub fn vertical(&mut self, line: LineHandle) -> Result<(), SolveError> {
        self.editable()?;
        let line = self.check_line(line)?;
        self.constraints.push(Constraint::Vertical { line });
        Ok(())
    }

    /// Perpendicular distance from the point to the line's infinite
    /// extension equals `value`.
    pub fn distance(
        &mut self,
        point: PointHandle,
        line: LineHandle,
        value: f64,
    ) -> Result<(), SolveError> {
        self.editable()?;
        let point = self.check_point(point)?;
        let line = self.check_line(line)?;
        if !value.is_finite() || value < 0.0 {
            return Err(SolveError::invalid_geometry(format!(
                "distance value {value} is not a non-negative finite number"
            )));
        }
        self.constraints
            .push(Constraint::PointLineDistance { point, line, value });
        Ok(())
    }

    /// Both arc endpoints lie at distance `value / 2` from the center.
    pub fn diameter(&mut self, arc: ArcHandle, value: f64) -> Result<(), SolveError> {
        self.editable()?;
        let arc = self.check_arc(arc)?;
        if !value.is_finite() || value <= 0.0 {
            return Err(SolveError::invalid_geometry(format!(
                "diameter value {value} is not a positive finite number"
            )));
        }
        self.constraints.push(Constraint::Diameter { arc, value });
        Ok(())
    }

    /// The arc's center coincides with the reference point.
    pub fn concentric(&mut self, arc: ArcHandle, point: PointHandle) -> Result<(), SolveError> {
        self.editable()?;
        let arc_id = self.check_arc(arc)?;
        let point = self.check_point(point)?;
        if arc.center.id == point {
            return Err(SolveError::invalid_geometry(
                "arc is already centered on that point",
            ));
        }
        self.constraints.push(Constraint::Concentric {
            arc: arc_id,
            point,
        });
        Ok(())
    }

    // ── Solving ─────────────────────────────────────────────────────────

    /// Build the variable map and residual system, run the solver, and on
    /// success write solved coordinates into the primitives. Accepted only
    /// from `Unsolved`; a solved or failed sketch must be `reset()` first.
    pub fn solve(&mut self) -> Result<SolveReport, SolveError> {
        if self.state != SolveState::Unsolved {
            return Err(SolveError::AlreadySolved);
        }
        info!(
            sketch = %self.id,
            points = self.points.len(),
            constraints = self.constraints.len(),
            "solving sketch"
        );
        self.state = SolveState::Solving;
        let result = self.run_solver();
        self.state = match &result {
            Ok(_) => SolveState::Solved,
            Err(err) => SolveState::Failed {
                reason: err.to_string(),
            },
        };
        result
    }

    fn run_solver(&mut self) -> Result<SolveReport, SolveError> {
        self.validate_geometry()?;
        solve_sketch(
            &mut self.points,
            &self.entities,
            &self.constraints,
            &self.config,
        )
    }

    /// Return to `Unsolved` for a deliberate re-solve. The current
    /// coordinates (solved or seed) become the next solve's seeds.
    pub fn reset(&mut self) {
        self.state = SolveState::Unsolved;
    }

    /// Degenerate-input checks that registration cannot see in full.
    fn validate_geometry(&self) -> Result<(), SolveError> {
        for entity in &self.entities {
            match entity {
                SketchEntity::Line { id, start, end } => {
                    if self.separation(*start, *end) < DEGENERATE_SEED {
                        return Err(SolveError::invalid_geometry(format!(
                            "line {id} has zero length at its seed coordinates"
                        )));
                    }
                }
                SketchEntity::Arc {
                    id,
                    center,
                    start,
                    end,
                } => {
                    if self.separation(*center, *start) < DEGENERATE_SEED
                        || self.separation(*center, *end) < DEGENERATE_SEED
                    {
                        return Err(SolveError::invalid_geometry(format!(
                            "arc {id} has an endpoint on its center at the seed coordinates"
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    // ── Read-only surface ───────────────────────────────────────────────

    pub fn points(&self) -> &[SketchPoint] {
        &self.points
    }

    pub fn entities(&self) -> &[SketchEntity] {
        &self.entities
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Current position of a point (seed before solving, solved after).
    pub fn point_position(&self, handle: PointHandle) -> Result<(f64, f64), SolveError> {
        let id = self.check_point(handle)?;
        Ok(self.point(id).position())
    }

    /// Radius of an arc derived from the center-to-start distance.
    pub fn arc_radius(&self, handle: ArcHandle) -> Result<f64, SolveError> {
        self.check_arc(handle)?;
        Ok(self.separation(handle.center.id, handle.start.id))
    }

    /// All closed profiles of the solved geometry.
    pub fn profiles(&self) -> Result<Vec<ClosedProfile>, SolveError> {
        if !self.state.is_solved() {
            return Err(SolveError::NotSolved);
        }
        Ok(extract_profiles(&self.points, &self.entities))
    }

    /// The closed outer profile, the boundary handed to the extrusion
    /// consumer. Fails with `OpenProfile` when the solved geometry does
    /// not close into an outer loop.
    pub fn profile(&self) -> Result<ClosedProfile, SolveError> {
        self.profiles()?
            .into_iter()
            .find(|p| p.is_outer)
            .ok_or(SolveError::OpenProfile)
    }

    // ── Internals ───────────────────────────────────────────────────────

    fn editable(&self) -> Result<(), SolveError> {
        if self.state == SolveState::Unsolved {
            Ok(())
        } else {
            Err(SolveError::AlreadySolved)
        }
    }

    fn push_point(&mut self, x: f64, y: f64, fixed: bool, construction: bool) -> PointId {
        let id = self.alloc_id();
        self.points.push(SketchPoint {
            id,
            x,
            y,
            fixed,
            construction,
        });
        id
    }

    fn push_line(&mut self, start: PointId, end: PointId) -> Result<LineHandle, SolveError> {
        let id = self.alloc_id();
        self.entities.push(SketchEntity::Line { id, start, end });
        Ok(LineHandle {
            sketch: self.id,
            id,
            start: self.point_handle(start),
            end: self.point_handle(end),
        })
    }

    fn push_arc(
        &mut self,
        center: PointId,
        start: PointId,
        end: PointId,
    ) -> Result<ArcHandle, SolveError> {
        let id = self.alloc_id();
        self.entities.push(SketchEntity::Arc {
            id,
            center,
            start,
            end,
        });
        Ok(ArcHandle {
            sketch: self.id,
            id,
            center: self.point_handle(center),
            start: self.point_handle(start),
            end: self.point_handle(end),
        })
    }

    fn alloc_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn point_handle(&self, id: PointId) -> PointHandle {
        PointHandle {
            sketch: self.id,
            id,
        }
    }

    fn point(&self, id: PointId) -> &SketchPoint {
        self.points
            .iter()
            .find(|p| p.id == id)
            .expect("point ids are allocated by this sketch")
    }

    fn separation(&self, a: PointId, b: PointId) -> f64 {
        let (ax, ay) = self.point(a).position();
        let (bx, by) = self.point(b).position();
        (ax - bx).hypot(ay - by)
    }

    fn check_point(&self, handle: PointHandle) -> Result<PointId, SolveError> {
        if handle.sketch != self.id {
            return Err(SolveError::ForeignReference);
        }
        Ok(handle.id)
    }

    fn check_line(&self, handle: LineHandle) -> Result<EntityId, SolveError> {
        if handle.sketch != self.id {
            return Err(SolveError::ForeignReference);
        }
        Ok(handle.id)
    }

    fn check_arc(&self, handle: ArcHandle) -> Result<EntityId, SolveError> {
        if handle.sketch != self.id {
            return Err(SolveError::ForeignReference);
        }
        Ok(handle.id)
    }
}

fn check_finite(values: &[f64]) -> Result<(), SolveError> {
    if values.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(SolveError::invalid_geometry(
            "coordinates must be finite numbers",
        ))
    }
}
