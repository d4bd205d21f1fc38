use uuid::Uuid;

use sketch_types::{Constraint, PlaneDatum, SketchEntity, SketchPoint, SolveState};

use crate::sketch::Sketch;

/// Read-only traversal surface for external diagnostic sinks (image
/// renderers, constraint-graph dumps). Borrows the sketch's structure;
/// nothing here can mutate geometry.
#[derive(Debug, Clone, Copy)]
pub struct SketchView<'a> {
    pub id: Uuid,
    pub plane: &'a PlaneDatum,
    pub state: &'a SolveState,
    pub points: &'a [SketchPoint],
    pub entities: &'a [SketchEntity],
    pub constraints: &'a [Constraint],
}

/// An external collaborator that renders or records a sketch. File and
/// image output live behind this trait, outside the solve path.
pub trait DiagnosticSink {
    fn observe_sketch(&mut self, view: &SketchView<'_>);
}

impl Sketch {
    pub fn view(&self) -> SketchView<'_> {
        SketchView {
            id: self.id(),
            plane: self.plane(),
            state: self.state(),
            points: self.points(),
            entities: self.entities(),
            constraints: self.constraints(),
        }
    }

    /// Hand the sketch to a diagnostic sink. Valid in any state, solved or
    /// not, so failed sketches can be visualized for debugging.
    pub fn inspect(&self, sink: &mut dyn DiagnosticSink) {
        sink.observe_sketch(&self.view());
    }
}
