//! The sketch object exposed to part scripts.
//!
//! A [`Sketch`] is created on a working plane, populated with primitives at
//! approximate coordinates and constraints between them, then solved once.
//! On success the primitive coordinates are overwritten in place and the
//! closed profile becomes available for the downstream 3D kernel; on
//! failure the sketch keeps its seed coordinates and reports a typed error.

pub mod sketch;
pub mod view;

pub use sketch::Sketch;
pub use view::{DiagnosticSink, SketchView};
