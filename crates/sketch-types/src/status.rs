use serde::{Deserialize, Serialize};

/// Solve lifecycle of a sketch.
///
/// The `Unsolved -> Solving -> Solved | Failed` transition happens
/// synchronously inside a single `solve()` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SolveState {
    Unsolved,
    Solving,
    Solved,
    Failed { reason: String },
}

impl SolveState {
    pub fn is_solved(&self) -> bool {
        matches!(self, SolveState::Solved)
    }
}

/// Diagnostics returned alongside a successful solve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolveReport {
    /// Iterations the solver performed before converging.
    pub iterations: usize,
    /// Largest residual magnitude at the solved coordinates.
    pub final_residual: f64,
}
