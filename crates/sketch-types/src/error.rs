use thiserror::Error;

/// Failure modes of sketch constraint solving.
///
/// All failures propagate as values to the caller; the solver never exits
/// the process and never leaves partial geometry behind a `Solved` state.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolveError {
    #[error("under-constrained sketch: {dof} degrees of freedom remain")]
    Underconstrained { dof: usize },

    #[error("conflicting constraints: residual cannot reach tolerance with zero degrees of freedom")]
    Conflicting,

    #[error("solver did not converge after {iterations} iterations (residual: {residual:.3e})")]
    NonConvergent { iterations: usize, residual: f64 },

    #[error("invalid geometry: {reason}")]
    InvalidGeometry { reason: String },

    #[error("operand belongs to a different sketch")]
    ForeignReference,

    #[error("sketch was already solved; call reset() before solving again")]
    AlreadySolved,

    #[error("sketch is not solved")]
    NotSolved,

    #[error("solved geometry does not form a closed profile")]
    OpenProfile,
}

impl SolveError {
    pub fn invalid_geometry(reason: impl Into<String>) -> Self {
        SolveError::InvalidGeometry {
            reason: reason.into(),
        }
    }
}
