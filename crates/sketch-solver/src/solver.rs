use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use sketch_types::{Constraint, SketchEntity, SketchPoint, SolveError, SolveReport};
use tracing::{debug, info};

use crate::residuals::ResidualSystem;
use crate::variable_map::VariableMap;

/// Configuration for the damped Gauss-Newton solver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverConfig {
    pub max_iterations: usize,
    /// Convergence threshold on the infinity norm of the residual vector,
    /// in sketch units.
    pub tolerance: f64,
    /// Initial Tikhonov damping added to the diagonal of JᵗJ.
    pub lambda_initial: f64,
    /// Factor applied to the damping on rejected / accepted steps.
    pub lambda_factor: f64,
    /// Consecutive damped steps without residual reduction before the
    /// solve is declared stalled.
    pub stall_iterations: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            tolerance: 1e-9,
            lambda_initial: 1e-3,
            lambda_factor: 10.0,
            stall_iterations: 8,
        }
    }
}

/// A converged solve: the solved unknown vector plus diagnostics.
#[derive(Debug, Clone)]
pub struct Solution {
    pub u: DVector<f64>,
    pub report: SolveReport,
}

/// How the iteration loop ended, before rank classification.
enum Termination {
    Converged,
    Stalled,
    Exhausted,
}

/// Solve a sketch in place: build the variable map and residual system,
/// iterate, and on success write the solved coordinates back into the
/// points. On failure the points keep their seed coordinates.
pub fn solve_sketch(
    points: &mut [SketchPoint],
    entities: &[SketchEntity],
    constraints: &[Constraint],
    config: &SolverConfig,
) -> Result<SolveReport, SolveError> {
    let map = VariableMap::build(points);
    let system = ResidualSystem::build(entities, constraints, &map)?;
    let solution = solve_system(&system, map.initial(), config)?;
    map.write_back(&solution.u, points);
    Ok(solution.report)
}

/// Damped Gauss-Newton on the residual system, minimizing ||F(u)||².
///
/// Each iteration solves the normal-equations step
/// `(JᵗJ + λI) Δu = -Jᵗ F(u)`, raising λ when a step fails to shrink the
/// residual and lowering it when one succeeds. Termination is classified
/// by the numerical rank of J at the final point: free degrees of freedom
/// mean under-constraint, a stall with zero free DOF means contradictory
/// constraints, and an exhausted iteration budget that was still improving
/// means non-convergence.
pub fn solve_system(
    system: &ResidualSystem,
    initial: DVector<f64>,
    config: &SolverConfig,
) -> Result<Solution, SolveError> {
    let n = system.unknowns();
    let m = system.rows();

    let mut u = initial;
    let mut f = DVector::zeros(m);
    system.residual_into(&u, &mut f);

    if n == 0 {
        // Nothing to solve for; the constraints are either satisfied by
        // the fixed geometry or contradictory.
        return if inf_norm(&f) < config.tolerance {
            Ok(Solution {
                u,
                report: SolveReport {
                    iterations: 0,
                    final_residual: inf_norm(&f),
                },
            })
        } else {
            Err(SolveError::Conflicting)
        };
    }

    let mut j = DMatrix::zeros(m, n);
    let mut scratch = Vec::new();
    let mut lambda = config.lambda_initial;
    let mut rejected_in_a_row = 0usize;
    let mut iterations = 0usize;

    let termination = loop {
        if inf_norm(&f) < config.tolerance {
            break Termination::Converged;
        }
        if iterations >= config.max_iterations {
            break Termination::Exhausted;
        }
        if rejected_in_a_row >= config.stall_iterations {
            break Termination::Stalled;
        }
        iterations += 1;

        system.jacobian_into(&u, &mut j, &mut scratch);
        let jt = j.transpose();
        let jtj = &jt * &j;
        let jtf = &jt * &f;

        let mut damped = jtj.clone();
        for i in 0..n {
            damped[(i, i)] += lambda;
        }

        let step = match damped.cholesky() {
            Some(chol) => chol.solve(&(-&jtf)),
            None => {
                // Singular even with damping; raise and retry.
                lambda *= config.lambda_factor;
                rejected_in_a_row += 1;
                continue;
            }
        };

        let candidate = &u + &step;
        let mut f_candidate = DVector::zeros(m);
        system.residual_into(&candidate, &mut f_candidate);

        // Sufficient decrease, so floating-point noise at a stalled
        // least-squares optimum does not count as progress.
        if f_candidate.norm() < f.norm() * (1.0 - 1e-14) {
            u = candidate;
            f = f_candidate;
            lambda = (lambda / config.lambda_factor).max(1e-12);
            rejected_in_a_row = 0;
        } else {
            lambda *= config.lambda_factor;
            rejected_in_a_row += 1;
        }
        debug!(
            iteration = iterations,
            residual = f.norm(),
            lambda,
            "gauss-newton step"
        );
    };

    system.jacobian_into(&u, &mut j, &mut scratch);
    let dof = n - jacobian_rank(&j);
    let final_residual = inf_norm(&f);

    match termination {
        Termination::Converged if dof == 0 => {
            info!(iterations, final_residual, "sketch solved");
            Ok(Solution {
                u,
                report: SolveReport {
                    iterations,
                    final_residual,
                },
            })
        }
        Termination::Converged => Err(SolveError::Underconstrained { dof }),
        Termination::Stalled if dof > 0 => Err(SolveError::Underconstrained { dof }),
        Termination::Stalled => Err(SolveError::Conflicting),
        Termination::Exhausted if dof > 0 => Err(SolveError::Underconstrained { dof }),
        Termination::Exhausted => Err(SolveError::NonConvergent {
            iterations,
            residual: final_residual,
        }),
    }
}

/// Numerical rank of the Jacobian: singular values above
/// `eps * sigma_max * max(m, n)` count.
fn jacobian_rank(j: &DMatrix<f64>) -> usize {
    if j.nrows() == 0 || j.ncols() == 0 {
        return 0;
    }
    let svd = j.clone().svd(false, false);
    let sigma_max = svd
        .singular_values
        .iter()
        .cloned()
        .fold(0.0_f64, f64::max);
    if sigma_max == 0.0 {
        return 0;
    }
    let threshold = f64::EPSILON * sigma_max * j.nrows().max(j.ncols()) as f64;
    svd.singular_values
        .iter()
        .filter(|sigma| **sigma > threshold)
        .count()
}

/// Infinity norm, tolerating the empty residual of a constraint-free
/// sketch.
fn inf_norm(f: &DVector<f64>) -> f64 {
    if f.is_empty() {
        0.0
    } else {
        f.amax()
    }
}
