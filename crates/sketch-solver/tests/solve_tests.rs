use proptest::prelude::*;
use sketch_solver::{solve_sketch, SolverConfig};
use sketch_types::{Constraint, PointId, SketchEntity, SketchPoint, SolveError};

// ── Helpers ─────────────────────────────────────────────────────────────────

fn free_point(id: PointId, x: f64, y: f64) -> SketchPoint {
    SketchPoint {
        id,
        x,
        y,
        fixed: false,
        construction: false,
    }
}

fn fixed_point(id: PointId, x: f64, y: f64) -> SketchPoint {
    SketchPoint {
        id,
        x,
        y,
        fixed: true,
        construction: true,
    }
}

fn line(id: u32, start: PointId, end: PointId) -> SketchEntity {
    SketchEntity::Line { id, start, end }
}

fn assert_point_near(points: &[SketchPoint], id: PointId, expected: (f64, f64), tol: f64) {
    let point = points
        .iter()
        .find(|p| p.id == id)
        .unwrap_or_else(|| panic!("point {id} not found"));
    assert!(
        (point.x - expected.0).abs() < tol && (point.y - expected.1).abs() < tol,
        "point {} = ({:.6}, {:.6}), expected ({:.6}, {:.6}), tol={tol}",
        id,
        point.x,
        point.y,
        expected.0,
        expected.1,
    );
}

/// Rectangle anchored at the origin: corner 1 coincident with the fixed
/// origin, width and height dimensioned by point-line distances from the
/// origin to the right and top edges.
fn rectangle(
    w: f64,
    h: f64,
    jitter: f64,
) -> (Vec<SketchPoint>, Vec<SketchEntity>, Vec<Constraint>) {
    let points = vec![
        fixed_point(0, 0.0, 0.0),
        free_point(1, jitter, -jitter),
        free_point(2, w + jitter, jitter),
        free_point(3, w - jitter, h + jitter),
        free_point(4, -jitter, h - jitter),
    ];
    let entities = vec![
        line(10, 1, 2), // bottom
        line(11, 2, 3), // right
        line(12, 3, 4), // top
        line(13, 4, 1), // left
    ];
    let constraints = vec![
        Constraint::Coincident { a: 1, b: 0 },
        Constraint::Horizontal { line: 10 },
        Constraint::Vertical { line: 11 },
        Constraint::Horizontal { line: 12 },
        Constraint::Vertical { line: 13 },
        Constraint::PointLineDistance {
            point: 0,
            line: 11,
            value: w,
        },
        Constraint::PointLineDistance {
            point: 0,
            line: 12,
            value: h,
        },
    ];
    (points, entities, constraints)
}

// ── Convergence ─────────────────────────────────────────────────────────────

#[test]
fn rectangle_solves_to_exact_corners() {
    let (mut points, entities, constraints) = rectangle(200.0, 100.0, 0.5);
    let report =
        solve_sketch(&mut points, &entities, &constraints, &SolverConfig::default()).unwrap();
    assert!(report.final_residual < 1e-9);

    let tol = 1e-7;
    assert_point_near(&points, 1, (0.0, 0.0), tol);
    assert_point_near(&points, 2, (200.0, 0.0), tol);
    assert_point_near(&points, 3, (200.0, 100.0), tol);
    assert_point_near(&points, 4, (0.0, 100.0), tol);
}

#[test]
fn already_satisfied_sketch_converges_immediately() {
    let (mut points, entities, constraints) = rectangle(80.0, 40.0, 0.0);
    let report =
        solve_sketch(&mut points, &entities, &constraints, &SolverConfig::default()).unwrap();
    assert_eq!(report.iterations, 0);
}

#[test]
fn solving_twice_from_identical_seeds_is_deterministic() {
    let (mut first, entities, constraints) = rectangle(120.0, 60.0, 0.75);
    let (mut second, ..) = rectangle(120.0, 60.0, 0.75);

    solve_sketch(&mut first, &entities, &constraints, &SolverConfig::default()).unwrap();
    solve_sketch(&mut second, &entities, &constraints, &SolverConfig::default()).unwrap();

    for (a, b) in first.iter().zip(second.iter()) {
        assert!(
            (a.x - b.x).abs() < 1e-12 && (a.y - b.y).abs() < 1e-12,
            "point {} diverged between identical solves",
            a.id
        );
    }
}

// ── Failure classification ──────────────────────────────────────────────────

#[test]
fn incompatible_distances_on_one_line_conflict() {
    // The line is fully pinned through its endpoints; the second distance
    // value contradicts the first and can never be satisfied.
    let mut points = vec![
        fixed_point(0, 0.0, 0.0),
        fixed_point(5, 17.0, 14.0),
        fixed_point(6, -17.0, 14.0),
        free_point(1, 17.0, 14.0),
        free_point(2, -17.0, 14.0),
    ];
    let entities = vec![line(10, 1, 2)];
    let constraints = vec![
        Constraint::Coincident { a: 1, b: 5 },
        Constraint::Coincident { a: 2, b: 6 },
        Constraint::PointLineDistance {
            point: 0,
            line: 10,
            value: 14.0,
        },
        Constraint::PointLineDistance {
            point: 0,
            line: 10,
            value: 10.0,
        },
    ];
    let err =
        solve_sketch(&mut points, &entities, &constraints, &SolverConfig::default()).unwrap_err();
    assert_eq!(err, SolveError::Conflicting);
}

#[test]
fn free_point_fails_under_constrained_not_arbitrary() {
    let (mut points, entities, mut constraints) = rectangle(50.0, 25.0, 0.1);
    points.push(free_point(99, 7.0, 3.0));
    let err =
        solve_sketch(&mut points, &entities, &constraints, &SolverConfig::default()).unwrap_err();
    assert_eq!(err, SolveError::Underconstrained { dof: 2 });

    // Constraining the stray point restores solvability.
    constraints.push(Constraint::Coincident { a: 99, b: 0 });
    solve_sketch(&mut points, &entities, &constraints, &SolverConfig::default()).unwrap();
}

#[test]
fn exhausted_budget_reports_non_convergent() {
    let (mut points, entities, constraints) = rectangle(200.0, 100.0, 35.0);
    let config = SolverConfig {
        max_iterations: 1,
        ..SolverConfig::default()
    };
    let err = solve_sketch(&mut points, &entities, &constraints, &config).unwrap_err();
    assert!(
        matches!(err, SolveError::NonConvergent { iterations: 1, .. }),
        "expected NonConvergent, got {err:?}"
    );
}

// ── Property tests ──────────────────────────────────────────────────────────

proptest! {
    /// Any rectangle with consistent dimensions and modest seed error
    /// solves to the exact corner positions with zero residual DOF.
    #[test]
    fn rectangles_always_solve(
        w in 5.0_f64..200.0,
        h in 5.0_f64..200.0,
        jitter in 0.0_f64..1.0,
    ) {
        let (mut points, entities, constraints) = rectangle(w, h, jitter);
        let report = solve_sketch(&mut points, &entities, &constraints, &SolverConfig::default())
            .expect("rectangle must solve");
        prop_assert!(report.final_residual < 1e-9);

        let tol = 1e-6;
        prop_assert!((points[1].x).abs() < tol);
        prop_assert!((points[1].y).abs() < tol);
        prop_assert!((points[2].x - w).abs() < tol);
        prop_assert!((points[3].y - h).abs() < tol);
    }
}
