pub mod profiles;
pub mod residuals;
pub mod solver;
pub mod variable_map;

pub use profiles::extract_profiles;
pub use residuals::ResidualSystem;
pub use solver::{solve_sketch, solve_system, Solution, SolverConfig};
pub use variable_map::{Var, VariableMap};
