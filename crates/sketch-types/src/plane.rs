use serde::{Deserialize, Serialize};

/// Working-plane reference supplied by the 3D kernel collaborator.
///
/// The solver never interprets this; it is carried so the downstream
/// consumer can lift the solved profile back into 3D.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaneDatum {
    pub origin: [f64; 3],
    pub normal: [f64; 3],
    pub x_axis: [f64; 3],
}

impl PlaneDatum {
    pub fn new(origin: [f64; 3], normal: [f64; 3], x_axis: [f64; 3]) -> Self {
        Self {
            origin,
            normal,
            x_axis,
        }
    }

    /// The XY plane at the global origin.
    pub fn xy() -> Self {
        Self {
            origin: [0.0, 0.0, 0.0],
            normal: [0.0, 0.0, 1.0],
            x_axis: [1.0, 0.0, 0.0],
        }
    }
}

impl Default for PlaneDatum {
    fn default() -> Self {
        Self::xy()
    }
}
