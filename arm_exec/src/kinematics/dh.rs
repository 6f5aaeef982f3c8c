//! Denavit-Hartenberg transform stages
//!
//! Each stage describes the transform from one link frame to the next with
//! the four classic parameters:
//!
//! - `theta`: rotation about the previous Z axis
//! - `alpha`: rotation about the new X axis
//! - `r`: offset along the new X axis (length of the common normal)
//! - `d`: offset along the previous Z axis
//!
//! At most one of these is driven by a joint, the others stay fixed.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Matrix4;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// One set of Denavit-Hartenberg parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransformStage {
    /// Which parameter the joint value is added to
    pub variable: VariableParameter,

    /// Units: radians
    pub theta_rad: f64,

    /// Units: radians
    pub alpha_rad: f64,

    /// Units: meters
    pub r_m: f64,

    /// Units: meters
    pub d_m: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The parameter of a stage which is driven by a joint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VariableParameter {
    /// Fixed stage
    None,
    Theta,
    Alpha,
    R,
    D,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl VariableParameter {
    /// True if joint values for this parameter are angles.
    pub fn is_angular(&self) -> bool {
        matches!(self, VariableParameter::Theta | VariableParameter::Alpha)
    }
}

impl TransformStage {
    /// Create a stage with angles given in radians.
    pub fn new(
        variable: VariableParameter,
        theta_rad: f64,
        alpha_rad: f64,
        r_m: f64,
        d_m: f64,
    ) -> Self {
        Self {
            variable,
            theta_rad,
            alpha_rad,
            r_m,
            d_m,
        }
    }

    /// Create a stage with angles given in degrees.
    pub fn from_degrees(
        variable: VariableParameter,
        theta_deg: f64,
        alpha_deg: f64,
        r_m: f64,
        d_m: f64,
    ) -> Self {
        Self::new(variable, theta_deg.to_radians(), alpha_deg.to_radians(), r_m, d_m)
    }

    /// True if this stage consumes a joint value.
    pub fn is_variable(&self) -> bool {
        self.variable != VariableParameter::None
    }

    /// Build the homogeneous transform for this stage with `live_value` added
    /// to the variable parameter.
    ///
    /// `live_value` is in radians for angular parameters and in meters for
    /// linear ones. It is ignored by fixed stages.
    ///
    /// The rotation occupies the upper-left 3x3 block and the translation the
    /// last column, so a chain is composed by right-multiplying stages.
    pub fn matrix(&self, live_value: f64) -> Matrix4<f64> {
        let mut theta = self.theta_rad;
        let mut alpha = self.alpha_rad;
        let mut r = self.r_m;
        let mut d = self.d_m;

        match self.variable {
            VariableParameter::None => (),
            VariableParameter::Theta => theta += live_value,
            VariableParameter::Alpha => alpha += live_value,
            VariableParameter::R => r += live_value,
            VariableParameter::D => d += live_value,
        }

        let (sin_t, cos_t) = theta.sin_cos();
        let (sin_a, cos_a) = alpha.sin_cos();

        Matrix4::new(
            cos_t, -sin_t * cos_a,  sin_t * sin_a, r * cos_t,
            sin_t,  cos_t * cos_a, -cos_t * sin_a, r * sin_t,
            0.0,    sin_a,          cos_a,         d,
            0.0,    0.0,            0.0,           1.0,
        )
    }

    /// As [`TransformStage::matrix`] with an angular live value given in
    /// degrees.
    pub fn matrix_degrees(&self, live_value_deg: f64) -> Matrix4<f64> {
        self.matrix(live_value_deg.to_radians())
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    const EPS: f64 = 1e-12;

    #[test]
    fn test_fixed_stage_ignores_live_value() {
        let stage = TransformStage::new(VariableParameter::None, 0.3, 0.2, 0.1, 0.05);
        assert_eq!(stage.matrix(0.0), stage.matrix(1.5));
    }

    #[test]
    fn test_theta_stage() {
        let stage = TransformStage::from_degrees(VariableParameter::Theta, 0.0, 0.0, 0.2, 0.1);
        let m = stage.matrix_degrees(90.0);

        // X axis of the new frame points along the old Y axis
        assert!((m[(0, 0)] - 0.0).abs() < EPS);
        assert!((m[(1, 0)] - 1.0).abs() < EPS);

        // Translation is r along the rotated X plus d along Z
        assert!((m[(0, 3)] - 0.0).abs() < EPS);
        assert!((m[(1, 3)] - 0.2).abs() < EPS);
        assert!((m[(2, 3)] - 0.1).abs() < EPS);
        assert_eq!(m[(3, 3)], 1.0);
    }

    #[test]
    fn test_alpha_and_linear_stages() {
        // Twist of 90 degrees turns the Z axis onto -Y
        let stage = TransformStage::new(VariableParameter::Alpha, 0.0, 0.0, 0.0, 0.0);
        let m = stage.matrix(std::f64::consts::FRAC_PI_2);
        assert!((m[(1, 2)] + 1.0).abs() < EPS);
        assert!((m[(2, 1)] - 1.0).abs() < EPS);

        let stage = TransformStage::new(VariableParameter::D, 0.0, 0.0, 0.0, 0.1);
        assert!((stage.matrix(0.25)[(2, 3)] - 0.35).abs() < EPS);

        let stage = TransformStage::new(VariableParameter::R, 0.0, 0.0, 0.1, 0.0);
        assert!((stage.matrix(0.25)[(0, 3)] - 0.35).abs() < EPS);
    }
}
