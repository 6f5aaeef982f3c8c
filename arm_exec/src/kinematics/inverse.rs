//! Numeric inverse kinematics
//!
//! Position-only solver using a finite difference Jacobian and its right
//! pseudo-inverse `Jt (J Jt)^-1`. Only the first [`IK_MAX_JOINTS`] joint
//! values are adjusted, any later ones (gripper, wrist rotate) are passed
//! through untouched.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::trace;
use nalgebra::{DMatrix, DVector, Vector3};
use serde::Serialize;

use super::{position_of, JointUnits, KinematicChain, KinematicsError};
use util::maths::sum_abs;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Maximum number of solver iterations.
pub const IK_MAX_ITERATIONS: usize = 500;

/// Solver stops when the summed absolute position error is below this.
///
/// Units: meters
pub const IK_CONVERGENCE_M: f64 = 1e-4;

/// Finite difference step used to build the Jacobian.
///
/// Units: radians (meters for linear joints)
pub const IK_PERTURBATION: f64 = 0.001;

/// Fraction of the pseudo-inverse step applied each iteration.
pub const IK_LEARNING_RATE: f64 = 0.1;

/// Number of leading joints the solver adjusts.
pub const IK_MAX_JOINTS: usize = 4;

/// `J Jt` is treated as singular when its determinant is below this.
const SINGULAR_DETERMINANT: f64 = 1e-12;

/// Damping factor for the fallback damped least squares step.
const DAMPING: f64 = 0.01;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Outcome of an inverse kinematics solve.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IkSolution {
    /// True if the solver converged.
    pub found: bool,

    /// Joint values in the caller's units. When no solution was found this
    /// is the initial joint vector, unchanged.
    pub joints: Vec<f64>,

    /// Number of iterations performed.
    pub iterations: usize,

    /// Summed absolute position error at the last iteration.
    ///
    /// Units: meters
    pub residual_m: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl KinematicChain {
    /// Find joint values placing the end effector at `target`, starting from
    /// `initial`.
    pub fn inverse_kinematics(
        &self,
        initial: &[f64],
        units: JointUnits,
        target: &Vector3<f64>,
    ) -> Result<IkSolution, KinematicsError> {
        let num_vars = self.num_variables();
        if num_vars == 0 {
            return Err(KinematicsError::NoVariableStages);
        }
        if initial.len() < num_vars {
            return Err(KinematicsError::NotEnoughJoints {
                expected: num_vars,
                found: initial.len(),
            });
        }

        let num_active = num_vars.min(IK_MAX_JOINTS);
        let angular = self.angular_variables();

        // Work in radians so the perturbation and step sizes are fixed
        let mut work: Vec<f64> = initial
            .iter()
            .take(num_vars)
            .zip(angular.iter())
            .map(|(v, is_ang)| if *is_ang { units.to_radians(*v) } else { *v })
            .collect();

        let mut residual_m = std::f64::INFINITY;

        for iteration in 0..IK_MAX_ITERATIONS {
            let current = position_of(&self.pose(&work, JointUnits::Radians)?);
            let error = target - current;
            residual_m = sum_abs(error.as_slice());

            if residual_m < IK_CONVERGENCE_M {
                trace!(
                    "IK converged after {} iterations, residual {:.3e} m",
                    iteration,
                    residual_m
                );

                let mut joints = initial.to_vec();
                for i in 0..num_active {
                    joints[i] = if angular[i] {
                        units.from_radians(work[i])
                    } else {
                        work[i]
                    };
                }

                return Ok(IkSolution {
                    found: true,
                    joints,
                    iterations: iteration,
                    residual_m,
                });
            }

            let jacobian = self.jacobian(&mut work, num_active, &current)?;
            let step = pseudo_inverse(&jacobian) * DVector::from_column_slice(error.as_slice());

            for i in 0..num_active {
                work[i] += IK_LEARNING_RATE * step[i];
            }
        }

        trace!("IK did not converge, residual {:.3e} m", residual_m);

        Ok(IkSolution {
            found: false,
            joints: initial.to_vec(),
            iterations: IK_MAX_ITERATIONS,
            residual_m,
        })
    }

    /// Flags marking which joint values are angles.
    fn angular_variables(&self) -> Vec<bool> {
        self.stages()
            .iter()
            .filter(|s| s.is_variable())
            .map(|s| s.variable.is_angular())
            .collect()
    }

    /// Forward difference Jacobian of the end effector position with respect
    /// to the first `num_active` joints. `work` is restored before returning.
    fn jacobian(
        &self,
        work: &mut [f64],
        num_active: usize,
        current: &Vector3<f64>,
    ) -> Result<DMatrix<f64>, KinematicsError> {
        let mut jacobian = DMatrix::zeros(3, num_active);

        for i in 0..num_active {
            let original = work[i];
            work[i] += IK_PERTURBATION;
            let pose = self.pose(work, JointUnits::Radians);
            work[i] = original;

            let column = (position_of(&pose?) - current) / IK_PERTURBATION;
            jacobian.set_column(i, &column);
        }

        Ok(jacobian)
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Right pseudo-inverse of a 3xN Jacobian.
///
/// Falls back to damped least squares when `J Jt` is singular, which happens
/// when the joints cannot move the end effector along some axis.
fn pseudo_inverse(jacobian: &DMatrix<f64>) -> DMatrix<f64> {
    let jt = jacobian.transpose();
    let jjt = jacobian * &jt;

    if jjt.determinant().abs() > SINGULAR_DETERMINANT {
        if let Some(inv) = jjt.clone().try_inverse() {
            return &jt * inv;
        }
    }

    let damped = jjt + DMatrix::<f64>::identity(3, 3) * DAMPING.powi(2);
    match damped.try_inverse() {
        Some(inv) => &jt * inv,
        None => DMatrix::zeros(jacobian.ncols(), 3),
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::kinematics::{test_arm_chain, TransformStage, VariableParameter};

    #[test]
    fn test_seeded_at_solution() {
        let chain = test_arm_chain();
        let v = [15.0, -20.0, 30.0, 10.0, 45.0, -5.0];
        let target = position_of(&chain.pose(&v, JointUnits::Degrees).unwrap());

        let sol = chain.inverse_kinematics(&v, JointUnits::Degrees, &target).unwrap();

        assert!(sol.found);
        assert_eq!(sol.iterations, 0);
        for (a, b) in sol.joints.iter().zip(v.iter()) {
            assert!((a - b).abs() < 1e-9);
        }
    }

    #[test]
    fn test_jacobian() {
        let chain = test_arm_chain();
        let mut work = vec![0.3, -0.2, 0.4, 0.1];
        let current = position_of(&chain.pose(&work, JointUnits::Radians).unwrap());

        let jacobian = chain.jacobian(&mut work, 4, &current).unwrap();

        assert_eq!(jacobian.shape(), (3, 4));
        assert_eq!(work, vec![0.3, -0.2, 0.4, 0.1]);

        // The base turns about the vertical axis
        assert!((jacobian[(0, 0)] + current.y).abs() < 1e-3);
        assert!((jacobian[(1, 0)] - current.x).abs() < 1e-3);
        assert!(jacobian[(2, 0)].abs() < 1e-3);
    }

    #[test]
    fn test_fk_ik_consistency() {
        let chain = test_arm_chain();
        let goal = [20.0, 10.0, -15.0, 5.0];
        let target = position_of(&chain.pose(&goal, JointUnits::Degrees).unwrap());

        let initial = [0.0, 0.0, 0.0, 0.0, 60.0, 12.0];
        let sol = chain
            .inverse_kinematics(&initial, JointUnits::Degrees, &target)
            .unwrap();

        assert!(sol.found, "no solution, residual {}", sol.residual_m);
        assert!(sol.residual_m < IK_CONVERGENCE_M);

        // The solution really does reach the target
        let reached = position_of(&chain.pose(&sol.joints, JointUnits::Degrees).unwrap());
        let err = reached - target;
        assert!(err.x.abs() + err.y.abs() + err.z.abs() < IK_CONVERGENCE_M);

        // Joints after the fourth are passed through
        assert_eq!(sol.joints[4], 60.0);
        assert_eq!(sol.joints[5], 12.0);
    }

    #[test]
    fn test_unreachable_returns_initial() {
        let chain = test_arm_chain();
        let initial = [5.0, 10.0, 15.0, 20.0];

        let sol = chain
            .inverse_kinematics(&initial, JointUnits::Degrees, &Vector3::new(1.0, 0.0, 0.2))
            .unwrap();

        assert!(!sol.found);
        assert_eq!(sol.joints, initial.to_vec());
        assert_eq!(sol.iterations, IK_MAX_ITERATIONS);
    }

    #[test]
    fn test_singular_planar_chain() {
        // Two link planar arm in the XZ plane can never move along Y, so
        // J Jt is singular everywhere and the damped step is used.
        let chain = KinematicChain::new(vec![
            TransformStage::from_degrees(VariableParameter::None, 0.0, 90.0, 0.0, 0.0),
            TransformStage::from_degrees(VariableParameter::Theta, 0.0, 0.0, 0.2, 0.0),
            TransformStage::from_degrees(VariableParameter::Theta, 0.0, 0.0, 0.2, 0.0),
        ]);

        let goal = [30.0, 40.0];
        let target = position_of(&chain.pose(&goal, JointUnits::Degrees).unwrap());

        let sol = chain
            .inverse_kinematics(&[10.0, 60.0], JointUnits::Degrees, &target)
            .unwrap();

        assert!(sol.found, "no solution, residual {}", sol.residual_m);
    }

    #[test]
    fn test_errors() {
        let chain = KinematicChain::new(vec![TransformStage::new(
            VariableParameter::None,
            0.0,
            0.0,
            0.1,
            0.0,
        )]);
        assert_eq!(
            chain.inverse_kinematics(&[], JointUnits::Radians, &Vector3::zeros()),
            Err(KinematicsError::NoVariableStages)
        );

        assert_eq!(
            test_arm_chain().inverse_kinematics(&[0.0], JointUnits::Radians, &Vector3::zeros()),
            Err(KinematicsError::NotEnoughJoints {
                expected: 4,
                found: 1
            })
        );
    }
}
