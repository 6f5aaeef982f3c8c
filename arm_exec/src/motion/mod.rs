//! # Motion interpolator
//!
//! Moves every joint towards its target at no more than the joint's turning
//! rate. A single cycle's motion is split into small substeps so that the
//! ground collision check can stop the arm close to the point of contact
//! rather than a whole cycle's travel beyond it.
//!
//! All angles handled here are in degrees.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{trace, warn};
use nalgebra::Vector3;
use serde::Serialize;

// Internal
use crate::kinematics::{JointUnits, KinematicChain, KinematicsError};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Largest joint movement which is not subdivided.
///
/// Units: degrees
pub const SUBSTEP_THRESHOLD_DEG: f64 = 0.1;

/// Number of substeps per degree of the largest joint movement.
pub const SUBSTEPS_PER_DEG: f64 = 10.0;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Current joint angles of the arm and the target they are moving towards.
#[derive(Debug, Clone, Default)]
pub struct MotionInterpolator {
    /// Units: degrees
    joint_angles_deg: Vec<f64>,

    /// Last requested target.
    ///
    /// Units: degrees
    target_deg: Vec<f64>,

    /// Maximum turning rate of each joint.
    ///
    /// Units: degrees/second
    rates_degs: Vec<f64>,
}

/// Outcome of one [`MotionInterpolator::advance`] call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MotionReport {
    /// Number of substeps the motion was divided into
    pub num_substeps: usize,

    /// Number of substeps actually applied
    pub num_substeps_applied: usize,

    /// True if a substep would have put the end effector into the ground
    pub collision_stopped: bool,

    /// True for each joint whose movement was limited by its rate
    pub rate_limited: Vec<bool>,

    /// End effector position after the motion.
    ///
    /// Units: meters
    pub end_effector_m: Vector3<f64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl MotionInterpolator {
    /// Create a new interpolator resting at `initial_deg`.
    ///
    /// `rates_degs` must hold one rate per joint.
    pub fn new(initial_deg: Vec<f64>, rates_degs: Vec<f64>) -> Self {
        Self {
            target_deg: initial_deg.clone(),
            joint_angles_deg: initial_deg,
            rates_degs,
        }
    }

    /// Units: degrees
    pub fn joint_angles_deg(&self) -> &[f64] {
        &self.joint_angles_deg
    }

    /// Units: degrees
    pub fn target_deg(&self) -> &[f64] {
        &self.target_deg
    }

    /// Returns true once every joint has reached its target.
    pub fn at_target(&self) -> bool {
        self.joint_angles_deg
            .iter()
            .zip(self.target_deg.iter())
            .all(|(a, t)| a == t)
    }

    /// Move every joint towards `target_deg` by at most its rate times
    /// `elapsed_s`.
    ///
    /// If any substep puts the end effector into the ground that substep is
    /// undone for all joints and the remaining substeps are skipped.
    pub fn advance(
        &mut self,
        chain: &mut KinematicChain,
        elapsed_s: f64,
        target_deg: &[f64],
    ) -> Result<MotionReport, KinematicsError> {
        let num_joints = self.joint_angles_deg.len();
        if target_deg.len() < num_joints {
            return Err(KinematicsError::NotEnoughJoints {
                expected: num_joints,
                found: target_deg.len(),
            });
        }

        self.target_deg = target_deg[..num_joints].to_vec();

        // Rate limited movement of each joint over the whole cycle
        let mut rate_limited = vec![false; num_joints];
        let deltas_deg: Vec<f64> = (0..num_joints)
            .map(|i| {
                let raw_deg = self.target_deg[i] - self.joint_angles_deg[i];
                let time_to_reach_s = raw_deg.abs() / self.rates_degs[i];

                if time_to_reach_s > elapsed_s {
                    rate_limited[i] = true;
                    raw_deg * elapsed_s / time_to_reach_s
                } else {
                    raw_deg
                }
            })
            .collect();

        let max_delta_deg = deltas_deg.iter().fold(0f64, |acc, d| acc.max(d.abs()));

        let num_substeps = if max_delta_deg <= SUBSTEP_THRESHOLD_DEG {
            1
        } else {
            (max_delta_deg * SUBSTEPS_PER_DEG).ceil() as usize
        };

        let steps_deg: Vec<f64> = deltas_deg
            .iter()
            .map(|d| d / num_substeps as f64)
            .collect();

        let mut num_substeps_applied = 0;
        let mut collision_stopped = false;

        for _ in 0..num_substeps {
            for (angle, step) in self.joint_angles_deg.iter_mut().zip(steps_deg.iter()) {
                *angle += step;
            }

            let fk = chain.forward_kinematics(&self.joint_angles_deg, JointUnits::Degrees)?;

            if fk.ground_collision {
                for (angle, step) in self.joint_angles_deg.iter_mut().zip(steps_deg.iter()) {
                    *angle -= step;
                }

                collision_stopped = true;
                break;
            }

            num_substeps_applied += 1;
        }

        // Land exactly on the target when it was reachable this cycle
        if !collision_stopped {
            for i in 0..num_joints {
                if !rate_limited[i] {
                    self.joint_angles_deg[i] = self.target_deg[i];
                }
            }
        }

        // Refresh the cached pose for the angles actually kept
        let fk = chain.forward_kinematics(&self.joint_angles_deg, JointUnits::Degrees)?;

        if collision_stopped {
            warn!(
                "Ground collision, motion stopped after {} of {} substeps",
                num_substeps_applied, num_substeps
            );
        } else {
            trace!(
                "Motion advanced {:.3} deg in {} substeps",
                max_delta_deg,
                num_substeps
            );
        }

        Ok(MotionReport {
            num_substeps,
            num_substeps_applied,
            collision_stopped,
            rate_limited,
            end_effector_m: fk.position(),
        })
    }

    /// Set the target to the current angles, halting all motion.
    pub fn stop(&mut self) {
        self.target_deg = self.joint_angles_deg.clone();
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::kinematics::{is_ground_collision, position_of, test_arm_chain};

    #[test]
    fn test_rate_limit() {
        let mut chain = test_arm_chain();
        let rates = vec![60.0, 40.0, 100.0, 20.0, 80.0];
        let mut interp = MotionInterpolator::new(vec![0.0; 5], rates.clone());

        let target = [30.0, -30.0, 2.0, 10.0, -45.0];
        let report = interp.advance(&mut chain, 0.1, &target).unwrap();

        assert!(!report.collision_stopped);
        assert_eq!(report.rate_limited, vec![true, true, false, true, true]);

        for (i, angle) in interp.joint_angles_deg().iter().enumerate() {
            assert!(angle.abs() <= rates[i] * 0.1 + 1e-9);
        }
        assert!((interp.joint_angles_deg()[0] - 6.0).abs() < 1e-9);
        assert!((interp.joint_angles_deg()[1] + 4.0).abs() < 1e-9);
        assert_eq!(interp.joint_angles_deg()[2], 2.0);

        assert_eq!(report.num_substeps, report.num_substeps_applied);
        assert!(!interp.at_target());
    }

    #[test]
    fn test_substep_count() {
        let mut chain = test_arm_chain();
        let mut interp = MotionInterpolator::new(vec![0.0; 4], vec![1000.0; 4]);

        let report = interp.advance(&mut chain, 0.1, &[0.1, 0.0, 0.0, 0.0]).unwrap();
        assert_eq!(report.num_substeps, 1);

        let report = interp.advance(&mut chain, 0.1, &[0.1, 0.35, 0.0, 0.0]).unwrap();
        assert_eq!(report.num_substeps, 4);
        assert_eq!(interp.joint_angles_deg()[1], 0.35);
    }

    #[test]
    fn test_reaches_target() {
        let mut chain = test_arm_chain();
        let mut interp = MotionInterpolator::new(vec![0.0; 4], vec![100.0; 4]);

        let target = [0.05, 0.0, -0.02, 0.0];
        let report = interp.advance(&mut chain, 0.1, &target).unwrap();

        assert_eq!(report.num_substeps, 1);
        assert_eq!(interp.joint_angles_deg(), &target);
        assert!(interp.at_target());

        // Cached pose follows the joints
        let expected = position_of(&chain.pose(&target, JointUnits::Degrees).unwrap());
        assert_eq!(report.end_effector_m, expected);
        assert_eq!(chain.end_effector_position(), expected);

        // Nothing left to do
        let report = interp.advance(&mut chain, 0.1, &target).unwrap();
        assert_eq!(report.num_substeps, 1);
        assert_eq!(report.rate_limited, vec![false; 4]);
    }

    #[test]
    fn test_collision_rollback() {
        let mut chain = test_arm_chain();
        let mut interp = MotionInterpolator::new(vec![0.0; 4], vec![1000.0; 4]);

        // Lowering the shoulder with the elbow at zero swings the tool into
        // the ground well before the target.
        let target = [30.0, -90.0, 0.0, 0.0];
        let report = interp.advance(&mut chain, 1.0, &target).unwrap();

        assert!(report.collision_stopped);
        assert_eq!(report.num_substeps, 900);
        assert!(report.num_substeps_applied < 900);

        let angles = interp.joint_angles_deg().to_vec();

        // Earlier substeps were kept for every joint
        assert!(angles[0] > 0.0 && angles[0] < 30.0);
        assert!(angles[1] < -20.0 && angles[1] > -60.0);
        assert!(!is_ground_collision(&report.end_effector_m));

        // Moving on would hit the ground
        let mut further = angles.clone();
        further[0] += 2.0 * 30.0 / 900.0;
        further[1] -= 2.0 * 90.0 / 900.0;
        let p = position_of(&chain.pose(&further, JointUnits::Degrees).unwrap());
        assert!(is_ground_collision(&p));

        // Stopping holds the arm where it is
        interp.stop();
        assert!(interp.at_target());
    }

    #[test]
    fn test_short_target() {
        let mut chain = test_arm_chain();
        let mut interp = MotionInterpolator::new(vec![0.0; 5], vec![60.0; 5]);

        assert_eq!(
            interp.advance(&mut chain, 0.1, &[0.0; 4]),
            Err(KinematicsError::NotEnoughJoints {
                expected: 5,
                found: 4
            })
        );
    }
}
