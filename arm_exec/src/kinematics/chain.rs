//! Kinematic chain and forward kinematics

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::{Matrix4, Vector3};

use super::{JointUnits, KinematicsError, TransformStage, GROUND_COLLISION_HEIGHT_M};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// An ordered chain of transform stages from the arm base to the end
/// effector.
#[derive(Debug, Clone)]
pub struct KinematicChain {
    stages: Vec<TransformStage>,

    /// Pose from the last call to `forward_kinematics`
    end_effector: Matrix4<f64>,
}

/// Result of evaluating the chain for a joint vector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForwardKinematics {
    /// End effector pose in the base frame
    pub pose: Matrix4<f64>,

    /// True if the end effector is below the ground threshold
    pub ground_collision: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for KinematicChain {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl KinematicChain {
    /// Create a chain from stages ordered base first.
    pub fn new(stages: Vec<TransformStage>) -> Self {
        Self {
            stages,
            end_effector: Matrix4::identity(),
        }
    }

    pub fn stages(&self) -> &[TransformStage] {
        &self.stages
    }

    /// Number of joint values the chain consumes.
    pub fn num_variables(&self) -> usize {
        self.stages.iter().filter(|s| s.is_variable()).count()
    }

    /// Compute the end effector pose for a joint vector.
    ///
    /// Extra entries after the last variable stage are ignored.
    pub fn pose(&self, joints: &[f64], units: JointUnits) -> Result<Matrix4<f64>, KinematicsError> {
        let expected = self.num_variables();
        if joints.len() < expected {
            return Err(KinematicsError::NotEnoughJoints {
                expected,
                found: joints.len(),
            });
        }

        let mut joint_idx = 0;
        let mut pose = Matrix4::identity();

        for stage in self.stages.iter() {
            let live = if stage.is_variable() {
                let value = joints[joint_idx];
                joint_idx += 1;

                if stage.variable.is_angular() {
                    units.to_radians(value)
                } else {
                    value
                }
            } else {
                0.0
            };

            pose *= stage.matrix(live);
        }

        Ok(pose)
    }

    /// Evaluate the chain, check for ground collision and cache the pose.
    pub fn forward_kinematics(
        &mut self,
        joints: &[f64],
        units: JointUnits,
    ) -> Result<ForwardKinematics, KinematicsError> {
        let pose = self.pose(joints, units)?;
        self.end_effector = pose;

        Ok(ForwardKinematics {
            pose,
            ground_collision: is_ground_collision(&position_of(&pose)),
        })
    }

    /// Pose cached by the last forward kinematics evaluation.
    pub fn end_effector(&self) -> &Matrix4<f64> {
        &self.end_effector
    }

    /// Position cached by the last forward kinematics evaluation.
    ///
    /// Units: meters
    pub fn end_effector_position(&self) -> Vector3<f64> {
        position_of(&self.end_effector)
    }
}

impl ForwardKinematics {
    /// Units: meters
    pub fn position(&self) -> Vector3<f64> {
        position_of(&self.pose)
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Translation part of a homogeneous transform.
pub fn position_of(pose: &Matrix4<f64>) -> Vector3<f64> {
    Vector3::new(pose[(0, 3)], pose[(1, 3)], pose[(2, 3)])
}

/// True if a position is low enough to be touching the ground.
pub fn is_ground_collision(position: &Vector3<f64>) -> bool {
    position.z < GROUND_COLLISION_HEIGHT_M
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::kinematics::{test_arm_chain, VariableParameter};

    const EPS: f64 = 1e-9;

    #[test]
    fn test_zero_pose() {
        let mut chain = test_arm_chain();
        assert_eq!(chain.num_variables(), 4);

        let fk = chain
            .forward_kinematics(&[0.0, 0.0, 0.0, 0.0], JointUnits::Degrees)
            .unwrap();
        let p = fk.position();

        // Upper arm vertical, forearm and tool horizontal
        assert!((p.x - (0.185 + 0.0932)).abs() < EPS);
        assert!(p.y.abs() < EPS);
        assert!((p.z - (0.0738 + 0.146)).abs() < EPS);
        assert!(!fk.ground_collision);
        assert_eq!(chain.end_effector_position(), p);
    }

    #[test]
    fn test_units_and_extra_joints() {
        let chain = test_arm_chain();

        let deg = chain
            .pose(&[30.0, -10.0, 20.0, 5.0, 90.0, 45.0], JointUnits::Degrees)
            .unwrap();
        let rad = chain
            .pose(
                &[
                    30f64.to_radians(),
                    -10f64.to_radians(),
                    20f64.to_radians(),
                    5f64.to_radians(),
                ],
                JointUnits::Radians,
            )
            .unwrap();

        assert!((position_of(&deg) - position_of(&rad)).norm() < EPS);

        assert_eq!(
            chain.pose(&[0.0, 0.0], JointUnits::Degrees),
            Err(KinematicsError::NotEnoughJoints {
                expected: 4,
                found: 2
            })
        );
    }

    #[test]
    fn test_base_swivel() {
        let chain = test_arm_chain();
        let p = position_of(&chain.pose(&[90.0, 0.0, 0.0, 0.0], JointUnits::Degrees).unwrap());

        // A quarter turn of the base swings the reach onto the Y axis
        assert!(p.x.abs() < EPS);
        assert!((p.y - (0.185 + 0.0932)).abs() < EPS);
    }

    #[test]
    fn test_ground_collision_boundary() {
        // Single prismatic stage, so the joint value is the end effector
        // height. Linear values are never converted from degrees.
        let mut chain = KinematicChain::new(vec![TransformStage::new(
            VariableParameter::D,
            0.0,
            0.0,
            0.0,
            0.0,
        )]);

        assert!(chain.forward_kinematics(&[-0.05], JointUnits::Degrees).unwrap().ground_collision);
        assert!(!chain.forward_kinematics(&[0.5], JointUnits::Degrees).unwrap().ground_collision);
        assert!(chain.forward_kinematics(&[0.009], JointUnits::Radians).unwrap().ground_collision);
        assert!(!chain.forward_kinematics(&[0.01], JointUnits::Radians).unwrap().ground_collision);
    }
}
