//! Arm configuration
//!
//! Builds the kinematic chain and actuator set for a particular arm variant.
//!
//! The chain puts the base frame at the mounting surface with Z up and X
//! pointing forwards. With every joint at zero the upper arm is vertical and
//! the forearm and gripper point along X.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
use super::{ArmVariant, Geometry, Params};
use crate::{
    kinematics::{KinematicChain, TransformStage, VariableParameter},
    servo::JointActuator,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of joints positioning the end effector, and so taking part in the
/// kinematics.
pub const NUM_POSITIONING_JOINTS: usize = 4;

/// Index of the gripper in the joint vector.
pub const GRIPPER_JOINT: usize = 4;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The physical description of the arm.
#[derive(Debug, Clone, Default)]
pub struct ArmConfig {
    pub variant: ArmVariant,

    pub chain: KinematicChain,

    /// Servos in joint order
    pub actuators: Vec<JointActuator>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ArmConfig {
    /// Build the configuration described by the parameters.
    ///
    /// The parameters should be validated first.
    pub fn from_params(params: &Params) -> Self {
        Self {
            variant: params.arm_variant,
            chain: build_chain(&params.geometry, params.arm_variant),
            actuators: params.servos.clone(),
        }
    }

    pub fn num_joints(&self) -> usize {
        self.actuators.len()
    }

    /// Board channels of every servo in joint order.
    pub fn channels(&self) -> Vec<u8> {
        self.actuators.iter().map(|a| a.channel).collect()
    }

    /// Turning rate of every servo in joint order.
    ///
    /// Units: degrees/second
    pub fn rates_degs(&self) -> Vec<f64> {
        self.actuators.iter().map(|a| a.rotate_rate_degs()).collect()
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Denavit-Hartenberg chain for the base, shoulder, elbow and wrist joints.
pub fn build_chain(geometry: &Geometry, variant: ArmVariant) -> KinematicChain {
    let tool_m = match variant {
        ArmVariant::Standard => geometry.wrist_to_gripper_m,
        ArmVariant::WristRotate => geometry.wrist_to_gripper_m + geometry.wrist_rotate_m,
    };

    KinematicChain::new(vec![
        // Base swivel, twisting onto the vertical arm plane
        TransformStage::from_degrees(
            VariableParameter::Theta,
            0.0,
            90.0,
            0.0,
            geometry.shoulder_height_m,
        ),
        // Shoulder, upper arm vertical at zero
        TransformStage::from_degrees(VariableParameter::Theta, 90.0, 0.0, geometry.upper_arm_m, 0.0),
        // Elbow, forearm horizontal at zero
        TransformStage::from_degrees(VariableParameter::Theta, -90.0, 0.0, geometry.forearm_m, 0.0),
        // Wrist
        TransformStage::from_degrees(VariableParameter::Theta, 0.0, 0.0, tool_m, 0.0),
    ])
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::kinematics::{position_of, JointUnits};

    fn geometry() -> Geometry {
        Geometry {
            shoulder_height_m: 0.0738,
            upper_arm_m: 0.146,
            forearm_m: 0.185,
            wrist_to_gripper_m: 0.0358,
            wrist_rotate_m: 0.0574,
        }
    }

    #[test]
    fn test_variant_tool_length() {
        let zero = [0.0; 4];

        let standard = build_chain(&geometry(), ArmVariant::Standard);
        let p = position_of(&standard.pose(&zero, JointUnits::Degrees).unwrap());
        assert!((p.x - (0.185 + 0.0358)).abs() < 1e-9);

        let rotate = build_chain(&geometry(), ArmVariant::WristRotate);
        let p = position_of(&rotate.pose(&zero, JointUnits::Degrees).unwrap());
        assert!((p.x - (0.185 + 0.0358 + 0.0574)).abs() < 1e-9);
        assert!((p.z - (0.0738 + 0.146)).abs() < 1e-9);

        assert_eq!(rotate.num_variables(), NUM_POSITIONING_JOINTS);
    }
}
