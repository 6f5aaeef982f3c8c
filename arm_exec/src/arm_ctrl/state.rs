//! Implementations for the ArmCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info, trace, warn};
use nalgebra::Vector3;
use serde::Serialize;

// Internal
use super::{
    ArmConfig, ArmCtrlError, Params, GRIPPER_JOINT, MAX_NUM_JOINTS, NUM_POSITIONING_JOINTS,
};
use crate::{
    gripper::{Gripper, GripperState},
    kinematics::{IkSolution, JointUnits},
    motion::MotionInterpolator,
};
use comms_if::{
    eqpt::ssc::{MoveFrame, ServoCommand},
    tc::{arm_ctrl::ArmCmd, gripper::GripperCmd},
};
use util::{
    archive::{ArchiveError, Archived, Archiver},
    module::State,
    params,
    session::Session,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Arm control module state
#[derive(Default)]
pub struct ArmCtrl {
    pub(crate) params: Params,

    config: ArmConfig,

    initialised: bool,

    /// Where the joints have been told to go.
    ///
    /// Units: degrees
    target_deg: Vec<f64>,

    motion: MotionInterpolator,

    gripper: Gripper,

    /// Frame to send on the next cycle, set when made safe between cycles
    pending_frame: Option<MoveFrame>,

    /// Time of the last processed cycle.
    ///
    /// Units: seconds
    last_time_s: f64,

    pub(crate) report: StatusReport,

    output: OutputData,

    arch: Archiver,
}

/// Input data to Arm Control.
#[derive(Default)]
pub struct InputData {
    /// The arm command to be executed, or `None` if there is no new command
    /// on this cycle.
    pub cmd: Option<ArmCmd>,

    /// New gripper command, if any
    pub gripper_cmd: Option<GripperCmd>,

    /// Time since the previous cycle.
    ///
    /// Units: seconds
    pub elapsed_s: f64,

    /// Time of this cycle.
    ///
    /// Units: seconds
    pub time_s: f64,

    /// New gripper pressure reading. If `None` the last reading is kept.
    pub pressure: Option<f64>,
}

/// Demands and telemetry from ArmCtrl.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OutputData {
    /// Single servo demands, to be rate limited per channel.
    pub joint_dems: Vec<ServoCommand>,

    /// Group move to be sent as a whole.
    pub frame: Option<MoveFrame>,

    /// Modelled joint angles.
    ///
    /// Units: degrees
    pub joint_angles_deg: Vec<f64>,

    /// Modelled end effector position, in the configured telemetry units.
    pub end_effector: [f64; 3],
}

/// Status report for ArmCtrl processing.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StatusReport {
    /// Joint targets clamped to the servo's travel this cycle
    pub abs_pos_limited: [bool; MAX_NUM_JOINTS],

    /// Joints which could not reach their target this cycle
    pub rate_limited: [bool; MAX_NUM_JOINTS],

    /// Motion stopped to avoid the ground
    pub collision_stopped: bool,

    /// This cycle's arm command could not be executed
    pub cmd_rejected: bool,

    /// Result of a cartesian move or position check this cycle
    pub ik: Option<IkOutcome>,

    pub gripper_state: GripperState,

    /// Latest pressure reading
    pub pressure: Option<f64>,
}

/// Outcome of solving for a cartesian position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IkOutcome {
    /// A reachable solution was found
    SolutionFound,

    /// The solver did not converge
    NoSolution,

    /// A solution exists but needs a joint beyond its servo's travel
    OutsideLimits,
}

/// Flat record written to the archive each cycle.
#[derive(Serialize)]
struct ArchRecord {
    time_s: f64,
    base_deg: f64,
    shoulder_deg: f64,
    elbow_deg: f64,
    wrist_deg: f64,
    gripper_deg: f64,
    wrist_rotate_deg: Option<f64>,
    end_effector_x: f64,
    end_effector_y: f64,
    end_effector_z: f64,
    num_joint_dems: usize,
    frame_sent: bool,
    collision_stopped: bool,
    cmd_rejected: bool,
    ik: Option<IkOutcome>,
    gripper_state: String,
    pressure: Option<f64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl State for ArmCtrl {
    type InitData = &'static str;
    type InitError = ArmCtrlError;

    type InputData = InputData;
    type OutputData = OutputData;
    type StatusReport = StatusReport;
    type ProcError = ArmCtrlError;

    /// Initialise the ArmCtrl module.
    ///
    /// Expected init data is the path to the parameter file
    fn init(&mut self, init_data: Self::InitData, session: &Session) -> Result<(), Self::InitError> {
        let params: Params = params::load(init_data)?;

        *self = Self::from_params(params)?;
        self.arch = Archiver::from_path(session, "arm_ctrl.csv")?;

        Ok(())
    }

    /// Perform cyclic processing of Arm Control.
    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        if !self.initialised {
            return Err(ArmCtrlError::NotInitialised);
        }

        // Clear the status report and output
        self.report = StatusReport::default();
        self.output = OutputData {
            frame: self.pending_frame.take(),
            ..Default::default()
        };
        self.last_time_s = input_data.time_s;

        if let Some(p) = input_data.pressure {
            self.gripper.record_pressure(p, input_data.time_s);
        }

        // Check to see if there's a new command. A rejected command doesn't
        // stop the rest of the cycle.
        if let Some(cmd) = &input_data.cmd {
            debug!("New ArmCtrl ArmCmd::{:?}", cmd);
            if let Err(e) = self.exec_cmd(cmd, input_data.time_s) {
                warn!("ArmCmd::{:?} rejected: {}", cmd, e);
                self.report.cmd_rejected = true;
            }
        }

        if let Some(cmd) = &input_data.gripper_cmd {
            self.gripper.command(cmd, input_data.time_s);
        }

        // Gripper works from where it has been told to go
        if let Some(angle_deg) = self
            .gripper
            .proc(self.target_deg[GRIPPER_JOINT], input_data.time_s)
        {
            let angle_deg = self.set_target(GRIPPER_JOINT, angle_deg);
            self.output
                .joint_dems
                .push(self.config.actuators[GRIPPER_JOINT].command_for_joint_deg(angle_deg));
        }

        // Move the model towards the targets
        let motion = self
            .motion
            .advance(&mut self.config.chain, input_data.elapsed_s, &self.target_deg)?;

        for (i, limited) in motion.rate_limited.iter().enumerate().take(MAX_NUM_JOINTS) {
            self.report.rate_limited[i] = *limited;
        }

        if motion.collision_stopped {
            warn!("Arm stopped to avoid the ground");
            self.report.collision_stopped = true;
            self.hold();
        }

        // Telemetry
        let ee = motion.end_effector_m * self.params.telemetry_units.multiplier();
        self.output.end_effector = [ee.x, ee.y, ee.z];
        self.output.joint_angles_deg = self.motion.joint_angles_deg().to_vec();

        self.report.gripper_state = self.gripper.state();
        self.report.pressure = self.gripper.pressure().map(|r| r.value);

        trace!(
            "ArmCtrl output: {} joint dems, frame: {:?}, joints: {:?}",
            self.output.joint_dems.len(),
            self.output.frame,
            self.output.joint_angles_deg
        );

        Ok((self.output.clone(), self.report))
    }
}

impl Archived for ArmCtrl {
    fn write(&mut self) -> Result<(), ArchiveError> {
        let joints = &self.output.joint_angles_deg;
        let joint = |i: usize| joints.get(i).copied();

        let record = ArchRecord {
            time_s: self.last_time_s,
            base_deg: joint(0).unwrap_or_default(),
            shoulder_deg: joint(1).unwrap_or_default(),
            elbow_deg: joint(2).unwrap_or_default(),
            wrist_deg: joint(3).unwrap_or_default(),
            gripper_deg: joint(4).unwrap_or_default(),
            wrist_rotate_deg: joint(5),
            end_effector_x: self.output.end_effector[0],
            end_effector_y: self.output.end_effector[1],
            end_effector_z: self.output.end_effector[2],
            num_joint_dems: self.output.joint_dems.len(),
            frame_sent: self.output.frame.is_some(),
            collision_stopped: self.report.collision_stopped,
            cmd_rejected: self.report.cmd_rejected,
            ik: self.report.ik,
            gripper_state: format!("{:?}", self.report.gripper_state),
            pressure: self.report.pressure,
        };

        self.arch.serialise(record)
    }
}

impl ArmCtrl {
    /// Build an arm controller directly from parameters, without archiving.
    pub fn from_params(params: Params) -> Result<Self, ArmCtrlError> {
        params.are_valid()?;

        let mut config = ArmConfig::from_params(&params);
        let num_joints = config.num_joints();

        info!(
            "ArmCtrl configured for {:?} arm with {} joints",
            config.variant, num_joints
        );

        let mut motion = MotionInterpolator::new(vec![0.0; num_joints], config.rates_degs());

        // Prime the cached end effector pose
        motion.advance(&mut config.chain, 0.0, &vec![0.0; num_joints])?;

        Ok(Self {
            gripper: Gripper::new(params.grip_limit_pressure, 0.0),
            params,
            config,
            initialised: true,
            target_deg: vec![0.0; num_joints],
            motion,
            ..Default::default()
        })
    }

    /// Function called when entering safe mode.
    ///
    /// Must result in no motion of the arm. The hold frame is sent on the
    /// next cycle.
    pub fn make_safe(&mut self) {
        if !self.initialised {
            return;
        }

        self.stop(self.last_time_s);
        self.pending_frame = self.output.frame.take();
    }

    /// Units: degrees
    pub fn joint_angles_deg(&self) -> &[f64] {
        self.motion.joint_angles_deg()
    }

    /// Units: degrees
    pub fn target_deg(&self) -> &[f64] {
        &self.target_deg
    }

    pub fn gripper(&self) -> &Gripper {
        &self.gripper
    }

    pub fn config(&self) -> &ArmConfig {
        &self.config
    }

    /// Modelled end effector position.
    ///
    /// Units: meters
    pub fn end_effector_m(&self) -> Vector3<f64> {
        self.config.chain.end_effector_position()
    }

    /// Execute a single arm command.
    fn exec_cmd(&mut self, cmd: &ArmCmd, time_s: f64) -> Result<(), ArmCtrlError> {
        match cmd {
            ArmCmd::SetJoint { joint, angle_deg } => {
                let index = joint.index();
                if index >= self.config.num_joints() {
                    return Err(ArmCtrlError::JointNotFitted(*joint));
                }

                self.set_joint_dem(index, *angle_deg);
            }
            ArmCmd::SetJoints { angles_deg } => {
                for (index, angle_deg) in angles_deg
                    .iter()
                    .enumerate()
                    .take(self.config.num_joints())
                {
                    self.set_joint_dem(index, *angle_deg);
                }
            }
            ArmCmd::MoveTo { x_m, y_m, z_m } => {
                let target = Vector3::new(*x_m, *y_m, *z_m);

                if let Some(solution) = self.solve(&target)? {
                    self.move_to(&target, &solution);
                }
            }
            ArmCmd::CheckPosition { x_m, y_m, z_m } => {
                let target = Vector3::new(*x_m, *y_m, *z_m);
                let found = self.solve(&target)?.is_some();

                info!(
                    "Position ({:.3}, {:.3}, {:.3}) m: {}",
                    x_m,
                    y_m,
                    z_m,
                    if found { "Solution Found" } else { "No Solution" }
                );
            }
            ArmCmd::CentreAll => {
                for t in self.target_deg.iter_mut() {
                    *t = 0.0;
                }
                self.output.frame = Some(MoveFrame::centre_all(&self.config.channels()));
            }
            ArmCmd::Stop => self.stop(time_s),
        }

        Ok(())
    }

    /// Solve for a cartesian target from the current joint targets.
    ///
    /// Returns the solution if one exists within the servos' travel, and sets
    /// the IK outcome in the status report.
    fn solve(&mut self, target: &Vector3<f64>) -> Result<Option<IkSolution>, ArmCtrlError> {
        let solution =
            self.config
                .chain
                .inverse_kinematics(&self.target_deg, JointUnits::Degrees, target)?;

        let outcome = if !solution.found {
            IkOutcome::NoSolution
        } else if solution.joints[..NUM_POSITIONING_JOINTS]
            .iter()
            .zip(self.config.actuators.iter())
            .any(|(a, act)| !act.in_limits_deg(*a))
        {
            IkOutcome::OutsideLimits
        } else {
            IkOutcome::SolutionFound
        };

        self.report.ik = Some(outcome);

        match outcome {
            IkOutcome::SolutionFound => Ok(Some(solution)),
            _ => {
                warn!(
                    "Cannot reach ({:.3}, {:.3}, {:.3}) m: {:?}",
                    target.x, target.y, target.z, outcome
                );
                Ok(None)
            }
        }
    }

    /// Send the positioning joints to a solution in a single timed frame.
    fn move_to(&mut self, target: &Vector3<f64>, solution: &IkSolution) {
        let distance_m = (target - self.end_effector_m()).norm();
        let time_ms = (distance_m * 1000.0 / self.params.travel_speed_ms) as i32;

        let mut cmds = Vec::with_capacity(NUM_POSITIONING_JOINTS);
        for i in 0..NUM_POSITIONING_JOINTS {
            self.target_deg[i] = solution.joints[i];
            cmds.push(self.config.actuators[i].command_for_joint_deg(solution.joints[i]));
        }

        debug!("Moving {:.3} m over {} ms", distance_m, time_ms);

        self.output.frame = Some(MoveFrame {
            cmds,
            time_ms: Some(time_ms),
        });
    }

    /// Stop the arm and gripper where they are.
    fn stop(&mut self, time_s: f64) {
        self.gripper.stop(time_s);
        self.hold();
    }

    /// Replace the targets with the current joint angles and command every
    /// servo to hold there.
    fn hold(&mut self) {
        self.motion.stop();
        self.target_deg = self.motion.joint_angles_deg().to_vec();

        let cmds = self
            .config
            .actuators
            .iter()
            .zip(self.target_deg.iter())
            .map(|(act, a)| act.command_for_joint_deg(*a))
            .collect();

        self.output.frame = Some(MoveFrame {
            cmds,
            time_ms: None,
        });
    }

    /// Set a joint target and emit its demand.
    fn set_joint_dem(&mut self, index: usize, angle_deg: f64) {
        let angle_deg = self.set_target(index, angle_deg);
        self.output
            .joint_dems
            .push(self.config.actuators[index].command_for_joint_deg(angle_deg));
    }

    /// Set a joint target limited to the servo's travel, returning the value
    /// set.
    fn set_target(&mut self, index: usize, angle_deg: f64) -> f64 {
        let (angle_deg, limited) = self.config.actuators[index].clamp_joint_deg(angle_deg);

        if limited {
            self.report.abs_pos_limited[index] = true;
        }

        self.target_deg[index] = angle_deg;
        angle_deg
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
