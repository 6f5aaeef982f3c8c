//! # Arm library.
//!
//! This library allows other crates in the workspace, and the benchmarks, to access items
//! defined inside the arm crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Arm control module - turns arm and gripper commands into servo demands
pub mod arm_ctrl;

/// Bus client - owns the serial connection to the servo controller
pub mod bus_client;

/// Global data store for the executable
pub mod data_store;

/// Gripper module - gripper state machine and pressure history
pub mod gripper;

/// Kinematics module - Denavit-Hartenberg chains, forward and inverse kinematics
pub mod kinematics;

/// Motion interpolator - rate limited, collision checked joint motion
pub mod motion;

/// Executable parameters
pub mod params;

/// Servo module - joint actuator calibration
pub mod servo;

/// Telecommand processor - dispatches telecommands to the modules
pub mod tc_processor;
