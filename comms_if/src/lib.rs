//! # Communications interface crate.
//!
//! Provides all common communications interfaces for the software: the
//! telecommand definitions, the servo controller wire protocol and the serial
//! transport the protocol is carried over.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

pub mod tc;

/// Command and response definitions for equipment (the servo controller board)
pub mod eqpt;

/// Serial transport abstraction and port management
pub mod serial;
