//! # Equipment Interface
//!
//! This module defines the wire formats exchanged with equipment.

// -----------------------------------------------------------------------------------------------
// MODULES
// -----------------------------------------------------------------------------------------------

/// SSC-32 style servo controller protocol
pub mod ssc;
