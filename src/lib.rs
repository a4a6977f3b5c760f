//! car-scanner library crate.
//!
//! Camera capture and file upload feed one canonical image payload, which is
//! sent to a vehicle recognition service. [`scan::ScanStateMachine`] owns the
//! workflow; everything else is a collaborator it drives.

pub mod camera;
pub mod config;
pub mod payload;
pub mod recognition;
pub mod scan;
