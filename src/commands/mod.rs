//! Top-level command orchestration.
//!
//! [`pack`] drives the whole build pipeline; [`release`] is the optional
//! publish step it hands the finished artifact to.

pub mod pack;
pub mod release;
