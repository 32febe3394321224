//! Domain Services - Decision logic that spans several models
//!
//! Both services are pure functions of their inputs: no I/O, no clocks.

pub mod age_policy;
pub mod monitoring;
