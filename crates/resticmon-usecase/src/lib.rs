//! # resticmon Use Case Layer
//!
//! Application-specific flows: one per CLI action.
//! This layer orchestrates the flow of data between the domain and the
//! backup-engine adapter.

pub mod dispatcher;
pub mod report;

pub use resticmon_domain;

pub use dispatcher::{Action, DispatchOptions, Dispatcher};
pub use report::{
    ActionDetail, ActionReport, CheckReport, DispatchReport, Outcome, PruneSummary,
    ACTION_FAILURE_EXIT_CODE,
};
