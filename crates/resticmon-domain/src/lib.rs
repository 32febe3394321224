//! # resticmon Domain Layer
//!
//! Pure decision logic for backup repository health, with zero external
//! dependencies.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Domain Layer (This Crate)                     │
//! │  ┌─────────────────────────────────────────────────────────────┐│
//! │  │  model/   - Repositories, snapshots, statuses, verdicts     ││
//! │  │  port/    - BackupEngine trait (not its implementation)     ││
//! │  │  service/ - AgePolicyEngine, monitoring formatter           ││
//! │  └─────────────────────────────────────────────────────────────┘│
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All timestamps handled here live on one wall clock shared by every host
//! that produces or inspects snapshots. Nothing in this crate converts
//! between timezones.

pub mod model;
pub mod port;
pub mod service;

// Re-export commonly used types
pub use model::{
    repository::{AgePolicy, Credential, Endpoint, PolicyError, RepositoryDescriptor, RepositoryLabel},
    snapshot::{SnapshotId, SnapshotRecord, Timestamp, SECONDS_PER_DAY},
    status::Status,
    verdict::AgePolicyVerdict,
};

pub use port::backup_engine::{
    BackupEngine, CollaboratorError, Inventory, Transcript, Verification, VerificationResult,
};

pub use service::age_policy::AgePolicyEngine;
pub use service::monitoring::{format, format_many, MonitoringReport};
