//! Domain Models - The vocabulary of resticmon
//!
//! These types name what operators talk about: repositories, snapshots,
//! and the monitoring status derived from them.

pub mod repository;
pub mod snapshot;
pub mod status;
pub mod verdict;
