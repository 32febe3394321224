//! # resticmon Adapter Layer
//!
//! External system integrations (Hexagonal Architecture adapters).
//!
//! ## Structure
//!
//! - `config` - Inbound: the YAML repository configuration
//! - `restic/` - Outbound: the restic command-line backup engine
//! - `clock` - Wall-clock reading and restic time parsing

pub mod clock;
pub mod config;
pub mod restic;

pub use config::{Config, ConfigError};
pub use restic::{ResticCli, SystemRunner};
