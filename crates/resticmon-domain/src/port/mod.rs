//! Port Traits - The "Ports" of Hexagonal Architecture
//!
//! These traits define WHAT the domain needs from the backup engine,
//! but NOT how it's actually done. That's the adapter's job.
//!
//! ```text
//! Domain Layer          │  Adapter Layer
//! ──────────────────────┼────────────────────────
//! trait BackupEngine    │  ResticCli
//!   fn list_snapshots() │  (test doubles in usecase)
//!   fn create_snapshot()│
//! ```

pub mod backup_engine;
