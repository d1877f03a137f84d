//! Leasehold Core - lease-based mutual exclusion keyed by string
//!
//! A `LockManager` turns one row per key in a shared table into a lock that
//! independent processes can contend for. Leases expire on their own; an
//! expired lease is reclaimed by the next caller that wants the key.
//!
//! Expiry is judged against each caller's local clock, so callers are assumed
//! to run with reasonably synchronized clocks.

pub mod manager;
pub mod settings;

pub use manager::LockManager;
pub use settings::{DEFAULT_TTL_SECONDS, LockSettings};
