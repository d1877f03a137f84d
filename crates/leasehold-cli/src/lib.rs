//! Leasehold command line front end
//!
//! Wires configuration, logging and a database-backed `LockManager` together
//! so locks can be taken and dropped from shell scripts and cron jobs.

pub mod cli;
pub mod commands;
pub mod config;
pub mod logging;

/// Exit code when the lock operation itself was refused
pub const EXIT_REFUSED: u8 = 1;

/// Exit code for configuration, connection and migration errors
pub const EXIT_ERROR: u8 = 2;
