//! Command line arguments

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Leasehold lock table client
#[derive(Debug, Parser)]
#[command(name = "leasehold", version, about)]
pub struct Cli {
    /// Configuration file (defaults to conf/leasehold.yml when present)
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    #[arg(long = "db-url", env = "DATABASE_URL", global = true)]
    pub database_url: Option<String>,

    #[arg(long = "log-level", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Apply (or roll back) the lock table schema
    Migrate {
        /// Roll back every migration
        #[arg(long, conflicts_with_all = ["fresh", "status"])]
        down: bool,
        /// Drop all tables and re-apply
        #[arg(long, conflicts_with = "status")]
        fresh: bool,
        /// Print migration status only
        #[arg(long)]
        status: bool,
    },

    /// Try to take a lock; exits 1 if it is held by someone else
    Acquire {
        #[arg(short, long)]
        key: String,
        /// Lock holder identity (defaults to this host's name)
        #[arg(short, long)]
        owner: Option<String>,
        /// Lease duration in seconds (defaults to lock.default_ttl_seconds)
        #[arg(short, long, allow_negative_numbers = true)]
        ttl: Option<i64>,
    },

    /// Release a lock; exits 1 if it is held by someone else
    Release {
        #[arg(short, long)]
        key: String,
        #[arg(short, long)]
        owner: Option<String>,
    },

    /// Verify the database is reachable and migrated
    Check,
}
