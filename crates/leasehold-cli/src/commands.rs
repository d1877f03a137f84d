//! Subcommand handlers
//!
//! Each handler returns `Ok(true)` when the operation went through,
//! `Ok(false)` when the lock table refused it, and `Err` for anything that
//! kept the operation from being attempted.

use std::sync::Arc;

use anyhow::Context;
use leasehold_core::LockManager;
use leasehold_migration::{Migrator, MigratorTrait};
use leasehold_persistence::{LockStore, SqlLockStore};
use tracing::info;

use crate::cli::Command;
use crate::config::{Configuration, default_owner};

pub async fn dispatch(configuration: &Configuration, command: Command) -> anyhow::Result<bool> {
    match command {
        Command::Migrate {
            down,
            fresh,
            status,
        } => migrate(configuration, down, fresh, status).await,
        Command::Acquire { key, owner, ttl } => {
            let owner = owner.unwrap_or_else(default_owner);
            let manager = lock_manager(configuration).await?;
            let ttl = ttl.unwrap_or(manager.settings().default_ttl_seconds);

            let acquired = manager.acquire(&key, &owner, ttl).await;
            if acquired {
                println!("acquired {} as {} for {}s", key, owner, ttl);
            } else {
                println!("not acquired {}", key);
            }
            Ok(acquired)
        }
        Command::Release { key, owner } => {
            let owner = owner.unwrap_or_else(default_owner);
            let manager = lock_manager(configuration).await?;

            let released = manager.release(&key, &owner).await;
            if released {
                println!("released {}", key);
            } else {
                println!("not released {}", key);
            }
            Ok(released)
        }
        Command::Check => {
            let store = SqlLockStore::new(configuration.database_connection().await?);
            store
                .health_check()
                .await
                .context("lock table health check failed")?;
            println!("ok ({})", store.storage_mode());
            Ok(true)
        }
    }
}

async fn lock_manager(configuration: &Configuration) -> anyhow::Result<LockManager> {
    let db = configuration.database_connection().await?;
    Ok(LockManager::with_settings(
        Arc::new(SqlLockStore::new(db)),
        configuration.lock_settings(),
    ))
}

async fn migrate(
    configuration: &Configuration,
    down: bool,
    fresh: bool,
    status: bool,
) -> anyhow::Result<bool> {
    let db = configuration.database_connection().await?;

    if status {
        Migrator::status(&db).await?;
    } else if down {
        Migrator::down(&db, None).await?;
        info!("Rolled back lock table migrations");
    } else if fresh {
        Migrator::fresh(&db).await?;
        info!("Recreated lock table");
    } else {
        Migrator::up(&db, None).await?;
        info!("Lock table is up to date");
    }

    Ok(true)
}
