//! Seeding of user accounts at startup.
//!
//! Seeding is idempotent: an email that is already registered is left
//! untouched, including its password and role.

use anyhow::Context;
use fhirlite_auth::{User, UserStore, hash_password};
use tracing::info;

use crate::config::SeedUser;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BootstrapStats {
    pub created: usize,
    pub skipped: usize,
}

/// Create every configured user whose email is not yet registered.
///
/// # Errors
///
/// Returns an error if a password cannot be hashed or the store fails.
pub async fn seed_users(store: &dyn UserStore, seeds: &[SeedUser]) -> anyhow::Result<BootstrapStats> {
    let mut stats = BootstrapStats::default();

    for seed in seeds {
        if store.find_by_email(&seed.email).await?.is_some() {
            stats.skipped += 1;
            continue;
        }

        let password = seed.password.clone();
        let hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .context("password hashing task failed")?
            .map_err(|e| anyhow::anyhow!("failed to hash password for {}: {e}", seed.email))?;

        store
            .create(User::new(seed.email.clone(), hash, seed.role))
            .await?;
        info!(user = %seed.email, role = %seed.role, "seeded user");
        stats.created += 1;
    }

    if !seeds.is_empty() {
        info!(
            created = stats.created,
            skipped = stats.skipped,
            "user bootstrap complete"
        );
    }
    Ok(stats)
}
