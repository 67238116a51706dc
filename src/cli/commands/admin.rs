//! Admin account command handlers

use anyhow::{Context, bail};

use crate::config::Config;
use crate::constants::limits::PASSWORD_MIN_LENGTH;
use crate::db::repositories::admin::{NewAdmin, hash_password};
use crate::db::{Store, is_unique_violation};
use crate::domain::AdminStatus;
use crate::entities::admins;
use crate::services::step_up::pin_meets_policy;

async fn find_admin(store: &Store, username: &str) -> anyhow::Result<admins::Model> {
    store
        .admin_repo()
        .find_by_username(username)
        .await?
        .with_context(|| format!("No admin named '{username}'"))
}

pub async fn cmd_admin_list(config: &Config) -> anyhow::Result<()> {
    let store = Store::new(&config.general.database_path).await?;
    let admins = store.admin_repo().list_all().await?;

    println!("Admins ({} total)", admins.len());
    println!("{:-<70}", "");

    for admin in admins {
        let pin = if admin.management_pin_hash.is_some_and(|h| !h.is_empty()) {
            "pin"
        } else {
            "no pin"
        };
        let locked = admin.locked_until.as_deref().map_or(String::new(), |until| {
            format!(" | locked until {until}")
        });
        println!(
            "{:<8} {:<20} {:<30} [{}, {}]{}",
            admin.public_id, admin.username, admin.email, admin.status, pin, locked
        );
    }

    Ok(())
}

pub async fn cmd_admin_create(
    config: &Config,
    username: &str,
    email: &str,
    name: Option<&str>,
    password: &str,
) -> anyhow::Result<()> {
    if password.chars().count() < PASSWORD_MIN_LENGTH {
        bail!("Password must be at least {PASSWORD_MIN_LENGTH} characters");
    }

    let store = Store::new(&config.general.database_path).await?;
    let password_hash = hash_password(password, Some(&config.security))?;

    let created = store
        .admin_repo()
        .create(NewAdmin {
            username: username.trim().to_string(),
            name: name.unwrap_or(username).trim().to_string(),
            email: email.trim().to_string(),
            password_hash,
            status: AdminStatus::Active.as_str().to_string(),
        })
        .await;

    match created {
        Ok(admin) => {
            println!("✓ Created admin {} ({})", admin.username, admin.public_id);
            Ok(())
        }
        Err(e) if is_unique_violation(&e) => {
            bail!("An admin with that username or email already exists")
        }
        Err(e) => Err(e),
    }
}

pub async fn cmd_admin_set_pin(config: &Config, username: &str, pin: &str) -> anyhow::Result<()> {
    if !pin_meets_policy(pin, config.security.pin_min_length) {
        bail!(
            "PIN must be at least {} characters",
            config.security.pin_min_length
        );
    }

    let store = Store::new(&config.general.database_path).await?;
    let admin = find_admin(&store, username).await?;

    let hash = hash_password(pin, Some(&config.security))?;
    store.admin_repo().set_pin_hash(admin.id, hash).await?;

    println!("✓ Management PIN updated for {}", admin.username);
    Ok(())
}

pub async fn cmd_admin_reset_password(
    config: &Config,
    username: &str,
    password: &str,
) -> anyhow::Result<()> {
    if password.chars().count() < PASSWORD_MIN_LENGTH {
        bail!("Password must be at least {PASSWORD_MIN_LENGTH} characters");
    }

    let store = Store::new(&config.general.database_path).await?;
    let admin = find_admin(&store, username).await?;

    let hash = hash_password(password, Some(&config.security))?;
    let repo = store.admin_repo();
    repo.set_password_hash(admin.id, hash).await?;
    repo.reset_failures(admin.id).await?;

    println!("✓ Password reset for {}", admin.username);
    Ok(())
}

pub async fn cmd_admin_approve(config: &Config, username: &str) -> anyhow::Result<()> {
    let store = Store::new(&config.general.database_path).await?;
    let admin = find_admin(&store, username).await?;

    if AdminStatus::parse(&admin.status) == AdminStatus::Active {
        println!("{} is already active", admin.username);
        return Ok(());
    }

    store
        .admin_repo()
        .set_status(admin.id, AdminStatus::Active.as_str())
        .await?;

    println!("✓ Approved {}", admin.username);
    Ok(())
}
