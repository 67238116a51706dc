//! Audit log command handler

use crate::config::Config;
use crate::constants::limits::MAX_AUDIT_LIMIT;
use crate::db::Store;

pub async fn cmd_audit(config: &Config, limit: u64, pin: bool) -> anyhow::Result<()> {
    let store = Store::new(&config.general.database_path).await?;
    let limit = limit.clamp(1, MAX_AUDIT_LIMIT);
    let repo = store.audit_repo();

    if pin {
        let rows = repo.recent_pin_audit(None, limit).await?;
        if rows.is_empty() {
            println!("No PIN verifications recorded.");
            return Ok(());
        }
        for row in rows {
            let outcome = if row.status == "success" { "✓" } else { "✗" };
            println!(
                "{} {} admin={} {}",
                row.created_at, outcome, row.admin_id, row.action_key
            );
        }
        return Ok(());
    }

    let rows = repo.recent_activity(None, limit).await?;
    if rows.is_empty() {
        println!("No activity recorded.");
        return Ok(());
    }
    for row in rows {
        let admin = row.admin_id.map_or("-".to_string(), |id| id.to_string());
        println!(
            "{} [{}] admin={} {}",
            row.created_at, row.action_key, admin, row.description
        );
    }

    Ok(())
}
