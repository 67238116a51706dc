use anyhow::{Context, Result};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{ConnectionTrait, EntityTrait, Set};

use crate::entities::{prelude::*, public_id_counters};

/// Reserves the next public ID for `prefix`.
///
/// Must run on the connection or transaction that inserts the row using the
/// ID. The counter is bumped by a single upsert, so two writers can never
/// observe the same value: SQLite serializes the write and the caller's
/// transaction holds it until commit.
pub async fn allocate<C>(db: &C, prefix: &str) -> Result<String>
where
    C: ConnectionTrait,
{
    let seed = public_id_counters::ActiveModel {
        prefix: Set(prefix.to_string()),
        last_value: Set(1),
    };

    PublicIdCounters::insert(seed)
        .on_conflict(
            OnConflict::column(public_id_counters::Column::Prefix)
                .value(
                    public_id_counters::Column::LastValue,
                    Expr::col(public_id_counters::Column::LastValue).add(1),
                )
                .to_owned(),
        )
        .exec_without_returning(db)
        .await
        .with_context(|| format!("Failed to bump public ID counter for {prefix}"))?;

    let counter = PublicIdCounters::find_by_id(prefix.to_string())
        .one(db)
        .await
        .context("Failed to read public ID counter")?
        .ok_or_else(|| anyhow::anyhow!("Public ID counter for {prefix} vanished"))?;

    Ok(format!("{prefix}-{}", counter.last_value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Store;
    use sea_orm::TransactionTrait;

    #[tokio::test]
    async fn allocates_sequentially_per_prefix() {
        let store = Store::new("sqlite::memory:").await.unwrap();

        assert_eq!(allocate(&store.conn, "C").await.unwrap(), "C-1");
        assert_eq!(allocate(&store.conn, "C").await.unwrap(), "C-2");
        assert_eq!(allocate(&store.conn, "CL").await.unwrap(), "CL-1");
        assert_eq!(allocate(&store.conn, "C").await.unwrap(), "C-3");
    }

    #[tokio::test]
    async fn rolled_back_allocation_is_reused() {
        let store = Store::new("sqlite::memory:").await.unwrap();

        let txn = store.conn.begin().await.unwrap();
        assert_eq!(allocate(&txn, "S").await.unwrap(), "S-1");
        txn.rollback().await.unwrap();

        assert_eq!(allocate(&store.conn, "S").await.unwrap(), "S-1");
    }

    #[tokio::test]
    async fn continues_after_seeded_admin() {
        let store = Store::new("sqlite::memory:").await.unwrap();
        assert_eq!(allocate(&store.conn, "ADM").await.unwrap(), "ADM-2");
    }
}
