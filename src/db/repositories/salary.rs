use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use std::collections::HashMap;

use super::public_id;
use crate::db::now_timestamp;
use crate::domain::{EntityKind, PaymentStatus};
use crate::entities::{classes, prelude::*, professors, salary_statements};
use crate::models::{Salary, SalaryInput, current_month, non_empty};

pub struct SalaryRepository {
    conn: DatabaseConnection,
}

impl SalaryRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn list(&self) -> Result<Vec<Salary>> {
        let rows = SalaryStatements::find()
            .order_by_desc(salary_statements::Column::CreatedAt)
            .order_by_desc(salary_statements::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list salary statements")?;

        self.project(rows).await
    }

    pub async fn find(&self, public_id: &str) -> Result<Option<salary_statements::Model>> {
        SalaryStatements::find()
            .filter(salary_statements::Column::PublicId.eq(public_id))
            .one(&self.conn)
            .await
            .context("Failed to query salary statement")
    }

    pub async fn project_one(&self, row: salary_statements::Model) -> Result<Salary> {
        self.project(vec![row])
            .await?
            .pop()
            .ok_or_else(|| anyhow::anyhow!("Salary projection came back empty"))
    }

    pub async fn create(
        &self,
        professor_id: i32,
        class_id: Option<i32>,
        input: &SalaryInput,
        admin_id: i32,
    ) -> Result<salary_statements::Model> {
        let txn = self.conn.begin().await?;
        let public_id = public_id::allocate(&txn, EntityKind::Salary.public_id_prefix()).await?;
        let now = now_timestamp();

        let base = input.base_amount.unwrap_or(0.0);
        let advances = input.advances.unwrap_or(0.0);
        let paid_amount = input.paid_amount.unwrap_or(0.0);
        let status = non_empty(input.status.as_ref()).unwrap_or_else(|| PaymentStatus::Due.as_str().to_string());
        let paid = status == PaymentStatus::Paid.as_str();

        let model = salary_statements::ActiveModel {
            public_id: Set(public_id),
            professor_id: Set(professor_id),
            class_id: Set(class_id),
            pay_month: Set(non_empty(input.pay_month.as_ref()).unwrap_or_else(current_month)),
            base_amount: Set(base),
            advances: Set(advances),
            paid_amount: Set(paid_amount),
            balance: Set(balance(base, advances, paid_amount)),
            status: Set(status),
            notes: Set(non_empty(input.notes.as_ref())),
            confirmed_at: Set(paid.then(|| now.clone())),
            confirmed_by: Set(paid.then_some(admin_id)),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .context("Failed to insert salary statement")?;

        txn.commit().await?;
        Ok(model)
    }

    /// Partial update. The balance is always recomputed from the merged
    /// amounts.
    pub async fn update(
        &self,
        existing: salary_statements::Model,
        class_id: Option<i32>,
        input: &SalaryInput,
        admin_id: i32,
    ) -> Result<salary_statements::Model> {
        let now = now_timestamp();
        let base = input.base_amount.unwrap_or(existing.base_amount);
        let advances = input.advances.unwrap_or(existing.advances);
        let paid_amount = input.paid_amount.unwrap_or(existing.paid_amount);

        let mut active: salary_statements::ActiveModel = existing.into();

        if let Some(class_id) = class_id {
            active.class_id = Set(Some(class_id));
        }
        if let Some(month) = non_empty(input.pay_month.as_ref()) {
            active.pay_month = Set(month);
        }
        if let Some(notes) = non_empty(input.notes.as_ref()) {
            active.notes = Set(Some(notes));
        }
        if let Some(status) = non_empty(input.status.as_ref()) {
            if status == PaymentStatus::Paid.as_str() {
                active.confirmed_at = Set(Some(now.clone()));
                active.confirmed_by = Set(Some(admin_id));
            }
            active.status = Set(status);
        }
        active.base_amount = Set(base);
        active.advances = Set(advances);
        active.paid_amount = Set(paid_amount);
        active.balance = Set(balance(base, advances, paid_amount));
        active.updated_at = Set(now);

        active
            .update(&self.conn)
            .await
            .context("Failed to update salary statement")
    }

    pub async fn delete(&self, salary_id: i32) -> Result<()> {
        SalaryStatements::delete_by_id(salary_id)
            .exec(&self.conn)
            .await
            .context("Failed to delete salary statement")?;
        Ok(())
    }

    async fn project(&self, rows: Vec<salary_statements::Model>) -> Result<Vec<Salary>> {
        let professor_ids: Vec<i32> = rows.iter().map(|r| r.professor_id).collect();
        let class_ids: Vec<i32> = rows.iter().filter_map(|r| r.class_id).collect();

        let professor_refs: HashMap<i32, String> = Professors::find()
            .select_only()
            .column(professors::Column::Id)
            .column(professors::Column::PublicId)
            .filter(professors::Column::Id.is_in(professor_ids))
            .into_tuple::<(i32, String)>()
            .all(&self.conn)
            .await
            .context("Failed to resolve salary professors")?
            .into_iter()
            .collect();

        let class_refs: HashMap<i32, String> = Classes::find()
            .select_only()
            .column(classes::Column::Id)
            .column(classes::Column::PublicId)
            .filter(classes::Column::Id.is_in(class_ids))
            .into_tuple::<(i32, String)>()
            .all(&self.conn)
            .await
            .context("Failed to resolve salary classes")?
            .into_iter()
            .collect();

        Ok(rows
            .into_iter()
            .map(|row| Salary {
                professor_public_id: professor_refs.get(&row.professor_id).cloned(),
                class_public_id: row.class_id.and_then(|id| class_refs.get(&id).cloned()),
                public_id: row.public_id,
                pay_month: row.pay_month,
                base_amount: row.base_amount,
                advances: row.advances,
                paid_amount: row.paid_amount,
                balance: row.balance,
                status: row.status,
                notes: row.notes,
                confirmed_at: row.confirmed_at,
                created_at: row.created_at,
                updated_at: row.updated_at,
            })
            .collect())
    }
}

#[must_use]
pub fn balance(base: f64, advances: f64, paid: f64) -> f64 {
    base - advances - paid
}
