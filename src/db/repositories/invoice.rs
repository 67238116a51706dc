use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use std::collections::HashMap;

use super::public_id;
use crate::db::now_timestamp;
use crate::domain::{EntityKind, PaymentStatus};
use crate::entities::{classes, prelude::*, student_invoices, students};
use crate::models::{Invoice, InvoiceInput, current_month, non_empty};

pub struct InvoiceRepository {
    conn: DatabaseConnection,
}

impl InvoiceRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn list(&self) -> Result<Vec<Invoice>> {
        let rows = StudentInvoices::find()
            .order_by_desc(student_invoices::Column::CreatedAt)
            .order_by_desc(student_invoices::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list invoices")?;

        project(&self.conn, rows).await
    }

    pub async fn find(&self, public_id: &str) -> Result<Option<student_invoices::Model>> {
        StudentInvoices::find()
            .filter(student_invoices::Column::PublicId.eq(public_id))
            .one(&self.conn)
            .await
            .context("Failed to query invoice")
    }

    pub async fn project_one(&self, row: student_invoices::Model) -> Result<Invoice> {
        project(&self.conn, vec![row])
            .await?
            .pop()
            .ok_or_else(|| anyhow::anyhow!("Invoice projection came back empty"))
    }

    pub async fn create(
        &self,
        class_id: i32,
        student_id: i32,
        input: &InvoiceInput,
        admin_id: i32,
    ) -> Result<student_invoices::Model> {
        let txn = self.conn.begin().await?;
        let public_id = public_id::allocate(&txn, EntityKind::Invoice.public_id_prefix()).await?;
        let now = now_timestamp();
        let status = non_empty(input.status.as_ref()).unwrap_or_else(|| PaymentStatus::Due.as_str().to_string());
        let paid = status == PaymentStatus::Paid.as_str();

        let model = student_invoices::ActiveModel {
            public_id: Set(public_id),
            class_id: Set(class_id),
            student_id: Set(student_id),
            plan_month: Set(non_empty(input.plan_month.as_ref()).unwrap_or_else(current_month)),
            due_amount: Set(input.due_amount.unwrap_or(0.0)),
            paid_amount: Set(input.paid_amount.unwrap_or(0.0)),
            status: Set(status),
            tax: Set(non_empty(input.tax.as_ref()).unwrap_or_else(|| "none".to_string())),
            notes: Set(non_empty(input.notes.as_ref())),
            confirmed_at: Set(paid.then(|| now.clone())),
            confirmed_by: Set(paid.then_some(admin_id)),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .context("Failed to insert invoice")?;

        txn.commit().await?;
        Ok(model)
    }

    /// Partial update. Moving to `paid` stamps the confirming admin.
    pub async fn update(
        &self,
        existing: student_invoices::Model,
        refs: (Option<i32>, Option<i32>),
        input: &InvoiceInput,
        admin_id: i32,
    ) -> Result<student_invoices::Model> {
        let now = now_timestamp();
        let (class_id, student_id) = refs;
        let mut active: student_invoices::ActiveModel = existing.into();

        if let Some(class_id) = class_id {
            active.class_id = Set(class_id);
        }
        if let Some(student_id) = student_id {
            active.student_id = Set(student_id);
        }
        if let Some(month) = non_empty(input.plan_month.as_ref()) {
            active.plan_month = Set(month);
        }
        if let Some(due) = input.due_amount {
            active.due_amount = Set(due);
        }
        if let Some(paid) = input.paid_amount {
            active.paid_amount = Set(paid);
        }
        if let Some(tax) = non_empty(input.tax.as_ref()) {
            active.tax = Set(tax);
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
        active.updated_at = Set(now);

        active
            .update(&self.conn)
            .await
            .context("Failed to update invoice")
    }

    pub async fn delete(&self, invoice_id: i32) -> Result<()> {
        StudentInvoices::delete_by_id(invoice_id)
            .exec(&self.conn)
            .await
            .context("Failed to delete invoice")?;
        Ok(())
    }
}

/// Resolves class and student public IDs for a batch of invoice rows.
pub(crate) async fn project<C>(db: &C, rows: Vec<student_invoices::Model>) -> Result<Vec<Invoice>>
where
    C: ConnectionTrait,
{
    let class_ids: Vec<i32> = rows.iter().map(|r| r.class_id).collect();
    let student_ids: Vec<i32> = rows.iter().map(|r| r.student_id).collect();

    let class_refs: HashMap<i32, String> = Classes::find()
        .select_only()
        .column(classes::Column::Id)
        .column(classes::Column::PublicId)
        .filter(classes::Column::Id.is_in(class_ids))
        .into_tuple::<(i32, String)>()
        .all(db)
        .await
        .context("Failed to resolve invoice classes")?
        .into_iter()
        .collect();

    let student_refs: HashMap<i32, String> = Students::find()
        .select_only()
        .column(students::Column::Id)
        .column(students::Column::PublicId)
        .filter(students::Column::Id.is_in(student_ids))
        .into_tuple::<(i32, String)>()
        .all(db)
        .await
        .context("Failed to resolve invoice students")?
        .into_iter()
        .collect();

    Ok(rows
        .into_iter()
        .map(|row| Invoice {
            class_public_id: class_refs.get(&row.class_id).cloned(),
            student_public_id: student_refs.get(&row.student_id).cloned(),
            public_id: row.public_id,
            plan_month: row.plan_month,
            due_amount: row.due_amount,
            paid_amount: row.paid_amount,
            status: row.status,
            tax: row.tax,
            notes: row.notes,
            confirmed_at: row.confirmed_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
        .collect())
}
