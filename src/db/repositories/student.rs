use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};

use super::public_id;
use crate::db::now_timestamp;
use crate::domain::EntityKind;
use crate::entities::{class_students, prelude::*, student_invoices, students};
use crate::models::{StudentInput, non_empty};

pub struct StudentRepository {
    conn: DatabaseConnection,
}

impl StudentRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn list(&self) -> Result<Vec<students::Model>> {
        Students::find()
            .order_by_desc(students::Column::CreatedAt)
            .order_by_desc(students::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list students")
    }

    pub async fn find(&self, public_id: &str) -> Result<Option<students::Model>> {
        Students::find()
            .filter(students::Column::PublicId.eq(public_id))
            .one(&self.conn)
            .await
            .context("Failed to query student")
    }

    pub async fn find_many(&self, public_ids: &[String]) -> Result<Vec<students::Model>> {
        if public_ids.is_empty() {
            return Ok(Vec::new());
        }
        Students::find()
            .filter(students::Column::PublicId.is_in(public_ids.to_vec()))
            .all(&self.conn)
            .await
            .context("Failed to query students")
    }

    pub async fn create(&self, input: &StudentInput) -> Result<students::Model> {
        let txn = self.conn.begin().await?;
        let public_id = public_id::allocate(&txn, EntityKind::Student.public_id_prefix()).await?;
        let now = now_timestamp();

        let model = students::ActiveModel {
            public_id: Set(public_id),
            first_name: Set(non_empty(input.first_name.as_ref()).unwrap_or_default()),
            last_name: Set(non_empty(input.last_name.as_ref()).unwrap_or_default()),
            national_id: Set(non_empty(input.national_id.as_ref())),
            phone: Set(non_empty(input.phone.as_ref())),
            address: Set(non_empty(input.address.as_ref())),
            age: Set(input.age),
            registration_date: Set(non_empty(input.registration_date.as_ref())),
            notes: Set(non_empty(input.notes.as_ref())),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .context("Failed to insert student")?;

        txn.commit().await?;
        Ok(model)
    }

    pub async fn update(
        &self,
        existing: students::Model,
        input: &StudentInput,
    ) -> Result<students::Model> {
        let mut active: students::ActiveModel = existing.into();

        if let Some(v) = non_empty(input.first_name.as_ref()) {
            active.first_name = Set(v);
        }
        if let Some(v) = non_empty(input.last_name.as_ref()) {
            active.last_name = Set(v);
        }
        if let Some(v) = non_empty(input.national_id.as_ref()) {
            active.national_id = Set(Some(v));
        }
        if let Some(v) = non_empty(input.phone.as_ref()) {
            active.phone = Set(Some(v));
        }
        if let Some(v) = non_empty(input.address.as_ref()) {
            active.address = Set(Some(v));
        }
        if let Some(age) = input.age {
            active.age = Set(Some(age));
        }
        if let Some(v) = non_empty(input.registration_date.as_ref()) {
            active.registration_date = Set(Some(v));
        }
        if let Some(v) = non_empty(input.notes.as_ref()) {
            active.notes = Set(Some(v));
        }
        active.updated_at = Set(now_timestamp());

        active
            .update(&self.conn)
            .await
            .context("Failed to update student")
    }

    /// Drops enrollments and invoices before the student row.
    pub async fn delete_cascade(&self, student_id: i32) -> Result<()> {
        let txn = self.conn.begin().await?;

        ClassStudents::delete_many()
            .filter(class_students::Column::StudentId.eq(student_id))
            .exec(&txn)
            .await
            .context("Failed to delete student enrollments")?;

        StudentInvoices::delete_many()
            .filter(student_invoices::Column::StudentId.eq(student_id))
            .exec(&txn)
            .await
            .context("Failed to delete student invoices")?;

        Students::delete_by_id(student_id)
            .exec(&txn)
            .await
            .context("Failed to delete student")?;

        txn.commit().await?;
        Ok(())
    }
}
