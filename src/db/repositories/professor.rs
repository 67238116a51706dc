use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};

use super::public_id;
use crate::db::now_timestamp;
use crate::domain::EntityKind;
use crate::entities::{class_professors, prelude::*, professors, salary_statements};
use crate::models::{ProfessorInput, non_empty};

pub struct ProfessorRepository {
    conn: DatabaseConnection,
}

impl ProfessorRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn list(&self) -> Result<Vec<professors::Model>> {
        Professors::find()
            .order_by_desc(professors::Column::CreatedAt)
            .order_by_desc(professors::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list professors")
    }

    pub async fn find(&self, public_id: &str) -> Result<Option<professors::Model>> {
        Professors::find()
            .filter(professors::Column::PublicId.eq(public_id))
            .one(&self.conn)
            .await
            .context("Failed to query professor")
    }

    pub async fn find_many(&self, public_ids: &[String]) -> Result<Vec<professors::Model>> {
        if public_ids.is_empty() {
            return Ok(Vec::new());
        }
        Professors::find()
            .filter(professors::Column::PublicId.is_in(public_ids.to_vec()))
            .all(&self.conn)
            .await
            .context("Failed to query professors")
    }

    pub async fn create(&self, input: &ProfessorInput) -> Result<professors::Model> {
        let txn = self.conn.begin().await?;
        let public_id =
            public_id::allocate(&txn, EntityKind::Professor.public_id_prefix()).await?;
        let now = now_timestamp();

        let model = professors::ActiveModel {
            public_id: Set(public_id),
            first_name: Set(non_empty(input.first_name.as_ref()).unwrap_or_default()),
            last_name: Set(non_empty(input.last_name.as_ref()).unwrap_or_default()),
            national_id: Set(non_empty(input.national_id.as_ref())),
            email: Set(non_empty(input.email.as_ref())),
            phone: Set(non_empty(input.phone.as_ref())),
            address: Set(non_empty(input.address.as_ref())),
            education: Set(non_empty(input.education.as_ref())),
            biography: Set(non_empty(input.biography.as_ref())),
            salary_type: Set(
                non_empty(input.salary_type.as_ref()).unwrap_or_else(|| "fixed".to_string())
            ),
            base_salary: Set(input.base_salary.unwrap_or(0.0)),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .context("Failed to insert professor")?;

        txn.commit().await?;
        Ok(model)
    }

    pub async fn update(
        &self,
        existing: professors::Model,
        input: &ProfessorInput,
    ) -> Result<professors::Model> {
        let mut active: professors::ActiveModel = existing.into();

        if let Some(v) = non_empty(input.first_name.as_ref()) {
            active.first_name = Set(v);
        }
        if let Some(v) = non_empty(input.last_name.as_ref()) {
            active.last_name = Set(v);
        }
        if let Some(v) = non_empty(input.national_id.as_ref()) {
            active.national_id = Set(Some(v));
        }
        if let Some(v) = non_empty(input.email.as_ref()) {
            active.email = Set(Some(v));
        }
        if let Some(v) = non_empty(input.phone.as_ref()) {
            active.phone = Set(Some(v));
        }
        if let Some(v) = non_empty(input.address.as_ref()) {
            active.address = Set(Some(v));
        }
        if let Some(v) = non_empty(input.education.as_ref()) {
            active.education = Set(Some(v));
        }
        if let Some(v) = non_empty(input.biography.as_ref()) {
            active.biography = Set(Some(v));
        }
        if let Some(v) = non_empty(input.salary_type.as_ref()) {
            active.salary_type = Set(v);
        }
        if let Some(salary) = input.base_salary {
            active.base_salary = Set(salary);
        }
        active.updated_at = Set(now_timestamp());

        active
            .update(&self.conn)
            .await
            .context("Failed to update professor")
    }

    /// Drops class assignments and salary statements before the professor.
    pub async fn delete_cascade(&self, professor_id: i32) -> Result<()> {
        let txn = self.conn.begin().await?;

        ClassProfessors::delete_many()
            .filter(class_professors::Column::ProfessorId.eq(professor_id))
            .exec(&txn)
            .await
            .context("Failed to delete professor assignments")?;

        SalaryStatements::delete_many()
            .filter(salary_statements::Column::ProfessorId.eq(professor_id))
            .exec(&txn)
            .await
            .context("Failed to delete professor salary statements")?;

        Professors::delete_by_id(professor_id)
            .exec(&txn)
            .await
            .context("Failed to delete professor")?;

        txn.commit().await?;
        Ok(())
    }
}
