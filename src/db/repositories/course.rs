use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};

use super::{class, public_id};
use crate::db::now_timestamp;
use crate::domain::EntityKind;
use crate::entities::{classes, courses, prelude::*};
use crate::models::{CourseInput, non_empty};

pub struct CourseRepository {
    conn: DatabaseConnection,
}

impl CourseRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn list(&self) -> Result<Vec<courses::Model>> {
        Courses::find()
            .order_by_desc(courses::Column::UpdatedAt)
            .order_by_desc(courses::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list courses")
    }

    pub async fn find(&self, public_id: &str) -> Result<Option<courses::Model>> {
        Courses::find()
            .filter(courses::Column::PublicId.eq(public_id))
            .one(&self.conn)
            .await
            .context("Failed to query course")
    }

    pub async fn create(&self, input: &CourseInput) -> Result<courses::Model> {
        let txn = self.conn.begin().await?;
        let public_id =
            public_id::allocate(&txn, EntityKind::Course.public_id_prefix()).await?;
        let now = now_timestamp();

        let model = courses::ActiveModel {
            public_id: Set(public_id),
            name: Set(non_empty(input.name.as_ref()).unwrap_or_default()),
            price: Set(input.price.unwrap_or(0.0)),
            description: Set(non_empty(input.description.as_ref())),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .context("Failed to insert course")?;

        txn.commit().await?;
        Ok(model)
    }

    pub async fn update(
        &self,
        existing: courses::Model,
        input: &CourseInput,
    ) -> Result<courses::Model> {
        let mut active: courses::ActiveModel = existing.into();

        if let Some(name) = non_empty(input.name.as_ref()) {
            active.name = Set(name);
        }
        if let Some(price) = input.price {
            active.price = Set(price);
        }
        if let Some(description) = non_empty(input.description.as_ref()) {
            active.description = Set(Some(description));
        }
        active.updated_at = Set(now_timestamp());

        active
            .update(&self.conn)
            .await
            .context("Failed to update course")
    }

    /// Deletes the course together with every class under it and all of
    /// their rows. Either everything goes or nothing does.
    pub async fn delete_cascade(&self, course_id: i32) -> Result<()> {
        let txn = self.conn.begin().await?;

        let class_ids: Vec<i32> = Classes::find()
            .select_only()
            .column(classes::Column::Id)
            .filter(classes::Column::CourseId.eq(course_id))
            .into_tuple()
            .all(&txn)
            .await
            .context("Failed to list classes for course")?;

        for class_id in class_ids {
            class::delete_class_rows(&txn, class_id).await?;
        }

        Courses::delete_by_id(course_id)
            .exec(&txn)
            .await
            .context("Failed to delete course")?;

        txn.commit().await?;
        Ok(())
    }
}
