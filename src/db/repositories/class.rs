use anyhow::{Context, Result};
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use std::collections::HashMap;

use super::{invoice, public_id};
use crate::db::now_timestamp;
use crate::domain::EntityKind;
use crate::entities::{
    class_payment_plan, class_professors, class_students, classes, courses, prelude::*,
    professors, salary_statements, student_invoices, students,
};
use crate::models::{
    Class, ClassInput, ClassProfessor, ClassStudent, PaymentPlanEntry, non_empty, today,
};

/// Roster and plan changes resolved from public IDs by the caller.
#[derive(Debug, Clone, Default)]
pub struct ClassLinks {
    pub add_professors: Vec<professors::Model>,
    pub add_students: Vec<students::Model>,
    pub remove_professor_ids: Vec<i32>,
    pub remove_student_ids: Vec<i32>,
    pub payment_plan: Option<Vec<PaymentPlanEntry>>,
}

pub struct ClassRepository {
    conn: DatabaseConnection,
}

impl ClassRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn list(&self) -> Result<Vec<classes::Model>> {
        Classes::find()
            .order_by_desc(classes::Column::CreatedAt)
            .order_by_desc(classes::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list classes")
    }

    pub async fn find(&self, public_id: &str) -> Result<Option<classes::Model>> {
        Classes::find()
            .filter(classes::Column::PublicId.eq(public_id))
            .one(&self.conn)
            .await
            .context("Failed to query class")
    }

    pub async fn create(
        &self,
        course_id: i32,
        input: &ClassInput,
        links: ClassLinks,
    ) -> Result<classes::Model> {
        let txn = self.conn.begin().await?;
        let public_id = public_id::allocate(&txn, EntityKind::Class.public_id_prefix()).await?;
        let now = now_timestamp();

        let class = classes::ActiveModel {
            public_id: Set(public_id),
            course_id: Set(course_id),
            name: Set(non_empty(input.name.as_ref()).unwrap_or_default()),
            level: Set(non_empty(input.level.as_ref())),
            start_date: Set(non_empty(input.start_date.as_ref())),
            end_date: Set(non_empty(input.end_date.as_ref())),
            schedule: Set(input.schedule.clone()),
            monthly_price: Set(input.monthly_price.unwrap_or(0.0)),
            professor_class_pay: Set(input.professor_class_pay.unwrap_or(0.0)),
            description: Set(non_empty(input.description.as_ref())),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .context("Failed to insert class")?;

        apply_links(&txn, &class, links).await?;

        txn.commit().await?;
        Ok(class)
    }

    /// Applies the non-blank fields of `input` and the roster changes in one
    /// transaction.
    pub async fn update(
        &self,
        existing: classes::Model,
        course_id: Option<i32>,
        input: &ClassInput,
        links: ClassLinks,
    ) -> Result<classes::Model> {
        let txn = self.conn.begin().await?;
        let mut active: classes::ActiveModel = existing.into();

        if let Some(course_id) = course_id {
            active.course_id = Set(course_id);
        }
        if let Some(name) = non_empty(input.name.as_ref()) {
            active.name = Set(name);
        }
        if let Some(level) = non_empty(input.level.as_ref()) {
            active.level = Set(Some(level));
        }
        if let Some(start_date) = non_empty(input.start_date.as_ref()) {
            active.start_date = Set(Some(start_date));
        }
        if let Some(end_date) = non_empty(input.end_date.as_ref()) {
            active.end_date = Set(Some(end_date));
        }
        if let Some(schedule) = &input.schedule {
            active.schedule = Set(Some(schedule.clone()));
        }
        if let Some(monthly_price) = input.monthly_price {
            active.monthly_price = Set(monthly_price);
        }
        if let Some(pay) = input.professor_class_pay {
            active.professor_class_pay = Set(pay);
        }
        if let Some(description) = non_empty(input.description.as_ref()) {
            active.description = Set(Some(description));
        }
        active.updated_at = Set(now_timestamp());

        let class = active.update(&txn).await.context("Failed to update class")?;

        if !links.remove_professor_ids.is_empty() {
            ClassProfessors::delete_many()
                .filter(class_professors::Column::ClassId.eq(class.id))
                .filter(class_professors::Column::ProfessorId.is_in(links.remove_professor_ids.clone()))
                .exec(&txn)
                .await
                .context("Failed to detach professors")?;
        }

        if !links.remove_student_ids.is_empty() {
            ClassStudents::delete_many()
                .filter(class_students::Column::ClassId.eq(class.id))
                .filter(class_students::Column::StudentId.is_in(links.remove_student_ids.clone()))
                .exec(&txn)
                .await
                .context("Failed to unenroll students")?;
        }

        apply_links(&txn, &class, links).await?;

        txn.commit().await?;
        Ok(class)
    }

    pub async fn delete_cascade(&self, class_id: i32) -> Result<()> {
        let txn = self.conn.begin().await?;
        delete_class_rows(&txn, class_id).await?;
        txn.commit().await?;
        Ok(())
    }

    /// Builds the full projection for each class.
    pub async fn hydrate_all(&self, rows: Vec<classes::Model>) -> Result<Vec<Class>> {
        let mut hydrated = Vec::with_capacity(rows.len());
        for row in rows {
            hydrated.push(self.hydrate(row).await?);
        }
        Ok(hydrated)
    }

    pub async fn hydrate(&self, class: classes::Model) -> Result<Class> {
        let course = Courses::find_by_id(class.course_id)
            .one(&self.conn)
            .await
            .context("Failed to load class course")?;

        let professor_links = ClassProfessors::find()
            .filter(class_professors::Column::ClassId.eq(class.id))
            .order_by_asc(class_professors::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to load class professors")?;
        let professor_rows: HashMap<i32, professors::Model> = Professors::find()
            .filter(
                professors::Column::Id
                    .is_in(professor_links.iter().map(|l| l.professor_id).collect::<Vec<_>>()),
            )
            .all(&self.conn)
            .await
            .context("Failed to load professors")?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let student_links = ClassStudents::find()
            .filter(class_students::Column::ClassId.eq(class.id))
            .order_by_asc(class_students::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to load class students")?;
        let student_rows: HashMap<i32, students::Model> = Students::find()
            .filter(
                students::Column::Id
                    .is_in(student_links.iter().map(|l| l.student_id).collect::<Vec<_>>()),
            )
            .all(&self.conn)
            .await
            .context("Failed to load students")?
            .into_iter()
            .map(|s| (s.id, s))
            .collect();

        let payment_plan = ClassPaymentPlan::find()
            .filter(class_payment_plan::Column::ClassId.eq(class.id))
            .order_by_asc(class_payment_plan::Column::PlanMonth)
            .all(&self.conn)
            .await
            .context("Failed to load payment plan")?
            .into_iter()
            .map(|p| PaymentPlanEntry {
                plan_month: p.plan_month,
                due_amount: p.due_amount,
                due_date: p.due_date,
                notes: p.notes,
            })
            .collect();

        let invoice_rows = StudentInvoices::find()
            .filter(student_invoices::Column::ClassId.eq(class.id))
            .order_by_desc(student_invoices::Column::CreatedAt)
            .all(&self.conn)
            .await
            .context("Failed to load class invoices")?;
        let invoices = invoice::project(&self.conn, invoice_rows).await?;

        let professors = professor_links
            .into_iter()
            .filter_map(|link| {
                professor_rows.get(&link.professor_id).map(|p| ClassProfessor {
                    public_id: p.public_id.clone(),
                    first_name: p.first_name.clone(),
                    last_name: p.last_name.clone(),
                    pay_amount: link.pay_amount,
                })
            })
            .collect();

        let students = student_links
            .into_iter()
            .filter_map(|link| {
                student_rows.get(&link.student_id).map(|s| ClassStudent {
                    public_id: s.public_id.clone(),
                    first_name: s.first_name.clone(),
                    last_name: s.last_name.clone(),
                    monthly_fee: link.monthly_fee,
                    status: link.status,
                    join_date: link.join_date,
                })
            })
            .collect();

        let (course_public_id, course_name) = course
            .map(|c: courses::Model| (Some(c.public_id), Some(c.name)))
            .unwrap_or_default();

        Ok(Class {
            public_id: class.public_id,
            course_public_id,
            course_name,
            name: class.name,
            level: class.level,
            start_date: class.start_date,
            end_date: class.end_date,
            schedule: class.schedule,
            monthly_price: class.monthly_price,
            professor_class_pay: class.professor_class_pay,
            description: class.description,
            professors,
            students,
            payment_plan,
            invoices,
            created_at: class.created_at,
            updated_at: class.updated_at,
        })
    }
}

/// Attaches professors and students (existing pairs are left alone) and
/// replaces the payment plan when one is given.
async fn apply_links<C>(db: &C, class: &classes::Model, links: ClassLinks) -> Result<()>
where
    C: ConnectionTrait,
{
    for professor in links.add_professors {
        let pay_amount = (professor.salary_type != "fixed").then_some(class.professor_class_pay);

        ClassProfessors::insert(class_professors::ActiveModel {
            class_id: Set(class.id),
            professor_id: Set(professor.id),
            pay_amount: Set(pay_amount),
            ..Default::default()
        })
        .on_conflict(
            OnConflict::columns([
                class_professors::Column::ClassId,
                class_professors::Column::ProfessorId,
            ])
            .do_nothing()
            .to_owned(),
        )
        .exec_without_returning(db)
        .await
        .context("Failed to attach professor")?;
    }

    for student in links.add_students {
        ClassStudents::insert(class_students::ActiveModel {
            class_id: Set(class.id),
            student_id: Set(student.id),
            join_date: Set(today()),
            status: Set("active".to_string()),
            monthly_fee: Set(class.monthly_price),
            ..Default::default()
        })
        .on_conflict(
            OnConflict::columns([
                class_students::Column::ClassId,
                class_students::Column::StudentId,
            ])
            .do_nothing()
            .to_owned(),
        )
        .exec_without_returning(db)
        .await
        .context("Failed to enroll student")?;
    }

    if let Some(plan) = links.payment_plan {
        ClassPaymentPlan::delete_many()
            .filter(class_payment_plan::Column::ClassId.eq(class.id))
            .exec(db)
            .await
            .context("Failed to clear payment plan")?;

        for entry in plan {
            ClassPaymentPlan::insert(class_payment_plan::ActiveModel {
                class_id: Set(class.id),
                plan_month: Set(entry.plan_month),
                due_amount: Set(entry.due_amount),
                due_date: Set(entry.due_date),
                notes: Set(entry.notes),
                ..Default::default()
            })
            .on_conflict(
                OnConflict::columns([
                    class_payment_plan::Column::ClassId,
                    class_payment_plan::Column::PlanMonth,
                ])
                .update_columns([
                    class_payment_plan::Column::DueAmount,
                    class_payment_plan::Column::DueDate,
                    class_payment_plan::Column::Notes,
                ])
                .to_owned(),
            )
            .exec_without_returning(db)
            .await
            .context("Failed to insert payment plan entry")?;
        }
    }

    Ok(())
}

/// Removes a class and everything hanging off it. Runs on the caller's
/// transaction so course deletion can reuse it.
pub(crate) async fn delete_class_rows<C>(db: &C, class_id: i32) -> Result<()>
where
    C: ConnectionTrait,
{
    ClassStudents::delete_many()
        .filter(class_students::Column::ClassId.eq(class_id))
        .exec(db)
        .await
        .context("Failed to delete class enrollments")?;

    ClassProfessors::delete_many()
        .filter(class_professors::Column::ClassId.eq(class_id))
        .exec(db)
        .await
        .context("Failed to delete class professors")?;

    StudentInvoices::delete_many()
        .filter(student_invoices::Column::ClassId.eq(class_id))
        .exec(db)
        .await
        .context("Failed to delete class invoices")?;

    ClassPaymentPlan::delete_many()
        .filter(class_payment_plan::Column::ClassId.eq(class_id))
        .exec(db)
        .await
        .context("Failed to delete class payment plan")?;

    SalaryStatements::delete_many()
        .filter(salary_statements::Column::ClassId.eq(class_id))
        .exec(db)
        .await
        .context("Failed to delete class salary statements")?;

    Classes::delete_by_id(class_id)
        .exec(db)
        .await
        .context("Failed to delete class")?;

    Ok(())
}
