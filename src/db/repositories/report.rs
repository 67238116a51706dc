use anyhow::{Context, Result};
use chrono::{Months, NaiveDate};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect,
};
use std::collections::HashMap;

use crate::domain::PaymentStatus;
use crate::entities::{
    classes, courses, prelude::*, salary_statements, student_invoices, students,
};
use crate::models::{
    CourseRevenue, FinancialHistory, OverdueInvoice, ReportRange, ReportSummary,
};

const HISTORY_MONTHS: u32 = 6;
const TOP_COURSES: usize = 5;
const OVERDUE_LIMIT: u64 = 10;

/// Read-only aggregates over invoices, salary statements and students.
pub struct ReportRepository {
    conn: DatabaseConnection,
}

fn settled() -> impl Iterator<Item = &'static str> {
    PaymentStatus::SETTLED.into_iter().map(|s| s.as_str())
}

/// Created or confirmed inside the range.
fn touched_in<C: ColumnTrait>(created: C, confirmed: C, range: &ReportRange) -> Condition {
    let (lo, hi) = (range.lower_bound(), range.upper_bound());
    Condition::any()
        .add(created.gte(lo.clone()).and(created.lt(hi.clone())))
        .add(confirmed.gte(lo).and(confirmed.lt(hi)))
}

impl ReportRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Money received from students: paid amounts on settled invoices.
    pub async fn income(&self, range: &ReportRange) -> Result<f64> {
        let total = StudentInvoices::find()
            .select_only()
            .column_as(Expr::col(student_invoices::Column::PaidAmount).sum(), "total")
            .filter(student_invoices::Column::Status.is_in(settled()))
            .filter(touched_in(
                student_invoices::Column::CreatedAt,
                student_invoices::Column::ConfirmedAt,
                range,
            ))
            .into_tuple::<Option<f64>>()
            .one(&self.conn)
            .await
            .context("Failed to sum income")?;

        Ok(total.flatten().unwrap_or(0.0))
    }

    /// Money paid out to professors: paid amounts on settled statements.
    pub async fn expenses(&self, range: &ReportRange) -> Result<f64> {
        let total = SalaryStatements::find()
            .select_only()
            .column_as(Expr::col(salary_statements::Column::PaidAmount).sum(), "total")
            .filter(salary_statements::Column::Status.is_in(settled()))
            .filter(touched_in(
                salary_statements::Column::CreatedAt,
                salary_statements::Column::ConfirmedAt,
                range,
            ))
            .into_tuple::<Option<f64>>()
            .one(&self.conn)
            .await
            .context("Failed to sum expenses")?;

        Ok(total.flatten().unwrap_or(0.0))
    }

    pub async fn summary(&self, range: &ReportRange) -> Result<ReportSummary> {
        let income = self.income(range).await?;
        let expenses = self.expenses(range).await?;

        let total_students = Students::find()
            .count(&self.conn)
            .await
            .context("Failed to count students")?;
        let new_students = Students::find()
            .filter(students::Column::RegistrationDate.gte(range.lower_bound()))
            .filter(students::Column::RegistrationDate.lt(range.upper_bound()))
            .count(&self.conn)
            .await
            .context("Failed to count new students")?;

        Ok(ReportSummary {
            income,
            expenses,
            profit: income - expenses,
            total_students,
            new_students,
        })
    }

    /// Income and expenses for the six calendar months ending with the one
    /// containing `today`, oldest first.
    pub async fn financial_history(&self, today: NaiveDate) -> Result<FinancialHistory> {
        let mut history = FinancialHistory::default();

        for back in (0..HISTORY_MONTHS).rev() {
            let Some(day) = today.checked_sub_months(Months::new(back)) else {
                continue;
            };
            let month = ReportRange::month_of(day);
            history.labels.push(month.start.format("%b %Y").to_string());
            history.income.push(self.income(&month).await?);
            history.expenses.push(self.expenses(&month).await?);
        }

        Ok(history)
    }

    /// Courses ranked by settled invoice revenue across their classes.
    pub async fn top_courses(&self) -> Result<Vec<CourseRevenue>> {
        let per_class: Vec<(i32, Option<f64>)> = StudentInvoices::find()
            .select_only()
            .column(student_invoices::Column::ClassId)
            .column_as(Expr::col(student_invoices::Column::PaidAmount).sum(), "revenue")
            .filter(student_invoices::Column::Status.is_in(settled()))
            .group_by(student_invoices::Column::ClassId)
            .into_tuple()
            .all(&self.conn)
            .await
            .context("Failed to sum revenue per class")?;

        let class_courses: HashMap<i32, i32> = Classes::find()
            .select_only()
            .column(classes::Column::Id)
            .column(classes::Column::CourseId)
            .filter(classes::Column::Id.is_in(per_class.iter().map(|(id, _)| *id)))
            .into_tuple::<(i32, i32)>()
            .all(&self.conn)
            .await
            .context("Failed to resolve report classes")?
            .into_iter()
            .collect();

        let mut revenue: HashMap<i32, f64> = HashMap::new();
        for (class_id, amount) in per_class {
            if let Some(course_id) = class_courses.get(&class_id) {
                *revenue.entry(*course_id).or_default() += amount.unwrap_or(0.0);
            }
        }

        let course_rows = Courses::find()
            .filter(courses::Column::Id.is_in(revenue.keys().copied()))
            .all(&self.conn)
            .await
            .context("Failed to load report courses")?;

        let mut ranked: Vec<CourseRevenue> = course_rows
            .into_iter()
            .map(|course| CourseRevenue {
                revenue: revenue.get(&course.id).copied().unwrap_or(0.0),
                public_id: course.public_id,
                name: course.name,
            })
            .collect();
        ranked.sort_by(|a, b| {
            b.revenue
                .total_cmp(&a.revenue)
                .then_with(|| a.name.cmp(&b.name))
        });
        ranked.truncate(TOP_COURSES);

        Ok(ranked)
    }

    /// Unpaid and short-paid invoices, oldest billing month first and the
    /// largest amount first within a month.
    pub async fn overdue_invoices(&self) -> Result<Vec<OverdueInvoice>> {
        let rows = StudentInvoices::find()
            .filter(
                Condition::any()
                    .add(student_invoices::Column::Status.eq(PaymentStatus::Due.as_str()))
                    .add(
                        Condition::all()
                            .add(
                                student_invoices::Column::Status
                                    .eq(PaymentStatus::Partial.as_str()),
                            )
                            .add(
                                Expr::col(student_invoices::Column::PaidAmount)
                                    .lt(Expr::col(student_invoices::Column::DueAmount)),
                            ),
                    ),
            )
            .order_by_asc(student_invoices::Column::PlanMonth)
            .order_by_desc(student_invoices::Column::DueAmount)
            .limit(OVERDUE_LIMIT)
            .all(&self.conn)
            .await
            .context("Failed to list overdue invoices")?;

        let student_names: HashMap<i32, String> = Students::find()
            .filter(students::Column::Id.is_in(rows.iter().map(|r| r.student_id)))
            .all(&self.conn)
            .await
            .context("Failed to resolve overdue students")?
            .into_iter()
            .map(|s| (s.id, format!("{} {}", s.first_name, s.last_name)))
            .collect();

        let class_names: HashMap<i32, String> = Classes::find()
            .select_only()
            .column(classes::Column::Id)
            .column(classes::Column::Name)
            .filter(classes::Column::Id.is_in(rows.iter().map(|r| r.class_id)))
            .into_tuple::<(i32, String)>()
            .all(&self.conn)
            .await
            .context("Failed to resolve overdue classes")?
            .into_iter()
            .collect();

        Ok(rows
            .into_iter()
            .map(|row| OverdueInvoice {
                student_name: student_names.get(&row.student_id).cloned().unwrap_or_default(),
                class_name: class_names.get(&row.class_id).cloned().unwrap_or_default(),
                public_id: row.public_id,
                plan_month: row.plan_month,
                due_amount: row.due_amount,
                paid_amount: row.paid_amount,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Store;
    use sea_orm::{ActiveModelTrait, Set};

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn october() -> ReportRange {
        ReportRange {
            start: day("2026-10-01"),
            end: day("2026-10-31"),
        }
    }

    async fn course(store: &Store, id: i32, name: &str) {
        courses::ActiveModel {
            id: Set(id),
            public_id: Set(format!("C-{id}")),
            name: Set(name.to_string()),
            price: Set(0.0),
            description: Set(None),
            created_at: Set("2026-01-01T00:00:00.000Z".to_string()),
            updated_at: Set("2026-01-01T00:00:00.000Z".to_string()),
        }
        .insert(&store.conn)
        .await
        .unwrap();
    }

    async fn class(store: &Store, id: i32, course_id: i32, name: &str) {
        classes::ActiveModel {
            id: Set(id),
            public_id: Set(format!("CL-{id}")),
            course_id: Set(course_id),
            name: Set(name.to_string()),
            level: Set(None),
            start_date: Set(None),
            end_date: Set(None),
            schedule: Set(None),
            monthly_price: Set(0.0),
            professor_class_pay: Set(0.0),
            description: Set(None),
            created_at: Set("2026-01-01T00:00:00.000Z".to_string()),
            updated_at: Set("2026-01-01T00:00:00.000Z".to_string()),
        }
        .insert(&store.conn)
        .await
        .unwrap();
    }

    async fn student(store: &Store, id: i32, name: (&str, &str), registered: Option<&str>) {
        students::ActiveModel {
            id: Set(id),
            public_id: Set(format!("S-{id}")),
            first_name: Set(name.0.to_string()),
            last_name: Set(name.1.to_string()),
            national_id: Set(None),
            phone: Set(None),
            address: Set(None),
            age: Set(None),
            registration_date: Set(registered.map(str::to_string)),
            notes: Set(None),
            created_at: Set("2026-01-01T00:00:00.000Z".to_string()),
            updated_at: Set("2026-01-01T00:00:00.000Z".to_string()),
        }
        .insert(&store.conn)
        .await
        .unwrap();
    }

    struct Bill<'a> {
        id: i32,
        class_id: i32,
        student_id: i32,
        month: &'a str,
        due: f64,
        paid: f64,
        status: &'a str,
        created_at: &'a str,
    }

    async fn invoice(store: &Store, bill: Bill<'_>) {
        student_invoices::ActiveModel {
            id: Set(bill.id),
            public_id: Set(format!("INV-{}", bill.id)),
            class_id: Set(bill.class_id),
            student_id: Set(bill.student_id),
            plan_month: Set(bill.month.to_string()),
            due_amount: Set(bill.due),
            paid_amount: Set(bill.paid),
            status: Set(bill.status.to_string()),
            tax: Set("none".to_string()),
            notes: Set(None),
            confirmed_at: Set(None),
            confirmed_by: Set(None),
            created_at: Set(bill.created_at.to_string()),
            updated_at: Set(bill.created_at.to_string()),
        }
        .insert(&store.conn)
        .await
        .unwrap();
    }

    async fn salary(store: &Store, id: i32, paid: f64, status: &str, created_at: &str) {
        salary_statements::ActiveModel {
            id: Set(id),
            public_id: Set(format!("SAL-{id}")),
            professor_id: Set(1),
            class_id: Set(None),
            pay_month: Set(created_at[..7].to_string()),
            base_amount: Set(paid),
            advances: Set(0.0),
            paid_amount: Set(paid),
            balance: Set(0.0),
            status: Set(status.to_string()),
            notes: Set(None),
            confirmed_at: Set(None),
            confirmed_by: Set(None),
            created_at: Set(created_at.to_string()),
            updated_at: Set(created_at.to_string()),
        }
        .insert(&store.conn)
        .await
        .unwrap();
    }

    /// Two courses with one class each, three students and a spread of
    /// invoices and salary statements around October 2026.
    async fn seeded() -> Store {
        let store = Store::new("sqlite::memory:").await.unwrap();
        course(&store, 1, "Biology").await;
        course(&store, 2, "Chemistry").await;
        class(&store, 1, 1, "Bio Morning").await;
        class(&store, 2, 2, "Chem Evening").await;
        student(&store, 1, ("Ada", "King"), Some("2026-10-31")).await;
        student(&store, 2, ("Alan", "Turing"), Some("2026-09-30")).await;
        student(&store, 3, ("Grace", "Hopper"), None).await;

        let bills = [
            Bill { id: 1, class_id: 1, student_id: 1, month: "2026-10", due: 100.0, paid: 100.0, status: "paid", created_at: "2026-10-05T09:00:00.000Z" },
            Bill { id: 2, class_id: 1, student_id: 2, month: "2026-10", due: 100.0, paid: 40.0, status: "partial", created_at: "2026-10-31T23:59:59.999Z" },
            Bill { id: 3, class_id: 2, student_id: 3, month: "2026-09", due: 80.0, paid: 0.0, status: "due", created_at: "2026-10-10T09:00:00.000Z" },
            Bill { id: 4, class_id: 2, student_id: 1, month: "2026-08", due: 300.0, paid: 300.0, status: "paid", created_at: "2026-08-02T09:00:00.000Z" },
            Bill { id: 5, class_id: 2, student_id: 2, month: "2026-09", due: 120.0, paid: 50.0, status: "partial", created_at: "2026-11-01T00:00:00.000Z" },
        ];
        for bill in bills {
            invoice(&store, bill).await;
        }

        salary(&store, 1, 30.0, "paid", "2026-10-20T09:00:00.000Z").await;
        salary(&store, 2, 999.0, "due", "2026-10-20T09:00:00.000Z").await;
        salary(&store, 3, 25.0, "partial", "2026-09-01T09:00:00.000Z").await;
        store
    }

    #[tokio::test]
    async fn summary_counts_settled_money_inside_the_range() {
        let store = seeded().await;
        let summary = store.report_repo().summary(&october()).await.unwrap();

        // INV-1 and INV-2 only: INV-3 is unpaid, INV-4 and INV-5 fall outside.
        assert_eq!(summary.income, 140.0);
        assert_eq!(summary.expenses, 30.0);
        assert_eq!(summary.profit, 110.0);
        assert_eq!(summary.total_students, 3);
        assert_eq!(summary.new_students, 1);
    }

    #[tokio::test]
    async fn history_spans_six_labelled_months() {
        let store = seeded().await;
        let history = store
            .report_repo()
            .financial_history(day("2026-10-16"))
            .await
            .unwrap();

        assert_eq!(
            history.labels,
            ["May 2026", "Jun 2026", "Jul 2026", "Aug 2026", "Sep 2026", "Oct 2026"]
        );
        assert_eq!(history.income, [0.0, 0.0, 0.0, 300.0, 0.0, 140.0]);
        assert_eq!(history.expenses, [0.0, 0.0, 0.0, 0.0, 25.0, 30.0]);
    }

    #[tokio::test]
    async fn top_courses_rank_by_revenue() {
        let store = seeded().await;
        let top = store.report_repo().top_courses().await.unwrap();

        assert_eq!(top.len(), 2);
        assert_eq!(top[0].name, "Chemistry");
        assert_eq!(top[0].revenue, 350.0);
        assert_eq!(top[1].public_id, "C-1");
        assert_eq!(top[1].revenue, 140.0);
    }

    #[tokio::test]
    async fn overdue_lists_oldest_month_then_largest_amount() {
        let store = seeded().await;
        let overdue = store.report_repo().overdue_invoices().await.unwrap();

        let ids: Vec<&str> = overdue.iter().map(|o| o.public_id.as_str()).collect();
        assert_eq!(ids, ["INV-5", "INV-3", "INV-2"]);
        assert_eq!(overdue[0].student_name, "Alan Turing");
        assert_eq!(overdue[0].class_name, "Chem Evening");
        assert_eq!(overdue[1].paid_amount, 0.0);
    }

    #[tokio::test]
    async fn fully_paid_partial_invoices_are_not_overdue() {
        let store = seeded().await;
        invoice(
            &store,
            Bill { id: 6, class_id: 1, student_id: 3, month: "2026-01", due: 50.0, paid: 50.0, status: "partial", created_at: "2026-01-05T09:00:00.000Z" },
        )
        .await;

        let overdue = store.report_repo().overdue_invoices().await.unwrap();
        assert!(overdue.iter().all(|o| o.public_id != "INV-6"));
    }

    #[tokio::test]
    async fn overdue_list_is_capped() {
        let store = seeded().await;
        for id in 10..25 {
            invoice(
                &store,
                Bill { id, class_id: 1, student_id: 1, month: "2026-07", due: 10.0, paid: 0.0, status: "due", created_at: "2026-07-01T09:00:00.000Z" },
            )
            .await;
        }

        let overdue = store.report_repo().overdue_invoices().await.unwrap();
        assert_eq!(overdue.len(), 10);
        assert!(overdue.iter().all(|o| o.plan_month == "2026-07"));
    }
}
