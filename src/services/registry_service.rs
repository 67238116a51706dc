//! Domain service for the school registry: courses, classes, students,
//! professors, invoices and salary statements.
//!
//! Every mutation runs the same gate: resolve the target, validate input,
//! step up when the permission matrix asks for it, mutate, then audit.

use thiserror::Error;

use crate::db::{DashboardCounts, is_unique_violation};
use crate::domain::PaymentStatus;
use crate::models::{
    Class, ClassInput, Course, CourseInput, Invoice, InvoiceInput, Professor, ProfessorInput,
    Report, ReportRange, Salary, SalaryInput, Student, StudentInput, non_empty,
};
use crate::services::step_up::StepUpError;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Record not found")]
    NotFound,

    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),

    #[error("Unknown course")]
    InvalidCourse,

    #[error("Unknown class, student or professor")]
    InvalidRefs,

    #[error("Record already exists")]
    Duplicate,

    #[error("Invalid payment status: {0}")]
    InvalidStatus(String),

    #[error(transparent)]
    StepUp(#[from] StepUpError),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for RegistryError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for RegistryError {
    fn from(err: anyhow::Error) -> Self {
        if is_unique_violation(&err) {
            Self::Duplicate
        } else {
            Self::Database(format!("{err:#}"))
        }
    }
}

/// Validates an optional payment status and rewrites it in canonical form.
pub(crate) fn normalize_status(status: &mut Option<String>) -> Result<(), RegistryError> {
    if let Some(raw) = non_empty(status.as_ref()) {
        let parsed: PaymentStatus = raw
            .parse()
            .map_err(|()| RegistryError::InvalidStatus(raw.clone()))?;
        *status = Some(parsed.as_str().to_string());
    }
    Ok(())
}

/// The admin performing a mutation and the step-up PIN sent with it.
#[derive(Debug, Clone, Default)]
pub struct Actor {
    pub admin_id: i32,
    pub pin: Option<String>,
}

impl Actor {
    #[must_use]
    pub fn new(admin_id: i32, pin: Option<String>) -> Self {
        Self { admin_id, pin }
    }

    #[must_use]
    pub fn pin(&self) -> Option<&str> {
        self.pin.as_deref()
    }
}

/// Fails with the names of every required field that is absent or blank.
pub(crate) fn require_fields(fields: &[(&str, Option<&String>)]) -> Result<(), RegistryError> {
    let missing: Vec<String> = fields
        .iter()
        .filter(|(_, value)| value.is_none_or(|v| v.trim().is_empty()))
        .map(|(name, _)| (*name).to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(RegistryError::MissingFields(missing))
    }
}

#[async_trait::async_trait]
pub trait RegistryService: Send + Sync {
    async fn dashboard_counts(&self) -> Result<DashboardCounts, RegistryError>;
    /// Financial summary for a date window plus the standing lists
    /// (six-month history, top courses, overdue invoices).
    async fn report(&self, range: ReportRange) -> Result<Report, RegistryError>;

    async fn list_courses(&self) -> Result<Vec<Course>, RegistryError>;
    async fn create_course(&self, actor: &Actor, input: CourseInput) -> Result<Course, RegistryError>;
    async fn update_course(
        &self,
        actor: &Actor,
        public_id: &str,
        input: CourseInput,
    ) -> Result<Course, RegistryError>;
    /// Removes the course with all of its classes. Returns the remaining courses.
    async fn delete_course(&self, actor: &Actor, public_id: &str) -> Result<Vec<Course>, RegistryError>;

    async fn list_classes(&self) -> Result<Vec<Class>, RegistryError>;
    /// One class with its roster and billing plan.
    async fn get_class(&self, public_id: &str) -> Result<Class, RegistryError>;
    async fn create_class(&self, actor: &Actor, input: ClassInput) -> Result<Class, RegistryError>;
    async fn update_class(
        &self,
        actor: &Actor,
        public_id: &str,
        input: ClassInput,
    ) -> Result<Class, RegistryError>;
    async fn delete_class(&self, actor: &Actor, public_id: &str) -> Result<Vec<Class>, RegistryError>;

    async fn list_students(&self) -> Result<Vec<Student>, RegistryError>;
    async fn create_student(&self, actor: &Actor, input: StudentInput) -> Result<Student, RegistryError>;
    async fn update_student(
        &self,
        actor: &Actor,
        public_id: &str,
        input: StudentInput,
    ) -> Result<Student, RegistryError>;
    async fn delete_student(&self, actor: &Actor, public_id: &str) -> Result<Vec<Student>, RegistryError>;

    async fn list_professors(&self) -> Result<Vec<Professor>, RegistryError>;
    async fn create_professor(
        &self,
        actor: &Actor,
        input: ProfessorInput,
    ) -> Result<Professor, RegistryError>;
    async fn update_professor(
        &self,
        actor: &Actor,
        public_id: &str,
        input: ProfessorInput,
    ) -> Result<Professor, RegistryError>;
    async fn delete_professor(
        &self,
        actor: &Actor,
        public_id: &str,
    ) -> Result<Vec<Professor>, RegistryError>;

    async fn list_invoices(&self) -> Result<Vec<Invoice>, RegistryError>;
    async fn create_invoice(&self, actor: &Actor, input: InvoiceInput) -> Result<Invoice, RegistryError>;
    async fn update_invoice(
        &self,
        actor: &Actor,
        public_id: &str,
        input: InvoiceInput,
    ) -> Result<Invoice, RegistryError>;
    async fn delete_invoice(&self, actor: &Actor, public_id: &str) -> Result<Vec<Invoice>, RegistryError>;

    async fn list_salaries(&self) -> Result<Vec<Salary>, RegistryError>;
    async fn create_salary(&self, actor: &Actor, input: SalaryInput) -> Result<Salary, RegistryError>;
    async fn update_salary(
        &self,
        actor: &Actor,
        public_id: &str,
        input: SalaryInput,
    ) -> Result<Salary, RegistryError>;
    async fn delete_salary(&self, actor: &Actor, public_id: &str) -> Result<Vec<Salary>, RegistryError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_fields_lists_every_gap() {
        let name = "Math".to_string();
        let blank = "  ".to_string();

        assert!(require_fields(&[("name", Some(&name))]).is_ok());

        let Err(RegistryError::MissingFields(missing)) =
            require_fields(&[("name", Some(&blank)), ("course_public_id", None), ("level", Some(&name))])
        else {
            panic!("expected missing fields");
        };
        assert_eq!(missing, vec!["name", "course_public_id"]);
    }

    #[test]
    fn plain_errors_are_database_errors() {
        let err = RegistryError::from(anyhow::anyhow!("disk on fire"));
        assert!(matches!(err, RegistryError::Database(_)));
    }
}
