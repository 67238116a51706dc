//! Request inputs and response projections for the registry entities.

pub mod billing;
pub mod class;
pub mod course;
pub mod person;
pub mod report;

pub use billing::{Invoice, InvoiceInput, Salary, SalaryInput};
pub use class::{Class, ClassInput, ClassProfessor, ClassStudent, PaymentPlanEntry};
pub use course::{Course, CourseInput};
pub use person::{Professor, ProfessorInput, Student, StudentInput};
pub use report::{
    CourseRevenue, FinancialHistory, OverdueInvoice, Report, ReportRange, ReportSummary,
};

/// Trimmed text, or `None` when absent or blank. Partial updates skip blanks.
#[must_use]
pub fn non_empty(value: Option<&String>) -> Option<String> {
    value
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Current month as `YYYY-MM`, the default billing period.
#[must_use]
pub fn current_month() -> String {
    chrono::Utc::now().format("%Y-%m").to_string()
}

#[must_use]
pub fn today() -> String {
    chrono::Utc::now().format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_empty_trims_and_drops_blanks() {
        assert_eq!(non_empty(Some(&"  x ".to_string())), Some("x".to_string()));
        assert_eq!(non_empty(Some(&"   ".to_string())), None);
        assert_eq!(non_empty(None), None);
    }

    #[test]
    fn current_month_shape() {
        let month = current_month();
        assert_eq!(month.len(), 7);
        assert_eq!(&month[4..5], "-");
    }
}
