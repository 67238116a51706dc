use chrono::{Datelike, Months, NaiveDate};
use serde::Serialize;

/// Inclusive date window for a financial report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl ReportRange {
    /// The calendar month containing `day`.
    #[must_use]
    pub fn month_of(day: NaiveDate) -> Self {
        let start = day.with_day(1).unwrap_or(day);
        let end = start
            .checked_add_months(Months::new(1))
            .and_then(|next| next.pred_opt())
            .unwrap_or(day);
        Self { start, end }
    }

    /// Lower bound for lexical comparison against stored dates and timestamps.
    #[must_use]
    pub fn lower_bound(&self) -> String {
        self.start.format("%Y-%m-%d").to_string()
    }

    /// Exclusive upper bound: the day after `end`, so a timestamp late on
    /// the last day still sorts below it.
    #[must_use]
    pub fn upper_bound(&self) -> String {
        self.end
            .succ_opt()
            .unwrap_or(self.end)
            .format("%Y-%m-%d")
            .to_string()
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ReportSummary {
    pub income: f64,
    pub expenses: f64,
    pub profit: f64,
    pub total_students: u64,
    pub new_students: u64,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct FinancialHistory {
    /// Month labels such as `Oct 2026`, oldest first.
    pub labels: Vec<String>,
    pub income: Vec<f64>,
    pub expenses: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CourseRevenue {
    pub public_id: String,
    pub name: String,
    pub revenue: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OverdueInvoice {
    pub public_id: String,
    pub student_name: String,
    pub class_name: String,
    pub plan_month: String,
    pub due_amount: f64,
    pub paid_amount: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Report {
    pub start_date: String,
    pub end_date: String,
    pub summary: ReportSummary,
    pub financial_history: FinancialHistory,
    pub top_courses: Vec<CourseRevenue>,
    pub overdue_invoices: Vec<OverdueInvoice>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn month_of_covers_the_whole_month() {
        let range = ReportRange::month_of(day("2024-02-17"));
        assert_eq!(range.start, day("2024-02-01"));
        assert_eq!(range.end, day("2024-02-29"));
    }

    #[test]
    fn bounds_include_the_last_day() {
        let range = ReportRange {
            start: day("2026-10-01"),
            end: day("2026-10-31"),
        };
        assert_eq!(range.lower_bound(), "2026-10-01");
        assert_eq!(range.upper_bound(), "2026-11-01");
        assert!("2026-10-31T23:59:59.999Z" < range.upper_bound().as_str());
        assert!("2026-10-01T00:00:00.000Z" >= range.lower_bound().as_str());
    }
}
