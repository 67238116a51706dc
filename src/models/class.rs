use serde::{Deserialize, Serialize};

use super::Invoice;

/// A class with its course, staff, roster, payment plan and invoices.
#[derive(Debug, Clone, Serialize)]
pub struct Class {
    pub public_id: String,
    pub course_public_id: Option<String>,
    pub course_name: Option<String>,
    pub name: String,
    pub level: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub schedule: Option<serde_json::Value>,
    pub monthly_price: f64,
    pub professor_class_pay: f64,
    pub description: Option<String>,
    pub professors: Vec<ClassProfessor>,
    pub students: Vec<ClassStudent>,
    pub payment_plan: Vec<PaymentPlanEntry>,
    pub invoices: Vec<Invoice>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassProfessor {
    pub public_id: String,
    pub first_name: String,
    pub last_name: String,
    pub pay_amount: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassStudent {
    pub public_id: String,
    pub first_name: String,
    pub last_name: String,
    pub monthly_fee: f64,
    pub status: String,
    pub join_date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentPlanEntry {
    pub plan_month: String,
    pub due_amount: f64,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClassInput {
    pub course_public_id: Option<String>,
    pub name: Option<String>,
    pub level: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub schedule: Option<serde_json::Value>,
    pub monthly_price: Option<f64>,
    pub professor_class_pay: Option<f64>,
    pub description: Option<String>,
    /// Professor public IDs to attach.
    #[serde(default)]
    pub professors: Vec<String>,
    /// Student public IDs to enroll.
    #[serde(default)]
    pub students: Vec<String>,
    #[serde(default)]
    pub professors_remove: Vec<String>,
    #[serde(default)]
    pub students_remove: Vec<String>,
    /// Replaces the whole plan when present.
    pub payment_plan: Option<Vec<PaymentPlanEntry>>,
}
