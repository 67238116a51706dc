use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct Invoice {
    pub public_id: String,
    pub class_public_id: Option<String>,
    pub student_public_id: Option<String>,
    pub plan_month: String,
    pub due_amount: f64,
    pub paid_amount: f64,
    pub status: String,
    pub tax: String,
    pub notes: Option<String>,
    pub confirmed_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InvoiceInput {
    pub class_public_id: Option<String>,
    pub student_public_id: Option<String>,
    pub plan_month: Option<String>,
    pub due_amount: Option<f64>,
    pub paid_amount: Option<f64>,
    pub status: Option<String>,
    pub tax: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Salary {
    pub public_id: String,
    pub professor_public_id: Option<String>,
    pub class_public_id: Option<String>,
    pub pay_month: String,
    pub base_amount: f64,
    pub advances: f64,
    pub paid_amount: f64,
    pub balance: f64,
    pub status: String,
    pub notes: Option<String>,
    pub confirmed_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SalaryInput {
    pub professor_public_id: Option<String>,
    pub class_public_id: Option<String>,
    pub pay_month: Option<String>,
    pub base_amount: Option<f64>,
    pub advances: Option<f64>,
    pub paid_amount: Option<f64>,
    pub status: Option<String>,
    pub notes: Option<String>,
}
