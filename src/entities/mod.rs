pub mod prelude;

pub mod activity_logs;
pub mod admins;
pub mod class_payment_plan;
pub mod class_professors;
pub mod class_students;
pub mod classes;
pub mod courses;
pub mod login_attempts;
pub mod password_reset_tokens;
pub mod permission_access_tokens;
pub mod pin_audit_logs;
pub mod pin_permissions;
pub mod professors;
pub mod public_id_counters;
pub mod salary_statements;
pub mod settings;
pub mod student_invoices;
pub mod students;
