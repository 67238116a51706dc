pub use super::activity_logs::Entity as ActivityLogs;
pub use super::admins::Entity as Admins;
pub use super::class_payment_plan::Entity as ClassPaymentPlan;
pub use super::class_professors::Entity as ClassProfessors;
pub use super::class_students::Entity as ClassStudents;
pub use super::classes::Entity as Classes;
pub use super::courses::Entity as Courses;
pub use super::login_attempts::Entity as LoginAttempts;
pub use super::password_reset_tokens::Entity as PasswordResetTokens;
pub use super::permission_access_tokens::Entity as PermissionAccessTokens;
pub use super::pin_audit_logs::Entity as PinAuditLogs;
pub use super::pin_permissions::Entity as PinPermissions;
pub use super::professors::Entity as Professors;
pub use super::public_id_counters::Entity as PublicIdCounters;
pub use super::salary_statements::Entity as SalaryStatements;
pub use super::settings::Entity as Settings;
pub use super::student_invoices::Entity as StudentInvoices;
pub use super::students::Entity as Students;
