pub mod audit;
pub use audit::AuditService;

pub mod login_guard;
pub use login_guard::LoginGuard;

pub mod mailer;
pub use mailer::{LogMailer, MailMessage, Mailer};

pub mod step_up;
pub use step_up::{StepUpAuthorizer, StepUpError};

pub mod permission_service;
pub mod permission_service_impl;
pub use permission_service::{AccessRequest, PermissionError, PermissionService};
pub use permission_service_impl::SeaOrmPermissionService;

pub mod auth_service;
pub mod auth_service_impl;
pub use auth_service::{
    AdminProfile, AuthError, AuthService, LoginAttempt, LoginOutcome, RequestDecision,
    SignupRequest, TwoFactorChallenge,
};
pub use auth_service_impl::SeaOrmAuthService;

pub mod registry_service;
pub mod registry_service_impl;
pub use registry_service::{Actor, RegistryError, RegistryService};
pub use registry_service_impl::SeaOrmRegistryService;

pub mod settings;
pub use settings::{SettingsError, SettingsService};
