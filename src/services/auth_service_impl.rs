//! `SeaORM` implementation of the `AuthService` trait.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::SecurityConfig;
use crate::constants::limits::PASSWORD_MIN_LENGTH;
use crate::constants::tokens::{LOGIN_CODE_TTL_MINUTES, PASSWORD_RESET_TTL_MINUTES};
use crate::db::repositories::admin::{
    NewAdmin, generate_code, hash_password_blocking, verify_password,
};
use crate::db::{Store, is_unique_violation};
use crate::domain::AdminStatus;
use crate::services::audit::AuditService;
use crate::entities::admins;
use crate::services::auth_service::{
    AdminProfile, AuthError, AuthService, LoginAttempt, LoginOutcome, RequestDecision,
    SignupRequest, TwoFactorChallenge,
};
use crate::services::login_guard::LoginGuard;
use crate::services::mailer::{Mailer, login_code_message, password_reset_message};

pub struct SeaOrmAuthService {
    store: Store,
    guard: LoginGuard,
    audit: AuditService,
    mailer: Arc<dyn Mailer>,
    config: SecurityConfig,
}

impl SeaOrmAuthService {
    #[must_use]
    pub fn new(store: Store, mailer: Arc<dyn Mailer>, config: SecurityConfig) -> Self {
        Self {
            guard: LoginGuard::new(store.clone(), config.clone()),
            audit: AuditService::new(store.clone()),
            store,
            mailer,
            config,
        }
    }

    fn check_password_strength(password: &str) -> Result<(), AuthError> {
        if password.chars().count() < PASSWORD_MIN_LENGTH {
            return Err(AuthError::WeakPassword(PASSWORD_MIN_LENGTH));
        }
        Ok(())
    }

    /// Issues and mails a login code. A failed delivery is logged only, the
    /// code stays valid.
    async fn issue_login_code(&self, admin: &admins::Model, ip_address: &str) -> TwoFactorChallenge {
        let challenge = TwoFactorChallenge {
            admin_id: admin.id,
            code: generate_code(),
            expires_at: (Utc::now() + Duration::minutes(LOGIN_CODE_TTL_MINUTES)).timestamp_millis(),
        };

        if let Err(e) = self
            .mailer
            .send(login_code_message(&admin.email, &challenge.code))
            .await
        {
            warn!(error = %e, admin = %admin.public_id, "Failed to send login code email");
        }

        self.audit
            .record_activity(
                Some(admin.id),
                "auth.2fa_code_requested",
                "Login code sent",
                Some(serde_json::json!({ "ip": ip_address })),
            )
            .await;

        challenge
    }
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn login(&self, attempt: LoginAttempt<'_>) -> Result<LoginOutcome, AuthError> {
        let identifier = attempt.identifier.trim();
        let password = attempt.password;
        let ip_address = attempt.ip_address;

        let mut missing = Vec::new();
        if identifier.is_empty() {
            missing.push("username".to_string());
        }
        if password.is_empty() {
            missing.push("password".to_string());
        }
        if !missing.is_empty() {
            return Err(AuthError::MissingFields(missing));
        }

        if !self.guard.check_rate_limit(identifier, ip_address).await {
            self.guard.record_attempt(identifier, ip_address, false).await;
            metrics::counter!("auth_logins_total", "outcome" => "rate_limited").increment(1);
            return Err(AuthError::TooManyAttempts);
        }

        let Some(admin) = self.store.admin_repo().find_by_identifier(identifier).await? else {
            self.guard.record_attempt(identifier, ip_address, false).await;
            metrics::counter!("auth_logins_total", "outcome" => "invalid").increment(1);
            return Err(AuthError::InvalidCredentials);
        };

        match AdminStatus::parse(&admin.status) {
            AdminStatus::Pending => return Err(AuthError::AccountPending),
            AdminStatus::Rejected => return Err(AuthError::AccountRejected),
            AdminStatus::Active => {}
        }

        let admin = self.guard.release_expired_lock(admin).await?;
        if self.guard.is_locked(&admin) {
            metrics::counter!("auth_logins_total", "outcome" => "locked").increment(1);
            return Err(AuthError::TooManyAttempts);
        }

        let valid = match verify_password(password, &admin.password_hash).await {
            Ok(valid) => valid,
            Err(e) => {
                warn!(error = %e, admin = %admin.public_id, "Stored password hash is unreadable");
                false
            }
        };

        if !valid {
            self.guard.increment_failures(&admin).await?;
            self.guard.record_attempt(identifier, ip_address, false).await;
            metrics::counter!("auth_logins_total", "outcome" => "invalid").increment(1);
            return Err(AuthError::InvalidCredentials);
        }

        if self.config.login_two_factor_enabled {
            let Some(code) = attempt.two_factor_code.map(str::trim).filter(|c| !c.is_empty()) else {
                metrics::counter!("auth_logins_total", "outcome" => "two_factor_required").increment(1);
                let challenge = self.issue_login_code(&admin, ip_address).await;
                return Ok(LoginOutcome::TwoFactorRequired(challenge));
            };

            if !attempt
                .challenge
                .is_some_and(|challenge| challenge.accepts(admin.id, code, Utc::now()))
            {
                self.guard.record_attempt(identifier, ip_address, false).await;
                metrics::counter!("auth_logins_total", "outcome" => "invalid_2fa").increment(1);
                return Err(AuthError::InvalidTwoFactor);
            }
        }

        self.guard.reset_failures(admin.id).await?;
        self.guard.record_attempt(identifier, ip_address, true).await;
        self.store.admin_repo().touch_last_login(admin.id).await?;

        self.audit
            .record_activity(
                Some(admin.id),
                "auth.login",
                &format!("Signed in as {}", admin.username),
                Some(serde_json::json!({ "ip": ip_address })),
            )
            .await;

        metrics::counter!("auth_logins_total", "outcome" => "success").increment(1);
        info!(admin = %admin.public_id, "Admin signed in");

        let admin = self
            .store
            .admin_repo()
            .find_by_id(admin.id)
            .await?
            .ok_or(AuthError::NotFound)?;
        Ok(LoginOutcome::Authenticated(admin.into()))
    }

    async fn request_login_code(
        &self,
        identifier: &str,
        ip_address: &str,
    ) -> Result<Option<TwoFactorChallenge>, AuthError> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Err(AuthError::MissingFields(vec!["username".to_string()]));
        }
        if !self.config.login_two_factor_enabled {
            return Ok(None);
        }

        let Some(admin) = self.store.admin_repo().find_by_identifier(identifier).await? else {
            return Ok(None);
        };
        if AdminStatus::parse(&admin.status) != AdminStatus::Active {
            return Ok(None);
        }

        Ok(Some(self.issue_login_code(&admin, ip_address).await))
    }

    async fn current_admin(&self, admin_id: i32) -> Result<Option<AdminProfile>, AuthError> {
        let admin = self.store.admin_repo().find_by_id(admin_id).await?;
        Ok(admin.map(Into::into))
    }

    async fn logout(&self, admin_id: i32) {
        self.audit
            .record_activity(Some(admin_id), "auth.logout", "Signed out", None)
            .await;
    }

    async fn signup(&self, request: SignupRequest) -> Result<AdminProfile, AuthError> {
        let username = request.username.trim().to_string();
        let email = request.email.trim().to_lowercase();

        let mut missing = Vec::new();
        if username.is_empty() {
            missing.push("username".to_string());
        }
        if email.is_empty() {
            missing.push("email".to_string());
        }
        if request.password.is_empty() {
            missing.push("password".to_string());
        }
        if !missing.is_empty() {
            return Err(AuthError::MissingFields(missing));
        }

        Self::check_password_strength(&request.password)?;

        let repo = self.store.admin_repo();
        if repo.exists(&username, &email).await? {
            return Err(AuthError::Duplicate);
        }

        let password_hash = hash_password_blocking(&request.password, &self.config).await?;
        let name = request
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| username.clone());

        let admin = repo
            .create(NewAdmin {
                username,
                name,
                email,
                password_hash,
                status: AdminStatus::Pending.as_str().to_string(),
            })
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AuthError::Duplicate
                } else {
                    AuthError::from(e)
                }
            })?;

        self.audit
            .record_activity(
                None,
                "auth.signup",
                &format!("Access requested by {}", admin.username),
                Some(serde_json::json!({ "admin": admin.public_id })),
            )
            .await;

        info!(admin = %admin.public_id, "Admin access requested");
        Ok(admin.into())
    }

    async fn list_requests(&self) -> Result<Vec<AdminProfile>, AuthError> {
        let pending = self
            .store
            .admin_repo()
            .list_by_status(AdminStatus::Pending.as_str())
            .await?;
        Ok(pending.into_iter().map(Into::into).collect())
    }

    async fn handle_request(
        &self,
        admin_id: i32,
        public_id: &str,
        decision: RequestDecision,
    ) -> Result<AdminProfile, AuthError> {
        let repo = self.store.admin_repo();
        let target = repo
            .find_by_public_id(public_id)
            .await?
            .filter(|a| AdminStatus::parse(&a.status) == AdminStatus::Pending)
            .ok_or(AuthError::NotFound)?;

        let (status, verb) = match decision {
            RequestDecision::Accept => (AdminStatus::Active, "Approved"),
            RequestDecision::Ignore => (AdminStatus::Rejected, "Rejected"),
        };

        repo.set_status(target.id, status.as_str()).await?;

        self.audit
            .record_activity(
                Some(admin_id),
                "auth.request_handled",
                &format!("{verb} access request for {}", target.username),
                Some(serde_json::json!({ "admin": target.public_id, "status": status.as_str() })),
            )
            .await;

        let updated = repo.find_by_id(target.id).await?.ok_or(AuthError::NotFound)?;
        Ok(updated.into())
    }

    async fn change_password(
        &self,
        admin_id: i32,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let repo = self.store.admin_repo();
        let admin = repo.find_by_id(admin_id).await?.ok_or(AuthError::NotFound)?;

        if !verify_password(current_password, &admin.password_hash).await? {
            return Err(AuthError::InvalidCredentials);
        }

        Self::check_password_strength(new_password)?;

        let hash = hash_password_blocking(new_password, &self.config).await?;
        repo.set_password_hash(admin.id, hash).await?;

        self.audit
            .record_activity(Some(admin.id), "auth.password_changed", "Changed password", None)
            .await;

        Ok(())
    }

    async fn request_password_reset(
        &self,
        identifier: &str,
        ip_address: Option<String>,
        user_agent: Option<String>,
    ) -> Result<Option<String>, AuthError> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Ok(None);
        }

        let Some(admin) = self.store.admin_repo().find_by_identifier(identifier).await? else {
            return Ok(None);
        };

        let token = self
            .store
            .token_repo()
            .issue_reset_token(
                admin.id,
                ip_address,
                user_agent,
                Duration::minutes(PASSWORD_RESET_TTL_MINUTES),
            )
            .await?;

        if let Err(e) = self
            .mailer
            .send(password_reset_message(&admin.email, &token))
            .await
        {
            warn!(error = %e, admin = %admin.public_id, "Failed to send password reset email");
        }

        self.audit
            .record_activity(
                Some(admin.id),
                "auth.password_reset_requested",
                "Requested a password reset",
                None,
            )
            .await;

        Ok(self.config.expose_verification_codes.then_some(token))
    }

    async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), AuthError> {
        Self::check_password_strength(new_password)?;

        let token = token.trim();
        if token.is_empty() {
            return Err(AuthError::InvalidToken);
        }

        let admin_id = self
            .store
            .token_repo()
            .consume_reset_token(token)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        let hash = hash_password_blocking(new_password, &self.config).await?;
        let repo = self.store.admin_repo();
        repo.set_password_hash(admin_id, hash).await?;
        repo.reset_failures(admin_id).await?;

        self.audit
            .record_activity(Some(admin_id), "auth.password_reset", "Reset password", None)
            .await;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::mailer::testing::RecordingMailer;

    fn fast_config() -> SecurityConfig {
        SecurityConfig {
            argon2_memory_cost_kib: 1024,
            argon2_time_cost: 1,
            expose_verification_codes: true,
            login_two_factor_enabled: false,
            ..SecurityConfig::default()
        }
    }

    fn two_factor_config() -> SecurityConfig {
        SecurityConfig {
            login_two_factor_enabled: true,
            ..fast_config()
        }
    }

    /// Password-only sign-in for services with the second step disabled.
    async fn sign_in(
        service: &SeaOrmAuthService,
        identifier: &str,
        password: &str,
        ip_address: &str,
    ) -> Result<AdminProfile, AuthError> {
        let outcome = service
            .login(LoginAttempt {
                identifier,
                password,
                ip_address,
                ..LoginAttempt::default()
            })
            .await?;
        match outcome {
            LoginOutcome::Authenticated(admin) => Ok(admin),
            LoginOutcome::TwoFactorRequired(_) => panic!("unexpected two-factor step"),
        }
    }

    async fn second_step(
        service: &SeaOrmAuthService,
        code: Option<&str>,
        challenge: Option<&TwoFactorChallenge>,
    ) -> Result<LoginOutcome, AuthError> {
        service
            .login(LoginAttempt {
                identifier: "admin",
                password: "password",
                ip_address: "127.0.0.1",
                two_factor_code: code,
                challenge,
            })
            .await
    }

    async fn service_with(config: SecurityConfig) -> (Store, Arc<RecordingMailer>, SeaOrmAuthService) {
        let store = Store::new("sqlite::memory:").await.unwrap();
        let mailer = Arc::new(RecordingMailer::default());
        let service = SeaOrmAuthService::new(store.clone(), mailer.clone(), config);
        (store, mailer, service)
    }

    async fn service() -> (Store, Arc<RecordingMailer>, SeaOrmAuthService) {
        service_with(fast_config()).await
    }

    fn signup(username: &str, password: &str) -> SignupRequest {
        SignupRequest {
            username: username.to_string(),
            name: None,
            email: format!("{username}@example.com"),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn login_with_username_or_email() {
        let (store, _, service) = service().await;

        let admin = sign_in(&service, "admin", "password", "127.0.0.1").await.unwrap();
        assert_eq!(admin.public_id, "ADM-1");
        assert!(admin.last_login_at.is_some());

        sign_in(&service, "ADMIN@eduflow.local", "password", "127.0.0.1")
            .await
            .unwrap();

        let activity = store.audit_repo().recent_activity(None, 10).await.unwrap();
        assert!(activity.iter().any(|a| a.action_key == "auth.login"));
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_user_look_the_same() {
        let (_, _, service) = service().await;

        assert!(matches!(
            sign_in(&service, "admin", "wrong", "127.0.0.1").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            sign_in(&service, "ghost", "wrong", "127.0.0.1").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn missing_fields_are_reported() {
        let (_, _, service) = service().await;

        let Err(AuthError::MissingFields(fields)) = sign_in(&service, " ", "", "127.0.0.1").await else {
            panic!("expected missing fields");
        };
        assert_eq!(fields, vec!["username", "password"]);
    }

    #[tokio::test]
    async fn repeated_failures_lock_the_account() {
        let (_, _, service) = service().await;

        for _ in 0..5 {
            assert!(matches!(
                sign_in(&service, "admin", "wrong", "127.0.0.1").await,
                Err(AuthError::InvalidCredentials)
            ));
        }

        assert!(matches!(
            sign_in(&service, "admin", "password", "127.0.0.1").await,
            Err(AuthError::TooManyAttempts)
        ));
    }

    #[tokio::test]
    async fn rate_limit_precedes_credential_check() {
        let (_, _, service) = service_with(SecurityConfig {
            rate_limit_enabled: true,
            account_lock_enabled: false,
            ..fast_config()
        })
        .await;

        for _ in 0..5 {
            let _ = sign_in(&service, "admin", "wrong", "10.0.0.1").await;
        }

        assert!(matches!(
            sign_in(&service, "admin", "password", "10.0.0.1").await,
            Err(AuthError::TooManyAttempts)
        ));
        sign_in(&service, "admin", "password", "10.0.0.2").await.unwrap();
    }

    #[tokio::test]
    async fn pending_admins_cannot_sign_in_until_approved() {
        let (store, _, service) = service().await;

        let pending = service.signup(signup("newbie", "longenough")).await.unwrap();
        assert_eq!(pending.status, "pending");
        assert_eq!(pending.public_id, "ADM-2");

        assert!(matches!(
            sign_in(&service, "newbie", "longenough", "127.0.0.1").await,
            Err(AuthError::AccountPending)
        ));

        let requests = service.list_requests().await.unwrap();
        assert_eq!(requests.len(), 1);

        let approver = store.admin_repo().find_by_username("admin").await.unwrap().unwrap();
        let approved = service
            .handle_request(approver.id, &pending.public_id, RequestDecision::Accept)
            .await
            .unwrap();
        assert_eq!(approved.status, "active");

        sign_in(&service, "newbie", "longenough", "127.0.0.1").await.unwrap();
        assert!(service.list_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejected_admins_are_told_so() {
        let (store, _, service) = service().await;
        let pending = service.signup(signup("nope", "longenough")).await.unwrap();
        let approver = store.admin_repo().find_by_username("admin").await.unwrap().unwrap();

        service
            .handle_request(approver.id, &pending.public_id, RequestDecision::Ignore)
            .await
            .unwrap();

        assert!(matches!(
            sign_in(&service, "nope", "longenough", "127.0.0.1").await,
            Err(AuthError::AccountRejected)
        ));
    }

    #[tokio::test]
    async fn signup_validation() {
        let (_, _, service) = service().await;

        assert!(matches!(
            service.signup(signup("shorty", "short")).await,
            Err(AuthError::WeakPassword(8))
        ));
        assert!(matches!(
            service.signup(signup("admin", "longenough")).await,
            Err(AuthError::Duplicate)
        ));
    }

    #[tokio::test]
    async fn change_password_checks_current() {
        let (store, _, service) = service().await;
        let id = store.admin_repo().find_by_username("admin").await.unwrap().unwrap().id;

        assert!(matches!(
            service.change_password(id, "wrong", "newpassword").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            service.change_password(id, "password", "short").await,
            Err(AuthError::WeakPassword(_))
        ));

        service.change_password(id, "password", "newpassword").await.unwrap();
        sign_in(&service, "admin", "newpassword", "127.0.0.1").await.unwrap();
    }

    #[tokio::test]
    async fn password_reset_round_trip() {
        let (_, mailer, service) = service().await;

        assert_eq!(
            service.request_password_reset("ghost", None, None).await.unwrap(),
            None
        );
        assert!(mailer.sent.lock().unwrap().is_empty());

        let token = service
            .request_password_reset("admin", Some("127.0.0.1".to_string()), None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(mailer.sent.lock().unwrap().len(), 1);

        service.reset_password(&token, "brandnewpass").await.unwrap();
        assert!(matches!(
            service.reset_password(&token, "brandnewpass").await,
            Err(AuthError::InvalidToken)
        ));

        sign_in(&service, "admin", "brandnewpass", "127.0.0.1").await.unwrap();
    }

    #[tokio::test]
    async fn password_without_code_mails_a_challenge() {
        let (store, mailer, service) = service_with(two_factor_config()).await;

        let LoginOutcome::TwoFactorRequired(challenge) =
            second_step(&service, None, None).await.unwrap()
        else {
            panic!("expected a two-factor challenge");
        };
        assert_eq!(challenge.code.len(), 6);
        assert!(!challenge.is_expired(Utc::now()));

        let sent = mailer.sent.lock().unwrap().clone();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "admin@eduflow.local");
        assert!(sent[0].body.contains(&challenge.code));

        let admin = store.admin_repo().find_by_username("admin").await.unwrap().unwrap();
        assert!(admin.last_login_at.is_none());
    }

    #[tokio::test]
    async fn matching_code_completes_the_login() {
        let (store, _, service) = service_with(two_factor_config()).await;

        let LoginOutcome::TwoFactorRequired(challenge) =
            second_step(&service, None, None).await.unwrap()
        else {
            panic!("expected a two-factor challenge");
        };

        let outcome = second_step(&service, Some(challenge.code.as_str()), Some(&challenge))
            .await
            .unwrap();
        assert!(matches!(outcome, LoginOutcome::Authenticated(ref admin) if admin.public_id == "ADM-1"));

        let activity = store.audit_repo().recent_activity(None, 10).await.unwrap();
        assert!(activity.iter().any(|a| a.action_key == "auth.login"));
    }

    #[tokio::test]
    async fn wrong_or_missing_challenge_is_rejected() {
        let (store, _, service) = service_with(SecurityConfig {
            rate_limit_enabled: true,
            ..two_factor_config()
        })
        .await;

        let LoginOutcome::TwoFactorRequired(challenge) =
            second_step(&service, None, None).await.unwrap()
        else {
            panic!("expected a two-factor challenge");
        };
        let wrong = if challenge.code == "000000" { "111111" } else { "000000" };

        assert!(matches!(
            second_step(&service, Some(wrong), Some(&challenge)).await,
            Err(AuthError::InvalidTwoFactor)
        ));
        assert!(matches!(
            second_step(&service, Some(challenge.code.as_str()), None).await,
            Err(AuthError::InvalidTwoFactor)
        ));

        let failures = store
            .login_attempt_repo()
            .count_failures_since("admin", "127.0.0.1", Utc::now() - Duration::minutes(1))
            .await
            .unwrap();
        assert_eq!(failures, 2);
    }

    #[tokio::test]
    async fn expired_code_is_rejected() {
        let (_, _, service) = service_with(two_factor_config()).await;

        let LoginOutcome::TwoFactorRequired(mut challenge) =
            second_step(&service, None, None).await.unwrap()
        else {
            panic!("expected a two-factor challenge");
        };
        challenge.expires_at = (Utc::now() - Duration::seconds(1)).timestamp_millis();

        assert!(matches!(
            second_step(&service, Some(challenge.code.as_str()), Some(&challenge)).await,
            Err(AuthError::InvalidTwoFactor)
        ));
    }

    #[tokio::test]
    async fn wrong_password_never_reaches_the_second_step() {
        let (_, mailer, service) = service_with(two_factor_config()).await;

        let result = service
            .login(LoginAttempt {
                identifier: "admin",
                password: "wrong",
                ip_address: "127.0.0.1",
                ..LoginAttempt::default()
            })
            .await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
        assert!(mailer.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn login_codes_can_be_resent() {
        let (_, mailer, service) = service_with(two_factor_config()).await;

        assert!(service.request_login_code("ghost", "127.0.0.1").await.unwrap().is_none());
        assert!(mailer.sent.lock().unwrap().is_empty());

        let challenge = service
            .request_login_code("admin", "127.0.0.1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(mailer.sent.lock().unwrap().len(), 1);

        let outcome = second_step(&service, Some(challenge.code.as_str()), Some(&challenge))
            .await
            .unwrap();
        assert!(matches!(outcome, LoginOutcome::Authenticated(_)));

        let (_, _, plain) = self::service().await;
        assert!(plain.request_login_code("admin", "127.0.0.1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn email_case_variants_share_the_rate_limit() {
        let (_, _, service) = service_with(SecurityConfig {
            rate_limit_enabled: true,
            account_lock_enabled: false,
            ..fast_config()
        })
        .await;

        for variant in [
            "admin@eduflow.local",
            "Admin@eduflow.local",
            "ADMIN@eduflow.local",
            "admin@EDUFLOW.local",
            "AdMiN@eduflow.local",
        ] {
            assert!(matches!(
                sign_in(&service, variant, "wrong", "10.0.0.9").await,
                Err(AuthError::InvalidCredentials)
            ));
        }

        assert!(matches!(
            sign_in(&service, "aDMIN@eduflow.local", "password", "10.0.0.9").await,
            Err(AuthError::TooManyAttempts)
        ));
    }

    #[tokio::test]
    async fn expired_lock_restores_full_attempt_budget() {
        let (store, _, service) = service().await;

        for _ in 0..5 {
            let _ = sign_in(&service, "admin", "wrong", "127.0.0.1").await;
        }
        let admin = store.admin_repo().find_by_username("admin").await.unwrap().unwrap();
        let past = crate::db::timestamp(Utc::now() - Duration::minutes(1));
        store.admin_repo().lock_until(admin.id, past).await.unwrap();

        assert!(matches!(
            sign_in(&service, "admin", "wrong", "127.0.0.1").await,
            Err(AuthError::InvalidCredentials)
        ));
        let admin = store.admin_repo().find_by_username("admin").await.unwrap().unwrap();
        assert_eq!(admin.failed_login_attempts, 1);

        sign_in(&service, "admin", "password", "127.0.0.1").await.unwrap();
    }
}
