use std::sync::Arc;

use crate::config::Config;
use crate::db::Store;
use crate::services::{
    AuditService, AuthService, LogMailer, Mailer, PermissionService, RegistryService,
    SeaOrmAuthService, SeaOrmPermissionService, SeaOrmRegistryService, SettingsService,
    StepUpAuthorizer,
};

/// Everything a request handler or CLI command needs, built once at startup.
#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<Config>,

    pub store: Store,

    pub audit: AuditService,

    pub step_up: StepUpAuthorizer,

    pub auth_service: Arc<dyn AuthService>,

    pub permission_service: Arc<dyn PermissionService>,

    pub registry_service: Arc<dyn RegistryService>,

    pub settings_service: Arc<SettingsService>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        Self::with_mailer(config, Arc::new(LogMailer)).await
    }

    pub async fn with_mailer(config: Config, mailer: Arc<dyn Mailer>) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        Ok(Self::from_store(config, store, mailer))
    }

    /// Wires the services over an already migrated store.
    #[must_use]
    pub fn from_store(config: Config, store: Store, mailer: Arc<dyn Mailer>) -> Self {
        let security = config.security.clone();

        let permission_service = Arc::new(SeaOrmPermissionService::new(
            store.clone(),
            mailer.clone(),
            security.clone(),
        )) as Arc<dyn PermissionService + Send + Sync + 'static>;

        let step_up =
            StepUpAuthorizer::new(store.clone(), permission_service.clone(), security.clone());

        let auth_service = Arc::new(SeaOrmAuthService::new(
            store.clone(),
            mailer,
            security.clone(),
        )) as Arc<dyn AuthService + Send + Sync + 'static>;

        let registry_service = Arc::new(SeaOrmRegistryService::new(
            store.clone(),
            step_up.clone(),
        )) as Arc<dyn RegistryService + Send + Sync + 'static>;

        let settings_service = Arc::new(SettingsService::new(
            store.clone(),
            permission_service.clone(),
            security,
        ));

        Self {
            config: Arc::new(config),
            audit: AuditService::new(store.clone()),
            store,
            step_up,
            auth_service,
            permission_service,
            registry_service,
            settings_service,
        }
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }
}
