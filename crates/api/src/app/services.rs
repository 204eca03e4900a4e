//! Service wiring: storage backend, auth facade, startup bootstrap.

use std::sync::Arc;

use classifieds_auth::{AuthConfig, AuthError, AuthService, Clock, Role, SystemClock};
use classifieds_infra::{
    AdminBootstrap, AppConfig, InMemoryStore, NewUser, PostgresStore, Store, StoreError,
};

pub type AppAuth = AuthService<Arc<dyn Store>>;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Shared state behind every handler.
pub struct AppServices {
    pub store: Arc<dyn Store>,
    pub auth: AppAuth,
    // Kept so the pool can be closed on shutdown.
    pg: Option<PostgresStore>,
}

impl AppServices {
    pub fn new(
        config: AuthConfig,
        clock: Arc<dyn Clock>,
        store: Arc<dyn Store>,
    ) -> Result<Self, AuthError> {
        let auth = AuthService::new(config, clock, store.clone())?;
        Ok(Self {
            store,
            auth,
            pg: None,
        })
    }

    /// Create the configured admin account unless the username already exists.
    pub async fn ensure_admin(&self, admin: &AdminBootstrap) -> Result<(), StartupError> {
        if self
            .store
            .get_user_by_username(&admin.username)
            .await?
            .is_some()
        {
            tracing::info!(username = %admin.username, "admin account already present");
            return Ok(());
        }

        let password_verifier = self.auth.hash_password(&admin.password)?;
        let created = self
            .store
            .create_user(NewUser {
                username: admin.username.clone(),
                email: format!("{}@localhost", admin.username),
                password_verifier,
                role: Role::Admin,
            })
            .await?;

        tracing::info!(subject_id = %created.id, username = %created.username, "admin account created");
        Ok(())
    }

    pub async fn shutdown(&self) {
        if let Some(pg) = &self.pg {
            pg.close().await;
            tracing::info!("database pool closed");
        }
    }
}

/// Build services from configuration: Postgres when `DATABASE_URL` is set,
/// otherwise an in-memory store.
pub async fn build_services(config: &AppConfig) -> Result<AppServices, StartupError> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let services = match &config.database_url {
        Some(url) => {
            let pg = PostgresStore::connect(url).await?;
            pg.migrate().await?;
            tracing::info!("using postgres store");

            let store: Arc<dyn Store> = Arc::new(pg.clone());
            let mut services = AppServices::new(config.auth.clone(), clock, store)?;
            services.pg = Some(pg);
            services
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory store (data is not persisted)");
            let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
            AppServices::new(config.auth.clone(), clock, store)?
        }
    };

    if let Some(admin) = &config.admin {
        services.ensure_admin(admin).await?;
    }

    Ok(services)
}
