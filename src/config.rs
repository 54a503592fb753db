// src/config.rs

use std::{env, path::PathBuf, str::FromStr, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    common::{
        i18n::I18nStore,
        retry::{retry_with_backoff, RetryPolicy},
    },
    db::{PgReminderStore, PropertyRepository, RbacRepository, RentalRepository, SettingsRepository, UserRepository},
    services::{
        alert_service::AlertService, auth::AuthService, document_service::DocumentService,
        property_service::PropertyService, rbac_service::RbacService, reminder_service::ReminderService,
        rental_service::RentalService,
    },
};

/// Variáveis de ambiente lidas na inicialização.
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub db_max_connections: u32,
    pub token_ttl_days: i64,
    pub fonts_dir: PathBuf,
}

fn var_or<T: FromStr>(name: &str, default: T) -> anyhow::Result<T>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("{} inválida ({}): {}", name, raw, e)),
        Err(_) => Ok(default),
    }
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL deve ser definida")?,
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET deve ser definido")?,
            bind_addr: var_or("BIND_ADDR", "0.0.0.0:3000".to_string())?,
            db_max_connections: var_or("DB_MAX_CONNECTIONS", 5)?,
            token_ttl_days: var_or("TOKEN_TTL_DAYS", 7)?,
            fonts_dir: var_or("FONTS_DIR", PathBuf::from("./fonts"))?,
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub i18n_store: Arc<I18nStore>,

    pub settings_repo: SettingsRepository,

    pub auth_service: AuthService,
    pub rbac_service: RbacService,
    pub property_service: PropertyService,
    pub reminder_service: ReminderService,
    pub rental_service: RentalService,
    pub alert_service: AlertService,
    pub document_service: DocumentService,
}

impl AppState {
    pub async fn new(settings: &Settings) -> anyhow::Result<Self> {
        // O banco pode subir depois da API (docker compose)
        let db_pool = retry_with_backoff(
            RetryPolicy::default(),
            "conectar ao banco",
            |_: &sqlx::Error| true,
            || {
                PgPoolOptions::new()
                    .max_connections(settings.db_max_connections)
                    .acquire_timeout(Duration::from_secs(3))
                    .connect(&settings.database_url)
            },
        )
        .await
        .context("Falha ao conectar ao banco de dados")?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        let i18n_store = Arc::new(I18nStore::load()?);

        // --- Monta o gráfico de dependências ---
        let user_repo = UserRepository::new(db_pool.clone());
        let rbac_repo = RbacRepository::new(db_pool.clone());
        let property_repo = PropertyRepository::new(db_pool.clone());
        let rental_repo = RentalRepository::new(db_pool.clone());
        let settings_repo = SettingsRepository::new(db_pool.clone());
        let reminder_store = Arc::new(PgReminderStore::new(db_pool.clone()));

        let auth_service = AuthService::new(
            user_repo.clone(),
            settings.jwt_secret.clone(),
            settings.token_ttl_days,
            db_pool.clone(),
        );
        let rbac_service = RbacService::new(rbac_repo, user_repo, db_pool.clone());
        let reminder_service = ReminderService::new(reminder_store);
        let property_service = PropertyService::new(property_repo, reminder_service.clone());
        let rental_service = RentalService::new(rental_repo.clone());
        let alert_service = AlertService::new(rental_repo.clone());
        let document_service = DocumentService::new(rental_repo, settings_repo.clone(), settings.fonts_dir.clone());

        Ok(Self {
            db_pool,
            i18n_store,
            settings_repo,
            auth_service,
            rbac_service,
            property_service,
            reminder_service,
            rental_service,
            alert_service,
            document_service,
        })
    }
}
