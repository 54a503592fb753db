// src/db/settings_repo.rs

use sqlx::{PgPool, Postgres, Executor};
use crate::{
    common::error::AppError,
    models::settings::{AgencySettings, UpdateSettingsRequest},
};

const SETTINGS_COLUMNS: &str = "company_name, document_number, creci, address, phone, email, \
     pix_key, pix_key_type, instagram_handle, updated_at";

#[derive(Clone)]
pub struct SettingsRepository {
    pool: PgPool,
}

impl SettingsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // A migração cria a linha; se alguém apagou, devolvemos tudo vazio
    pub async fn get_settings<'e, E>(&self, executor: E) -> Result<AgencySettings, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let settings = sqlx::query_as::<_, AgencySettings>(&format!(
            "SELECT {SETTINGS_COLUMNS} FROM agency_settings WHERE id"
        ))
            .fetch_optional(executor)
            .await?;

        Ok(settings.unwrap_or_default())
    }

    pub async fn update_settings<'e, E>(
        &self,
        executor: E,
        data: &UpdateSettingsRequest,
    ) -> Result<AgencySettings, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let settings = sqlx::query_as::<_, AgencySettings>(&format!(
            r#"
            INSERT INTO agency_settings (
                id, company_name, document_number, creci, address, phone, email,
                pix_key, pix_key_type, instagram_handle
            )
            VALUES (TRUE, $1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (id) DO UPDATE SET
                company_name = COALESCE(EXCLUDED.company_name, agency_settings.company_name),
                document_number = COALESCE(EXCLUDED.document_number, agency_settings.document_number),
                creci = COALESCE(EXCLUDED.creci, agency_settings.creci),
                address = COALESCE(EXCLUDED.address, agency_settings.address),
                phone = COALESCE(EXCLUDED.phone, agency_settings.phone),
                email = COALESCE(EXCLUDED.email, agency_settings.email),
                pix_key = COALESCE(EXCLUDED.pix_key, agency_settings.pix_key),
                pix_key_type = COALESCE(EXCLUDED.pix_key_type, agency_settings.pix_key_type),
                instagram_handle = COALESCE(EXCLUDED.instagram_handle, agency_settings.instagram_handle),
                updated_at = NOW()
            RETURNING {SETTINGS_COLUMNS}
            "#
        ))
            .bind(data.company_name.as_deref())
            .bind(data.document_number.as_deref())
            .bind(data.creci.as_deref())
            .bind(data.address.as_deref())
            .bind(data.phone.as_deref())
            .bind(data.email.as_deref())
            .bind(data.pix_key.as_deref())
            .bind(data.pix_key_type.as_deref())
            .bind(data.instagram_handle.as_deref())
            .fetch_one(executor)
            .await?;

        Ok(settings)
    }
}
