// src/models/settings.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

// Linha única com os dados da imobiliária (recibos e legendas)
#[derive(Debug, Clone, Default, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AgencySettings {
    #[schema(example = "Imobiliária Horizonte Ltda")]
    pub company_name: Option<String>,

    #[schema(example = "12.345.678/0001-99")]
    pub document_number: Option<String>,

    #[schema(example = "CRECI-J 45678")]
    pub creci: Option<String>,

    #[schema(example = "Rua das Flores, 123 - Centro")]
    pub address: Option<String>,

    #[schema(example = "(11) 99999-8888")]
    pub phone: Option<String>,

    #[schema(example = "contato@horizonte.com.br")]
    pub email: Option<String>,

    #[schema(example = "12.345.678/0001-99")]
    pub pix_key: Option<String>,

    #[schema(example = "CNPJ")]
    pub pix_key_type: Option<String>,

    #[schema(example = "@horizonteimoveis")]
    pub instagram_handle: Option<String>,

    pub updated_at: Option<DateTime<Utc>>,
}

// Campos ausentes mantêm o valor atual
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSettingsRequest {
    #[schema(example = "Imobiliária Horizonte Ltda")]
    pub company_name: Option<String>,

    #[schema(example = "12.345.678/0001-99")]
    pub document_number: Option<String>,

    #[schema(example = "CRECI-J 45678")]
    pub creci: Option<String>,

    #[schema(example = "Av. Paulista, 1000")]
    pub address: Option<String>,

    pub phone: Option<String>,

    #[validate(email(message = "invalid_email"))]
    pub email: Option<String>,

    pub pix_key: Option<String>,

    #[schema(example = "CNPJ")]
    pub pix_key_type: Option<String>,

    #[validate(length(min = 2, message = "invalid_handle"))]
    pub instagram_handle: Option<String>,
}
