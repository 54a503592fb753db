// src/models/rbac.rs

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use sqlx::FromRow;
use serde_json::json;
use utoipa::ToSchema;

use crate::models::auth::{User, UserRole};

// O que sai do banco (Tabela permissions)
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    #[schema(example = "550e8400-e29b-41d4-a716-446655440001")]
    pub id: Uuid,

    #[schema(example = "rentals:read")]
    pub slug: String,

    #[schema(example = "Visualizar contratos, pagamentos e alertas")]
    pub description: String,

    #[schema(example = "RENTALS")]
    pub module: String,
}

// Usuário + slugs que ele possui (tela de administração)
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserWithPermissions {
    #[serde(flatten)]
    pub user: User,

    #[schema(example = json!(["sales:read", "rentals:read"]))]
    pub permissions: Vec<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserPayload {
    pub role: Option<UserRole>,
    #[schema(example = true)]
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SetPermissionsPayload {
    #[schema(example = json!(["sales:read", "sales:write"]))]
    pub permissions: Vec<String>,
}
