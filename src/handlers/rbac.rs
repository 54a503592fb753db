// src/handlers/rbac.rs

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::{
    common::error::ApiError,
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale, rbac::RequireAdmin},
    models::rbac::{Permission, SetPermissionsPayload, UpdateUserPayload, UserWithPermissions},
};

// GET /api/permissions (catálogo para a tela de permissões)
#[utoipa::path(
    get,
    path = "/api/permissions",
    tag = "RBAC",
    responses(
        (status = 200, description = "Permissões do sistema", body = Vec<Permission>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_permissions(
    State(app_state): State<AppState>,
    locale: Locale,
) -> Result<impl IntoResponse, ApiError> {
    let permissions = app_state
        .rbac_service
        .list_system_permissions()
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(permissions))
}

// GET /api/admin/users
#[utoipa::path(
    get,
    path = "/api/admin/users",
    tag = "RBAC",
    responses(
        (status = 200, description = "Usuários e suas permissões", body = Vec<UserWithPermissions>),
        (status = 403, description = "Apenas administradores")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_users(
    State(app_state): State<AppState>,
    locale: Locale,
    _admin: RequireAdmin,
) -> Result<impl IntoResponse, ApiError> {
    let users = app_state
        .rbac_service
        .list_users()
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(users))
}

// PATCH /api/admin/users/{id}
#[utoipa::path(
    patch,
    path = "/api/admin/users/{id}",
    tag = "RBAC",
    request_body = UpdateUserPayload,
    params(("id" = Uuid, Path, description = "ID do usuário")),
    responses(
        (status = 200, description = "Usuário atualizado", body = UserWithPermissions),
        (status = 403, description = "Apenas administradores"),
        (status = 404, description = "Usuário não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_user(
    State(app_state): State<AppState>,
    locale: Locale,
    _admin: RequireAdmin,
    AuthenticatedUser(acting_user): AuthenticatedUser,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<UpdateUserPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let user = app_state
        .rbac_service
        .update_user(&acting_user, user_id, payload.role, payload.is_active)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(user))
}

// PUT /api/admin/users/{id}/permissions
#[utoipa::path(
    put,
    path = "/api/admin/users/{id}/permissions",
    tag = "RBAC",
    request_body = SetPermissionsPayload,
    params(("id" = Uuid, Path, description = "ID do usuário")),
    responses(
        (status = 200, description = "Permissões substituídas", body = UserWithPermissions),
        (status = 403, description = "Apenas administradores"),
        (status = 404, description = "Usuário ou permissão inexistente")
    ),
    security(("api_jwt" = []))
)]
pub async fn set_user_permissions(
    State(app_state): State<AppState>,
    locale: Locale,
    _admin: RequireAdmin,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<SetPermissionsPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let user = app_state
        .rbac_service
        .set_user_permissions(user_id, &payload.permissions)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(user))
}
