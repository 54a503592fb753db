// src/middleware/rbac.rs

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use std::marker::PhantomData;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::auth::User,
};

/// Uma permissão do catálogo, identificada pelo slug.
pub trait PermissionDef: Send + Sync + 'static {
    fn slug() -> &'static str;
}

/// Guardião: a rota só executa se o usuário tiver a permissão `T` (admin passa sempre).
pub struct RequirePermission<T>(pub PhantomData<T>);

impl<T, S> FromRequestParts<S> for RequirePermission<T>
where
    T: PermissionDef,
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let locale = Locale::from_headers(&parts.headers);
        let reject = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

        let user = authenticated(parts).map_err(reject)?;
        let required_perm = T::slug();

        let allowed = app_state
            .rbac_service
            .user_can(&user, required_perm)
            .await
            .map_err(reject)?;

        if !allowed {
            tracing::warn!(user_id = %user.id, permission = required_perm, "Acesso negado");
            return Err(reject(AppError::Forbidden(required_perm.to_string())));
        }

        Ok(RequirePermission(PhantomData))
    }
}

/// Rotas de administração de usuários.
pub struct RequireAdmin;

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let locale = Locale::from_headers(&parts.headers);

        let user = authenticated(parts).map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
        if !user.is_admin() {
            return Err(AppError::AdminRequired.to_api_error(&locale, &app_state.i18n_store));
        }
        Ok(RequireAdmin)
    }
}

fn authenticated(parts: &Parts) -> Result<User, AppError> {
    parts
        .extensions
        .get::<AuthenticatedUser>()
        .map(|u| u.0.clone())
        .ok_or(AppError::InvalidToken)
}

// ---
// PERMISSÕES DO SISTEMA (mesmos slugs da tabela permissions)
// ---

pub struct PermSalesRead;
impl PermissionDef for PermSalesRead {
    fn slug() -> &'static str { "sales:read" }
}

pub struct PermSalesWrite;
impl PermissionDef for PermSalesWrite {
    fn slug() -> &'static str { "sales:write" }
}

pub struct PermRentalsRead;
impl PermissionDef for PermRentalsRead {
    fn slug() -> &'static str { "rentals:read" }
}

pub struct PermRentalsWrite;
impl PermissionDef for PermRentalsWrite {
    fn slug() -> &'static str { "rentals:write" }
}

pub struct PermCreativesWrite;
impl PermissionDef for PermCreativesWrite {
    fn slug() -> &'static str { "creatives:write" }
}

pub struct PermSettingsWrite;
impl PermissionDef for PermSettingsWrite {
    fn slug() -> &'static str { "settings:write" }
}
