// src/handlers/reminders.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{
        i18n::Locale,
        rbac::{PermSalesRead, PermSalesWrite, RequirePermission},
    },
    models::reminder::{Reminder, ReminderView},
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct HoursPayload {
    #[validate(range(min = 1, max = 720, message = "invalid_interval"))]
    #[schema(example = 48)]
    pub hours: i32,
}

// GET /api/reminders
#[utoipa::path(
    get,
    path = "/api/reminders",
    tag = "Reminders",
    responses(
        (status = 200, description = "Lembretes ativos, atrasados primeiro", body = Vec<ReminderView>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_reminders(
    State(app_state): State<AppState>,
    locale: Locale,
    _perm: RequirePermission<PermSalesRead>,
) -> Result<impl IntoResponse, ApiError> {
    let reminders = app_state
        .reminder_service
        .list_active(Utc::now())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(reminders))
}

// GET /api/properties/{id}/reminder
#[utoipa::path(
    get,
    path = "/api/properties/{id}/reminder",
    tag = "Reminders",
    params(("id" = Uuid, Path, description = "ID do imóvel")),
    responses(
        (status = 200, description = "Lembrete ativo do imóvel (ou nulo)", body = Option<Reminder>)
    ),
    security(("api_jwt" = []))
)]
pub async fn get_property_reminder(
    State(app_state): State<AppState>,
    locale: Locale,
    _perm: RequirePermission<PermSalesRead>,
    Path(property_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let reminder = app_state
        .reminder_service
        .active_for_property(property_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(reminder))
}

// PUT /api/properties/{id}/reminder
#[utoipa::path(
    put,
    path = "/api/properties/{id}/reminder",
    tag = "Reminders",
    request_body = HoursPayload,
    params(("id" = Uuid, Path, description = "ID do imóvel")),
    responses(
        (status = 200, description = "Lembrete customizado para a etapa atual", body = Reminder),
        (status = 400, description = "Intervalo fora de 1..720 horas"),
        (status = 404, description = "Imóvel não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn set_custom_interval(
    State(app_state): State<AppState>,
    locale: Locale,
    _perm: RequirePermission<PermSalesWrite>,
    Path(property_id): Path<Uuid>,
    Json(payload): Json<HoursPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let reminder = app_state
        .reminder_service
        .set_custom_interval(property_id, payload.hours)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(reminder))
}

// DELETE /api/properties/{id}/reminder
#[utoipa::path(
    delete,
    path = "/api/properties/{id}/reminder",
    tag = "Reminders",
    params(("id" = Uuid, Path, description = "ID do imóvel")),
    responses(
        (status = 204, description = "Lembretes do imóvel desativados"),
        (status = 404, description = "Imóvel não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn disable_reminder(
    State(app_state): State<AppState>,
    locale: Locale,
    _perm: RequirePermission<PermSalesWrite>,
    Path(property_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .reminder_service
        .disable(property_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}

// POST /api/reminders/{id}/snooze
#[utoipa::path(
    post,
    path = "/api/reminders/{id}/snooze",
    tag = "Reminders",
    request_body = HoursPayload,
    params(("id" = Uuid, Path, description = "ID do lembrete")),
    responses(
        (status = 200, description = "Próximo aviso adiado", body = Reminder),
        (status = 404, description = "Lembrete não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn snooze_reminder(
    State(app_state): State<AppState>,
    locale: Locale,
    _perm: RequirePermission<PermSalesWrite>,
    Path(reminder_id): Path<Uuid>,
    Json(payload): Json<HoursPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let reminder = app_state
        .reminder_service
        .snooze(reminder_id, payload.hours)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(reminder))
}
