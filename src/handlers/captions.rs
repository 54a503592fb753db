// src/handlers/captions.rs

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{
        i18n::Locale,
        rbac::{PermCreativesWrite, RequirePermission},
    },
    models::caption::{Caption, CaptionTone, SocialPlatform},
    services::caption_service,
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerateCaptionsPayload {
    #[validate(length(min = 1, message = "required"))]
    #[schema(example = json!(["instagram", "whatsapp"]))]
    pub platforms: Vec<SocialPlatform>,

    #[serde(default)]
    pub tone: CaptionTone,
}

// POST /api/properties/{id}/captions
#[utoipa::path(
    post,
    path = "/api/properties/{id}/captions",
    tag = "Creatives",
    request_body = GenerateCaptionsPayload,
    params(("id" = Uuid, Path, description = "ID do imóvel")),
    responses(
        (status = 200, description = "Uma legenda por rede pedida", body = Vec<Caption>),
        (status = 404, description = "Imóvel não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn generate_captions(
    State(app_state): State<AppState>,
    locale: Locale,
    _perm: RequirePermission<PermCreativesWrite>,
    Path(property_id): Path<Uuid>,
    Json(payload): Json<GenerateCaptionsPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let property = app_state
        .property_service
        .get_property(&app_state.db_pool, property_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let settings = app_state
        .settings_repo
        .get_settings(&app_state.db_pool)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let captions = caption_service::generate_captions(&property, &settings, &payload.platforms, payload.tone);

    Ok(Json(captions))
}
