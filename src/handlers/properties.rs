// src/handlers/properties.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    db::property_repo::PropertyFields,
    middleware::{
        i18n::Locale,
        rbac::{PermSalesRead, PermSalesWrite, RequirePermission},
    },
    models::{
        property::{PipelineKind, Property, Stage, StageConfig, STAGE_TABLE},
        reminder::Reminder,
    },
};

fn validate_not_negative(val: &Decimal) -> Result<(), ValidationError> {
    if val.is_sign_negative() {
        let mut err = ValidationError::new("range");
        err.add_param("min".into(), &0.0);
        err.message = Some("O valor não pode ser negativo.".into());
        return Err(err);
    }
    Ok(())
}

// =============================================================================
//  PAYLOADS
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePropertyPayload {
    #[validate(length(min = 1, max = 32, message = "required"))]
    #[schema(example = "AP-1024")]
    pub code: String,

    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "Apartamento 3 quartos com varanda gourmet")]
    pub title: String,

    pub pipeline: PipelineKind,

    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "Apartamento")]
    pub property_type: String,

    pub neighborhood: Option<String>,
    pub city: Option<String>,

    #[validate(range(min = 0, max = 99))]
    pub bedrooms: Option<i32>,
    #[validate(range(min = 0, max = 99))]
    pub bathrooms: Option<i32>,
    #[validate(range(min = 0, max = 99))]
    pub parking_spots: Option<i32>,

    #[validate(custom(function = "validate_not_negative"))]
    pub area_m2: Option<Decimal>,

    #[validate(custom(function = "validate_not_negative"))]
    pub price: Option<Decimal>,

    pub description: Option<String>,

    #[serde(default)]
    #[schema(example = json!(["Varanda gourmet", "Próximo ao metrô"]))]
    pub highlights: Vec<String>,

    pub owner_name: Option<String>,
    pub assigned_to: Option<Uuid>,
}

impl CreatePropertyPayload {
    fn fields(&self) -> PropertyFields {
        PropertyFields {
            title: Some(self.title.clone()),
            property_type: Some(self.property_type.clone()),
            neighborhood: self.neighborhood.clone(),
            city: self.city.clone(),
            bedrooms: self.bedrooms,
            bathrooms: self.bathrooms,
            parking_spots: self.parking_spots,
            area_m2: self.area_m2,
            price: self.price,
            description: self.description.clone(),
            highlights: Some(self.highlights.clone()),
            owner_name: self.owner_name.clone(),
            assigned_to: self.assigned_to,
        }
    }
}

// Campos ausentes mantêm o valor atual
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePropertyPayload {
    #[validate(length(min = 1, message = "required"))]
    pub title: Option<String>,
    #[validate(length(min = 1, message = "required"))]
    pub property_type: Option<String>,
    pub neighborhood: Option<String>,
    pub city: Option<String>,
    #[validate(range(min = 0, max = 99))]
    pub bedrooms: Option<i32>,
    #[validate(range(min = 0, max = 99))]
    pub bathrooms: Option<i32>,
    #[validate(range(min = 0, max = 99))]
    pub parking_spots: Option<i32>,
    #[validate(custom(function = "validate_not_negative"))]
    pub area_m2: Option<Decimal>,
    #[validate(custom(function = "validate_not_negative"))]
    pub price: Option<Decimal>,
    pub description: Option<String>,
    pub highlights: Option<Vec<String>>,
    pub owner_name: Option<String>,
    pub assigned_to: Option<Uuid>,
}

impl From<UpdatePropertyPayload> for PropertyFields {
    fn from(p: UpdatePropertyPayload) -> Self {
        PropertyFields {
            title: p.title,
            property_type: p.property_type,
            neighborhood: p.neighborhood,
            city: p.city,
            bedrooms: p.bedrooms,
            bathrooms: p.bathrooms,
            parking_spots: p.parking_spots,
            area_m2: p.area_m2,
            price: p.price,
            description: p.description,
            highlights: p.highlights,
            owner_name: p.owner_name,
            assigned_to: p.assigned_to,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListPropertiesQuery {
    pub pipeline: Option<PipelineKind>,
    pub stage: Option<Stage>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct MoveStagePayload {
    #[schema(example = "visitas")]
    pub stage: Stage,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MoveStageResponse {
    pub property: Property,
    /// Lembrete ativo da nova etapa (nulo se a etapa não gera lembretes).
    pub reminder: Option<Reminder>,
}

// =============================================================================
//  HANDLERS
// =============================================================================

// GET /api/stages
#[utoipa::path(
    get,
    path = "/api/stages",
    tag = "Pipeline",
    responses(
        (status = 200, description = "Etapas dos funis com intervalo padrão de lembrete", body = Vec<StageConfig>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_stages() -> Json<Vec<StageConfig>> {
    Json(STAGE_TABLE.to_vec())
}

// POST /api/properties
#[utoipa::path(
    post,
    path = "/api/properties",
    tag = "Pipeline",
    request_body = CreatePropertyPayload,
    responses(
        (status = 201, description = "Imóvel cadastrado na primeira etapa do funil", body = Property),
        (status = 400, description = "Dados inválidos"),
        (status = 409, description = "Código já utilizado")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_property(
    State(app_state): State<AppState>,
    locale: Locale,
    _perm: RequirePermission<PermSalesWrite>,
    Json(payload): Json<CreatePropertyPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let property = app_state
        .property_service
        .create_property(&app_state.db_pool, payload.code.trim(), payload.pipeline, &payload.fields())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(property)))
}

// GET /api/properties?pipeline=SALE&stage=visitas
#[utoipa::path(
    get,
    path = "/api/properties",
    tag = "Pipeline",
    params(ListPropertiesQuery),
    responses(
        (status = 200, description = "Imóveis do funil", body = Vec<Property>),
        (status = 400, description = "Etapa não pertence ao funil")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_properties(
    State(app_state): State<AppState>,
    locale: Locale,
    _perm: RequirePermission<PermSalesRead>,
    Query(query): Query<ListPropertiesQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let properties = app_state
        .property_service
        .list_properties(&app_state.db_pool, query.pipeline, query.stage)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(properties))
}

// GET /api/properties/{id}
#[utoipa::path(
    get,
    path = "/api/properties/{id}",
    tag = "Pipeline",
    params(("id" = Uuid, Path, description = "ID do imóvel")),
    responses(
        (status = 200, description = "Imóvel", body = Property),
        (status = 404, description = "Imóvel não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_property(
    State(app_state): State<AppState>,
    locale: Locale,
    _perm: RequirePermission<PermSalesRead>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let property = app_state
        .property_service
        .get_property(&app_state.db_pool, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(property))
}

// PATCH /api/properties/{id}
#[utoipa::path(
    patch,
    path = "/api/properties/{id}",
    tag = "Pipeline",
    request_body = UpdatePropertyPayload,
    params(("id" = Uuid, Path, description = "ID do imóvel")),
    responses(
        (status = 200, description = "Imóvel atualizado", body = Property),
        (status = 404, description = "Imóvel não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_property(
    State(app_state): State<AppState>,
    locale: Locale,
    _perm: RequirePermission<PermSalesWrite>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePropertyPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let property = app_state
        .property_service
        .update_property(&app_state.db_pool, id, &PropertyFields::from(payload))
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(property))
}

// POST /api/properties/{id}/stage
#[utoipa::path(
    post,
    path = "/api/properties/{id}/stage",
    tag = "Pipeline",
    request_body = MoveStagePayload,
    params(("id" = Uuid, Path, description = "ID do imóvel")),
    responses(
        (status = 200, description = "Etapa alterada e lembrete reagendado", body = MoveStageResponse),
        (status = 400, description = "Etapa de outro funil"),
        (status = 404, description = "Imóvel não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn move_stage(
    State(app_state): State<AppState>,
    locale: Locale,
    _perm: RequirePermission<PermSalesWrite>,
    Path(id): Path<Uuid>,
    Json(payload): Json<MoveStagePayload>,
) -> Result<impl IntoResponse, ApiError> {
    let (property, reminder) = app_state
        .property_service
        .move_stage(&app_state.db_pool, id, payload.stage)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(MoveStageResponse { property, reminder }))
}
