// src/handlers/rentals.rs

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    db::rental_repo::NewContract,
    middleware::{
        i18n::Locale,
        rbac::{PermRentalsRead, PermRentalsWrite, RequirePermission},
    },
    models::rental::{AlertConfig, PaymentStatus, PaymentView, RentalAlert, RentalContract},
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

fn validate_positive(val: &Decimal) -> Result<(), ValidationError> {
    if *val <= Decimal::ZERO {
        let mut err = ValidationError::new("range");
        err.add_param("min".into(), &0.01);
        err.message = Some("O valor deve ser maior que zero.".into());
        return Err(err);
    }
    Ok(())
}

// =============================================================================
//  1. CONTRATOS
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateContractPayload {
    pub property_id: Option<Uuid>,

    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "AP-1024")]
    pub property_code: String,

    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "Carlos Pereira")]
    pub tenant_name: String,
    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "123.456.789-00")]
    pub tenant_document: String,
    #[validate(email(message = "invalid_email"))]
    pub tenant_email: Option<String>,
    pub tenant_phone: Option<String>,

    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "Maria Oliveira")]
    pub owner_name: String,
    pub owner_document: Option<String>,

    #[validate(custom(function = "validate_positive"))]
    #[schema(example = "3200.00")]
    pub rent_value: Decimal,
    #[serde(default)]
    #[validate(custom(function = "validate_not_negative"))]
    pub condominium_fee: Decimal,
    #[serde(default)]
    #[validate(custom(function = "validate_not_negative"))]
    pub iptu_value: Decimal,

    #[validate(range(min = 1, max = 28, message = "invalid_due_day"))]
    #[schema(example = 10)]
    pub due_day: i32,

    #[schema(value_type = String, format = Date, example = "2024-01-01")]
    pub start_date: NaiveDate,
    #[schema(value_type = String, format = Date, example = "2026-12-31")]
    pub end_date: NaiveDate,

    #[schema(example = "IGP-M")]
    pub adjustment_index: Option<String>,
}

impl From<CreateContractPayload> for NewContract {
    fn from(p: CreateContractPayload) -> Self {
        NewContract {
            property_id: p.property_id,
            property_code: p.property_code,
            tenant_name: p.tenant_name,
            tenant_document: p.tenant_document,
            tenant_email: p.tenant_email,
            tenant_phone: p.tenant_phone,
            owner_name: p.owner_name,
            owner_document: p.owner_document,
            rent_value: p.rent_value,
            condominium_fee: p.condominium_fee,
            iptu_value: p.iptu_value,
            due_day: p.due_day,
            start_date: p.start_date,
            end_date: p.end_date,
            adjustment_index: p.adjustment_index,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ContractWithPayments {
    pub contract: RentalContract,
    pub payments: Vec<PaymentView>,
}

// POST /api/rentals/contracts
#[utoipa::path(
    post,
    path = "/api/rentals/contracts",
    tag = "Rentals",
    request_body = CreateContractPayload,
    responses(
        (status = 201, description = "Contrato criado com o carnê de pagamentos", body = ContractWithPayments),
        (status = 400, description = "Vigência ou valores inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_contract(
    State(app_state): State<AppState>,
    locale: Locale,
    _perm: RequirePermission<PermRentalsWrite>,
    Json(payload): Json<CreateContractPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let (contract, payments) = app_state
        .rental_service
        .create_contract(&app_state.db_pool, NewContract::from(payload))
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(ContractWithPayments { contract, payments })))
}

// GET /api/rentals/contracts
#[utoipa::path(
    get,
    path = "/api/rentals/contracts",
    tag = "Rentals",
    responses(
        (status = 200, description = "Contratos com status recalculado", body = Vec<RentalContract>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_contracts(
    State(app_state): State<AppState>,
    locale: Locale,
    _perm: RequirePermission<PermRentalsRead>,
) -> Result<impl IntoResponse, ApiError> {
    let contracts = app_state
        .rental_service
        .list_contracts(&app_state.db_pool)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(contracts))
}

// GET /api/rentals/contracts/{id}
#[utoipa::path(
    get,
    path = "/api/rentals/contracts/{id}",
    tag = "Rentals",
    params(("id" = Uuid, Path, description = "ID do contrato")),
    responses(
        (status = 200, description = "Contrato", body = RentalContract),
        (status = 404, description = "Contrato não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_contract(
    State(app_state): State<AppState>,
    locale: Locale,
    _perm: RequirePermission<PermRentalsRead>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let contract = app_state
        .rental_service
        .get_contract(&app_state.db_pool, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(contract))
}

// POST /api/rentals/contracts/{id}/terminate
#[utoipa::path(
    post,
    path = "/api/rentals/contracts/{id}/terminate",
    tag = "Rentals",
    params(("id" = Uuid, Path, description = "ID do contrato")),
    responses(
        (status = 200, description = "Contrato rescindido; parcelas futuras canceladas", body = RentalContract),
        (status = 400, description = "Contrato já encerrado"),
        (status = 404, description = "Contrato não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn terminate_contract(
    State(app_state): State<AppState>,
    locale: Locale,
    _perm: RequirePermission<PermRentalsWrite>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let contract = app_state
        .rental_service
        .terminate_contract(&app_state.db_pool, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(contract))
}

// POST /api/rentals/contracts/{id}/renew
#[utoipa::path(
    post,
    path = "/api/rentals/contracts/{id}/renew",
    tag = "Rentals",
    params(("id" = Uuid, Path, description = "ID do contrato")),
    responses(
        (status = 200, description = "Contrato marcado como renovado", body = RentalContract),
        (status = 400, description = "Contrato rescindido"),
        (status = 404, description = "Contrato não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn renew_contract(
    State(app_state): State<AppState>,
    locale: Locale,
    _perm: RequirePermission<PermRentalsWrite>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let contract = app_state
        .rental_service
        .renew_contract(&app_state.db_pool, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(contract))
}

// =============================================================================
//  2. PAGAMENTOS
// =============================================================================

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListPaymentsQuery {
    pub contract_id: Option<Uuid>,
    pub status: Option<PaymentStatus>,
    /// Só parcelas pendentes, vencidas ou parciais.
    #[serde(default)]
    pub open_only: bool,
}

impl ListPaymentsQuery {
    fn statuses(&self) -> Vec<PaymentStatus> {
        match (self.status, self.open_only) {
            (Some(status), _) => vec![status],
            (None, true) => vec![PaymentStatus::Pending, PaymentStatus::Overdue, PaymentStatus::Partial],
            (None, false) => Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmPaymentPayload {
    /// Sem valor, quita o saldo da parcela.
    #[validate(custom(function = "validate_positive"))]
    #[schema(example = "4170.00")]
    pub amount: Option<Decimal>,
    pub paid_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdjustPaymentPayload {
    #[validate(custom(function = "validate_not_negative"))]
    #[schema(example = "64.00")]
    pub late_fee: Option<Decimal>,
    #[validate(custom(function = "validate_not_negative"))]
    pub discount: Option<Decimal>,
    #[validate(custom(function = "validate_not_negative"))]
    pub other_fees: Option<Decimal>,
}

// GET /api/rentals/payments
#[utoipa::path(
    get,
    path = "/api/rentals/payments",
    tag = "Rentals",
    params(ListPaymentsQuery),
    responses(
        (status = 200, description = "Parcelas com total calculado", body = Vec<PaymentView>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_payments(
    State(app_state): State<AppState>,
    locale: Locale,
    _perm: RequirePermission<PermRentalsRead>,
    Query(query): Query<ListPaymentsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let payments = app_state
        .rental_service
        .list_payments(&app_state.db_pool, query.contract_id, &query.statuses())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(payments))
}

// POST /api/rentals/payments/{id}/confirm
#[utoipa::path(
    post,
    path = "/api/rentals/payments/{id}/confirm",
    tag = "Rentals",
    request_body = ConfirmPaymentPayload,
    params(("id" = Uuid, Path, description = "ID da parcela")),
    responses(
        (status = 200, description = "Baixa registrada (quitada ou parcial)", body = PaymentView),
        (status = 404, description = "Parcela não encontrada"),
        (status = 409, description = "Parcela já quitada ou cancelada")
    ),
    security(("api_jwt" = []))
)]
pub async fn confirm_payment(
    State(app_state): State<AppState>,
    locale: Locale,
    _perm: RequirePermission<PermRentalsWrite>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ConfirmPaymentPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let payment = app_state
        .rental_service
        .confirm_payment(&app_state.db_pool, id, payload.amount, payload.paid_at, payload.notes.as_deref())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(payment))
}

// POST /api/rentals/payments/{id}/cancel
#[utoipa::path(
    post,
    path = "/api/rentals/payments/{id}/cancel",
    tag = "Rentals",
    params(("id" = Uuid, Path, description = "ID da parcela")),
    responses(
        (status = 200, description = "Parcela cancelada", body = PaymentView),
        (status = 409, description = "Parcela já quitada ou cancelada")
    ),
    security(("api_jwt" = []))
)]
pub async fn cancel_payment(
    State(app_state): State<AppState>,
    locale: Locale,
    _perm: RequirePermission<PermRentalsWrite>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let payment = app_state
        .rental_service
        .cancel_payment(&app_state.db_pool, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(payment))
}

// PATCH /api/rentals/payments/{id}
#[utoipa::path(
    patch,
    path = "/api/rentals/payments/{id}",
    tag = "Rentals",
    request_body = AdjustPaymentPayload,
    params(("id" = Uuid, Path, description = "ID da parcela")),
    responses(
        (status = 200, description = "Encargos ajustados", body = PaymentView),
        (status = 409, description = "Parcela fechada ou total negativo")
    ),
    security(("api_jwt" = []))
)]
pub async fn adjust_payment(
    State(app_state): State<AppState>,
    locale: Locale,
    _perm: RequirePermission<PermRentalsWrite>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AdjustPaymentPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let payment = app_state
        .rental_service
        .adjust_payment(&app_state.db_pool, id, payload.late_fee, payload.discount, payload.other_fees)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(payment))
}

// GET /api/rentals/payments/{id}/receipt
#[utoipa::path(
    get,
    path = "/api/rentals/payments/{id}/receipt",
    tag = "Rentals",
    params(("id" = Uuid, Path, description = "ID da parcela")),
    responses(
        (status = 200, description = "Recibo em PDF", content_type = "application/pdf"),
        (status = 404, description = "Parcela não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn payment_receipt(
    State(app_state): State<AppState>,
    locale: Locale,
    _perm: RequirePermission<PermRentalsRead>,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let pdf_bytes = app_state
        .document_service
        .generate_rent_receipt(&app_state.db_pool, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let headers = [
        (header::CONTENT_TYPE, "application/pdf".to_string()),
        (header::CONTENT_DISPOSITION, format!("attachment; filename=\"recibo_{}.pdf\"", id)),
    ];

    Ok((headers, pdf_bytes).into_response())
}

// =============================================================================
//  3. ALERTAS
// =============================================================================

// GET /api/rentals/alerts
#[utoipa::path(
    get,
    path = "/api/rentals/alerts",
    tag = "Rentals",
    responses(
        (status = 200, description = "Alertas de vencimento, críticos primeiro", body = Vec<RentalAlert>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_alerts(
    State(app_state): State<AppState>,
    locale: Locale,
    _perm: RequirePermission<PermRentalsRead>,
) -> Result<impl IntoResponse, ApiError> {
    let alerts = app_state
        .alert_service
        .current_alerts(&app_state.db_pool, Utc::now().date_naive())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(alerts))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateAlertConfigPayload {
    /// Negativo = dias antes do vencimento, zero = no dia, positivo = dias de atraso.
    #[validate(range(min = -90, max = 90))]
    #[schema(example = -3)]
    pub days_offset: i32,
    #[serde(default = "enabled_by_default")]
    pub is_enabled: bool,
    #[validate(length(max = 500))]
    #[schema(example = "Aluguel do imóvel {property} vence em {days} dia(s)")]
    pub message_template: Option<String>,
}

fn enabled_by_default() -> bool {
    true
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAlertConfigPayload {
    #[validate(range(min = -90, max = 90))]
    pub days_offset: Option<i32>,
    pub is_enabled: Option<bool>,
    /// Ausente mantém o modelo; `null` volta para a mensagem padrão.
    #[serde(default, deserialize_with = "present_or_null")]
    #[validate(length(max = 500))]
    #[schema(value_type = Option<String>)]
    pub message_template: Option<Option<String>>,
}

// Distingue campo ausente (None) de `null` explícito (Some(None))
fn present_or_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// GET /api/rentals/alert-configs
#[utoipa::path(
    get,
    path = "/api/rentals/alert-configs",
    tag = "Rentals",
    responses(
        (status = 200, description = "Regras de alerta", body = Vec<AlertConfig>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_alert_configs(
    State(app_state): State<AppState>,
    locale: Locale,
    _perm: RequirePermission<PermRentalsRead>,
) -> Result<impl IntoResponse, ApiError> {
    let configs = app_state
        .rental_service
        .list_alert_configs(&app_state.db_pool)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(configs))
}

// POST /api/rentals/alert-configs
#[utoipa::path(
    post,
    path = "/api/rentals/alert-configs",
    tag = "Rentals",
    request_body = CreateAlertConfigPayload,
    responses(
        (status = 201, description = "Regra criada", body = AlertConfig),
        (status = 400, description = "Dados inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_alert_config(
    State(app_state): State<AppState>,
    locale: Locale,
    _perm: RequirePermission<PermRentalsWrite>,
    Json(payload): Json<CreateAlertConfigPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let config = app_state
        .rental_service
        .create_alert_config(
            &app_state.db_pool,
            payload.days_offset,
            payload.is_enabled,
            payload.message_template.as_deref(),
        )
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(config)))
}

// PATCH /api/rentals/alert-configs/{id}
#[utoipa::path(
    patch,
    path = "/api/rentals/alert-configs/{id}",
    tag = "Rentals",
    request_body = UpdateAlertConfigPayload,
    params(("id" = Uuid, Path, description = "ID da regra")),
    responses(
        (status = 200, description = "Regra atualizada", body = AlertConfig),
        (status = 404, description = "Regra não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_alert_config(
    State(app_state): State<AppState>,
    locale: Locale,
    _perm: RequirePermission<PermRentalsWrite>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateAlertConfigPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let config = app_state
        .rental_service
        .update_alert_config(
            &app_state.db_pool,
            id,
            payload.days_offset,
            payload.is_enabled,
            payload.message_template.as_ref().map(|t| t.as_deref()),
        )
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(config))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(status: Option<PaymentStatus>, open_only: bool) -> ListPaymentsQuery {
        ListPaymentsQuery { contract_id: None, status, open_only }
    }

    #[test]
    fn explicit_status_wins_over_open_only() {
        assert_eq!(query(Some(PaymentStatus::Paid), true).statuses(), vec![PaymentStatus::Paid]);
    }

    #[test]
    fn template_update_tells_absent_from_null() {
        let keep: UpdateAlertConfigPayload = serde_json::from_str(r#"{"isEnabled": false}"#).unwrap();
        assert_eq!(keep.message_template, None);

        let clear: UpdateAlertConfigPayload = serde_json::from_str(r#"{"messageTemplate": null}"#).unwrap();
        assert_eq!(clear.message_template, Some(None));

        let set: UpdateAlertConfigPayload =
            serde_json::from_str(r#"{"messageTemplate": "{property} vence hoje"}"#).unwrap();
        assert_eq!(set.message_template, Some(Some("{property} vence hoje".to_string())));
        assert!(set.validate().is_ok());
    }

    #[test]
    fn long_template_is_rejected() {
        let payload = UpdateAlertConfigPayload {
            days_offset: None,
            is_enabled: None,
            message_template: Some(Some("x".repeat(501))),
        };
        assert!(payload.validate().is_err());
    }

    #[test]
    fn open_only_lists_every_open_status() {
        let statuses = query(None, true).statuses();
        assert!(statuses.iter().all(|s| s.is_open()));
        assert_eq!(statuses.len(), 3);
        assert!(query(None, false).statuses().is_empty());
    }
}
