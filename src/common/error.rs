// src/common/error.rs

use std::sync::LazyLock;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

use crate::{
    common::i18n::{I18nStore, DEFAULT_LANG},
    middleware::i18n::Locale,
};

// Usado quando o erro sai sem passar por um handler (ex.: middleware)
static FALLBACK_STORE: LazyLock<Option<I18nStore>> = LazyLock::new(|| I18nStore::load().ok());

// Erros de domínio. Os handlers convertem para ApiError com o idioma do cliente.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("E-mail já existe")]
    EmailAlreadyExists,

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Token inválido")]
    InvalidToken,

    #[error("Usuário não encontrado")]
    UserNotFound,

    #[error("Usuário desativado")]
    UserInactive,

    #[error("Permissão ausente: {0}")]
    Forbidden(String),

    #[error("Ação restrita a administradores")]
    AdminRequired,

    #[error("Recurso não encontrado: {0}")]
    ResourceNotFound(String),

    #[error("Violação de unicidade: {0}")]
    UniqueConstraintViolation(String),

    #[error("Etapa inválida para o funil: {0}")]
    InvalidStage(String),

    #[error("Intervalo de lembrete inválido: {0}h")]
    InvalidInterval(i32),

    #[error("Contrato inválido: {0}")]
    InvalidContract(String),

    #[error("Pagamento inválido: {0}")]
    InvalidPayment(String),

    #[error("Fonte não encontrada: {0}")]
    FontNotFound(String),

    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    // Qualquer outro erro inesperado, com contexto do anyhow
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

/// Erro pronto para o cliente: status HTTP + mensagem traduzida.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: String,
    pub details: Option<Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.details {
            Some(details) => json!({ "error": self.error, "details": details }),
            None => json!({ "error": self.error }),
        };
        (self.status, Json(body)).into_response()
    }
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_)
            | AppError::InvalidStage(_)
            | AppError::InvalidInterval(_)
            | AppError::InvalidContract(_) => StatusCode::BAD_REQUEST,
            AppError::EmailAlreadyExists | AppError::UniqueConstraintViolation(_) => StatusCode::CONFLICT,
            AppError::InvalidPayment(_) => StatusCode::CONFLICT,
            AppError::InvalidCredentials | AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            AppError::UserInactive | AppError::Forbidden(_) | AppError::AdminRequired => StatusCode::FORBIDDEN,
            AppError::UserNotFound | AppError::ResourceNotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Converte para a resposta HTTP no idioma do cliente.
    pub fn to_api_error(self, locale: &Locale, store: &I18nStore) -> ApiError {
        let status = self.status_code();
        let lang = locale.0.as_str();

        let (key, arg): (&str, Option<String>) = match &self {
            AppError::ValidationError(errors) => {
                let mut details = serde_json::Map::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                        })
                        .collect();
                    details.insert(field.to_string(), json!(messages));
                }
                return ApiError {
                    status,
                    error: store.translate(lang, "validation_error", None),
                    details: Some(Value::Object(details)),
                };
            }
            AppError::EmailAlreadyExists => ("email_already_exists", None),
            AppError::InvalidCredentials => ("invalid_credentials", None),
            AppError::InvalidToken => ("invalid_token", None),
            AppError::UserNotFound => ("user_not_found", None),
            AppError::UserInactive => ("user_inactive", None),
            AppError::Forbidden(slug) => ("forbidden", Some(slug.clone())),
            AppError::AdminRequired => ("admin_required", None),
            AppError::ResourceNotFound(what) => ("resource_not_found", Some(what.clone())),
            AppError::UniqueConstraintViolation(what) => ("conflict", Some(what.clone())),
            AppError::InvalidStage(stage) => ("invalid_stage", Some(stage.clone())),
            AppError::InvalidInterval(_) => ("invalid_interval", None),
            AppError::InvalidContract(reason) => ("invalid_contract", Some(reason.clone())),
            AppError::InvalidPayment(reason) => ("invalid_payment", Some(reason.clone())),
            AppError::FontNotFound(path) => {
                tracing::error!("Fonte do PDF não encontrada em {}", path);
                ("font_not_found", None)
            }
            // Todos os outros erros viram 500 e ficam só no log.
            e => {
                tracing::error!("Erro Interno do Servidor: {:?}", e);
                ("internal_error", None)
            }
        };

        ApiError {
            status,
            error: store.translate(lang, key, arg.as_deref()),
            details: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match FALLBACK_STORE.as_ref() {
            Some(store) => self
                .to_api_error(&Locale(DEFAULT_LANG.to_string()), store)
                .into_response(),
            None => {
                tracing::error!("Dicionário de traduções indisponível: {}", self);
                (self.status_code(), Json(json!({ "error": self.to_string() }))).into_response()
            }
        }
    }
}

/// Traduz violações de unicidade do Postgres para 409.
pub fn map_unique_violation(e: sqlx::Error, what: &str) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            return AppError::UniqueConstraintViolation(what.to_string());
        }
    }
    e.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::{Validate, ValidationErrors};

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn store() -> I18nStore {
        I18nStore::load().unwrap()
    }

    #[tokio::test]
    async fn not_found_is_translated_and_returns_404() {
        let api = AppError::ResourceNotFound("Contrato".into())
            .to_api_error(&Locale("en".into()), &store());
        assert_eq!(api.status, StatusCode::NOT_FOUND);

        let json = body_json(api.into_response()).await;
        assert_eq!(json["error"], "Record not found: Contrato");
        assert!(json.get("details").is_none());
    }

    #[tokio::test]
    async fn validation_errors_list_each_field() {
        #[derive(Validate)]
        struct Payload {
            #[validate(range(min = 1, max = 28, message = "invalid_due_day"))]
            due_day: i32,
        }

        let errors: ValidationErrors = Payload { due_day: 31 }.validate().unwrap_err();
        let api = AppError::ValidationError(errors).to_api_error(&Locale("pt".into()), &store());
        assert_eq!(api.status, StatusCode::BAD_REQUEST);

        let json = body_json(api.into_response()).await;
        assert_eq!(json["error"], "Um ou mais campos são inválidos.");
        assert_eq!(json["details"]["due_day"][0], "invalid_due_day");
    }

    #[tokio::test]
    async fn internal_errors_hide_the_cause() {
        let response = AppError::InternalServerError(anyhow::anyhow!("pool timeout")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let json = body_json(response).await;
        assert_eq!(json["error"], "Ocorreu um erro inesperado.");
    }

    #[test]
    fn permission_errors_are_forbidden() {
        assert_eq!(AppError::Forbidden("rentals:write".into()).status_code(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::AdminRequired.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::InvalidToken.status_code(), StatusCode::UNAUTHORIZED);
    }
}
