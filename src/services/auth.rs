// src/services/auth.rs

use bcrypt::{hash, verify};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{
        error::AppError,
        retry::{retry_with_backoff, RetryPolicy},
    },
    db::UserRepository,
    models::auth::{Claims, User, UserRole},
};

/// Gera um JWT HS256 para o usuário, válido por `ttl_days`.
pub fn issue_token(secret: &str, user_id: Uuid, ttl_days: i64) -> Result<String, AppError> {
    let now = Utc::now();
    let expires_at = now + chrono::Duration::days(ttl_days);

    let claims = Claims {
        sub: user_id,
        exp: expires_at.timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    Ok(encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_ref()))?)
}

/// Valida assinatura e expiração; devolve o id do usuário.
pub fn decode_token(secret: &str, token: &str) -> Result<Uuid, AppError> {
    let token_data = decode::<Claims>(token, &DecodingKey::from_secret(secret.as_ref()), &Validation::default())
        .map_err(|_| AppError::InvalidToken)?;
    Ok(token_data.claims.sub)
}

// Só falhas de conexão valem nova tentativa
fn is_transient(e: &AppError) -> bool {
    matches!(
        e,
        AppError::DatabaseError(sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut)
    )
}

#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    jwt_secret: String,
    token_ttl_days: i64,
    retry_policy: RetryPolicy,
    pool: PgPool,
}

impl AuthService {
    pub fn new(user_repo: UserRepository, jwt_secret: String, token_ttl_days: i64, pool: PgPool) -> Self {
        Self {
            user_repo,
            jwt_secret,
            token_ttl_days,
            retry_policy: RetryPolicy::default(),
            pool,
        }
    }

    /// Cadastra o usuário. O primeiro cadastro do sistema vira administrador.
    pub async fn register_user(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
        creci: Option<&str>,
    ) -> Result<String, AppError> {
        let password_clone = password.to_owned();
        let hashed_password = tokio::task::spawn_blocking(move || hash(&password_clone, bcrypt::DEFAULT_COST))
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task de hashing: {}", e))??;

        let mut tx = self.pool.begin().await?;

        self.user_repo.lock_for_registration(&mut tx).await?;
        let role = if self.user_repo.count_users(&mut *tx).await? == 0 {
            UserRole::Admin
        } else {
            UserRole::Broker
        };

        let new_user = self
            .user_repo
            .create_user(&mut *tx, email, &hashed_password, full_name, creci, role)
            .await?;

        tx.commit().await?;

        tracing::info!(user_id = %new_user.id, role = ?role, "Usuário cadastrado");
        issue_token(&self.jwt_secret, new_user.id, self.token_ttl_days)
    }

    pub async fn login_user(&self, email: &str, password: &str) -> Result<String, AppError> {
        let user = self
            .user_repo
            .find_by_email(email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let password_clone = password.to_owned();
        let password_hash_clone = user.password_hash.clone();

        let is_password_valid = tokio::task::spawn_blocking(move || verify(&password_clone, &password_hash_clone))
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task de verificação de senha: {}", e))??;

        if !is_password_valid {
            return Err(AppError::InvalidCredentials);
        }
        if !user.is_active {
            return Err(AppError::UserInactive);
        }

        issue_token(&self.jwt_secret, user.id, self.token_ttl_days)
    }

    /// Valida o token e carrega o usuário, repetindo a leitura em falhas de conexão.
    pub async fn validate_token(&self, token: &str) -> Result<User, AppError> {
        let user_id = decode_token(&self.jwt_secret, token)?;

        let user = retry_with_backoff(self.retry_policy, "carregar usuário", is_transient, || {
            self.user_repo.find_by_id(user_id)
        })
        .await?
        .ok_or(AppError::UserNotFound)?;

        if !user.is_active {
            return Err(AppError::UserInactive);
        }
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "segredo-de-teste";

    #[test]
    fn issued_token_decodes_to_same_user() {
        let user_id = Uuid::new_v4();
        let token = issue_token(SECRET, user_id, 7).unwrap();
        assert_eq!(decode_token(SECRET, &token).unwrap(), user_id);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = issue_token(SECRET, Uuid::new_v4(), 7).unwrap();
        assert!(matches!(decode_token("outro", &token), Err(AppError::InvalidToken)));
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = issue_token(SECRET, Uuid::new_v4(), -1).unwrap();
        assert!(matches!(decode_token(SECRET, &token), Err(AppError::InvalidToken)));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(matches!(decode_token(SECRET, "nao.e.jwt"), Err(AppError::InvalidToken)));
    }

    #[test]
    fn only_connection_failures_are_retried() {
        assert!(is_transient(&AppError::DatabaseError(sqlx::Error::PoolTimedOut)));
        assert!(!is_transient(&AppError::DatabaseError(sqlx::Error::RowNotFound)));
        assert!(!is_transient(&AppError::UserNotFound));
    }
}
