// src/services/rbac_service.rs

use std::collections::BTreeSet;

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{RbacRepository, UserRepository},
    models::{
        auth::{User, UserRole},
        rbac::{Permission, UserWithPermissions},
    },
};

/// Slugs pedidos que não existem no catálogo.
pub fn unknown_slugs(requested: &[String], known: &[Permission]) -> Vec<String> {
    let known: BTreeSet<&str> = known.iter().map(|p| p.slug.as_str()).collect();
    requested
        .iter()
        .filter(|s| !known.contains(s.as_str()))
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[derive(Clone)]
pub struct RbacService {
    repo: RbacRepository,
    user_repo: UserRepository,
    pool: PgPool,
}

impl RbacService {
    pub fn new(repo: RbacRepository, user_repo: UserRepository, pool: PgPool) -> Self {
        Self { repo, user_repo, pool }
    }

    pub async fn list_system_permissions(&self) -> Result<Vec<Permission>, AppError> {
        self.repo.list_all_permissions().await
    }

    /// Admin passa sempre; corretor precisa do slug.
    pub async fn user_can(&self, user: &User, slug: &str) -> Result<bool, AppError> {
        if user.is_admin() {
            return Ok(true);
        }
        self.repo.user_has_permission(user.id, slug).await
    }

    pub async fn list_users(&self) -> Result<Vec<UserWithPermissions>, AppError> {
        let users = self.user_repo.list_users(&self.pool).await?;

        let mut result = Vec::with_capacity(users.len());
        for user in users {
            let permissions = self.repo.list_user_permission_slugs(&self.pool, user.id).await?;
            result.push(UserWithPermissions { user, permissions });
        }
        Ok(result)
    }

    pub async fn update_user(
        &self,
        acting_user: &User,
        user_id: Uuid,
        role: Option<UserRole>,
        is_active: Option<bool>,
    ) -> Result<UserWithPermissions, AppError> {
        // Sem isso o sistema pode ficar sem nenhum administrador ativo
        if acting_user.id == user_id && (role == Some(UserRole::Broker) || is_active == Some(false)) {
            return Err(AppError::Forbidden("alterar o próprio acesso de administrador".into()));
        }

        let user = self
            .user_repo
            .update_user(&self.pool, user_id, role, is_active)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("Usuário {}", user_id)))?;

        let permissions = self.repo.list_user_permission_slugs(&self.pool, user.id).await?;

        tracing::info!(%user_id, by = %acting_user.id, role = ?user.role, active = user.is_active, "Usuário atualizado");
        Ok(UserWithPermissions { user, permissions })
    }

    /// Troca o conjunto inteiro de permissões do usuário numa transação.
    pub async fn set_user_permissions(
        &self,
        user_id: Uuid,
        slugs: &[String],
    ) -> Result<UserWithPermissions, AppError> {
        let user = self
            .user_repo
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("Usuário {}", user_id)))?;

        let mut tx = self.pool.begin().await?;

        let permissions = self.repo.find_permissions_by_slugs(&mut *tx, slugs).await?;
        let unknown = unknown_slugs(slugs, &permissions);
        if !unknown.is_empty() {
            return Err(AppError::ResourceNotFound(format!("Permissão {}", unknown.join(", "))));
        }

        let permission_ids: Vec<Uuid> = permissions.iter().map(|p| p.id).collect();
        self.repo.replace_user_permissions(&mut tx, user_id, &permission_ids).await?;

        let granted = self.repo.list_user_permission_slugs(&mut *tx, user_id).await?;

        tx.commit().await?;

        Ok(UserWithPermissions { user, permissions: granted })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn permission(slug: &str) -> Permission {
        Permission {
            id: Uuid::new_v4(),
            slug: slug.into(),
            description: String::new(),
            module: "SALES".into(),
        }
    }

    #[test]
    fn reports_each_unknown_slug_once() {
        let known = vec![permission("sales:read"), permission("sales:write")];
        let requested: Vec<String> = ["sales:read", "rentals:fly", "rentals:fly", "x"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        assert_eq!(unknown_slugs(&requested, &known), vec!["rentals:fly", "x"]);
    }

    #[test]
    fn known_slugs_pass() {
        let known = vec![permission("sales:read")];
        assert!(unknown_slugs(&["sales:read".to_string()], &known).is_empty());
        assert!(unknown_slugs(&[], &known).is_empty());
    }
}
