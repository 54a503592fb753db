// src/db/rbac_repo.rs

use sqlx::{Postgres, Executor, PgPool};
use uuid::Uuid;
use crate::common::error::AppError;
use crate::models::rbac::Permission;

#[derive(Clone)]
pub struct RbacRepository {
    pool: PgPool,
}

impl RbacRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // 1. Catálogo de permissões do sistema
    pub async fn list_all_permissions(&self) -> Result<Vec<Permission>, AppError> {
        let permissions = sqlx::query_as::<_, Permission>(
            "SELECT id, slug, description, module FROM permissions ORDER BY module, slug",
        )
            .fetch_all(&self.pool)
            .await?;
        Ok(permissions)
    }

    // 2. Buscar IDs das permissões baseado nos Slugs ("rentals:write" -> UUID)
    pub async fn find_permissions_by_slugs<'e, E>(
        &self,
        executor: E,
        slugs: &[String],
    ) -> Result<Vec<Permission>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let permissions = sqlx::query_as::<_, Permission>(
            "SELECT id, slug, description, module FROM permissions WHERE slug = ANY($1)",
        )
            .bind(slugs)
            .fetch_all(executor)
            .await?;
        Ok(permissions)
    }

    // 3. Slugs que o usuário possui
    pub async fn list_user_permission_slugs<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
    ) -> Result<Vec<String>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let slugs: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT p.slug
            FROM user_permissions up
            JOIN permissions p ON p.id = up.permission_id
            WHERE up.user_id = $1
            ORDER BY p.slug
            "#,
        )
            .bind(user_id)
            .fetch_all(executor)
            .await?;
        Ok(slugs)
    }

    // 4. Substitui o conjunto de permissões do usuário (chamar dentro de transação)
    pub async fn replace_user_permissions(
        &self,
        conn: &mut sqlx::PgConnection,
        user_id: Uuid,
        permission_ids: &[Uuid],
    ) -> Result<(), AppError> {
        sqlx::query("DELETE FROM user_permissions WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *conn)
            .await?;

        if !permission_ids.is_empty() {
            sqlx::query(
                r#"
                INSERT INTO user_permissions (user_id, permission_id)
                SELECT $1, UNNEST($2::uuid[])
                "#,
            )
                .bind(user_id)
                .bind(permission_ids)
                .execute(&mut *conn)
                .await?;
        }

        Ok(())
    }

    // 5. Checagem usada pelo extrator RequirePermission
    pub async fn user_has_permission(&self, user_id: Uuid, slug: &str) -> Result<bool, AppError> {
        let has: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM user_permissions up
                JOIN permissions p ON p.id = up.permission_id
                WHERE up.user_id = $1 AND p.slug = $2
            )
            "#,
        )
            .bind(user_id)
            .bind(slug)
            .fetch_one(&self.pool)
            .await?;
        Ok(has)
    }
}
