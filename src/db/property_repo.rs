// src/db/property_repo.rs

use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Executor};
use uuid::Uuid;

use crate::{
    common::error::{map_unique_violation, AppError},
    models::property::{PipelineKind, Property, Stage},
};

const PROPERTY_COLUMNS: &str = "id, code, title, pipeline, stage, property_type, neighborhood, city, \
     bedrooms, bathrooms, parking_spots, area_m2, price, description, highlights, owner_name, \
     assigned_to, created_at, updated_at";

/// Campos editáveis de um imóvel. Em `update`, None mantém o valor atual.
#[derive(Debug, Default, Clone)]
pub struct PropertyFields {
    pub title: Option<String>,
    pub property_type: Option<String>,
    pub neighborhood: Option<String>,
    pub city: Option<String>,
    pub bedrooms: Option<i32>,
    pub bathrooms: Option<i32>,
    pub parking_spots: Option<i32>,
    pub area_m2: Option<Decimal>,
    pub price: Option<Decimal>,
    pub description: Option<String>,
    pub highlights: Option<Vec<String>>,
    pub owner_name: Option<String>,
    pub assigned_to: Option<Uuid>,
}

#[derive(Clone)]
pub struct PropertyRepository {
    pool: PgPool,
}

impl PropertyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create<'e, E>(
        &self,
        executor: E,
        code: &str,
        pipeline: PipelineKind,
        stage: Stage,
        fields: &PropertyFields,
    ) -> Result<Property, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let property = sqlx::query_as::<_, Property>(&format!(
            r#"
            INSERT INTO properties (
                code, title, pipeline, stage, property_type, neighborhood, city,
                bedrooms, bathrooms, parking_spots, area_m2, price, description,
                highlights, owner_name, assigned_to
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            RETURNING {PROPERTY_COLUMNS}
            "#
        ))
            .bind(code)
            .bind(fields.title.as_deref().unwrap_or_default())
            .bind(pipeline)
            .bind(stage)
            .bind(fields.property_type.as_deref().unwrap_or_default())
            .bind(fields.neighborhood.as_deref())
            .bind(fields.city.as_deref())
            .bind(fields.bedrooms)
            .bind(fields.bathrooms)
            .bind(fields.parking_spots)
            .bind(fields.area_m2)
            .bind(fields.price)
            .bind(fields.description.as_deref())
            .bind(fields.highlights.clone().unwrap_or_default())
            .bind(fields.owner_name.as_deref())
            .bind(fields.assigned_to)
            .fetch_one(executor)
            .await
            .map_err(|e| map_unique_violation(e, &format!("código {}", code)))?;

        Ok(property)
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Property>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let property = sqlx::query_as::<_, Property>(&format!(
            "SELECT {PROPERTY_COLUMNS} FROM properties WHERE id = $1"
        ))
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(property)
    }

    /// Lista com filtros opcionais por funil e etapa.
    pub async fn list<'e, E>(
        &self,
        executor: E,
        pipeline: Option<PipelineKind>,
        stage: Option<Stage>,
    ) -> Result<Vec<Property>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let properties = sqlx::query_as::<_, Property>(&format!(
            r#"
            SELECT {PROPERTY_COLUMNS}
            FROM properties
            WHERE ($1::pipeline_kind IS NULL OR pipeline = $1)
              AND ($2::property_stage IS NULL OR stage = $2)
            ORDER BY updated_at DESC
            "#
        ))
            .bind(pipeline)
            .bind(stage)
            .fetch_all(executor)
            .await?;
        Ok(properties)
    }

    pub async fn update<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        fields: &PropertyFields,
    ) -> Result<Option<Property>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let property = sqlx::query_as::<_, Property>(&format!(
            r#"
            UPDATE properties SET
                title = COALESCE($2, title),
                property_type = COALESCE($3, property_type),
                neighborhood = COALESCE($4, neighborhood),
                city = COALESCE($5, city),
                bedrooms = COALESCE($6, bedrooms),
                bathrooms = COALESCE($7, bathrooms),
                parking_spots = COALESCE($8, parking_spots),
                area_m2 = COALESCE($9, area_m2),
                price = COALESCE($10, price),
                description = COALESCE($11, description),
                highlights = COALESCE($12, highlights),
                owner_name = COALESCE($13, owner_name),
                assigned_to = COALESCE($14, assigned_to),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {PROPERTY_COLUMNS}
            "#
        ))
            .bind(id)
            .bind(fields.title.as_deref())
            .bind(fields.property_type.as_deref())
            .bind(fields.neighborhood.as_deref())
            .bind(fields.city.as_deref())
            .bind(fields.bedrooms)
            .bind(fields.bathrooms)
            .bind(fields.parking_spots)
            .bind(fields.area_m2)
            .bind(fields.price)
            .bind(fields.description.as_deref())
            .bind(fields.highlights.as_deref())
            .bind(fields.owner_name.as_deref())
            .bind(fields.assigned_to)
            .fetch_optional(executor)
            .await?;
        Ok(property)
    }
}
