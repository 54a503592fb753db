// src/services/property_service.rs

use chrono::Utc;
use sqlx::{Postgres, Executor, Acquire};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{property_repo::PropertyFields, reminder_repo::insert_reminder, PropertyRepository},
    models::{
        property::{PipelineKind, Property, Stage},
        reminder::Reminder,
    },
    services::reminder_service::{plan_for_stage, ReminderService},
};

/// Uma etapa só vale dentro do próprio funil.
pub fn ensure_stage_in_pipeline(pipeline: PipelineKind, stage: Stage) -> Result<(), AppError> {
    if stage.pipeline() != pipeline {
        return Err(AppError::InvalidStage(format!("{:?} não pertence ao funil {:?}", stage, pipeline)));
    }
    Ok(())
}

#[derive(Clone)]
pub struct PropertyService {
    repo: PropertyRepository,
    reminder_service: ReminderService,
}

impl PropertyService {
    pub fn new(repo: PropertyRepository, reminder_service: ReminderService) -> Self {
        Self { repo, reminder_service }
    }

    /// Cadastra o imóvel na primeira etapa do funil e agenda o lembrete dela,
    /// na mesma transação.
    pub async fn create_property<'e, E>(
        &self,
        executor: E,
        code: &str,
        pipeline: PipelineKind,
        fields: &PropertyFields,
    ) -> Result<Property, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let stage = pipeline.initial_stage();
        let mut tx = executor.begin().await?;

        let property = self.repo.create(&mut *tx, code, pipeline, stage, fields).await?;
        if let Some(plan) = plan_for_stage(property.id, stage, Utc::now()) {
            insert_reminder(&mut *tx, &plan).await?;
        }

        tx.commit().await?;

        tracing::info!(property_id = %property.id, code, "Imóvel cadastrado");
        Ok(property)
    }

    pub async fn list_properties<'e, E>(
        &self,
        executor: E,
        pipeline: Option<PipelineKind>,
        stage: Option<Stage>,
    ) -> Result<Vec<Property>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        if let (Some(pipeline), Some(stage)) = (pipeline, stage) {
            ensure_stage_in_pipeline(pipeline, stage)?;
        }
        self.repo.list(executor, pipeline, stage).await
    }

    pub async fn get_property<'e, E>(&self, executor: E, id: Uuid) -> Result<Property, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo
            .find_by_id(executor, id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("Imóvel {}", id)))
    }

    pub async fn update_property<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        fields: &PropertyFields,
    ) -> Result<Property, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo
            .update(executor, id, fields)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("Imóvel {}", id)))
    }

    /// Move o imóvel de etapa e troca o lembrete ativo pelo da nova etapa.
    /// Etapa e lembrete são gravados juntos pelo ReminderStore.
    pub async fn move_stage(
        &self,
        pool: &sqlx::PgPool,
        id: Uuid,
        stage: Stage,
    ) -> Result<(Property, Option<Reminder>), AppError> {
        let moved = self.reminder_service.on_stage_enter(id, stage).await?;
        let property = self.get_property(pool, id).await?;

        tracing::info!(property_id = %id, from = ?moved.previous_stage, to = ?moved.stage, "Etapa alterada");
        Ok((property, moved.reminder))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_are_checked_against_their_pipeline() {
        assert!(ensure_stage_in_pipeline(PipelineKind::Sale, Stage::Proposta).is_ok());
        assert!(ensure_stage_in_pipeline(PipelineKind::Rental, Stage::Ocupado).is_ok());

        assert!(matches!(
            ensure_stage_in_pipeline(PipelineKind::Sale, Stage::Reservado),
            Err(AppError::InvalidStage(_))
        ));
        assert!(matches!(
            ensure_stage_in_pipeline(PipelineKind::Rental, Stage::Visitas),
            Err(AppError::InvalidStage(_))
        ));
    }

    #[test]
    fn every_stage_belongs_to_exactly_one_pipeline() {
        for config in crate::models::property::STAGE_TABLE.iter() {
            let sale = ensure_stage_in_pipeline(PipelineKind::Sale, config.stage).is_ok();
            let rental = ensure_stage_in_pipeline(PipelineKind::Rental, config.stage).is_ok();
            assert!(sale ^ rental, "{:?}", config.stage);
        }
    }
}
