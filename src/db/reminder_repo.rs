// src/db/reminder_repo.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        property::{PipelineKind, Stage},
        reminder::{NewReminder, Reminder, ReminderWithProperty},
    },
    services::reminder_service::{plan_change, ReminderChange, ReminderStore, StageReminder},
};

const REMINDER_COLUMNS: &str =
    "id, property_id, stage, interval_hours, next_reminder_at, is_active, is_custom, created_at";

/// Implementação do ReminderStore sobre a tabela 'reminders'.
#[derive(Clone)]
pub struct PgReminderStore {
    pool: PgPool,
}

impl PgReminderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Grava um lembrete ativo. Quem chama já desativou o anterior na mesma transação.
pub async fn insert_reminder(conn: &mut PgConnection, new: &NewReminder) -> Result<Reminder, AppError> {
    let reminder = sqlx::query_as::<_, Reminder>(&format!(
        r#"
        INSERT INTO reminders (property_id, stage, interval_hours, next_reminder_at, is_custom)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {REMINDER_COLUMNS}
        "#
    ))
        .bind(new.property_id)
        .bind(new.stage)
        .bind(new.interval_hours)
        .bind(new.next_reminder_at)
        .bind(new.is_custom)
        .fetch_one(conn)
        .await?;
    Ok(reminder)
}

#[async_trait]
impl ReminderStore for PgReminderStore {
    async fn apply(
        &self,
        property_id: Uuid,
        change: ReminderChange,
        now: DateTime<Utc>,
    ) -> Result<StageReminder, AppError> {
        let mut tx = self.pool.begin().await?;

        // Trava o imóvel: etapa e lembrete mudam juntos, uma troca de cada vez
        let locked: Option<(PipelineKind, Stage)> =
            sqlx::query_as("SELECT pipeline, stage FROM properties WHERE id = $1 FOR UPDATE")
                .bind(property_id)
                .fetch_optional(&mut *tx)
                .await?;

        let (pipeline, previous_stage) =
            locked.ok_or_else(|| AppError::ResourceNotFound(format!("Imóvel {}", property_id)))?;

        let plan = plan_change(property_id, pipeline, previous_stage, change, now)?;

        if plan.stage != previous_stage {
            sqlx::query("UPDATE properties SET stage = $2, updated_at = NOW() WHERE id = $1")
                .bind(property_id)
                .bind(plan.stage)
                .execute(&mut *tx)
                .await?;
        }

        let deactivated = sqlx::query(
            "UPDATE reminders SET is_active = FALSE WHERE property_id = $1 AND is_active",
        )
            .bind(property_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let reminder = match &plan.new {
            Some(new) => Some(insert_reminder(&mut tx, new).await?),
            None => None,
        };

        tx.commit().await?;

        tracing::debug!(
            %property_id, from = ?previous_stage, to = ?plan.stage, deactivated,
            created = reminder.is_some(), "Lembretes substituídos"
        );
        Ok(StageReminder { previous_stage, stage: plan.stage, reminder })
    }

    async fn find(&self, id: Uuid) -> Result<Option<Reminder>, AppError> {
        let reminder = sqlx::query_as::<_, Reminder>(&format!(
            "SELECT {REMINDER_COLUMNS} FROM reminders WHERE id = $1"
        ))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(reminder)
    }

    async fn active_for_property(&self, property_id: Uuid) -> Result<Option<Reminder>, AppError> {
        let reminder = sqlx::query_as::<_, Reminder>(&format!(
            "SELECT {REMINDER_COLUMNS} FROM reminders WHERE property_id = $1 AND is_active"
        ))
            .bind(property_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(reminder)
    }

    async fn set_next_reminder_at(
        &self,
        id: Uuid,
        next_reminder_at: DateTime<Utc>,
    ) -> Result<Option<Reminder>, AppError> {
        let reminder = sqlx::query_as::<_, Reminder>(&format!(
            "UPDATE reminders SET next_reminder_at = $2 WHERE id = $1 RETURNING {REMINDER_COLUMNS}"
        ))
            .bind(id)
            .bind(next_reminder_at)
            .fetch_optional(&self.pool)
            .await?;
        Ok(reminder)
    }

    async fn list_active(&self) -> Result<Vec<ReminderWithProperty>, AppError> {
        let reminders = sqlx::query_as::<_, ReminderWithProperty>(
            r#"
            SELECT
                r.id, r.property_id, r.stage, r.interval_hours, r.next_reminder_at,
                r.is_active, r.is_custom, r.created_at,
                p.code AS property_code,
                p.title AS property_title
            FROM reminders r
            JOIN properties p ON p.id = r.property_id
            WHERE r.is_active
            ORDER BY r.next_reminder_at ASC
            "#,
        )
            .fetch_all(&self.pool)
            .await?;
        Ok(reminders)
    }
}
