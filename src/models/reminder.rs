// src/models/reminder.rs

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::property::Stage;

/// Janela em que um lembrete é considerado "vence em breve".
pub const DUE_SOON_WINDOW_HOURS: i64 = 2;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    pub id: Uuid,
    pub property_id: Uuid,
    pub stage: Stage,
    #[schema(example = 48)]
    pub interval_hours: i32,
    pub next_reminder_at: DateTime<Utc>,
    pub is_active: bool,
    pub is_custom: bool,
    pub created_at: DateTime<Utc>,
}

/// Dados para inserir um lembrete novo (o banco gera id e created_at).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReminder {
    pub property_id: Uuid,
    pub stage: Stage,
    pub interval_hours: i32,
    pub next_reminder_at: DateTime<Utc>,
    pub is_custom: bool,
}

// Ordem de declaração = ordem de exibição
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReminderStatus {
    Overdue,
    DueSoon,
    Upcoming,
}

impl Reminder {
    /// Derivado na leitura, nunca gravado.
    pub fn status_at(&self, now: DateTime<Utc>) -> ReminderStatus {
        if self.next_reminder_at < now {
            ReminderStatus::Overdue
        } else if self.next_reminder_at - now <= Duration::hours(DUE_SOON_WINDOW_HOURS) {
            ReminderStatus::DueSoon
        } else {
            ReminderStatus::Upcoming
        }
    }
}

/// Lembrete ativo com o contexto do imóvel, como a tela de follow-up consome.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReminderWithProperty {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub reminder: Reminder,
    #[schema(example = "AP-1024")]
    pub property_code: String,
    #[schema(example = "Apartamento 3 quartos com varanda gourmet")]
    pub property_title: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReminderView {
    #[serde(flatten)]
    pub item: ReminderWithProperty,
    pub status: ReminderStatus,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn reminder_at(next: DateTime<Utc>) -> Reminder {
        Reminder {
            id: Uuid::new_v4(),
            property_id: Uuid::new_v4(),
            stage: Stage::Visitas,
            interval_hours: 48,
            next_reminder_at: next,
            is_active: true,
            is_custom: false,
            created_at: next - Duration::hours(48),
        }
    }

    #[test]
    fn status_follows_next_reminder_at() {
        let now = Utc.with_ymd_and_hms(2024, 1, 10, 12, 0, 0).unwrap();

        assert_eq!(reminder_at(now - Duration::minutes(1)).status_at(now), ReminderStatus::Overdue);
        assert_eq!(reminder_at(now).status_at(now), ReminderStatus::DueSoon);
        assert_eq!(reminder_at(now + Duration::hours(2)).status_at(now), ReminderStatus::DueSoon);
        assert_eq!(
            reminder_at(now + Duration::hours(2) + Duration::seconds(1)).status_at(now),
            ReminderStatus::Upcoming
        );
    }
}
