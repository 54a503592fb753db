// src/services/reminder_service.rs

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        property::{PipelineKind, Stage},
        reminder::{NewReminder, Reminder, ReminderView, ReminderWithProperty},
    },
    services::property_service::ensure_stage_in_pipeline,
};

/// Maior intervalo aceito para lembrete customizado ou soneca (30 dias).
pub const MAX_INTERVAL_HOURS: i32 = 720;

/// Mudança pedida para o lembrete de um imóvel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderChange {
    /// Move o imóvel para a etapa e agenda o lembrete padrão dela.
    EnterStage(Stage),
    /// Lembrete customizado na etapa em que o imóvel estiver.
    Custom { hours: i32 },
    /// Desliga sem criar outro.
    Disable,
}

/// Etapa e lembrete decididos a partir da linha travada do imóvel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderPlan {
    pub stage: Stage,
    pub new: Option<NewReminder>,
}

/// Estado do imóvel depois de aplicar uma mudança.
#[derive(Debug, Clone)]
pub struct StageReminder {
    pub previous_stage: Stage,
    pub stage: Stage,
    pub reminder: Option<Reminder>,
}

/// Persistência dos lembretes.
///
/// `apply` é a única forma de criar lembretes. Trava o imóvel, grava a
/// etapa nova (se houver), desativa o lembrete ativo e grava o da etapa,
/// tudo numa transação: no máximo um lembrete ativo por imóvel, sempre da
/// etapa atual.
#[async_trait]
pub trait ReminderStore: Send + Sync {
    async fn apply(
        &self,
        property_id: Uuid,
        change: ReminderChange,
        now: DateTime<Utc>,
    ) -> Result<StageReminder, AppError>;

    async fn find(&self, id: Uuid) -> Result<Option<Reminder>, AppError>;

    async fn active_for_property(&self, property_id: Uuid) -> Result<Option<Reminder>, AppError>;

    async fn set_next_reminder_at(
        &self,
        id: Uuid,
        next_reminder_at: DateTime<Utc>,
    ) -> Result<Option<Reminder>, AppError>;

    async fn list_active(&self) -> Result<Vec<ReminderWithProperty>, AppError>;
}

#[derive(Clone)]
pub struct ReminderService {
    store: Arc<dyn ReminderStore>,
}

fn validate_hours(hours: i32) -> Result<(), AppError> {
    if (1..=MAX_INTERVAL_HOURS).contains(&hours) {
        Ok(())
    } else {
        Err(AppError::InvalidInterval(hours))
    }
}

/// Lembrete padrão para quem acabou de entrar na etapa, se a etapa tiver lembretes.
pub fn plan_for_stage(property_id: Uuid, stage: Stage, now: DateTime<Utc>) -> Option<NewReminder> {
    stage.default_interval_hours().map(|hours| NewReminder {
        property_id,
        stage,
        interval_hours: hours,
        next_reminder_at: now + Duration::hours(hours as i64),
        is_custom: false,
    })
}

/// Decide a etapa final e o lembrete a gravar. `current` deve vir da linha travada.
pub fn plan_change(
    property_id: Uuid,
    pipeline: PipelineKind,
    current: Stage,
    change: ReminderChange,
    now: DateTime<Utc>,
) -> Result<ReminderPlan, AppError> {
    match change {
        ReminderChange::EnterStage(stage) => {
            ensure_stage_in_pipeline(pipeline, stage)?;
            Ok(ReminderPlan { stage, new: plan_for_stage(property_id, stage, now) })
        }
        ReminderChange::Custom { hours } => {
            validate_hours(hours)?;
            Ok(ReminderPlan {
                stage: current,
                new: Some(NewReminder {
                    property_id,
                    stage: current,
                    interval_hours: hours,
                    next_reminder_at: now + Duration::hours(hours as i64),
                    is_custom: true,
                }),
            })
        }
        ReminderChange::Disable => Ok(ReminderPlan { stage: current, new: None }),
    }
}

impl ReminderService {
    pub fn new(store: Arc<dyn ReminderStore>) -> Self {
        Self { store }
    }

    /// Troca de etapa: grava a etapa, o lembrete anterior sai e o da nova etapa entra.
    pub async fn on_stage_enter(&self, property_id: Uuid, stage: Stage) -> Result<StageReminder, AppError> {
        self.on_stage_enter_at(property_id, stage, Utc::now()).await
    }

    pub async fn on_stage_enter_at(
        &self,
        property_id: Uuid,
        stage: Stage,
        now: DateTime<Utc>,
    ) -> Result<StageReminder, AppError> {
        let moved = self.store.apply(property_id, ReminderChange::EnterStage(stage), now).await?;

        match &moved.reminder {
            Some(r) => tracing::info!(
                %property_id, stage = ?stage, next = %r.next_reminder_at,
                "⏰ Lembrete agendado para a etapa"
            ),
            None => tracing::info!(%property_id, stage = ?stage, "Etapa sem lembrete; anteriores desativados"),
        }

        Ok(moved)
    }

    /// Lembrete customizado para a etapa atual do imóvel.
    pub async fn set_custom_interval(&self, property_id: Uuid, hours: i32) -> Result<Reminder, AppError> {
        self.set_custom_interval_at(property_id, hours, Utc::now()).await
    }

    pub async fn set_custom_interval_at(
        &self,
        property_id: Uuid,
        hours: i32,
        now: DateTime<Utc>,
    ) -> Result<Reminder, AppError> {
        validate_hours(hours)?;

        self.store
            .apply(property_id, ReminderChange::Custom { hours }, now)
            .await?
            .reminder
            .ok_or_else(|| AppError::InternalServerError(anyhow::anyhow!("lembrete customizado não foi gravado")))
    }

    /// Adia o próximo aviso. Não mexe em `is_active` nem em `is_custom`.
    pub async fn snooze(&self, reminder_id: Uuid, hours: i32) -> Result<Reminder, AppError> {
        self.snooze_at(reminder_id, hours, Utc::now()).await
    }

    pub async fn snooze_at(&self, reminder_id: Uuid, hours: i32, now: DateTime<Utc>) -> Result<Reminder, AppError> {
        validate_hours(hours)?;

        self.store
            .set_next_reminder_at(reminder_id, now + Duration::hours(hours as i64))
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("Lembrete {}", reminder_id)))
    }

    /// Desliga os lembretes do imóvel sem criar outro.
    pub async fn disable(&self, property_id: Uuid) -> Result<(), AppError> {
        self.store.apply(property_id, ReminderChange::Disable, Utc::now()).await?;
        Ok(())
    }

    pub async fn find(&self, reminder_id: Uuid) -> Result<Reminder, AppError> {
        self.store
            .find(reminder_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("Lembrete {}", reminder_id)))
    }

    pub async fn active_for_property(&self, property_id: Uuid) -> Result<Option<Reminder>, AppError> {
        self.store.active_for_property(property_id).await
    }

    /// Lembretes ativos com status: vencidos primeiro, depois pelo horário.
    pub async fn list_active(&self, now: DateTime<Utc>) -> Result<Vec<ReminderView>, AppError> {
        let rows = self.store.list_active().await?;
        Ok(build_views(rows, now))
    }
}

fn build_views(rows: Vec<ReminderWithProperty>, now: DateTime<Utc>) -> Vec<ReminderView> {
    let mut views: Vec<ReminderView> = rows
        .into_iter()
        .map(|item| {
            let status = item.reminder.status_at(now);
            ReminderView { item, status }
        })
        .collect();

    views.sort_by(|a, b| {
        a.status
            .cmp(&b.status)
            .then(a.item.reminder.next_reminder_at.cmp(&b.item.reminder.next_reminder_at))
    });
    views
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::reminder::ReminderStatus;
    use chrono::TimeZone;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Store em memória com a mesma semântica atômica do Postgres.
    #[derive(Default)]
    pub(crate) struct MemoryReminderStore {
        properties: Mutex<HashMap<Uuid, (PipelineKind, Stage)>>,
        rows: Mutex<Vec<Reminder>>,
    }

    impl MemoryReminderStore {
        pub(crate) fn with_property(property_id: Uuid, pipeline: PipelineKind) -> Self {
            let store = Self::default();
            store
                .properties
                .lock()
                .unwrap()
                .insert(property_id, (pipeline, pipeline.initial_stage()));
            store
        }

        fn stage_of(&self, property_id: Uuid) -> Stage {
            self.properties.lock().unwrap()[&property_id].1
        }

        fn active_count(&self, property_id: Uuid) -> usize {
            self.rows
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.property_id == property_id && r.is_active)
                .count()
        }
    }

    #[async_trait]
    impl ReminderStore for MemoryReminderStore {
        async fn apply(
            &self,
            property_id: Uuid,
            change: ReminderChange,
            now: DateTime<Utc>,
        ) -> Result<StageReminder, AppError> {
            // Os dois locks ficam presos até o fim, como a transação
            let mut properties = self.properties.lock().unwrap();
            let mut rows = self.rows.lock().unwrap();

            let (pipeline, previous_stage) = *properties
                .get(&property_id)
                .ok_or_else(|| AppError::ResourceNotFound(format!("Imóvel {}", property_id)))?;
            let plan = plan_change(property_id, pipeline, previous_stage, change, now)?;

            properties.insert(property_id, (pipeline, plan.stage));
            for r in rows.iter_mut().filter(|r| r.property_id == property_id) {
                r.is_active = false;
            }

            let reminder = plan.new.map(|n| {
                let reminder = Reminder {
                    id: Uuid::new_v4(),
                    property_id: n.property_id,
                    stage: n.stage,
                    interval_hours: n.interval_hours,
                    next_reminder_at: n.next_reminder_at,
                    is_active: true,
                    is_custom: n.is_custom,
                    created_at: now,
                };
                rows.push(reminder.clone());
                reminder
            });

            Ok(StageReminder { previous_stage, stage: plan.stage, reminder })
        }

        async fn find(&self, id: Uuid) -> Result<Option<Reminder>, AppError> {
            Ok(self.rows.lock().unwrap().iter().find(|r| r.id == id).cloned())
        }

        async fn active_for_property(&self, property_id: Uuid) -> Result<Option<Reminder>, AppError> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .iter()
                .find(|r| r.property_id == property_id && r.is_active)
                .cloned())
        }

        async fn set_next_reminder_at(
            &self,
            id: Uuid,
            next_reminder_at: DateTime<Utc>,
        ) -> Result<Option<Reminder>, AppError> {
            let mut rows = self.rows.lock().unwrap();
            Ok(rows.iter_mut().find(|r| r.id == id).map(|r| {
                r.next_reminder_at = next_reminder_at;
                r.clone()
            }))
        }

        async fn list_active(&self) -> Result<Vec<ReminderWithProperty>, AppError> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.is_active)
                .map(|r| ReminderWithProperty {
                    reminder: r.clone(),
                    property_code: format!("IM-{}", &r.property_id.to_string()[..4]),
                    property_title: "Imóvel de teste".into(),
                })
                .collect())
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 10, 9, 0, 0).unwrap()
    }

    fn service_for(property_id: Uuid, pipeline: PipelineKind) -> (ReminderService, Arc<MemoryReminderStore>) {
        let store = Arc::new(MemoryReminderStore::with_property(property_id, pipeline));
        (ReminderService::new(store.clone()), store)
    }

    #[tokio::test]
    async fn entering_stage_schedules_default_interval() {
        let property_id = Uuid::new_v4();
        let (service, store) = service_for(property_id, PipelineKind::Sale);

        let moved = service
            .on_stage_enter_at(property_id, Stage::EmAnuncio, now())
            .await
            .unwrap();
        let reminder = moved.reminder.expect("etapa com lembrete");

        assert_eq!(moved.previous_stage, Stage::NovoImovel);
        assert_eq!(store.stage_of(property_id), Stage::EmAnuncio);
        assert_eq!(reminder.interval_hours, 72);
        assert_eq!(reminder.next_reminder_at, now() + Duration::hours(72));
        assert!(reminder.is_active);
        assert!(!reminder.is_custom);
    }

    #[tokio::test]
    async fn entering_twice_leaves_one_active_and_last_wins() {
        let property_id = Uuid::new_v4();
        let (service, store) = service_for(property_id, PipelineKind::Sale);

        service.on_stage_enter_at(property_id, Stage::Visitas, now()).await.unwrap();
        let second = service
            .on_stage_enter_at(property_id, Stage::Proposta, now())
            .await
            .unwrap()
            .reminder
            .unwrap();

        assert_eq!(store.active_count(property_id), 1);
        let active = service.active_for_property(property_id).await.unwrap().unwrap();
        assert_eq!(active.id, second.id);
        assert_eq!(active.stage, Stage::Proposta);
    }

    #[tokio::test]
    async fn property_stage_always_matches_active_reminder() {
        let property_id = Uuid::new_v4();
        let (service, store) = service_for(property_id, PipelineKind::Sale);

        for stage in [Stage::EmAnuncio, Stage::Visitas, Stage::Proposta, Stage::Documentacao] {
            let moved = service.on_stage_enter_at(property_id, stage, now()).await.unwrap();
            let active = service.active_for_property(property_id).await.unwrap().unwrap();

            assert_eq!(moved.stage, stage);
            assert_eq!(store.stage_of(property_id), stage);
            assert_eq!(active.stage, store.stage_of(property_id));
            assert_eq!(store.active_count(property_id), 1);
        }
    }

    #[tokio::test]
    async fn move_to_other_pipeline_changes_nothing() {
        let property_id = Uuid::new_v4();
        let (service, store) = service_for(property_id, PipelineKind::Sale);

        let before = service
            .on_stage_enter_at(property_id, Stage::Visitas, now())
            .await
            .unwrap()
            .reminder
            .unwrap();
        let err = service
            .on_stage_enter_at(property_id, Stage::Reservado, now())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::InvalidStage(_)));
        assert_eq!(store.stage_of(property_id), Stage::Visitas);
        let active = service.active_for_property(property_id).await.unwrap().unwrap();
        assert_eq!(active.id, before.id);
    }

    #[tokio::test]
    async fn stage_without_reminders_only_deactivates() {
        let property_id = Uuid::new_v4();
        let (service, store) = service_for(property_id, PipelineKind::Sale);

        service.on_stage_enter_at(property_id, Stage::ContratoAssinado, now()).await.unwrap();
        let moved = service
            .on_stage_enter_at(property_id, Stage::ComissaoLiberada, now())
            .await
            .unwrap();

        assert!(moved.reminder.is_none());
        assert_eq!(store.stage_of(property_id), Stage::ComissaoLiberada);
        assert_eq!(store.active_count(property_id), 0);
    }

    #[tokio::test]
    async fn custom_interval_replaces_default() {
        let property_id = Uuid::new_v4();
        let (service, store) = service_for(property_id, PipelineKind::Rental);

        service.on_stage_enter_at(property_id, Stage::Reservado, now()).await.unwrap();
        let custom = service.set_custom_interval_at(property_id, 6, now()).await.unwrap();

        assert!(custom.is_custom);
        assert_eq!(custom.stage, Stage::Reservado);
        assert_eq!(custom.interval_hours, 6);
        assert_eq!(custom.next_reminder_at, now() + Duration::hours(6));
        assert_eq!(store.active_count(property_id), 1);
    }

    #[tokio::test]
    async fn custom_interval_uses_stage_current_at_write() {
        let property_id = Uuid::new_v4();
        let (service, store) = service_for(property_id, PipelineKind::Sale);

        service.on_stage_enter_at(property_id, Stage::Visitas, now()).await.unwrap();
        service.on_stage_enter_at(property_id, Stage::Proposta, now()).await.unwrap();
        let custom = service.set_custom_interval_at(property_id, 10, now()).await.unwrap();

        assert_eq!(custom.stage, Stage::Proposta);
        assert_eq!(store.stage_of(property_id), Stage::Proposta);
    }

    #[tokio::test]
    async fn custom_interval_rejects_out_of_range() {
        let property_id = Uuid::new_v4();
        let (service, store) = service_for(property_id, PipelineKind::Sale);

        for hours in [0, -4, MAX_INTERVAL_HOURS + 1] {
            let err = service.set_custom_interval_at(property_id, hours, now()).await.unwrap_err();
            assert!(matches!(err, AppError::InvalidInterval(h) if h == hours));
        }
        assert_eq!(store.active_count(property_id), 0);
    }

    #[tokio::test]
    async fn snooze_only_moves_next_reminder_at() {
        let property_id = Uuid::new_v4();
        let (service, _) = service_for(property_id, PipelineKind::Sale);

        let custom = service.set_custom_interval_at(property_id, 12, now()).await.unwrap();

        let later = now() + Duration::hours(30);
        let snoozed = service.snooze_at(custom.id, 24, later).await.unwrap();

        assert_eq!(snoozed.next_reminder_at, later + Duration::hours(24));
        assert_eq!(snoozed.is_active, custom.is_active);
        assert_eq!(snoozed.is_custom, custom.is_custom);
        assert_eq!(snoozed.interval_hours, custom.interval_hours);
    }

    #[tokio::test]
    async fn snooze_unknown_reminder_is_not_found() {
        let (service, _) = service_for(Uuid::new_v4(), PipelineKind::Sale);
        let err = service.snooze_at(Uuid::new_v4(), 24, now()).await.unwrap_err();
        assert!(matches!(err, AppError::ResourceNotFound(_)));
    }

    #[tokio::test]
    async fn unknown_property_is_rejected() {
        let (service, _) = service_for(Uuid::new_v4(), PipelineKind::Sale);
        let err = service
            .on_stage_enter_at(Uuid::new_v4(), Stage::Visitas, now())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ResourceNotFound(_)));
    }

    #[tokio::test]
    async fn disable_turns_off_without_replacement() {
        let property_id = Uuid::new_v4();
        let (service, store) = service_for(property_id, PipelineKind::Sale);

        service.on_stage_enter_at(property_id, Stage::Visitas, now()).await.unwrap();
        service.disable(property_id).await.unwrap();

        assert_eq!(store.active_count(property_id), 0);
        assert_eq!(store.stage_of(property_id), Stage::Visitas);
    }

    #[test]
    fn plan_keeps_locked_stage_for_custom_and_disable() {
        let id = Uuid::new_v4();

        let custom = plan_change(id, PipelineKind::Rental, Stage::Reservado, ReminderChange::Custom { hours: 8 }, now())
            .unwrap();
        assert_eq!(custom.stage, Stage::Reservado);
        assert_eq!(custom.new.as_ref().map(|n| (n.stage, n.is_custom)), Some((Stage::Reservado, true)));

        let off = plan_change(id, PipelineKind::Sale, Stage::Visitas, ReminderChange::Disable, now()).unwrap();
        assert_eq!(off, ReminderPlan { stage: Stage::Visitas, new: None });

        let wrong = plan_change(id, PipelineKind::Rental, Stage::Disponivel, ReminderChange::EnterStage(Stage::Proposta), now());
        assert!(matches!(wrong, Err(AppError::InvalidStage(_))));
    }

    #[test]
    fn views_put_overdue_first_then_by_time() {
        let base = now();
        let row = |offset_hours: i64| ReminderWithProperty {
            reminder: Reminder {
                id: Uuid::new_v4(),
                property_id: Uuid::new_v4(),
                stage: Stage::Visitas,
                interval_hours: 48,
                next_reminder_at: base + Duration::hours(offset_hours),
                is_active: true,
                is_custom: false,
                created_at: base,
            },
            property_code: "AP-1".into(),
            property_title: "Apto".into(),
        };

        let views = build_views(vec![row(30), row(1), row(-5), row(-1)], base);
        let statuses: Vec<ReminderStatus> = views.iter().map(|v| v.status).collect();
        assert_eq!(
            statuses,
            vec![ReminderStatus::Overdue, ReminderStatus::Overdue, ReminderStatus::DueSoon, ReminderStatus::Upcoming]
        );
        assert!(views[0].item.reminder.next_reminder_at < views[1].item.reminder.next_reminder_at);
    }
}
