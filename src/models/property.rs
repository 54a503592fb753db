// src/models/property.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Enums (Mapeando o Postgres) ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "pipeline_kind", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineKind {
    Sale,   // Venda
    Rental, // Locação
}

/// Etapas dos dois funis. A ordem de declaração é a ordem do funil.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "property_stage", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    // Venda
    NovoImovel,
    EmAnuncio,
    Visitas,
    Proposta,
    PropostaAceita,
    Documentacao,
    ContratoAssinado,
    ComissaoLiberada,
    // Locação
    Disponivel,
    Reservado,
    Ocupado,
    Catalogo,
}

/// Linha da tabela estática de configuração por etapa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StageConfig {
    pub stage: Stage,
    pub pipeline: PipelineKind,
    #[schema(example = "Em anúncio")]
    pub label: &'static str,
    pub reminders_enabled: bool,
    #[schema(example = 72)]
    pub default_interval_hours: i32,
}

const fn row(
    stage: Stage,
    pipeline: PipelineKind,
    label: &'static str,
    reminders_enabled: bool,
    default_interval_hours: i32,
) -> StageConfig {
    StageConfig { stage, pipeline, label, reminders_enabled, default_interval_hours }
}

pub const STAGE_TABLE: [StageConfig; 12] = [
    row(Stage::NovoImovel, PipelineKind::Sale, "Novo imóvel", true, 24),
    row(Stage::EmAnuncio, PipelineKind::Sale, "Em anúncio", true, 72),
    row(Stage::Visitas, PipelineKind::Sale, "Visitas", true, 48),
    row(Stage::Proposta, PipelineKind::Sale, "Proposta", true, 24),
    row(Stage::PropostaAceita, PipelineKind::Sale, "Proposta aceita", true, 24),
    row(Stage::Documentacao, PipelineKind::Sale, "Documentação", true, 48),
    row(Stage::ContratoAssinado, PipelineKind::Sale, "Contrato assinado", true, 72),
    row(Stage::ComissaoLiberada, PipelineKind::Sale, "Comissão liberada", false, 0),
    row(Stage::Disponivel, PipelineKind::Rental, "Disponível", true, 72),
    row(Stage::Reservado, PipelineKind::Rental, "Reservado", true, 24),
    row(Stage::Ocupado, PipelineKind::Rental, "Ocupado", false, 0),
    row(Stage::Catalogo, PipelineKind::Rental, "Catálogo", false, 0),
];

impl Stage {
    pub fn config(self) -> &'static StageConfig {
        // A tabela cobre todas as variantes, na mesma ordem do enum
        &STAGE_TABLE[self as usize]
    }

    pub fn pipeline(self) -> PipelineKind {
        self.config().pipeline
    }

    /// Intervalo padrão do lembrete, ou None se a etapa não gera lembretes.
    pub fn default_interval_hours(self) -> Option<i32> {
        let config = self.config();
        config.reminders_enabled.then_some(config.default_interval_hours)
    }
}

impl PipelineKind {
    pub fn stages(self) -> impl Iterator<Item = &'static StageConfig> {
        STAGE_TABLE.iter().filter(move |c| c.pipeline == self)
    }

    pub fn initial_stage(self) -> Stage {
        match self {
            PipelineKind::Sale => Stage::NovoImovel,
            PipelineKind::Rental => Stage::Disponivel,
        }
    }
}

// --- Structs ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub id: Uuid,

    #[schema(example = "AP-1024")]
    pub code: String,

    #[schema(example = "Apartamento 3 quartos com varanda gourmet")]
    pub title: String,

    pub pipeline: PipelineKind,
    pub stage: Stage,

    #[schema(example = "Apartamento")]
    pub property_type: String,

    #[schema(example = "Pinheiros")]
    pub neighborhood: Option<String>,
    #[schema(example = "São Paulo")]
    pub city: Option<String>,

    #[schema(example = 3)]
    pub bedrooms: Option<i32>,
    #[schema(example = 2)]
    pub bathrooms: Option<i32>,
    #[schema(example = 1)]
    pub parking_spots: Option<i32>,

    #[schema(example = "98.50")]
    pub area_m2: Option<Decimal>,

    // Valor de venda ou aluguel mensal, conforme o funil
    #[schema(example = "850000.00")]
    pub price: Option<Decimal>,

    pub description: Option<String>,

    #[schema(example = json!(["Varanda gourmet", "Próximo ao metrô"]))]
    pub highlights: Vec<String>,

    pub owner_name: Option<String>,
    pub assigned_to: Option<Uuid>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
