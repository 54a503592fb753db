// src/models/rental.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Contratos que terminam dentro desta janela aparecem como "terminando".
pub const ENDING_SOON_WINDOW_DAYS: i64 = 30;

// --- Enums (Mapeando o Postgres) ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "contract_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContractStatus {
    Active,
    EndingSoon,
    Expired,
    Terminated, // Rescindido
    Renewed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "payment_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,   // Em aberto
    Paid,      // Quitado
    Overdue,   // Vencido
    Partial,   // Pago parcialmente
    Cancelled, // Cancelado
}

impl PaymentStatus {
    /// Parcelas que ainda podem receber baixa, ajuste ou cancelamento.
    pub fn is_open(self) -> bool {
        matches!(self, PaymentStatus::Pending | PaymentStatus::Overdue | PaymentStatus::Partial)
    }
}

// Ordem de declaração = ordem da lista de alertas
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Critical,
    Warning,
    Info,
}

// --- Structs ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RentalContract {
    pub id: Uuid,
    pub property_id: Option<Uuid>,

    #[schema(example = "AP-1024")]
    pub property_code: String,

    #[schema(example = "Carlos Pereira")]
    pub tenant_name: String,
    #[schema(example = "123.456.789-00")]
    pub tenant_document: String,
    pub tenant_email: Option<String>,
    pub tenant_phone: Option<String>,

    #[schema(example = "Maria Oliveira")]
    pub owner_name: String,
    pub owner_document: Option<String>,

    #[schema(example = "3200.00")]
    pub rent_value: Decimal,
    #[schema(example = "850.00")]
    pub condominium_fee: Decimal,
    #[schema(example = "120.00")]
    pub iptu_value: Decimal,

    #[schema(example = 10)]
    pub due_day: i32,

    #[schema(value_type = String, format = Date, example = "2024-01-01")]
    pub start_date: NaiveDate,
    #[schema(value_type = String, format = Date, example = "2026-12-31")]
    pub end_date: NaiveDate,

    #[schema(example = "IGP-M")]
    pub adjustment_index: Option<String>,

    pub status: ContractStatus,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RentalContract {
    /// Status derivado da proximidade do fim do contrato.
    /// Rescisão e renovação são decisões explícitas e não mudam com o tempo.
    pub fn effective_status(&self, today: NaiveDate) -> ContractStatus {
        match self.status {
            ContractStatus::Terminated | ContractStatus::Renewed => self.status,
            _ => {
                let days_left = (self.end_date - today).num_days();
                if days_left < 0 {
                    ContractStatus::Expired
                } else if days_left <= ENDING_SOON_WINDOW_DAYS {
                    ContractStatus::EndingSoon
                } else {
                    ContractStatus::Active
                }
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RentalPayment {
    pub id: Uuid,
    pub contract_id: Uuid,

    #[schema(value_type = String, format = Date, example = "2024-01-10")]
    pub due_date: NaiveDate,

    #[schema(example = "3200.00")]
    pub rent_value: Decimal,
    #[schema(example = "850.00")]
    pub condominium_fee: Decimal,
    #[schema(example = "120.00")]
    pub iptu_value: Decimal,
    #[schema(example = "0.00")]
    pub other_fees: Decimal,
    #[schema(example = "64.00")]
    pub late_fee: Decimal, // Multa
    #[schema(example = "0.00")]
    pub discount: Decimal,

    pub status: PaymentStatus,

    pub paid_at: Option<DateTime<Utc>>,
    pub paid_amount: Option<Decimal>,
    pub notes: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RentalPayment {
    /// Aluguel + condomínio + IPTU + outras taxas + multa - desconto.
    pub fn total(&self) -> Decimal {
        self.rent_value + self.condominium_fee + self.iptu_value + self.other_fees + self.late_fee
            - self.discount
    }

    /// Pendente com vencimento no passado é tratado como vencido.
    pub fn effective_status(&self, today: NaiveDate) -> PaymentStatus {
        if self.status == PaymentStatus::Pending && self.due_date < today {
            PaymentStatus::Overdue
        } else {
            self.status
        }
    }
}

/// Pagamento com o total já calculado, como a API devolve.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentView {
    #[serde(flatten)]
    pub payment: RentalPayment,
    #[schema(example = "4170.00")]
    pub total: Decimal,
}

impl From<RentalPayment> for PaymentView {
    fn from(payment: RentalPayment) -> Self {
        let total = payment.total();
        Self { payment, total }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AlertConfig {
    pub id: Uuid,

    /// Negativo = dias antes do vencimento, zero = no dia, positivo = dias de atraso.
    #[schema(example = -3)]
    pub days_offset: i32,

    #[schema(example = true)]
    pub is_enabled: bool,

    #[schema(example = "Aluguel do imóvel {property} vence em {days} dia(s)")]
    pub message_template: Option<String>,

    pub created_at: DateTime<Utc>,
}

/// Alerta calculado a cada leitura; não existe no banco.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RentalAlert {
    pub payment: PaymentView,
    pub contract: RentalContract,
    pub config: AlertConfig,
    /// Vencimento menos hoje, em dias (negativo = atrasado).
    #[schema(example = 2)]
    pub days_offset: i64,
    pub severity: AlertSeverity,
    #[schema(value_type = String, format = Date, example = "2024-01-10")]
    pub due_date: NaiveDate,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn money(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn payment(due: NaiveDate, status: PaymentStatus) -> RentalPayment {
        RentalPayment {
            id: Uuid::new_v4(),
            contract_id: Uuid::new_v4(),
            due_date: due,
            rent_value: money("2500.00"),
            condominium_fee: money("640.35"),
            iptu_value: money("98.10"),
            other_fees: money("15.00"),
            late_fee: money("50.00"),
            discount: money("100.45"),
            status,
            paid_at: None,
            paid_amount: None,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn total_is_charges_minus_discount() {
        let p = payment(date(2024, 1, 10), PaymentStatus::Pending);
        assert_eq!(p.total(), money("3203.00"));
    }

    #[test]
    fn pending_in_the_past_reads_as_overdue() {
        let p = payment(date(2024, 1, 10), PaymentStatus::Pending);
        assert_eq!(p.effective_status(date(2024, 1, 10)), PaymentStatus::Pending);
        assert_eq!(p.effective_status(date(2024, 1, 11)), PaymentStatus::Overdue);

        let paid = payment(date(2024, 1, 10), PaymentStatus::Paid);
        assert_eq!(paid.effective_status(date(2024, 2, 1)), PaymentStatus::Paid);
    }

    #[test]
    fn contract_status_tracks_end_date() {
        let mut contract = RentalContract {
            id: Uuid::new_v4(),
            property_id: None,
            property_code: "AP-1".into(),
            tenant_name: "Carlos".into(),
            tenant_document: "123".into(),
            tenant_email: None,
            tenant_phone: None,
            owner_name: "Maria".into(),
            owner_document: None,
            rent_value: money("1000"),
            condominium_fee: Decimal::ZERO,
            iptu_value: Decimal::ZERO,
            due_day: 5,
            start_date: date(2023, 1, 1),
            end_date: date(2024, 6, 30),
            adjustment_index: None,
            status: ContractStatus::Active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        assert_eq!(contract.effective_status(date(2024, 5, 1)), ContractStatus::Active);
        assert_eq!(contract.effective_status(date(2024, 5, 31)), ContractStatus::EndingSoon);
        assert_eq!(contract.effective_status(date(2024, 6, 30)), ContractStatus::EndingSoon);
        assert_eq!(contract.effective_status(date(2024, 7, 1)), ContractStatus::Expired);

        contract.status = ContractStatus::Terminated;
        assert_eq!(contract.effective_status(date(2024, 7, 1)), ContractStatus::Terminated);
    }
}
