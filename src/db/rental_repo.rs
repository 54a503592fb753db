// src/db/rental_repo.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Executor};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::rental::{AlertConfig, ContractStatus, PaymentStatus, RentalContract, RentalPayment},
};

const CONTRACT_COLUMNS: &str = "id, property_id, property_code, tenant_name, tenant_document, \
     tenant_email, tenant_phone, owner_name, owner_document, rent_value, condominium_fee, iptu_value, \
     due_day, start_date, end_date, adjustment_index, status, created_at, updated_at";

const PAYMENT_COLUMNS: &str = "id, contract_id, due_date, rent_value, condominium_fee, iptu_value, \
     other_fees, late_fee, discount, status, paid_at, paid_amount, notes, created_at, updated_at";

const ALERT_CONFIG_COLUMNS: &str = "id, days_offset, is_enabled, message_template, created_at";

/// Termos do contrato no momento da assinatura.
#[derive(Debug, Clone)]
pub struct NewContract {
    pub property_id: Option<Uuid>,
    pub property_code: String,
    pub tenant_name: String,
    pub tenant_document: String,
    pub tenant_email: Option<String>,
    pub tenant_phone: Option<String>,
    pub owner_name: String,
    pub owner_document: Option<String>,
    pub rent_value: Decimal,
    pub condominium_fee: Decimal,
    pub iptu_value: Decimal,
    pub due_day: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub adjustment_index: Option<String>,
}

#[derive(Clone)]
pub struct RentalRepository {
    pool: PgPool,
}

impl RentalRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    //  CONTRATOS
    // =========================================================================

    pub async fn create_contract<'e, E>(
        &self,
        executor: E,
        data: &NewContract,
    ) -> Result<RentalContract, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let contract = sqlx::query_as::<_, RentalContract>(&format!(
            r#"
            INSERT INTO rental_contracts (
                property_id, property_code, tenant_name, tenant_document, tenant_email,
                tenant_phone, owner_name, owner_document, rent_value, condominium_fee,
                iptu_value, due_day, start_date, end_date, adjustment_index
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING {CONTRACT_COLUMNS}
            "#
        ))
            .bind(data.property_id)
            .bind(&data.property_code)
            .bind(&data.tenant_name)
            .bind(&data.tenant_document)
            .bind(data.tenant_email.as_deref())
            .bind(data.tenant_phone.as_deref())
            .bind(&data.owner_name)
            .bind(data.owner_document.as_deref())
            .bind(data.rent_value)
            .bind(data.condominium_fee)
            .bind(data.iptu_value)
            .bind(data.due_day)
            .bind(data.start_date)
            .bind(data.end_date)
            .bind(data.adjustment_index.as_deref())
            .fetch_one(executor)
            .await?;

        Ok(contract)
    }

    pub async fn list_contracts<'e, E>(&self, executor: E) -> Result<Vec<RentalContract>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let contracts = sqlx::query_as::<_, RentalContract>(&format!(
            "SELECT {CONTRACT_COLUMNS} FROM rental_contracts ORDER BY end_date ASC"
        ))
            .fetch_all(executor)
            .await?;
        Ok(contracts)
    }

    pub async fn find_contract<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<RentalContract>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let contract = sqlx::query_as::<_, RentalContract>(&format!(
            "SELECT {CONTRACT_COLUMNS} FROM rental_contracts WHERE id = $1"
        ))
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(contract)
    }

    pub async fn set_contract_status<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        status: ContractStatus,
    ) -> Result<Option<RentalContract>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let contract = sqlx::query_as::<_, RentalContract>(&format!(
            r#"
            UPDATE rental_contracts SET status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {CONTRACT_COLUMNS}
            "#
        ))
            .bind(id)
            .bind(status)
            .fetch_optional(executor)
            .await?;
        Ok(contract)
    }

    // =========================================================================
    //  PAGAMENTOS
    // =========================================================================

    /// Grava o carnê inteiro de uma vez (um pagamento por vencimento).
    pub async fn insert_payment_schedule<'e, E>(
        &self,
        executor: E,
        contract: &RentalContract,
        due_dates: &[NaiveDate],
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            INSERT INTO rental_payments (contract_id, due_date, rent_value, condominium_fee, iptu_value)
            SELECT $1, d, $3, $4, $5 FROM UNNEST($2::date[]) AS d
            "#,
        )
            .bind(contract.id)
            .bind(due_dates)
            .bind(contract.rent_value)
            .bind(contract.condominium_fee)
            .bind(contract.iptu_value)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    /// Persiste a virada pendente -> vencido para tudo que venceu antes de `today`.
    pub async fn mark_overdue<'e, E>(&self, executor: E, today: NaiveDate) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE rental_payments SET status = 'OVERDUE', updated_at = NOW()
            WHERE status = 'PENDING' AND due_date < $1
            "#,
        )
            .bind(today)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn list_payments<'e, E>(
        &self,
        executor: E,
        contract_id: Option<Uuid>,
        statuses: &[PaymentStatus],
    ) -> Result<Vec<RentalPayment>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let payments = sqlx::query_as::<_, RentalPayment>(&format!(
            r#"
            SELECT {PAYMENT_COLUMNS}
            FROM rental_payments
            WHERE ($1::uuid IS NULL OR contract_id = $1)
              AND (CARDINALITY($2::payment_status[]) = 0 OR status = ANY($2))
            ORDER BY due_date ASC
            "#
        ))
            .bind(contract_id)
            .bind(statuses)
            .fetch_all(executor)
            .await?;
        Ok(payments)
    }

    pub async fn find_payment<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<RentalPayment>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let payment = sqlx::query_as::<_, RentalPayment>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM rental_payments WHERE id = $1 FOR UPDATE"
        ))
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(payment)
    }

    pub async fn record_payment<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        status: PaymentStatus,
        paid_amount: Decimal,
        paid_at: DateTime<Utc>,
        notes: Option<&str>,
    ) -> Result<RentalPayment, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let payment = sqlx::query_as::<_, RentalPayment>(&format!(
            r#"
            UPDATE rental_payments
            SET status = $2, paid_amount = $3, paid_at = $4,
                notes = COALESCE($5, notes), updated_at = NOW()
            WHERE id = $1
            RETURNING {PAYMENT_COLUMNS}
            "#
        ))
            .bind(id)
            .bind(status)
            .bind(paid_amount)
            .bind(paid_at)
            .bind(notes)
            .fetch_one(executor)
            .await?;
        Ok(payment)
    }

    pub async fn set_payment_status<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        status: PaymentStatus,
    ) -> Result<RentalPayment, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let payment = sqlx::query_as::<_, RentalPayment>(&format!(
            "UPDATE rental_payments SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING {PAYMENT_COLUMNS}"
        ))
            .bind(id)
            .bind(status)
            .fetch_one(executor)
            .await?;
        Ok(payment)
    }

    /// Ajuste de encargos: multa, desconto e outras taxas. None mantém o valor atual.
    pub async fn adjust_payment<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        late_fee: Option<Decimal>,
        discount: Option<Decimal>,
        other_fees: Option<Decimal>,
    ) -> Result<RentalPayment, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let payment = sqlx::query_as::<_, RentalPayment>(&format!(
            r#"
            UPDATE rental_payments
            SET late_fee = COALESCE($2, late_fee),
                discount = COALESCE($3, discount),
                other_fees = COALESCE($4, other_fees),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {PAYMENT_COLUMNS}
            "#
        ))
            .bind(id)
            .bind(late_fee)
            .bind(discount)
            .bind(other_fees)
            .fetch_one(executor)
            .await?;
        Ok(payment)
    }

    /// Cancela as parcelas em aberto de um contrato (rescisão).
    pub async fn cancel_open_payments<'e, E>(
        &self,
        executor: E,
        contract_id: Uuid,
        from: NaiveDate,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE rental_payments SET status = 'CANCELLED', updated_at = NOW()
            WHERE contract_id = $1 AND due_date >= $2 AND status IN ('PENDING', 'OVERDUE')
            "#,
        )
            .bind(contract_id)
            .bind(from)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    // =========================================================================
    //  CONFIGURAÇÃO DE ALERTAS
    // =========================================================================

    pub async fn list_alert_configs<'e, E>(
        &self,
        executor: E,
        only_enabled: bool,
    ) -> Result<Vec<AlertConfig>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let configs = sqlx::query_as::<_, AlertConfig>(&format!(
            r#"
            SELECT {ALERT_CONFIG_COLUMNS}
            FROM rental_alert_configs
            WHERE (NOT $1 OR is_enabled)
            ORDER BY days_offset ASC
            "#
        ))
            .bind(only_enabled)
            .fetch_all(executor)
            .await?;
        Ok(configs)
    }

    pub async fn create_alert_config<'e, E>(
        &self,
        executor: E,
        days_offset: i32,
        is_enabled: bool,
        message_template: Option<&str>,
    ) -> Result<AlertConfig, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let config = sqlx::query_as::<_, AlertConfig>(&format!(
            r#"
            INSERT INTO rental_alert_configs (days_offset, is_enabled, message_template)
            VALUES ($1, $2, $3)
            RETURNING {ALERT_CONFIG_COLUMNS}
            "#
        ))
            .bind(days_offset)
            .bind(is_enabled)
            .bind(message_template)
            .fetch_one(executor)
            .await?;
        Ok(config)
    }

    /// Campos None mantêm o valor atual; `message_template = Some(None)`
    /// apaga o modelo e o alerta volta à mensagem padrão.
    pub async fn update_alert_config<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        days_offset: Option<i32>,
        is_enabled: Option<bool>,
        message_template: Option<Option<&str>>,
    ) -> Result<Option<AlertConfig>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let config = sqlx::query_as::<_, AlertConfig>(&format!(
            r#"
            UPDATE rental_alert_configs
            SET days_offset = COALESCE($2, days_offset),
                is_enabled = COALESCE($3, is_enabled),
                message_template = CASE WHEN $4 THEN $5 ELSE message_template END
            WHERE id = $1
            RETURNING {ALERT_CONFIG_COLUMNS}
            "#
        ))
            .bind(id)
            .bind(days_offset)
            .bind(is_enabled)
            .bind(message_template.is_some())
            .bind(message_template.flatten())
            .fetch_optional(executor)
            .await?;
        Ok(config)
    }
}
