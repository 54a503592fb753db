// src/services/rental_service.rs

use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{Postgres, Executor, Acquire};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{rental_repo::NewContract, RentalRepository},
    models::rental::{AlertConfig, ContractStatus, PaymentStatus, PaymentView, RentalContract, RentalPayment},
};

/// Vencimentos mensais no dia `due_day`, do mês de início ao mês de término,
/// mantendo só as datas dentro da vigência.
pub fn payment_schedule(start: NaiveDate, end: NaiveDate, due_day: u32) -> Vec<NaiveDate> {
    let mut dates = Vec::new();
    let Some(mut month) = NaiveDate::from_ymd_opt(start.year(), start.month(), 1) else {
        return dates;
    };

    while month <= end {
        if let Some(due) = month.with_day(due_day) {
            if due >= start && due <= end {
                dates.push(due);
            }
        }
        match month.checked_add_months(Months::new(1)) {
            Some(next) => month = next,
            None => break,
        }
    }

    dates
}

/// Aplica um valor recebido a uma parcela. Baixas parciais se acumulam.
pub fn settle(payment: &RentalPayment, amount: Decimal) -> Result<(PaymentStatus, Decimal), AppError> {
    if !payment.status.is_open() {
        return Err(AppError::InvalidPayment(format!("parcela {:?} não aceita baixa", payment.status)));
    }
    if amount <= Decimal::ZERO {
        return Err(AppError::InvalidPayment("valor deve ser positivo".into()));
    }

    let paid = payment.paid_amount.unwrap_or(Decimal::ZERO) + amount;
    let status = if paid >= payment.total() {
        PaymentStatus::Paid
    } else {
        PaymentStatus::Partial
    };
    Ok((status, paid))
}

/// Status de uma parcela depois de mudar multa, desconto ou taxas.
/// Uma parcial cujo valor já pago cobre o novo total vira quitada.
pub fn status_after_adjustment(payment: &RentalPayment) -> PaymentStatus {
    match (payment.status, payment.paid_amount) {
        (PaymentStatus::Partial, Some(paid)) if paid >= payment.total() => PaymentStatus::Paid,
        (status, _) => status,
    }
}

fn validate_terms(data: &NewContract) -> Result<(), AppError> {
    if data.end_date <= data.start_date {
        return Err(AppError::InvalidContract("término deve ser posterior ao início".into()));
    }
    if !(1..=28).contains(&data.due_day) {
        return Err(AppError::InvalidContract("dia de vencimento deve estar entre 1 e 28".into()));
    }
    if data.rent_value <= Decimal::ZERO {
        return Err(AppError::InvalidContract("valor do aluguel deve ser positivo".into()));
    }
    if data.condominium_fee < Decimal::ZERO || data.iptu_value < Decimal::ZERO {
        return Err(AppError::InvalidContract("encargos não podem ser negativos".into()));
    }
    Ok(())
}

fn with_effective_status(mut contract: RentalContract, today: NaiveDate) -> RentalContract {
    contract.status = contract.effective_status(today);
    contract
}

#[derive(Clone)]
pub struct RentalService {
    repo: RentalRepository,
}

impl RentalService {
    pub fn new(repo: RentalRepository) -> Self {
        Self { repo }
    }

    // =========================================================================
    //  CONTRATOS
    // =========================================================================

    /// Cria o contrato e o carnê de pagamentos na mesma transação.
    pub async fn create_contract<'e, E>(
        &self,
        executor: E,
        data: NewContract,
    ) -> Result<(RentalContract, Vec<PaymentView>), AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        validate_terms(&data)?;

        let due_dates = payment_schedule(data.start_date, data.end_date, data.due_day as u32);
        if due_dates.is_empty() {
            return Err(AppError::InvalidContract("vigência não contém nenhum vencimento".into()));
        }

        let mut tx = executor.begin().await?;

        let contract = self.repo.create_contract(&mut *tx, &data).await?;
        let inserted = self.repo.insert_payment_schedule(&mut *tx, &contract, &due_dates).await?;
        let payments = self.repo.list_payments(&mut *tx, Some(contract.id), &[]).await?;

        tx.commit().await?;

        tracing::info!(contract_id = %contract.id, property = %contract.property_code, inserted, "Contrato criado");

        let today = Utc::now().date_naive();
        Ok((
            with_effective_status(contract, today),
            payments.into_iter().map(PaymentView::from).collect(),
        ))
    }

    pub async fn list_contracts<'e, E>(&self, executor: E) -> Result<Vec<RentalContract>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let today = Utc::now().date_naive();
        let contracts = self.repo.list_contracts(executor).await?;
        Ok(contracts.into_iter().map(|c| with_effective_status(c, today)).collect())
    }

    pub async fn get_contract<'e, E>(&self, executor: E, id: Uuid) -> Result<RentalContract, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let contract = self
            .repo
            .find_contract(executor, id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("Contrato {}", id)))?;
        Ok(with_effective_status(contract, Utc::now().date_naive()))
    }

    /// Rescisão: marca o contrato e cancela as parcelas em aberto a partir de hoje.
    pub async fn terminate_contract<'e, E>(&self, executor: E, id: Uuid) -> Result<RentalContract, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let today = Utc::now().date_naive();
        let mut tx = executor.begin().await?;

        let contract = self
            .repo
            .find_contract(&mut *tx, id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("Contrato {}", id)))?;

        if matches!(contract.status, ContractStatus::Terminated | ContractStatus::Renewed) {
            return Err(AppError::InvalidContract(format!("contrato já está {:?}", contract.status)));
        }

        let cancelled = self.repo.cancel_open_payments(&mut *tx, id, today).await?;
        let contract = self
            .repo
            .set_contract_status(&mut *tx, id, ContractStatus::Terminated)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("Contrato {}", id)))?;

        tx.commit().await?;

        tracing::info!(contract_id = %id, cancelled, "Contrato rescindido");
        Ok(contract)
    }

    pub async fn renew_contract<'e, E>(&self, executor: E, id: Uuid) -> Result<RentalContract, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let contract = self
            .repo
            .find_contract(&mut *tx, id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("Contrato {}", id)))?;

        if contract.status == ContractStatus::Terminated {
            return Err(AppError::InvalidContract("contrato rescindido não pode ser renovado".into()));
        }

        let contract = self
            .repo
            .set_contract_status(&mut *tx, id, ContractStatus::Renewed)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("Contrato {}", id)))?;

        tx.commit().await?;
        Ok(contract)
    }

    // =========================================================================
    //  PAGAMENTOS
    // =========================================================================

    /// Lista parcelas (de um contrato ou todas) já com a virada para vencido gravada.
    pub async fn list_payments<'e, E>(
        &self,
        executor: E,
        contract_id: Option<Uuid>,
        statuses: &[PaymentStatus],
    ) -> Result<Vec<PaymentView>, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        self.repo.mark_overdue(&mut *tx, Utc::now().date_naive()).await?;
        let payments = self.repo.list_payments(&mut *tx, contract_id, statuses).await?;

        tx.commit().await?;
        Ok(payments.into_iter().map(PaymentView::from).collect())
    }

    async fn lock_payment(
        &self,
        conn: &mut sqlx::PgConnection,
        id: Uuid,
    ) -> Result<RentalPayment, AppError> {
        self.repo
            .find_payment(conn, id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("Pagamento {}", id)))
    }

    /// Baixa de pagamento. Sem valor informado, quita o total da parcela.
    pub async fn confirm_payment<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        amount: Option<Decimal>,
        paid_at: Option<DateTime<Utc>>,
        notes: Option<&str>,
    ) -> Result<PaymentView, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let payment = self.lock_payment(&mut tx, id).await?;
        let remaining = payment.total() - payment.paid_amount.unwrap_or(Decimal::ZERO);
        let (status, paid) = settle(&payment, amount.unwrap_or(remaining))?;

        let payment = self
            .repo
            .record_payment(&mut *tx, id, status, paid, paid_at.unwrap_or_else(Utc::now), notes)
            .await?;

        tx.commit().await?;

        tracing::info!(payment_id = %id, status = ?status, paid = %paid, "Baixa registrada");
        Ok(PaymentView::from(payment))
    }

    pub async fn cancel_payment<'e, E>(&self, executor: E, id: Uuid) -> Result<PaymentView, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let payment = self.lock_payment(&mut tx, id).await?;
        if !payment.status.is_open() {
            return Err(AppError::InvalidPayment(format!("parcela {:?} não pode ser cancelada", payment.status)));
        }

        let payment = self.repo.set_payment_status(&mut *tx, id, PaymentStatus::Cancelled).await?;
        tx.commit().await?;
        Ok(PaymentView::from(payment))
    }

    /// Multa, desconto e outras taxas sobre uma parcela em aberto.
    pub async fn adjust_payment<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        late_fee: Option<Decimal>,
        discount: Option<Decimal>,
        other_fees: Option<Decimal>,
    ) -> Result<PaymentView, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let negative = [late_fee, discount, other_fees]
            .iter()
            .flatten()
            .any(|v| *v < Decimal::ZERO);
        if negative {
            return Err(AppError::InvalidPayment("valores não podem ser negativos".into()));
        }

        let mut tx = executor.begin().await?;

        let payment = self.lock_payment(&mut tx, id).await?;
        if !payment.status.is_open() {
            return Err(AppError::InvalidPayment(format!("parcela {:?} não pode ser ajustada", payment.status)));
        }

        let payment = self.repo.adjust_payment(&mut *tx, id, late_fee, discount, other_fees).await?;

        // Desconto maior que a soma dos encargos deixaria o total negativo
        if payment.total() < Decimal::ZERO {
            return Err(AppError::InvalidPayment("total da parcela ficaria negativo".into()));
        }

        let status = status_after_adjustment(&payment);
        let payment = if status != payment.status {
            tracing::info!(payment_id = %id, status = ?status, "Valor pago cobre o novo total");
            self.repo.set_payment_status(&mut *tx, id, status).await?
        } else {
            payment
        };

        tx.commit().await?;
        Ok(PaymentView::from(payment))
    }

    // =========================================================================
    //  CONFIGURAÇÃO DE ALERTAS
    // =========================================================================

    pub async fn list_alert_configs<'e, E>(&self, executor: E) -> Result<Vec<AlertConfig>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo.list_alert_configs(executor, false).await
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
        self.repo.create_alert_config(executor, days_offset, is_enabled, message_template).await
    }

    pub async fn update_alert_config<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        days_offset: Option<i32>,
        is_enabled: Option<bool>,
        message_template: Option<Option<&str>>,
    ) -> Result<AlertConfig, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo
            .update_alert_config(executor, id, days_offset, is_enabled, message_template)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("Configuração de alerta {}", id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn money(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn open_payment(status: PaymentStatus, paid: Option<&str>) -> RentalPayment {
        RentalPayment {
            id: Uuid::new_v4(),
            contract_id: Uuid::new_v4(),
            due_date: date(2024, 1, 10),
            rent_value: money("2000.00"),
            condominium_fee: money("500.00"),
            iptu_value: Decimal::ZERO,
            other_fees: Decimal::ZERO,
            late_fee: Decimal::ZERO,
            discount: Decimal::ZERO,
            status,
            paid_at: None,
            paid_amount: paid.map(money),
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn terms(start: NaiveDate, end: NaiveDate, due_day: i32) -> NewContract {
        NewContract {
            property_id: None,
            property_code: "AP-1".into(),
            tenant_name: "Carlos".into(),
            tenant_document: "123".into(),
            tenant_email: None,
            tenant_phone: None,
            owner_name: "Maria".into(),
            owner_document: None,
            rent_value: money("1500"),
            condominium_fee: Decimal::ZERO,
            iptu_value: Decimal::ZERO,
            due_day,
            start_date: start,
            end_date: end,
            adjustment_index: None,
        }
    }

    #[test]
    fn schedule_covers_one_due_date_per_month() {
        let dates = payment_schedule(date(2024, 1, 1), date(2024, 12, 31), 10);
        assert_eq!(dates.len(), 12);
        assert_eq!(dates.first(), Some(&date(2024, 1, 10)));
        assert_eq!(dates.last(), Some(&date(2024, 12, 10)));
    }

    #[test]
    fn schedule_skips_due_dates_outside_the_term() {
        // Começa depois do dia 10 e termina antes do dia 10
        let dates = payment_schedule(date(2024, 1, 15), date(2024, 4, 5), 10);
        assert_eq!(dates, vec![date(2024, 2, 10), date(2024, 3, 10)]);
    }

    #[test]
    fn schedule_crosses_year_boundary() {
        let dates = payment_schedule(date(2023, 11, 1), date(2024, 2, 28), 28);
        assert_eq!(
            dates,
            vec![date(2023, 11, 28), date(2023, 12, 28), date(2024, 1, 28), date(2024, 2, 28)]
        );
    }

    #[test]
    fn full_amount_marks_paid() {
        let p = open_payment(PaymentStatus::Pending, None);
        let (status, paid) = settle(&p, money("2500.00")).unwrap();
        assert_eq!(status, PaymentStatus::Paid);
        assert_eq!(paid, money("2500.00"));
    }

    #[test]
    fn short_amount_marks_partial_and_accumulates() {
        let p = open_payment(PaymentStatus::Overdue, None);
        let (status, paid) = settle(&p, money("1000.00")).unwrap();
        assert_eq!(status, PaymentStatus::Partial);

        let p = open_payment(PaymentStatus::Partial, Some(paid.to_string().as_str()));
        let (status, paid) = settle(&p, money("1500.00")).unwrap();
        assert_eq!(status, PaymentStatus::Paid);
        assert_eq!(paid, money("2500.00"));
    }

    #[test]
    fn closed_payments_and_non_positive_amounts_are_rejected() {
        let paid = open_payment(PaymentStatus::Paid, Some("2500.00"));
        assert!(matches!(settle(&paid, money("1")), Err(AppError::InvalidPayment(_))));

        let cancelled = open_payment(PaymentStatus::Cancelled, None);
        assert!(matches!(settle(&cancelled, money("1")), Err(AppError::InvalidPayment(_))));

        let pending = open_payment(PaymentStatus::Pending, None);
        assert!(matches!(settle(&pending, Decimal::ZERO), Err(AppError::InvalidPayment(_))));
    }

    #[test]
    fn discount_that_covers_the_balance_closes_a_partial_payment() {
        // 2400 pagos de 2500; desconto de 200 deixa o total em 2300
        let mut p = open_payment(PaymentStatus::Partial, Some("2400.00"));
        p.discount = money("200.00");
        assert_eq!(p.total(), money("2300.00"));
        assert_eq!(status_after_adjustment(&p), PaymentStatus::Paid);

        p.status = status_after_adjustment(&p);
        assert!(matches!(settle(&p, money("1")), Err(AppError::InvalidPayment(_))));
    }

    #[test]
    fn adjustment_keeps_status_while_a_balance_remains() {
        let mut p = open_payment(PaymentStatus::Partial, Some("2400.00"));
        p.late_fee = money("50.00");
        assert_eq!(status_after_adjustment(&p), PaymentStatus::Partial);

        let (status, paid) = settle(&p, p.total() - money("2400.00")).unwrap();
        assert_eq!(status, PaymentStatus::Paid);
        assert_eq!(paid, money("2550.00"));

        let overdue = open_payment(PaymentStatus::Overdue, None);
        assert_eq!(status_after_adjustment(&overdue), PaymentStatus::Overdue);
    }

    #[test]
    fn contract_terms_are_checked() {
        assert!(validate_terms(&terms(date(2024, 1, 1), date(2025, 1, 1), 10)).is_ok());
        assert!(matches!(
            validate_terms(&terms(date(2024, 1, 1), date(2024, 1, 1), 10)),
            Err(AppError::InvalidContract(_))
        ));
        assert!(matches!(
            validate_terms(&terms(date(2024, 1, 1), date(2025, 1, 1), 29)),
            Err(AppError::InvalidContract(_))
        ));
        assert!(matches!(
            validate_terms(&terms(date(2024, 1, 1), date(2025, 1, 1), 0)),
            Err(AppError::InvalidContract(_))
        ));
    }
}
