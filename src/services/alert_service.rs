// src/services/alert_service.rs

use std::collections::HashMap;

use chrono::NaiveDate;
use sqlx::{Postgres, Executor, Acquire};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::RentalRepository,
    models::rental::{
        AlertConfig, AlertSeverity, PaymentStatus, PaymentView, RentalAlert, RentalContract, RentalPayment,
    },
};

/// Severidade pela antecedência/atraso configurado (não pelo atraso real).
pub fn severity_for_offset(days_offset: i32) -> AlertSeverity {
    if days_offset >= 7 {
        AlertSeverity::Critical
    } else if days_offset >= 1 {
        AlertSeverity::Warning
    } else {
        AlertSeverity::Info
    }
}

/// A regra de alerta vale para um pagamento que vence em `days_diff` dias?
pub fn config_applies(days_offset: i32, days_diff: i64) -> bool {
    let offset = days_offset as i64;
    if offset < 0 {
        (0..=offset.abs()).contains(&days_diff)
    } else if offset == 0 {
        days_diff == 0
    } else {
        days_diff < 0 && days_diff.abs() >= offset
    }
}

fn default_message(contract: &RentalContract, days_diff: i64) -> String {
    match days_diff {
        0 => format!("Aluguel do imóvel {} vence hoje", contract.property_code),
        d if d > 0 => format!("Aluguel do imóvel {} vence em {} dia(s)", contract.property_code, d),
        d => format!("Aluguel do imóvel {} vencido há {} dia(s)", contract.property_code, d.abs()),
    }
}

fn render_message(config: &AlertConfig, contract: &RentalContract, payment: &RentalPayment, days_diff: i64) -> String {
    match config.message_template.as_deref().map(str::trim) {
        Some(template) if !template.is_empty() => template
            .replace("{property}", &contract.property_code)
            .replace("{tenant}", &contract.tenant_name)
            .replace("{days}", &days_diff.abs().to_string())
            .replace("{amount}", &format!("R$ {:.2}", payment.total())),
        _ => default_message(contract, days_diff),
    }
}

/// Calcula os alertas de vencimento a partir de um retrato dos dados.
///
/// Só entram pagamentos pendentes ou vencidos e regras habilitadas. Um mesmo
/// pagamento gera um alerta por regra que se aplica. Pagamentos cujo contrato
/// não está no retrato são ignorados. Resultado ordenado por severidade
/// (crítico, atenção, info) e depois por vencimento.
pub fn derive_alerts(
    payments: &[RentalPayment],
    contracts: &[RentalContract],
    configs: &[AlertConfig],
    today: NaiveDate,
) -> Vec<RentalAlert> {
    let contracts_by_id: HashMap<Uuid, &RentalContract> = contracts.iter().map(|c| (c.id, c)).collect();

    let mut enabled: Vec<&AlertConfig> = configs.iter().filter(|c| c.is_enabled).collect();
    enabled.sort_by_key(|c| c.days_offset);

    let mut alerts = Vec::new();

    for payment in payments
        .iter()
        .filter(|p| matches!(p.status, PaymentStatus::Pending | PaymentStatus::Overdue))
    {
        let Some(contract) = contracts_by_id.get(&payment.contract_id) else {
            continue;
        };

        let days_diff = (payment.due_date - today).num_days();

        for config in enabled.iter().filter(|c| config_applies(c.days_offset, days_diff)) {
            alerts.push(RentalAlert {
                payment: PaymentView::from(payment.clone()),
                contract: (*contract).clone(),
                config: (*config).clone(),
                days_offset: days_diff,
                severity: severity_for_offset(config.days_offset),
                due_date: payment.due_date,
                message: render_message(config, contract, payment, days_diff),
            });
        }
    }

    alerts.sort_by(|a, b| a.severity.cmp(&b.severity).then(a.due_date.cmp(&b.due_date)));
    alerts
}

#[derive(Clone)]
pub struct AlertService {
    repo: RentalRepository,
}

impl AlertService {
    pub fn new(repo: RentalRepository) -> Self {
        Self { repo }
    }

    /// Busca o retrato numa transação (pagamentos, contratos, regras) e deriva os alertas.
    pub async fn current_alerts<'e, E>(&self, executor: E, today: NaiveDate) -> Result<Vec<RentalAlert>, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        self.repo.mark_overdue(&mut *tx, today).await?;
        let payments = self
            .repo
            .list_payments(&mut *tx, None, &[PaymentStatus::Pending, PaymentStatus::Overdue])
            .await?;
        let contracts = self.repo.list_contracts(&mut *tx).await?;
        let configs = self.repo.list_alert_configs(&mut *tx, true).await?;

        tx.commit().await?;

        let alerts = derive_alerts(&payments, &contracts, &configs, today);
        tracing::debug!(payments = payments.len(), alerts = alerts.len(), "Alertas de aluguel calculados");
        Ok(alerts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::rental::ContractStatus;
    use chrono::Utc;
    use rust_decimal::Decimal;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn contract(code: &str) -> RentalContract {
        RentalContract {
            id: Uuid::new_v4(),
            property_id: None,
            property_code: code.into(),
            tenant_name: "Carlos Pereira".into(),
            tenant_document: "123.456.789-00".into(),
            tenant_email: None,
            tenant_phone: None,
            owner_name: "Maria Oliveira".into(),
            owner_document: None,
            rent_value: Decimal::new(2000, 0),
            condominium_fee: Decimal::new(500, 0),
            iptu_value: Decimal::ZERO,
            due_day: 10,
            start_date: date(2023, 1, 1),
            end_date: date(2025, 12, 31),
            adjustment_index: None,
            status: ContractStatus::Active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn payment(contract: &RentalContract, due: NaiveDate, status: PaymentStatus) -> RentalPayment {
        RentalPayment {
            id: Uuid::new_v4(),
            contract_id: contract.id,
            due_date: due,
            rent_value: contract.rent_value,
            condominium_fee: contract.condominium_fee,
            iptu_value: contract.iptu_value,
            other_fees: Decimal::ZERO,
            late_fee: Decimal::ZERO,
            discount: Decimal::ZERO,
            status,
            paid_at: None,
            paid_amount: None,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn config(days_offset: i32, template: Option<&str>) -> AlertConfig {
        AlertConfig {
            id: Uuid::new_v4(),
            days_offset,
            is_enabled: true,
            message_template: template.map(String::from),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn before_due_window_is_inclusive() {
        // offset -3: alerta sse 0 <= vencimento - hoje <= 3
        for diff in -10..=10 {
            assert_eq!(config_applies(-3, diff), (0..=3).contains(&diff), "diff {}", diff);
        }
    }

    #[test]
    fn on_due_date_only_matches_zero() {
        assert!(config_applies(0, 0));
        assert!(!config_applies(0, 1));
        assert!(!config_applies(0, -1));
    }

    #[test]
    fn after_due_needs_enough_lateness() {
        // offset 5: alerta sse hoje - vencimento >= 5
        for diff in -10..=10 {
            assert_eq!(config_applies(5, diff), diff <= -5, "diff {}", diff);
        }
    }

    #[test]
    fn severity_comes_from_configured_offset() {
        assert_eq!(severity_for_offset(7), AlertSeverity::Critical);
        assert_eq!(severity_for_offset(30), AlertSeverity::Critical);
        assert_eq!(severity_for_offset(1), AlertSeverity::Warning);
        assert_eq!(severity_for_offset(6), AlertSeverity::Warning);
        assert_eq!(severity_for_offset(0), AlertSeverity::Info);
        assert_eq!(severity_for_offset(-3), AlertSeverity::Info);
    }

    #[test]
    fn due_in_two_days_fires_for_three_days_before_but_not_one() {
        let c = contract("AP-1024");
        let p = payment(&c, date(2024, 1, 10), PaymentStatus::Pending);

        let alerts = derive_alerts(
            &[p],
            &[c],
            &[config(-3, None), config(-1, None)],
            date(2024, 1, 8),
        );

        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].config.days_offset, -3);
        assert_eq!(alerts[0].days_offset, 2);
        assert_eq!(alerts[0].severity, AlertSeverity::Info);
        assert_eq!(alerts[0].message, "Aluguel do imóvel AP-1024 vence em 2 dia(s)");
    }

    #[test]
    fn five_days_late_fires_for_offset_five_as_warning() {
        let c = contract("CS-7");
        let p = payment(&c, date(2024, 1, 10), PaymentStatus::Overdue);

        let alerts = derive_alerts(&[p], &[c], &[config(5, None)], date(2024, 1, 15));

        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].days_offset, -5);
        // 5 está entre 1 e 6: severidade "atenção" pela regra do offset
        assert_eq!(alerts[0].severity, AlertSeverity::Warning);
        assert_eq!(alerts[0].message, "Aluguel do imóvel CS-7 vencido há 5 dia(s)");
    }

    #[test]
    fn one_payment_can_match_several_rules() {
        let c = contract("AP-1");
        let p = payment(&c, date(2024, 1, 1), PaymentStatus::Overdue);

        let alerts = derive_alerts(
            &[p],
            &[c],
            &[config(1, None), config(7, None), config(30, None)],
            date(2024, 1, 9),
        );

        let offsets: Vec<i32> = alerts.iter().map(|a| a.config.days_offset).collect();
        assert_eq!(offsets, vec![7, 1]);
        assert_eq!(alerts[0].severity, AlertSeverity::Critical);
        assert_eq!(alerts[1].severity, AlertSeverity::Warning);
    }

    #[test]
    fn only_open_payments_and_enabled_rules_count() {
        let c = contract("AP-1");
        let today = date(2024, 1, 10);
        let payments = vec![
            payment(&c, today, PaymentStatus::Paid),
            payment(&c, today, PaymentStatus::Cancelled),
            payment(&c, today, PaymentStatus::Partial),
            payment(&c, today, PaymentStatus::Pending),
        ];
        let mut disabled = config(0, None);
        disabled.is_enabled = false;

        assert_eq!(derive_alerts(&payments, &[c.clone()], &[disabled], today).len(), 0);
        assert_eq!(derive_alerts(&payments, &[c], &[config(0, None)], today).len(), 1);
    }

    #[test]
    fn payments_without_contract_are_skipped() {
        let c = contract("AP-1");
        let orphan = payment(&contract("AP-2"), date(2024, 1, 10), PaymentStatus::Pending);

        let alerts = derive_alerts(&[orphan], &[c], &[config(0, None)], date(2024, 1, 10));
        assert!(alerts.is_empty());
    }

    #[test]
    fn sorted_by_severity_then_due_date() {
        let c = contract("AP-1");
        let today = date(2024, 3, 20);
        let payments = vec![
            payment(&c, date(2024, 3, 22), PaymentStatus::Pending), // info (-3)
            payment(&c, date(2024, 3, 5), PaymentStatus::Overdue),  // critical + warning
            payment(&c, date(2024, 3, 1), PaymentStatus::Overdue),  // critical + warning
            payment(&c, date(2024, 3, 18), PaymentStatus::Overdue), // warning
            payment(&c, date(2024, 3, 20), PaymentStatus::Pending), // info (0 e -3)
        ];
        let configs = vec![config(-3, None), config(0, None), config(1, None), config(7, None)];

        let alerts = derive_alerts(&payments, &[c], &configs, today);

        let severities: Vec<AlertSeverity> = alerts.iter().map(|a| a.severity).collect();
        let mut sorted = severities.clone();
        sorted.sort();
        assert_eq!(severities, sorted);

        for pair in alerts.windows(2) {
            if pair[0].severity == pair[1].severity {
                assert!(pair[0].due_date <= pair[1].due_date);
            }
        }

        assert_eq!(alerts.first().unwrap().due_date, date(2024, 3, 1));
        assert_eq!(alerts.first().unwrap().severity, AlertSeverity::Critical);
        assert_eq!(alerts.last().unwrap().severity, AlertSeverity::Info);
        assert_eq!(alerts.len(), 8);
    }

    #[test]
    fn template_placeholders_are_filled() {
        let c = contract("AP-1024");
        let p = payment(&c, date(2024, 1, 10), PaymentStatus::Pending);

        let alerts = derive_alerts(
            &[p],
            &[c],
            &[config(-3, Some("{tenant}: {property} vence em {days} dia(s), total {amount}"))],
            date(2024, 1, 7),
        );

        assert_eq!(alerts[0].message, "Carlos Pereira: AP-1024 vence em 3 dia(s), total R$ 2500.00");
    }
}
