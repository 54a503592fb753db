// src/services/document_service.rs

use std::path::PathBuf;

use genpdf::{elements, style, Element};
use image::Luma;
use qrcode::QrCode;
use rust_decimal::Decimal;
use sqlx::{Postgres, Executor, Acquire};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{RentalRepository, SettingsRepository},
    models::rental::{PaymentStatus, RentalContract, RentalPayment},
    services::caption_service::format_brl,
};

/// Linhas do quadro de valores do recibo. Encargos zerados não aparecem.
pub fn receipt_lines(payment: &RentalPayment) -> Vec<(&'static str, Decimal)> {
    let mut lines = vec![("Aluguel", payment.rent_value)];
    let optional = [
        ("Condomínio", payment.condominium_fee),
        ("IPTU", payment.iptu_value),
        ("Outras taxas", payment.other_fees),
        ("Multa por atraso", payment.late_fee),
        ("Desconto", -payment.discount),
    ];
    lines.extend(optional.into_iter().filter(|(_, value)| !value.is_zero()));
    lines
}

fn receipt_title(payment: &RentalPayment) -> &'static str {
    match payment.status {
        PaymentStatus::Paid => "RECIBO DE ALUGUEL",
        PaymentStatus::Partial => "RECIBO DE PAGAMENTO PARCIAL",
        _ => "COBRANÇA DE ALUGUEL",
    }
}

fn render_err(e: impl std::fmt::Display) -> AppError {
    AppError::InternalServerError(anyhow::Error::msg(e.to_string()))
}

#[derive(Clone)]
pub struct DocumentService {
    repo: RentalRepository,
    settings_repo: SettingsRepository,
    fonts_dir: PathBuf,
}

impl DocumentService {
    pub fn new(repo: RentalRepository, settings_repo: SettingsRepository, fonts_dir: PathBuf) -> Self {
        Self { repo, settings_repo, fonts_dir }
    }

    /// Recibo (ou cobrança, se ainda em aberto) de uma parcela de aluguel em PDF.
    pub async fn generate_rent_receipt<'e, E>(&self, executor: E, payment_id: Uuid) -> Result<Vec<u8>, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let payment = self
            .repo
            .find_payment(&mut *tx, payment_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("Pagamento {}", payment_id)))?;
        let contract = self
            .repo
            .find_contract(&mut *tx, payment.contract_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("Contrato {}", payment.contract_id)))?;
        let settings = self.settings_repo.get_settings(&mut *tx).await?;

        tx.commit().await?;

        let font_family = genpdf::fonts::from_files(&self.fonts_dir, "Roboto", None)
            .map_err(|_| AppError::FontNotFound(self.fonts_dir.display().to_string()))?;

        let mut doc = genpdf::Document::new(font_family);
        doc.set_title(format!("Recibo {} {}", contract.property_code, payment.due_date.format("%m/%Y")));
        let mut decorator = genpdf::SimplePageDecorator::new();
        decorator.set_margins(10);
        doc.set_page_decorator(decorator);

        // --- CABEÇALHO ---
        let company = settings.company_name.clone().unwrap_or_else(|| "IMOBILIÁRIA".to_string());
        doc.push(elements::Paragraph::new(company).styled(style::Style::new().bold().with_font_size(18)));

        if let Some(doc_num) = &settings.document_number {
            doc.push(elements::Paragraph::new(format!("CNPJ: {}", doc_num)).styled(style::Style::new().with_font_size(10)));
        }
        if let Some(creci) = &settings.creci {
            doc.push(elements::Paragraph::new(creci.clone()).styled(style::Style::new().with_font_size(10)));
        }

        doc.push(elements::Break::new(1.5));

        doc.push(elements::Paragraph::new(receipt_title(&payment)).styled(style::Style::new().bold().with_font_size(14)));
        doc.push(elements::Paragraph::new(format!("Referência: {}", payment.due_date.format("%m/%Y"))));
        doc.push(elements::Paragraph::new(format!("Vencimento: {}", payment.due_date.format("%d/%m/%Y"))));

        doc.push(elements::Break::new(1));
        push_parties(&mut doc, &contract);
        doc.push(elements::Break::new(2));

        // --- QUADRO DE VALORES ---
        let mut table = elements::TableLayout::new(vec![4, 2]);
        table.set_cell_decorator(elements::FrameCellDecorator::new(true, true, false));

        let style_bold = style::Style::new().bold();
        table
            .row()
            .element(elements::Paragraph::new("Descrição").styled(style_bold))
            .element(elements::Paragraph::new("Valor").styled(style_bold))
            .push()
            .map_err(render_err)?;

        for (label, value) in receipt_lines(&payment) {
            table
                .row()
                .element(elements::Paragraph::new(label))
                .element(elements::Paragraph::new(format_brl(value)))
                .push()
                .map_err(render_err)?;
        }

        doc.push(table);
        doc.push(elements::Break::new(1));

        let mut total_paragraph = elements::Paragraph::new(format!("TOTAL: {}", format_brl(payment.total())));
        total_paragraph.set_alignment(genpdf::Alignment::Right);
        doc.push(total_paragraph.styled(style::Style::new().bold().with_font_size(12)));

        doc.push(elements::Break::new(2));

        match (payment.status, payment.paid_amount) {
            (PaymentStatus::Paid | PaymentStatus::Partial, Some(paid)) => {
                let paid_on = payment
                    .paid_at
                    .map(|d| d.format("%d/%m/%Y").to_string())
                    .unwrap_or_default();
                doc.push(elements::Paragraph::new(format!(
                    "Recebemos de {} a quantia de {} em {}, referente ao aluguel do imóvel {}.",
                    contract.tenant_name,
                    format_brl(paid),
                    paid_on,
                    contract.property_code
                )));
            }
            _ => {
                // --- PAGAMENTO VIA PIX ---
                if let Some(key) = &settings.pix_key {
                    doc.push(elements::Paragraph::new("PAGAMENTO VIA PIX").styled(style::Style::new().bold().with_font_size(12)));

                    let key_type = settings.pix_key_type.as_deref().unwrap_or("Chave");
                    doc.push(elements::Paragraph::new(format!("{}: {}", key_type, key)));
                    doc.push(elements::Break::new(1));

                    // QR com a chave em texto puro, não o payload BR Code
                    let code = QrCode::new(key.as_bytes()).map_err(render_err)?;
                    let image_buffer = code.render::<Luma<u8>>().build();
                    let dynamic_image = image::DynamicImage::ImageLuma8(image_buffer);

                    let pdf_image = elements::Image::from_dynamic_image(dynamic_image)
                        .map_err(render_err)?
                        .with_scale(genpdf::Scale::new(0.5, 0.5));
                    doc.push(pdf_image);
                }
            }
        }

        // --- RODAPÉ ---
        if let Some(addr) = &settings.address {
            doc.push(elements::Break::new(2));
            doc.push(elements::Paragraph::new(addr.clone()).styled(style::Style::new().italic().with_font_size(8)));
        }

        let mut buffer = Vec::new();
        doc.render(&mut buffer).map_err(render_err)?;

        tracing::debug!(%payment_id, bytes = buffer.len(), "Recibo gerado");
        Ok(buffer)
    }
}

fn push_parties(doc: &mut genpdf::Document, contract: &RentalContract) {
    doc.push(elements::Paragraph::new(format!("Imóvel: {}", contract.property_code)));
    doc.push(elements::Paragraph::new(format!(
        "Locatário: {} ({})",
        contract.tenant_name, contract.tenant_document
    )));
    doc.push(elements::Paragraph::new(format!("Locador: {}", contract.owner_name)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use std::str::FromStr;

    fn money(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn payment() -> RentalPayment {
        RentalPayment {
            id: Uuid::new_v4(),
            contract_id: Uuid::new_v4(),
            due_date: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            rent_value: money("3200.00"),
            condominium_fee: money("850.00"),
            iptu_value: Decimal::ZERO,
            other_fees: Decimal::ZERO,
            late_fee: money("64.00"),
            discount: money("14.00"),
            status: PaymentStatus::Overdue,
            paid_at: None,
            paid_amount: None,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn zero_charges_are_left_out() {
        let lines = receipt_lines(&payment());
        let labels: Vec<&str> = lines.iter().map(|(l, _)| *l).collect();
        assert_eq!(labels, vec!["Aluguel", "Condomínio", "Multa por atraso", "Desconto"]);
    }

    #[test]
    fn lines_add_up_to_total() {
        let p = payment();
        let sum: Decimal = receipt_lines(&p).iter().map(|(_, v)| *v).sum();
        assert_eq!(sum, p.total());
        assert_eq!(sum, money("4100.00"));
    }

    #[test]
    fn title_follows_payment_status() {
        let mut p = payment();
        assert_eq!(receipt_title(&p), "COBRANÇA DE ALUGUEL");
        p.status = PaymentStatus::Paid;
        assert_eq!(receipt_title(&p), "RECIBO DE ALUGUEL");
    }
}
