// src/services/document_service.rs

use genpdf::{elements, style, Alignment, Element};
use image::Luma;
use qrcode::QrCode;
use rust_decimal::Decimal;

use crate::{
    common::error::AppError,
    models::{billing::BillDetail, settings::BusinessSettings},
};

const FONT_FAMILY: &str = "Roboto";

#[derive(Clone)]
pub struct DocumentService {
    fonts_dir: String,
}

/// UPI deep link understood by Indian payment apps.
pub fn upi_payment_uri(upi_id: &str, payee: &str, amount: Decimal, note: &str) -> String {
    format!(
        "upi://pay?pa={}&pn={}&am={:.2}&cu=INR&tn={}",
        urlencoding::encode(upi_id),
        urlencoding::encode(payee),
        amount,
        urlencoding::encode(note)
    )
}

fn doc_err(e: impl std::fmt::Display) -> AppError {
    AppError::DocumentError(e.to_string())
}

impl DocumentService {
    pub fn new(fonts_dir: String) -> Self {
        Self { fonts_dir }
    }

    /// Renders on the blocking pool; font loading and layout are CPU bound.
    pub async fn invoice_pdf(&self, detail: BillDetail, settings: BusinessSettings) -> Result<Vec<u8>, AppError> {
        let fonts_dir = self.fonts_dir.clone();
        tokio::task::spawn_blocking(move || render_invoice(&fonts_dir, &detail, &settings))
            .await
            .map_err(|e| anyhow::anyhow!("invoice rendering task failed: {e}"))?
    }
}

fn render_invoice(fonts_dir: &str, detail: &BillDetail, settings: &BusinessSettings) -> Result<Vec<u8>, AppError> {
    let bill = &detail.bill;
    let money = |value: Decimal| format!("{}{:.2}", settings.currency_symbol(), value);

    let font_family = genpdf::fonts::from_files(fonts_dir, FONT_FAMILY, None)
        .map_err(|_| AppError::FontNotFound(format!("{FONT_FAMILY} fonts missing in {fonts_dir}")))?;

    let mut doc = genpdf::Document::new(font_family);
    doc.set_title(format!("Invoice {}", bill.bill_number));
    let mut decorator = genpdf::SimplePageDecorator::new();
    decorator.set_margins(10);
    doc.set_page_decorator(decorator);

    // Shop header
    doc.push(elements::Paragraph::new(settings.shop_name.clone()).styled(style::Style::new().bold().with_font_size(18)));
    for line in [&settings.address, &settings.phone, &settings.email].into_iter().flatten() {
        doc.push(elements::Paragraph::new(line.clone()).styled(style::Style::new().with_font_size(9)));
    }
    if let Some(tax_id) = &settings.tax_id {
        doc.push(elements::Paragraph::new(format!("GSTIN: {tax_id}")).styled(style::Style::new().with_font_size(9)));
    }

    doc.push(elements::Break::new(1.5));

    let title = if bill.cancelled_at.is_some() {
        format!("INVOICE {} (CANCELLED)", bill.bill_number)
    } else {
        format!("INVOICE {}", bill.bill_number)
    };
    doc.push(elements::Paragraph::new(title).styled(style::Style::new().bold().with_font_size(14)));
    doc.push(elements::Paragraph::new(format!("Date: {}", bill.created_at.format("%d-%m-%Y"))));
    if let Some(due) = bill.due_date {
        doc.push(elements::Paragraph::new(format!("Due: {}", due.format("%d-%m-%Y"))));
    }
    match &detail.customer_name {
        Some(name) => {
            doc.push(elements::Paragraph::new(format!("Customer: {name}")));
            if let Some(phone) = &detail.customer_phone {
                doc.push(elements::Paragraph::new(format!("Phone: {phone}")));
            }
        }
        None => doc.push(elements::Paragraph::new("Customer: Walk-in")),
    }

    doc.push(elements::Break::new(1.5));

    // Items
    let mut table = elements::TableLayout::new(vec![4, 1, 2, 2, 2, 2]);
    table.set_cell_decorator(elements::FrameCellDecorator::new(true, true, false));

    let bold = style::Style::new().bold();
    table
        .row()
        .element(elements::Paragraph::new("Item").styled(bold))
        .element(elements::Paragraph::new("Qty").styled(bold))
        .element(elements::Paragraph::new("Price").styled(bold))
        .element(elements::Paragraph::new("Discount").styled(bold))
        .element(elements::Paragraph::new("Tax").styled(bold))
        .element(elements::Paragraph::new("Total").styled(bold))
        .push()
        .map_err(doc_err)?;

    for item in &detail.items {
        table
            .row()
            .element(elements::Paragraph::new(item.product_name.clone()))
            .element(elements::Paragraph::new(item.quantity.to_string()))
            .element(elements::Paragraph::new(money(item.unit_price)))
            .element(elements::Paragraph::new(money(item.discount)))
            .element(elements::Paragraph::new(format!("{}%", item.tax_rate.normalize())))
            .element(elements::Paragraph::new(money(item.line_total)))
            .push()
            .map_err(doc_err)?;
    }
    doc.push(table);
    doc.push(elements::Break::new(1.5));

    // Totals
    let mut totals = vec![
        format!("Subtotal: {}", money(bill.subtotal)),
        format!("Discount: -{}", money(bill.discount_total)),
        format!("Tax: {}", money(bill.tax_total)),
    ];
    totals.push(format!("TOTAL: {}", money(bill.total_amount)));
    for line in totals {
        let bold_total = line.starts_with("TOTAL");
        let mut paragraph = elements::Paragraph::new(line);
        paragraph.set_alignment(Alignment::Right);
        if bold_total {
            doc.push(paragraph.styled(style::Style::new().bold().with_font_size(12)));
        } else {
            doc.push(paragraph);
        }
    }

    // Payments
    if !detail.payments.is_empty() {
        doc.push(elements::Break::new(1));
        doc.push(elements::Paragraph::new("Payments").styled(bold));
        for payment in &detail.payments {
            doc.push(elements::Paragraph::new(format!(
                "{}  {}  {}",
                payment.paid_at.format("%d-%m-%Y"),
                payment.method.label(),
                money(payment.amount)
            )));
        }
    }

    let mut balance = elements::Paragraph::new(format!("Balance due: {}", money(detail.balance_due)));
    balance.set_alignment(Alignment::Right);
    doc.push(balance.styled(bold));

    // UPI QR for the outstanding amount
    if let Some(upi_id) = settings.upi_id.as_deref().filter(|_| detail.balance_due > Decimal::ZERO) {
        doc.push(elements::Break::new(1.5));
        doc.push(elements::Paragraph::new("PAY VIA UPI").styled(style::Style::new().bold().with_font_size(12)));
        doc.push(elements::Paragraph::new(format!("UPI ID: {upi_id}")));

        let uri = upi_payment_uri(upi_id, &settings.shop_name, detail.balance_due, &bill.bill_number);
        let code = QrCode::new(uri.as_bytes()).map_err(doc_err)?;
        let image_buffer = code.render::<Luma<u8>>().build();
        let qr_image = elements::Image::from_dynamic_image(image::DynamicImage::ImageLuma8(image_buffer))
            .map_err(doc_err)?
            .with_scale(genpdf::Scale::new(0.5, 0.5));
        doc.push(qr_image);
    }

    if let Some(footer) = &settings.invoice_footer {
        doc.push(elements::Break::new(2));
        doc.push(elements::Paragraph::new(footer.clone()).styled(style::Style::new().italic().with_font_size(8)));
    }

    let mut buffer = Vec::new();
    doc.render(&mut buffer).map_err(doc_err)?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn upi_uri_is_encoded() {
        let uri = upi_payment_uri(
            "royal@okbank",
            "Royal Tailors",
            Decimal::from_str("1550.5").unwrap(),
            "INV-20261019-0001",
        );
        assert_eq!(
            uri,
            "upi://pay?pa=royal%40okbank&pn=Royal%20Tailors&am=1550.50&cu=INR&tn=INV-20261019-0001"
        );
    }

    #[tokio::test]
    async fn missing_fonts_are_reported() {
        let service = DocumentService::new("./no-such-fonts-dir".into());
        let org = uuid::Uuid::new_v4();
        let now = chrono::Utc::now();
        let bill = crate::models::billing::Bill {
            id: uuid::Uuid::new_v4(),
            organization_id: org,
            bill_number: "INV-20261019-0001".into(),
            customer_id: None,
            status: crate::models::billing::BillStatus::Pending,
            subtotal: Decimal::ZERO,
            discount_total: Decimal::ZERO,
            tax_total: Decimal::ZERO,
            total_amount: Decimal::ZERO,
            paid_amount: Decimal::ZERO,
            notes: None,
            due_date: None,
            created_by: None,
            cancelled_at: None,
            created_at: now,
            updated_at: now,
        };
        let detail = BillDetail {
            bill,
            customer_name: None,
            customer_phone: None,
            customer_email: None,
            items: vec![],
            payments: vec![],
            balance_due: Decimal::ZERO,
        };
        let result = service
            .invoice_pdf(detail, BusinessSettings::defaults(org, "Royal Tailors"))
            .await;
        assert!(matches!(result, Err(AppError::FontNotFound(_))));
    }
}
