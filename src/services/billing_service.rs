// src/services/billing_service.rs

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{bill_repo::NewBill, BillRepository, CustomerRepository, ProductRepository, SettingsRepository},
    models::{
        billing::{BillDetail, BillStatus, CreateBillPayload, PaymentPayload},
        inventory::{MovementType, Product},
    },
    services::{inventory_service::InventoryService, pricing},
};

#[derive(Clone)]
pub struct BillingService {
    bill_repo: BillRepository,
    product_repo: ProductRepository,
    customer_repo: CustomerRepository,
    settings_repo: SettingsRepository,
    inventory_service: InventoryService,
    pool: PgPool,
}

/// `<prefix>-<YYYYMMDD>-<seq4>`, e.g. `INV-20261019-0007`.
pub fn format_bill_number(prefix: &str, day: NaiveDate, seq: i32) -> String {
    format!("{}-{}-{:04}", prefix, day.format("%Y%m%d"), seq)
}

impl BillingService {
    pub fn new(
        bill_repo: BillRepository,
        product_repo: ProductRepository,
        customer_repo: CustomerRepository,
        settings_repo: SettingsRepository,
        inventory_service: InventoryService,
        pool: PgPool,
    ) -> Self {
        Self {
            bill_repo,
            product_repo,
            customer_repo,
            settings_repo,
            inventory_service,
            pool,
        }
    }

    pub async fn create_bill(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        payload: &CreateBillPayload,
    ) -> Result<BillDetail, AppError> {
        if payload.items.is_empty() {
            return Err(AppError::BadRequest("A bill needs at least one item.".into()));
        }
        if let Some(customer_id) = payload.customer_id {
            self.customer_repo
                .find_active(organization_id, customer_id)
                .await?
                .ok_or_else(|| AppError::BadRequest("Customer does not exist.".into()))?;
        }
        let settings = self.settings_repo.get_business(organization_id).await?;

        let mut tx = self.pool.begin().await?;

        // Lock every product once, in id order, so concurrent bills cannot deadlock.
        let ids: BTreeSet<Uuid> = payload.items.iter().map(|i| i.product_id).collect();
        let mut products: BTreeMap<Uuid, Product> = BTreeMap::new();
        for id in ids {
            let product = self
                .product_repo
                .lock_for_update(&mut *tx, organization_id, id)
                .await?
                .filter(|p| p.is_active)
                .ok_or(AppError::NotFound("Product"))?;
            products.insert(id, product);
        }

        let mut lines = Vec::with_capacity(payload.items.len());
        for item in &payload.items {
            let product = products
                .get(&item.product_id)
                .ok_or(AppError::NotFound("Product"))?;
            lines.push(pricing::price_line(
                product.id,
                &product.name,
                item.quantity,
                item.unit_price.unwrap_or(product.selling_price),
                item.discount,
                product.tax_rate,
            )?);
        }
        let totals = pricing::bill_totals(&lines, payload.discount)?;

        let today = Utc::now().date_naive();
        let seq = self
            .bill_repo
            .next_bill_sequence(&mut *tx, organization_id, today)
            .await?;
        let bill_number = format_bill_number(&settings.invoice_prefix, today, seq);

        let mut bill = self
            .bill_repo
            .insert_bill(
                &mut *tx,
                NewBill {
                    organization_id,
                    bill_number: &bill_number,
                    customer_id: payload.customer_id,
                    totals: &totals,
                    notes: payload.notes.as_deref(),
                    due_date: payload.due_date,
                    created_by: user_id,
                },
            )
            .await?;

        for line in &lines {
            self.bill_repo.insert_item(&mut *tx, bill.id, line).await?;

            let product = products
                .get_mut(&line.product_id)
                .ok_or(AppError::NotFound("Product"))?;
            let (updated, _) = self
                .inventory_service
                .apply_locked(
                    &mut tx,
                    product,
                    MovementType::Out,
                    line.quantity,
                    Some("Sale"),
                    Some(&bill_number),
                    Some(user_id),
                )
                .await?;
            *product = updated;
        }

        if let Some(payment) = &payload.payment {
            pricing::check_payment(bill.status, bill.total_amount, bill.paid_amount, payment.amount)?;
            self.bill_repo
                .insert_payment(&mut *tx, organization_id, bill.id, payment, user_id)
                .await?;
            let paid = bill.paid_amount + payment.amount;
            bill = self
                .bill_repo
                .update_payment_state(&mut *tx, bill.id, paid, pricing::derive_status(bill.total_amount, paid))
                .await?;
        }

        tx.commit().await?;

        tracing::info!(
            bill_id = %bill.id,
            bill_number = %bill.bill_number,
            total = %bill.total_amount,
            items = lines.len(),
            "Bill created"
        );
        for product in products.values().filter(|p| p.is_low_stock()) {
            tracing::warn!(product_id = %product.id, stock = product.stock_quantity, "Product is low on stock");
        }

        self.get_detail(organization_id, bill.id).await
    }

    pub async fn add_payment(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        bill_id: Uuid,
        payment: &PaymentPayload,
    ) -> Result<BillDetail, AppError> {
        let mut tx = self.pool.begin().await?;

        let bill = self
            .bill_repo
            .lock_bill(&mut *tx, organization_id, bill_id)
            .await?
            .ok_or(AppError::NotFound("Bill"))?;

        pricing::check_payment(bill.status, bill.total_amount, bill.paid_amount, payment.amount)?;

        self.bill_repo
            .insert_payment(&mut *tx, organization_id, bill.id, payment, user_id)
            .await?;
        let paid = bill.paid_amount + payment.amount;
        let status = pricing::derive_status(bill.total_amount, paid);
        self.bill_repo.update_payment_state(&mut *tx, bill.id, paid, status).await?;

        tx.commit().await?;

        tracing::info!(bill_id = %bill.id, amount = %payment.amount, method = ?payment.method, ?status, "Payment recorded");
        self.get_detail(organization_id, bill_id).await
    }

    /// Cancels the bill and puts its items back on the shelf. Payments stay recorded.
    pub async fn cancel_bill(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        bill_id: Uuid,
        reason: Option<&str>,
    ) -> Result<BillDetail, AppError> {
        let mut tx = self.pool.begin().await?;

        let bill = self
            .bill_repo
            .lock_bill(&mut *tx, organization_id, bill_id)
            .await?
            .ok_or(AppError::NotFound("Bill"))?;

        if bill.status == BillStatus::Cancelled {
            return Err(AppError::Conflict("Bill is already cancelled".into()));
        }

        let mut items = self.bill_repo.list_items(&mut *tx, bill.id).await?;
        items.sort_by_key(|i| i.product_id);

        for item in &items {
            self.inventory_service
                .record_movement(
                    &mut tx,
                    organization_id,
                    item.product_id,
                    MovementType::In,
                    item.quantity,
                    Some("Bill cancelled"),
                    Some(&bill.bill_number),
                    Some(user_id),
                )
                .await?;
        }

        self.bill_repo.mark_cancelled(&mut *tx, bill.id, reason).await?;
        tx.commit().await?;

        tracing::info!(bill_id = %bill.id, bill_number = %bill.bill_number, restored_items = items.len(), "Bill cancelled");
        self.get_detail(organization_id, bill_id).await
    }

    pub async fn get_detail(&self, organization_id: Uuid, bill_id: Uuid) -> Result<BillDetail, AppError> {
        let summary = self
            .bill_repo
            .find_summary(organization_id, bill_id)
            .await?
            .ok_or(AppError::NotFound("Bill"))?;

        let items = self.bill_repo.list_items(&self.pool, bill_id).await?;
        let payments = self.bill_repo.list_payments(bill_id).await?;

        let customer = match summary.bill.customer_id {
            Some(id) => self.customer_repo.find_any(organization_id, id).await?,
            None => None,
        };

        let balance_due = if summary.bill.status == BillStatus::Cancelled {
            Decimal::ZERO
        } else {
            summary.bill.balance_due()
        };

        Ok(BillDetail {
            customer_name: summary.customer_name,
            customer_phone: customer.as_ref().and_then(|c| c.phone.clone()),
            customer_email: customer.as_ref().and_then(|c| c.email.clone()),
            bill: summary.bill,
            items,
            payments,
            balance_due,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{
            test_support::{product_payload, seeded_state},
            AppState,
        },
        models::{
            auth::User,
            billing::{BillItemPayload, PaymentMethod},
        },
    };

    #[test]
    fn bill_number_format() {
        let day = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        assert_eq!(format_bill_number("INV", day, 7), "INV-20261019-0007");
        assert_eq!(format_bill_number("RT", day, 12345), "RT-20261019-12345");
    }

    fn cash(amount: Decimal) -> PaymentPayload {
        PaymentPayload {
            amount,
            method: PaymentMethod::Cash,
            reference: None,
        }
    }

    fn bill_for(product: &Product, quantity: i32, payment: Option<PaymentPayload>) -> CreateBillPayload {
        CreateBillPayload {
            customer_id: None,
            items: vec![BillItemPayload {
                product_id: product.id,
                quantity,
                unit_price: None,
                discount: Decimal::ZERO,
            }],
            discount: Decimal::ZERO,
            notes: None,
            due_date: None,
            payment,
        }
    }

    async fn stocked_product(state: &AppState, admin: &User, sku: &str, stock: i32) -> Product {
        state
            .inventory_service
            .create_product(admin.organization_id, admin.id, &product_payload(sku, Decimal::new(500, 0), stock))
            .await
            .unwrap()
    }

    async fn stock_of(state: &AppState, admin: &User, product_id: Uuid) -> i32 {
        state
            .product_repo
            .find_active(admin.organization_id, product_id)
            .await
            .unwrap()
            .unwrap()
            .stock_quantity
    }

    #[sqlx::test]
    async fn sale_takes_stock_and_cancel_restores_it(pool: PgPool) {
        let (state, admin) = seeded_state(pool.clone()).await;
        let org = admin.organization_id;
        let product = stocked_product(&state, &admin, "KURTA-01", 5).await;

        let detail = state
            .billing_service
            .create_bill(org, admin.id, &bill_for(&product, 2, Some(cash(Decimal::new(400, 0)))))
            .await
            .unwrap();
        assert_eq!(detail.bill.total_amount, Decimal::new(1000, 0));
        assert_eq!(detail.bill.status, BillStatus::Partial);
        assert_eq!(detail.balance_due, Decimal::new(600, 0));
        assert_eq!(stock_of(&state, &admin, product.id).await, 3);

        let cancelled = state
            .billing_service
            .cancel_bill(org, admin.id, detail.bill.id, Some("Customer changed mind"))
            .await
            .unwrap();
        assert_eq!(cancelled.bill.status, BillStatus::Cancelled);
        assert_eq!(cancelled.balance_due, Decimal::ZERO);
        assert_eq!(cancelled.payments.len(), 1);
        assert_eq!(stock_of(&state, &admin, product.id).await, 5);

        let again = state
            .billing_service
            .cancel_bill(org, admin.id, detail.bill.id, None)
            .await
            .unwrap_err();
        assert!(matches!(again, AppError::Conflict(_)));

        let movements: Vec<(MovementType, i32)> = sqlx::query_as(
            "SELECT movement_type, quantity FROM inventory_movements WHERE product_id = $1 ORDER BY created_at",
        )
        .bind(product.id)
        .fetch_all(&pool)
        .await
        .unwrap();
        assert_eq!(
            movements,
            vec![(MovementType::In, 5), (MovementType::Out, -2), (MovementType::In, 2)]
        );
    }

    #[sqlx::test]
    async fn oversell_rolls_back_the_whole_bill(pool: PgPool) {
        let (state, admin) = seeded_state(pool.clone()).await;
        let product = stocked_product(&state, &admin, "SHERWANI-01", 1).await;

        let err = state
            .billing_service
            .create_bill(admin.organization_id, admin.id, &bill_for(&product, 2, None))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InsufficientStock { .. }));
        assert_eq!(stock_of(&state, &admin, product.id).await, 1);

        let bills: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bills")
            .fetch_one(&pool)
            .await
            .unwrap();
        let counters: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bill_counters")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!((bills, counters), (0, 0));
    }

    #[sqlx::test]
    async fn bill_numbers_count_up_per_day(pool: PgPool) {
        let (state, admin) = seeded_state(pool.clone()).await;
        let product = stocked_product(&state, &admin, "SHIRT-01", 10).await;
        let today = Utc::now().date_naive();

        let mut numbers = Vec::new();
        for _ in 0..3 {
            let detail = state
                .billing_service
                .create_bill(admin.organization_id, admin.id, &bill_for(&product, 1, None))
                .await
                .unwrap();
            assert_eq!(detail.bill.status, BillStatus::Pending);
            numbers.push(detail.bill.bill_number);
        }

        let expected: Vec<String> = (1..=3).map(|seq| format_bill_number("INV", today, seq)).collect();
        assert_eq!(numbers, expected);
    }

    #[sqlx::test]
    async fn payments_settle_the_bill(pool: PgPool) {
        let (state, admin) = seeded_state(pool.clone()).await;
        let org = admin.organization_id;
        let product = stocked_product(&state, &admin, "TROUSER-01", 3).await;

        let bill = state
            .billing_service
            .create_bill(org, admin.id, &bill_for(&product, 1, None))
            .await
            .unwrap()
            .bill;

        let sub_cent = state
            .billing_service
            .add_payment(org, admin.id, bill.id, &cash(Decimal::new(4, 3)))
            .await
            .unwrap_err();
        assert!(matches!(sub_cent, AppError::BadRequest(_)));

        let too_much = state
            .billing_service
            .add_payment(org, admin.id, bill.id, &cash(Decimal::new(50001, 2)))
            .await
            .unwrap_err();
        assert!(matches!(too_much, AppError::BadRequest(_)));

        let paid = state
            .billing_service
            .add_payment(org, admin.id, bill.id, &cash(Decimal::new(500, 0)))
            .await
            .unwrap();
        assert_eq!(paid.bill.status, BillStatus::Paid);
        assert_eq!(paid.balance_due, Decimal::ZERO);
    }
}
