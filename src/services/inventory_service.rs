// src/services/inventory_service.rs

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{CategoryRepository, ProductRepository, SettingsRepository},
    models::inventory::{
        CreateMovementPayload, CreateProductPayload, InventoryMovement, MovementType, Product,
        UpdateProductPayload,
    },
    services::barcode_service,
};

#[derive(Clone)]
pub struct InventoryService {
    product_repo: ProductRepository,
    category_repo: CategoryRepository,
    settings_repo: SettingsRepository,
    pool: PgPool,
}

/// Stock after applying a movement. ADJUSTMENT sets the counted stock.
pub fn apply_movement(
    product_name: &str,
    current: i32,
    movement_type: MovementType,
    quantity: i32,
) -> Result<i32, AppError> {
    match movement_type {
        MovementType::In => {
            if quantity <= 0 {
                return Err(AppError::BadRequest("Quantity must be greater than zero.".into()));
            }
            current
                .checked_add(quantity)
                .ok_or_else(|| AppError::BadRequest("Stock quantity is too large.".into()))
        }
        MovementType::Out => {
            if quantity <= 0 {
                return Err(AppError::BadRequest("Quantity must be greater than zero.".into()));
            }
            if quantity > current {
                return Err(AppError::InsufficientStock {
                    product: product_name.to_string(),
                    available: current,
                    requested: quantity,
                });
            }
            Ok(current - quantity)
        }
        MovementType::Adjustment => {
            if quantity < 0 {
                return Err(AppError::BadRequest("Counted stock cannot be negative.".into()));
            }
            Ok(quantity)
        }
    }
}

impl InventoryService {
    pub fn new(
        product_repo: ProductRepository,
        category_repo: CategoryRepository,
        settings_repo: SettingsRepository,
        pool: PgPool,
    ) -> Self {
        Self {
            product_repo,
            category_repo,
            settings_repo,
            pool,
        }
    }

    async fn ensure_category(&self, organization_id: Uuid, category_id: Option<Uuid>) -> Result<(), AppError> {
        if let Some(id) = category_id {
            self.category_repo
                .find_active(organization_id, id)
                .await?
                .ok_or_else(|| AppError::BadRequest("Category does not exist.".into()))?;
        }
        Ok(())
    }

    // --- Stock changes ---

    /// Applies a movement to a product already locked by the caller's
    /// transaction and writes the ledger row.
    #[allow(clippy::too_many_arguments)]
    pub async fn apply_locked(
        &self,
        conn: &mut PgConnection,
        product: &Product,
        movement_type: MovementType,
        quantity: i32,
        reason: Option<&str>,
        reference: Option<&str>,
        user_id: Option<Uuid>,
    ) -> Result<(Product, InventoryMovement), AppError> {
        let new_stock = apply_movement(&product.name, product.stock_quantity, movement_type, quantity)?;

        let updated = self.product_repo.set_stock(&mut *conn, product.id, new_stock).await?;
        let movement = self
            .product_repo
            .insert_movement(
                &mut *conn,
                product.organization_id,
                product.id,
                movement_type,
                product.stock_quantity,
                new_stock,
                reason,
                reference,
                user_id,
            )
            .await?;

        Ok((updated, movement))
    }

    /// Locks the product row, then applies the movement.
    #[allow(clippy::too_many_arguments)]
    pub async fn record_movement(
        &self,
        conn: &mut PgConnection,
        organization_id: Uuid,
        product_id: Uuid,
        movement_type: MovementType,
        quantity: i32,
        reason: Option<&str>,
        reference: Option<&str>,
        user_id: Option<Uuid>,
    ) -> Result<(Product, InventoryMovement), AppError> {
        let product = self
            .product_repo
            .lock_for_update(&mut *conn, organization_id, product_id)
            .await?
            .ok_or(AppError::NotFound("Product"))?;

        self.apply_locked(conn, &product, movement_type, quantity, reason, reference, user_id)
            .await
    }

    pub async fn create_movement(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        payload: &CreateMovementPayload,
    ) -> Result<InventoryMovement, AppError> {
        let mut tx = self.pool.begin().await?;

        let product = self
            .product_repo
            .lock_for_update(&mut *tx, organization_id, payload.product_id)
            .await?
            .filter(|p| p.is_active)
            .ok_or(AppError::NotFound("Product"))?;

        let (updated, movement) = self
            .apply_locked(
                &mut tx,
                &product,
                payload.movement_type,
                payload.quantity,
                payload.reason.as_deref(),
                payload.reference.as_deref(),
                Some(user_id),
            )
            .await?;

        tx.commit().await?;

        tracing::info!(
            product_id = %updated.id,
            movement = ?movement.movement_type,
            previous = movement.previous_stock,
            new = movement.new_stock,
            "Stock changed"
        );
        if updated.is_low_stock() {
            tracing::warn!(product_id = %updated.id, stock = updated.stock_quantity, "Product is low on stock");
        }

        Ok(movement)
    }

    // --- Catalog ---

    pub async fn create_product(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        payload: &CreateProductPayload,
    ) -> Result<Product, AppError> {
        self.ensure_category(organization_id, payload.category_id).await?;

        let tax_rate = match payload.tax_rate {
            Some(rate) => rate,
            None => self.settings_repo.get_business(organization_id).await?.default_tax_rate,
        };

        let mut tx = self.pool.begin().await?;

        let barcode = match &payload.barcode {
            Some(code) => code.clone(),
            None => {
                let seq = self.product_repo.next_barcode_sequence(&mut *tx).await?;
                barcode_service::generate_internal_ean13(seq)?
            }
        };

        let mut product = self
            .product_repo
            .create(&mut *tx, organization_id, payload, &barcode, tax_rate)
            .await?;

        if payload.initial_stock > 0 {
            let (updated, _) = self
                .apply_locked(
                    &mut tx,
                    &product,
                    MovementType::In,
                    payload.initial_stock,
                    Some("Initial stock"),
                    None,
                    Some(user_id),
                )
                .await?;
            product = updated;
        }

        tx.commit().await?;

        tracing::info!(product_id = %product.id, sku = %product.sku, barcode = %product.barcode, "Product created");
        Ok(product)
    }

    pub async fn update_product(
        &self,
        organization_id: Uuid,
        id: Uuid,
        payload: &UpdateProductPayload,
    ) -> Result<Product, AppError> {
        self.ensure_category(organization_id, payload.category_id).await?;
        self.product_repo
            .update(organization_id, id, payload)
            .await?
            .ok_or(AppError::NotFound("Product"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_support::{product_payload, seeded_state};
    use rust_decimal::Decimal;

    #[test]
    fn stock_in_and_out() {
        assert_eq!(apply_movement("Shirt", 5, MovementType::In, 3).unwrap(), 8);
        assert_eq!(apply_movement("Shirt", 5, MovementType::Out, 5).unwrap(), 0);
    }

    #[test]
    fn out_beyond_stock_is_rejected() {
        match apply_movement("Shirt", 2, MovementType::Out, 3) {
            Err(AppError::InsufficientStock { product, available, requested }) => {
                assert_eq!(product, "Shirt");
                assert_eq!(available, 2);
                assert_eq!(requested, 3);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn adjustment_sets_absolute_count() {
        assert_eq!(apply_movement("Shirt", 10, MovementType::Adjustment, 4).unwrap(), 4);
        assert_eq!(apply_movement("Shirt", 10, MovementType::Adjustment, 0).unwrap(), 0);
        assert!(apply_movement("Shirt", 10, MovementType::Adjustment, -1).is_err());
    }

    #[test]
    fn zero_quantity_in_or_out_is_rejected() {
        assert!(matches!(
            apply_movement("Shirt", 1, MovementType::In, 0),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            apply_movement("Shirt", 1, MovementType::Out, 0),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn overflow_is_rejected() {
        assert!(apply_movement("Shirt", i32::MAX, MovementType::In, 1).is_err());
    }
    fn movement(product_id: Uuid, movement_type: MovementType, quantity: i32) -> CreateMovementPayload {
        CreateMovementPayload {
            product_id,
            movement_type,
            quantity,
            reason: None,
            reference: None,
        }
    }

    async fn ledger(pool: &PgPool, product_id: Uuid) -> Vec<(MovementType, i32, i32, i32)> {
        sqlx::query_as(
            r#"
            SELECT movement_type, quantity, previous_stock, new_stock
            FROM inventory_movements WHERE product_id = $1
            ORDER BY created_at, new_stock
            "#,
        )
        .bind(product_id)
        .fetch_all(pool)
        .await
        .unwrap()
    }

    #[sqlx::test]
    async fn every_stock_change_writes_one_movement(pool: PgPool) {
        let (state, admin) = seeded_state(pool.clone()).await;
        let org = admin.organization_id;
        let service = &state.inventory_service;

        let product = service
            .create_product(org, admin.id, &product_payload("SH-01", Decimal::new(1200, 0), 5))
            .await
            .unwrap();
        assert_eq!(product.stock_quantity, 5);
        assert!(barcode_service::is_valid_ean13(&product.barcode));

        service
            .create_movement(org, admin.id, &movement(product.id, MovementType::Out, 2))
            .await
            .unwrap();
        let adjusted = service
            .create_movement(org, admin.id, &movement(product.id, MovementType::Adjustment, 7))
            .await
            .unwrap();
        assert_eq!((adjusted.quantity, adjusted.previous_stock, adjusted.new_stock), (4, 3, 7));

        assert_eq!(
            ledger(&pool, product.id).await,
            vec![
                (MovementType::In, 5, 0, 5),
                (MovementType::Out, -2, 5, 3),
                (MovementType::Adjustment, 4, 3, 7),
            ]
        );
    }

    #[sqlx::test]
    async fn failed_out_leaves_stock_and_ledger_untouched(pool: PgPool) {
        let (state, admin) = seeded_state(pool.clone()).await;
        let org = admin.organization_id;
        let service = &state.inventory_service;

        let product = service
            .create_product(org, admin.id, &product_payload("SH-02", Decimal::new(800, 0), 1))
            .await
            .unwrap();

        let err = service
            .create_movement(org, admin.id, &movement(product.id, MovementType::Out, 2))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InsufficientStock { available: 1, requested: 2, .. }));

        let reloaded = state.product_repo.find_active(org, product.id).await.unwrap().unwrap();
        assert_eq!(reloaded.stock_quantity, 1);
        assert_eq!(ledger(&pool, product.id).await.len(), 1);
    }

    #[sqlx::test]
    async fn stock_cannot_go_negative_in_the_database(pool: PgPool) {
        let (state, admin) = seeded_state(pool.clone()).await;
        let product = state
            .inventory_service
            .create_product(admin.organization_id, admin.id, &product_payload("SH-03", Decimal::ONE, 0))
            .await
            .unwrap();

        let result = sqlx::query("UPDATE products SET stock_quantity = -1 WHERE id = $1")
            .bind(product.id)
            .execute(&pool)
            .await;
        assert!(result.is_err());
    }

    #[sqlx::test]
    async fn missing_tax_rate_uses_the_shop_default(pool: PgPool) {
        let (state, admin) = seeded_state(pool.clone()).await;
        let org = admin.organization_id;

        sqlx::query("UPDATE business_settings SET default_tax_rate = 12 WHERE organization_id = $1")
            .bind(org)
            .execute(&pool)
            .await
            .unwrap();

        let mut payload = product_payload("SH-04", Decimal::new(500, 0), 0);
        payload.tax_rate = None;
        let defaulted = state.inventory_service.create_product(org, admin.id, &payload).await.unwrap();
        assert_eq!(defaulted.tax_rate, Decimal::new(12, 0));

        let mut payload = product_payload("SH-05", Decimal::new(500, 0), 0);
        payload.tax_rate = Some(Decimal::new(5, 0));
        let explicit = state.inventory_service.create_product(org, admin.id, &payload).await.unwrap();
        assert_eq!(explicit.tax_rate, Decimal::new(5, 0));
    }

    #[sqlx::test]
    async fn soft_deleted_products_drop_out_of_lookups(pool: PgPool) {
        let (state, admin) = seeded_state(pool.clone()).await;
        let org = admin.organization_id;
        let product = state
            .inventory_service
            .create_product(org, admin.id, &product_payload("SH-06", Decimal::ONE, 0))
            .await
            .unwrap();

        assert!(state.product_repo.soft_delete(org, product.id).await.unwrap());
        assert!(state.product_repo.find_active(org, product.id).await.unwrap().is_none());

        let err = state
            .inventory_service
            .create_movement(org, admin.id, &movement(product.id, MovementType::In, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound("Product")));
    }
}
