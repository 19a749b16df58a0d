// src/services/pricing.rs
//
// Bill arithmetic. Everything here is pure so it can be tested without a database.

use rust_decimal::{Decimal, RoundingStrategy};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        billing::{BillStatus, BillTotals, PricedLine},
        inventory::fits_two_decimals,
    },
};

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

pub fn price_line(
    product_id: Uuid,
    product_name: &str,
    quantity: i32,
    unit_price: Decimal,
    discount: Decimal,
    tax_rate: Decimal,
) -> Result<PricedLine, AppError> {
    if quantity <= 0 {
        return Err(AppError::BadRequest(format!("Quantity for '{product_name}' must be at least 1.")));
    }
    if unit_price.is_sign_negative() || discount.is_sign_negative() {
        return Err(AppError::BadRequest(format!("Prices for '{product_name}' cannot be negative.")));
    }
    if !fits_two_decimals(unit_price) || !fits_two_decimals(discount) {
        return Err(AppError::BadRequest(format!(
            "Prices for '{product_name}' allow at most two decimal places."
        )));
    }

    let gross = round_money(unit_price * Decimal::from(quantity));
    let discount = round_money(discount);
    if discount > gross {
        return Err(AppError::BadRequest(format!(
            "Discount for '{product_name}' exceeds the line amount."
        )));
    }

    let net = gross - discount;
    let tax_amount = round_money(net * tax_rate / HUNDRED);

    Ok(PricedLine {
        product_id,
        product_name: product_name.to_string(),
        quantity,
        unit_price,
        discount,
        tax_rate,
        gross,
        tax_amount,
        line_total: net + tax_amount,
    })
}

pub fn bill_totals(lines: &[PricedLine], bill_discount: Decimal) -> Result<BillTotals, AppError> {
    if bill_discount.is_sign_negative() {
        return Err(AppError::BadRequest("Discount cannot be negative.".into()));
    }

    let subtotal: Decimal = lines.iter().map(|l| l.gross).sum();
    let line_discounts: Decimal = lines.iter().map(|l| l.discount).sum();
    let tax_total: Decimal = lines.iter().map(|l| l.tax_amount).sum();
    let discount_total = line_discounts + round_money(bill_discount);

    let total_amount = (subtotal - discount_total + tax_total).max(Decimal::ZERO);

    Ok(BillTotals {
        subtotal,
        discount_total,
        tax_total,
        total_amount,
    })
}

/// Status of a non-cancelled bill after `paid` has been collected.
pub fn derive_status(total: Decimal, paid: Decimal) -> BillStatus {
    if paid <= Decimal::ZERO {
        BillStatus::Pending
    } else if paid < total {
        BillStatus::Partial
    } else {
        BillStatus::Paid
    }
}

/// Rejects payments on cancelled bills and payments above the balance.
pub fn check_payment(status: BillStatus, total: Decimal, paid: Decimal, amount: Decimal) -> Result<(), AppError> {
    if status == BillStatus::Cancelled {
        return Err(AppError::Conflict("Bill is cancelled".into()));
    }
    if amount <= Decimal::ZERO {
        return Err(AppError::BadRequest("Payment amount must be greater than zero.".into()));
    }
    if !fits_two_decimals(amount) {
        return Err(AppError::BadRequest("Payment amount allows at most two decimal places.".into()));
    }
    let balance = (total - paid).max(Decimal::ZERO);
    if amount > balance {
        return Err(AppError::BadRequest(format!(
            "Payment of {amount:.2} exceeds the balance due of {balance:.2}."
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn line(qty: i32, price: &str, discount: &str, tax: &str) -> PricedLine {
        price_line(Uuid::nil(), "Item", qty, d(price), d(discount), d(tax)).unwrap()
    }

    #[test]
    fn line_arithmetic() {
        let l = line(2, "499.50", "99.00", "5");
        assert_eq!(l.gross, d("999.00"));
        assert_eq!(l.tax_amount, d("45.00"));
        assert_eq!(l.line_total, d("945.00"));
    }

    #[test]
    fn tax_rounds_half_away_from_zero() {
        // 0.10 * 5% = 0.005 -> 0.01
        let l = line(1, "0.10", "0", "5");
        assert_eq!(l.tax_amount, d("0.01"));
    }

    #[test]
    fn discount_cannot_exceed_line() {
        let err = price_line(Uuid::nil(), "Kurta", 1, d("100"), d("100.01"), d("0"));
        assert!(matches!(err, Err(AppError::BadRequest(_))));
        assert!(price_line(Uuid::nil(), "Kurta", 0, d("100"), d("0"), d("0")).is_err());
    }

    #[test]
    fn totals_follow_formula() {
        let lines = vec![line(2, "500", "100", "5"), line(1, "1200", "0", "12")];
        let totals = bill_totals(&lines, d("50")).unwrap();
        assert_eq!(totals.subtotal, d("2200"));
        assert_eq!(totals.discount_total, d("150"));
        // 900 * 5% + 1200 * 12%
        assert_eq!(totals.tax_total, d("189.00"));
        assert_eq!(totals.total_amount, d("2239.00"));
    }

    #[test]
    fn total_never_negative() {
        let lines = vec![line(1, "100", "0", "0")];
        let totals = bill_totals(&lines, d("500")).unwrap();
        assert_eq!(totals.total_amount, Decimal::ZERO);
    }

    #[test]
    fn status_from_payments() {
        assert_eq!(derive_status(d("100"), d("0")), BillStatus::Pending);
        assert_eq!(derive_status(d("100"), d("40")), BillStatus::Partial);
        assert_eq!(derive_status(d("100"), d("100")), BillStatus::Paid);
        assert_eq!(derive_status(d("0"), d("0")), BillStatus::Pending);
    }

    #[test]
    fn payment_rules() {
        assert!(check_payment(BillStatus::Pending, d("100"), d("0"), d("100")).is_ok());
        assert!(check_payment(BillStatus::Partial, d("100"), d("60"), d("40")).is_ok());
        assert!(matches!(
            check_payment(BillStatus::Partial, d("100"), d("60"), d("40.01")),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            check_payment(BillStatus::Cancelled, d("100"), d("0"), d("10")),
            Err(AppError::Conflict(_))
        ));
        assert!(check_payment(BillStatus::Paid, d("100"), d("100"), d("1")).is_err());
    }

    #[test]
    fn sub_cent_amounts_are_rejected() {
        // NUMERIC(12,2) would round 0.004 to zero.
        assert!(matches!(
            check_payment(BillStatus::Pending, d("100"), d("0"), d("0.004")),
            Err(AppError::BadRequest(_))
        ));
        assert!(check_payment(BillStatus::Pending, d("100"), d("0"), d("10.500")).is_ok());
        assert!(matches!(
            price_line(Uuid::nil(), "Kurta", 1, d("99.999"), d("0"), d("0")),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            price_line(Uuid::nil(), "Kurta", 1, d("100"), d("0.001"), d("0")),
            Err(AppError::BadRequest(_))
        ));
    }
}
