use std::collections::HashMap;
use rust_decimal::Decimal;
use crate::error::AppError;
use crate::models::product::Product;
use crate::services::commission::{calculate_commission, round2};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShippingPolicy {
    pub flat_fee: Decimal,
    pub free_threshold: Option<Decimal>,
}

impl ShippingPolicy {
    pub fn fee_for(&self, subtotal: Decimal) -> Decimal {
        match self.free_threshold {
            Some(threshold) if subtotal >= threshold => Decimal::ZERO,
            _ => self.flat_fee,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedLine {
    pub product_id: i64,
    pub product_name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub subtotal: Decimal,
    pub commission_rate: Decimal,
}

impl PlannedLine {
    pub fn commission(&self) -> Decimal {
        calculate_commission(self.subtotal, self.commission_rate)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutPlan {
    pub lines: Vec<PlannedLine>,
    pub subtotal: Decimal,
    pub shipping_fee: Decimal,
    pub total: Decimal,
}

/// Prices a cart against current product rows and checks every line can be fulfilled.
pub fn plan_checkout(
    cart: &[(i64, i32)],
    products: &[Product],
    shipping: &ShippingPolicy,
) -> Result<CheckoutPlan, AppError> {
    if cart.is_empty() {
        return Err(AppError::validation("Cart is empty"));
    }

    let by_id: HashMap<i64, &Product> = products.iter().map(|p| (p.id, p)).collect();
    let mut lines = Vec::with_capacity(cart.len());
    let mut subtotal = Decimal::ZERO;

    for &(product_id, quantity) in cart {
        if quantity <= 0 {
            return Err(AppError::validation("Quantity must be greater than 0"));
        }
        let product = by_id
            .get(&product_id)
            .ok_or_else(|| AppError::not_found(format!("Product {product_id} not found")))?;

        if !product.is_active {
            return Err(AppError::validation(format!(
                "Product '{}' is no longer available",
                product.name
            )));
        }
        if product.stock < quantity {
            return Err(AppError::validation(format!(
                "Insufficient stock for product '{}'. Requested {}, available {}",
                product.name, quantity, product.stock
            )));
        }

        let line_subtotal = round2(product.price * Decimal::from(quantity));
        subtotal += line_subtotal;
        lines.push(PlannedLine {
            product_id,
            product_name: product.name.clone(),
            unit_price: product.price,
            quantity,
            subtotal: line_subtotal,
            commission_rate: product.commission_rate,
        });
    }

    let shipping_fee = shipping.fee_for(subtotal);
    Ok(CheckoutPlan {
        lines,
        subtotal,
        shipping_fee,
        total: subtotal + shipping_fee,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn product(id: i64, price: &str, stock: i32, rate: &str) -> Product {
        Product {
            id,
            name: format!("Product {id}"),
            price: d(price),
            stock,
            commission_rate: d(rate),
            is_active: true,
        }
    }

    fn flat() -> ShippingPolicy {
        ShippingPolicy { flat_fee: d("30000"), free_threshold: Some(d("500000")) }
    }

    #[test]
    fn plan_sums_lines_and_adds_shipping() {
        let products = vec![product(1, "100000", 10, "5"), product(2, "25000", 3, "0")];
        let plan = plan_checkout(&[(1, 2), (2, 3)], &products, &flat()).unwrap();

        assert_eq!(plan.lines.len(), 2);
        assert_eq!(plan.lines[0].subtotal, d("200000"));
        assert_eq!(plan.lines[0].commission(), d("10000"));
        assert_eq!(plan.lines[1].commission(), Decimal::ZERO);
        assert_eq!(plan.subtotal, d("275000"));
        assert_eq!(plan.shipping_fee, d("30000"));
        assert_eq!(plan.total, d("305000"));
    }

    #[test]
    fn cent_prices_add_up_exactly() {
        let products = vec![product(1, "0.10", 10, "0"), product(2, "0.20", 10, "0")];
        let policy = ShippingPolicy { flat_fee: Decimal::ZERO, free_threshold: None };
        let plan = plan_checkout(&[(1, 1), (2, 1)], &products, &policy).unwrap();
        assert_eq!(plan.total, d("0.30"));
    }

    #[test]
    fn shipping_is_free_at_threshold() {
        let products = vec![product(1, "250000", 10, "0")];
        let plan = plan_checkout(&[(1, 2)], &products, &flat()).unwrap();
        assert_eq!(plan.shipping_fee, Decimal::ZERO);
        assert_eq!(plan.total, d("500000"));
    }

    #[test]
    fn empty_cart_is_rejected() {
        assert!(matches!(plan_checkout(&[], &[], &flat()), Err(AppError::ValidationError(_))));
    }

    #[test]
    fn missing_product_is_not_found() {
        let products = vec![product(1, "10", 10, "0")];
        assert!(matches!(plan_checkout(&[(9, 1)], &products, &flat()), Err(AppError::NotFound(_))));
    }

    #[test]
    fn stock_and_availability_are_checked() {
        let mut inactive = product(2, "10", 10, "0");
        inactive.is_active = false;
        let products = vec![product(1, "10", 1, "0"), inactive];

        match plan_checkout(&[(1, 2)], &products, &flat()) {
            Err(AppError::ValidationError(msg)) => assert!(msg.contains("available 1")),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(plan_checkout(&[(2, 1)], &products, &flat()), Err(AppError::ValidationError(_))));
        assert!(matches!(plan_checkout(&[(1, 0)], &products, &flat()), Err(AppError::ValidationError(_))));
    }
}
