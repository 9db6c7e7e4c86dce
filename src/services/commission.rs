use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use crate::models::commission::CommissionStatus;

/// Rounds to cents, halves away from zero.
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Commission for one order line: `subtotal * rate / 100`, rounded to cents.
pub fn calculate_commission(subtotal: Decimal, rate: Decimal) -> Decimal {
    if subtotal <= Decimal::ZERO || rate <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    round2(subtotal * rate.min(Decimal::ONE_HUNDRED) / Decimal::ONE_HUNDRED)
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct CommissionTotals {
    pub pending: Decimal,
    pub approved: Decimal,
    pub paid: Decimal,
    pub cancelled: Decimal,
    /// Everything not cancelled.
    pub earned: Decimal,
    pub count: i64,
}

impl CommissionTotals {
    pub fn from_rows<'a, I>(rows: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, Decimal)>,
    {
        let mut totals = CommissionTotals::default();
        for (status, amount) in rows {
            match status.parse::<CommissionStatus>() {
                Ok(CommissionStatus::Pending) => totals.pending += amount,
                Ok(CommissionStatus::Approved) => totals.approved += amount,
                Ok(CommissionStatus::Paid) => totals.paid += amount,
                Ok(CommissionStatus::Cancelled) => totals.cancelled += amount,
                Err(_) => continue,
            }
            totals.count += 1;
        }
        totals.pending = round2(totals.pending);
        totals.approved = round2(totals.approved);
        totals.paid = round2(totals.paid);
        totals.cancelled = round2(totals.cancelled);
        totals.earned = totals.pending + totals.approved + totals.paid;
        totals
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn commission_is_percentage_of_subtotal() {
        assert_eq!(calculate_commission(d("200000"), d("5")), d("10000"));
        assert_eq!(calculate_commission(d("99.99"), d("10")), d("10.00"));
        assert_eq!(calculate_commission(d("1000"), d("12.5")), d("125"));
        assert_eq!(calculate_commission(d("10"), d("33.333")), d("3.33"));
    }

    #[test]
    fn half_cents_round_away_from_zero() {
        assert_eq!(round2(d("1.005")), d("1.01"));
        assert_eq!(round2(d("2.675")), d("2.68"));
        assert_eq!(round2(d("-1.005")), d("-1.01"));
        assert_eq!(round2(d("1.004999")), d("1.00"));
        assert_eq!(calculate_commission(d("10.05"), d("10")), d("1.01"));
        assert_eq!(calculate_commission(d("0.15"), d("50")), d("0.08"));
    }

    #[test]
    fn zero_or_negative_inputs_earn_nothing() {
        assert_eq!(calculate_commission(Decimal::ZERO, d("10")), Decimal::ZERO);
        assert_eq!(calculate_commission(d("100"), Decimal::ZERO), Decimal::ZERO);
        assert_eq!(calculate_commission(d("-5"), d("10")), Decimal::ZERO);
    }

    #[test]
    fn rate_is_capped_at_full_subtotal() {
        assert_eq!(calculate_commission(d("50"), d("150")), d("50"));
    }

    #[test]
    fn totals_group_by_status() {
        let rows = vec![
            ("pending", d("10")),
            ("pending", d("5.5")),
            ("approved", d("20")),
            ("paid", d("100")),
            ("cancelled", d("7")),
            ("bogus", d("1000")),
        ];
        let totals = CommissionTotals::from_rows(rows);
        assert_eq!(totals.pending, d("15.5"));
        assert_eq!(totals.approved, d("20"));
        assert_eq!(totals.paid, d("100"));
        assert_eq!(totals.cancelled, d("7"));
        assert_eq!(totals.earned, d("135.5"));
        assert_eq!(totals.count, 5);
    }
}
