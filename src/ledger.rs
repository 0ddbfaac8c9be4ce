//! Money arithmetic over already-validated inputs.
//!
//! Every operation is checked; `None` means the result does not fit in a `Decimal`.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use crate::database::models::{ReviewStatus, StatusTotal};

/// Amounts are kept to the paisa/cent
pub const MONEY_SCALE: u32 = 2;

fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// quantity × price per unit
pub fn line_total(quantity: Decimal, price_per_unit: Decimal) -> Option<Decimal> {
    quantity.checked_mul(price_per_unit).map(round_money)
}

/// days × wage per day
pub fn wage_total(number_of_days: Decimal, wage_per_day: Decimal) -> Option<Decimal> {
    number_of_days.checked_mul(wage_per_day).map(round_money)
}

/// Whether a submitted price deviates from the catalog price
pub fn price_changed(submitted: Decimal, catalog_base_price: Decimal) -> bool {
    submitted.normalize() != catalog_base_price.normalize()
}

pub fn sum<I: IntoIterator<Item = Decimal>>(amounts: I) -> Option<Decimal> {
    amounts
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, amount| acc.checked_add(amount))
}

/// allocated − approved-spent; may go negative
pub fn balance(allocated: Decimal, approved_spent: Decimal) -> Option<Decimal> {
    allocated.checked_sub(approved_spent)
}

/// Expense totals bucketed by review status
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExpenseTotals {
    pub approved_amount: Decimal,
    pub approved_count: i64,
    pub pending_amount: Decimal,
    pub pending_count: i64,
    pub rejected_amount: Decimal,
    pub rejected_count: i64,
}

impl ExpenseTotals {
    pub fn from_status_totals(rows: &[StatusTotal]) -> Self {
        let mut totals = Self::default();
        for row in rows {
            let (amount, count) = match row.status {
                ReviewStatus::Approved => (&mut totals.approved_amount, &mut totals.approved_count),
                ReviewStatus::Pending => (&mut totals.pending_amount, &mut totals.pending_count),
                ReviewStatus::Rejected => (&mut totals.rejected_amount, &mut totals.rejected_count),
            };
            *amount += row.total;
            *count += row.count;
        }
        totals
    }
}

/// What a supervisor has been given and what is left
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BalanceSummary {
    pub allocated: Decimal,
    pub approved_spent: Decimal,
    pub pending_amount: Decimal,
    pub balance: Decimal,
}

impl BalanceSummary {
    pub fn new(allocated: Decimal, totals: &ExpenseTotals) -> Option<Self> {
        Some(Self {
            allocated,
            approved_spent: totals.approved_amount,
            pending_amount: totals.pending_amount,
            balance: balance(allocated, totals.approved_amount)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn line_total_multiplies_and_rounds_to_cents() {
        assert_eq!(line_total(d("12"), d("350")), Some(d("4200")));
        assert_eq!(line_total(d("2.5"), d("10.01")), Some(d("25.03")));
        assert_eq!(line_total(d("0.333"), d("1.5")), Some(d("0.50")));
    }

    #[test]
    fn wage_total_counts_half_days() {
        assert_eq!(wage_total(d("5"), d("600")), Some(d("3000")));
        assert_eq!(wage_total(d("0.5"), d("700")), Some(d("350")));
    }

    #[test]
    fn oversized_products_are_none() {
        let huge = d("1000000000000000");
        assert_eq!(line_total(huge, huge), None);
        assert_eq!(wage_total(huge, huge), None);
        assert_eq!(line_total(Decimal::MAX, d("1.5")), None);
    }

    #[test]
    fn oversized_sums_are_none() {
        assert_eq!(sum(vec![Decimal::MAX, d("1")]), None);
        assert_eq!(balance(Decimal::MIN, d("1")), None);

        let totals = ExpenseTotals {
            approved_amount: d("1"),
            ..Default::default()
        };
        assert!(BalanceSummary::new(Decimal::MIN, &totals).is_none());
    }

    #[test]
    fn price_change_ignores_scale_differences() {
        assert!(!price_changed(d("350"), d("350.00")));
        assert!(price_changed(d("360"), d("350")));
        assert!(price_changed(d("349.99"), d("350")));
    }

    #[test]
    fn balance_subtracts_only_approved_spend() {
        let rows = vec![
            StatusTotal { status: ReviewStatus::Approved, total: d("1200"), count: 2 },
            StatusTotal { status: ReviewStatus::Pending, total: d("500"), count: 1 },
            StatusTotal { status: ReviewStatus::Rejected, total: d("900"), count: 3 },
        ];
        let totals = ExpenseTotals::from_status_totals(&rows);
        assert_eq!(totals.pending_count, 1);
        assert_eq!(totals.rejected_amount, d("900"));

        let allocated = sum(vec![d("2000"), d("1000")]).unwrap();
        let summary = BalanceSummary::new(allocated, &totals).unwrap();
        assert_eq!(summary.allocated, d("3000"));
        assert_eq!(summary.approved_spent, d("1200"));
        assert_eq!(summary.pending_amount, d("500"));
        assert_eq!(summary.balance, d("1800"));
    }

    #[test]
    fn balance_can_go_negative() {
        assert_eq!(balance(d("100"), d("250")), Some(d("-150")));
    }

    #[test]
    fn empty_inputs_sum_to_zero() {
        assert_eq!(sum(Vec::<Decimal>::new()), Some(Decimal::ZERO));
        let summary = BalanceSummary::new(Decimal::ZERO, &ExpenseTotals::from_status_totals(&[])).unwrap();
        assert_eq!(summary.balance, Decimal::ZERO);
    }
}
