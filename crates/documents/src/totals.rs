//! Derived amounts for lines and documents.
//!
//! All amounts are rounded to 2 decimal places, midpoint away from zero. Line
//! amounts are rounded first and document totals are sums of rounded line
//! amounts, so a document always equals the sum of what its lines display.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use docket_core::{DomainError, DomainResult, ValueObject};

use crate::catalog::{References, TaxKind};
use crate::line::LineValues;

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

fn overflow(what: &str) -> DomainError {
    DomainError::invariant(format!("{what} is out of range"))
}

fn checked_sum(a: Decimal, b: Decimal, what: &str) -> DomainResult<Decimal> {
    a.checked_add(b).ok_or_else(|| overflow(what))
}

/// `amount × percent / 100`, unrounded.
fn percent_of(amount: Decimal, percent: Decimal, what: &str) -> DomainResult<Decimal> {
    amount
        .checked_mul(percent)
        .and_then(|scaled| scaled.checked_div(HUNDRED))
        .ok_or_else(|| overflow(what))
}

/// Amounts derived for a single line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineAmounts {
    /// quantity × price, net of discount.
    pub amount_untaxed: Decimal,
    pub amount_tax_iva: Decimal,
    pub amount_tax_other: Decimal,
    pub amount_total: Decimal,
}

impl ValueObject for LineAmounts {}

impl LineAmounts {
    /// Price a line against the resolved tax records.
    ///
    /// Every tax id on the line must be present in `refs`; validation
    /// guarantees that before anything is priced.
    pub fn compute(values: &LineValues, refs: &References) -> DomainResult<Self> {
        let gross = values
            .quantity
            .checked_mul(values.price)
            .ok_or_else(|| overflow("line amount"))?;
        let kept = HUNDRED
            .checked_sub(values.discount)
            .ok_or_else(|| overflow("line discount"))?;
        let amount_untaxed = round_money(percent_of(gross, kept, "line amount")?);

        let mut amount_tax_iva = Decimal::ZERO;
        let mut amount_tax_other = Decimal::ZERO;
        for tax_id in &values.tax_ids {
            let tax = refs
                .tax(*tax_id)
                .ok_or_else(|| DomainError::invariant(format!("tax {tax_id} was not resolved")))?;
            let amount = round_money(percent_of(amount_untaxed, tax.rate, "line tax")?);
            let bucket = match tax.kind {
                TaxKind::Iva => &mut amount_tax_iva,
                TaxKind::Other => &mut amount_tax_other,
            };
            *bucket = checked_sum(*bucket, amount, "line tax")?;
        }

        let amount_tax = checked_sum(amount_tax_iva, amount_tax_other, "line tax")?;
        Ok(Self {
            amount_untaxed,
            amount_tax_iva,
            amount_tax_other,
            amount_total: checked_sum(amount_untaxed, amount_tax, "line total")?,
        })
    }
}

/// Document-level aggregates, persisted alongside the header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentTotals {
    pub amount_untaxed: Decimal,
    /// Net amount of lines carrying no tax at all.
    pub amount_exempt: Decimal,
    pub amount_tax_iva: Decimal,
    pub amount_tax_other: Decimal,
    pub amount_tax_total: Decimal,
    pub amount_total: Decimal,
}

impl ValueObject for DocumentTotals {}

impl DocumentTotals {
    /// Sum the given lines. An empty document totals zero.
    pub fn accumulate<'a, I>(lines: I) -> DomainResult<Self>
    where
        I: IntoIterator<Item = (&'a LineValues, &'a LineAmounts)>,
    {
        let mut totals = Self::default();
        for (values, amounts) in lines {
            totals.amount_untaxed =
                checked_sum(totals.amount_untaxed, amounts.amount_untaxed, "document amount")?;
            if values.is_exempt() {
                totals.amount_exempt =
                    checked_sum(totals.amount_exempt, amounts.amount_untaxed, "document amount")?;
            }
            totals.amount_tax_iva =
                checked_sum(totals.amount_tax_iva, amounts.amount_tax_iva, "document tax")?;
            totals.amount_tax_other =
                checked_sum(totals.amount_tax_other, amounts.amount_tax_other, "document tax")?;
        }
        totals.amount_tax_total =
            checked_sum(totals.amount_tax_iva, totals.amount_tax_other, "document tax")?;
        totals.amount_total =
            checked_sum(totals.amount_untaxed, totals.amount_tax_total, "document total")?;
        Ok(totals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ProductId, Tax, TaxId};
    use docket_core::CompanyId;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn line(quantity: Decimal, price: Decimal, discount: Decimal, taxes: &[i64]) -> LineValues {
        LineValues {
            product_id: ProductId::new(1),
            description: "widget".to_string(),
            quantity,
            price,
            discount,
            uom_id: None,
            tax_ids: taxes.iter().copied().map(TaxId::new).collect(),
        }
    }

    fn refs() -> References {
        let company = CompanyId::new(1);
        References::new(
            vec![],
            vec![],
            vec![
                Tax {
                    id: TaxId::new(1),
                    company_id: company,
                    name: "IVA 19%".to_string(),
                    rate: dec!(19),
                    kind: TaxKind::Iva,
                    active: true,
                },
                Tax {
                    id: TaxId::new(2),
                    company_id: company,
                    name: "Liquor 10%".to_string(),
                    rate: dec!(10),
                    kind: TaxKind::Other,
                    active: true,
                },
            ],
        )
    }

    #[test]
    fn untaxed_lines_sum_to_net_amount() {
        let refs = refs();
        let a = line(dec!(2), dec!(10), dec!(0), &[]);
        let b = line(dec!(1), dec!(5), dec!(0), &[]);
        let amounts_a = LineAmounts::compute(&a, &refs).unwrap();
        let amounts_b = LineAmounts::compute(&b, &refs).unwrap();

        let totals = DocumentTotals::accumulate([(&a, &amounts_a), (&b, &amounts_b)]).unwrap();
        assert_eq!(totals.amount_untaxed, dec!(25));
        assert_eq!(totals.amount_exempt, dec!(25));
        assert_eq!(totals.amount_tax_total, dec!(0));
        assert_eq!(totals.amount_total, dec!(25));
    }

    #[test]
    fn discount_and_taxes_split_by_kind() {
        let refs = refs();
        let values = line(dec!(3), dec!(100), dec!(10), &[1, 2]);
        let amounts = LineAmounts::compute(&values, &refs).unwrap();

        assert_eq!(amounts.amount_untaxed, dec!(270));
        assert_eq!(amounts.amount_tax_iva, dec!(51.30));
        assert_eq!(amounts.amount_tax_other, dec!(27));
        assert_eq!(amounts.amount_total, dec!(348.30));

        let totals = DocumentTotals::accumulate([(&values, &amounts)]).unwrap();
        assert_eq!(totals.amount_exempt, dec!(0));
        assert_eq!(totals.amount_tax_total, dec!(78.30));
        assert_eq!(totals.amount_total, dec!(348.30));
    }

    #[test]
    fn rounds_half_cents_away_from_zero() {
        let refs = refs();
        let values = line(dec!(1), dec!(0.125), dec!(0), &[]);
        let amounts = LineAmounts::compute(&values, &refs).unwrap();
        assert_eq!(amounts.amount_untaxed, dec!(0.13));
    }

    #[test]
    fn unresolved_tax_is_an_invariant_violation() {
        let values = line(dec!(1), dec!(1), dec!(0), &[99]);
        let err = LineAmounts::compute(&values, &References::default()).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn overflowing_line_amount_is_an_error_not_a_panic() {
        let values = line(Decimal::MAX, dec!(2), dec!(0), &[]);
        let err = LineAmounts::compute(&values, &refs()).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn overflowing_document_total_is_an_error() {
        let values = line(dec!(1), dec!(1), dec!(0), &[]);
        let huge = LineAmounts {
            amount_untaxed: Decimal::MAX,
            amount_tax_iva: Decimal::ZERO,
            amount_tax_other: Decimal::ZERO,
            amount_total: Decimal::MAX,
        };
        let err = DocumentTotals::accumulate([(&values, &huge), (&values, &huge)]).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    proptest! {
        #[test]
        fn document_total_is_untaxed_plus_taxes(
            rows in proptest::collection::vec((1i64..500, 0i64..100_000, 0i64..=100, 0usize..4), 0..12)
        ) {
            let refs = refs();
            let lines: Vec<LineValues> = rows
                .iter()
                .map(|(qty, cents, discount, taxes)| {
                    let tax_ids: &[i64] = match taxes {
                        0 => &[],
                        1 => &[1],
                        2 => &[2],
                        _ => &[1, 2],
                    };
                    line(Decimal::from(*qty), Decimal::new(*cents, 2), Decimal::from(*discount), tax_ids)
                })
                .collect();
            let amounts: Vec<LineAmounts> = lines
                .iter()
                .map(|l| LineAmounts::compute(l, &refs).unwrap())
                .collect();

            let totals = DocumentTotals::accumulate(lines.iter().zip(amounts.iter())).unwrap();
            let line_sum: Decimal = amounts.iter().map(|a| a.amount_total).sum();

            prop_assert_eq!(totals.amount_total, totals.amount_untaxed + totals.amount_tax_total);
            prop_assert_eq!(totals.amount_total, line_sum);
            prop_assert!(totals.amount_exempt <= totals.amount_untaxed);
        }
    }
}
