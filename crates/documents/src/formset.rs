//! Inline line-item formset: submission shape, validation and reconciliation.
//!
//! A formset submission carries management data (`total_forms`,
//! `initial_forms`) and an ordered list of rows. Rows that were loaded from the
//! document carry their line id; new rows carry none. Any row may be flagged
//! for deletion. Saving replaces the document's whole line collection:
//!
//! ```text
//! row without id            -> insert
//! row with id               -> update
//! row with id, flagged      -> delete
//! row without id, flagged   -> ignored
//! existing id not submitted -> delete
//! ```

use std::collections::BTreeSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::catalog::{ProductId, References, TaxId, UomId};
use crate::line::{LineItemId, LineValues};
use crate::validation::{REQUIRED, ValidationErrors};

/// Upper bound on rows accepted in one submission.
pub const MAX_NUM_FORMS: usize = 1000;

pub const LINE_DESCRIPTION_MAX_LEN: usize = 255;

const MAX_INTEGER_DIGITS: u32 = 12;
const INTEGER_DIGITS_LIMIT: i64 = 1_000_000_000_000;
const AMOUNT_DECIMAL_PLACES: u32 = 4;
const DISCOUNT_DECIMAL_PLACES: u32 = 2;

const TAMPERED: &str = "ManagementForm data is missing or has been tampered with.";
const INVALID_CHOICE: &str =
    "Select a valid choice. That choice is not one of the available choices.";

/// One submitted line row. All fields are optional at this stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRow {
    #[serde(default)]
    pub id: Option<LineItemId>,
    #[serde(default)]
    pub product_id: Option<ProductId>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub quantity: Option<Decimal>,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub discount: Option<Decimal>,
    #[serde(default)]
    pub uom_id: Option<UomId>,
    #[serde(default)]
    pub tax_ids: Vec<TaxId>,
    #[serde(default)]
    pub delete: bool,
}

impl LineRow {
    /// An untouched extra row: nothing filled in at all.
    pub fn is_blank(&self) -> bool {
        self.id.is_none()
            && self.product_id.is_none()
            && self.description.as_deref().is_none_or(|d| d.trim().is_empty())
            && self.quantity.is_none()
            && self.price.is_none()
            && self.discount.is_none()
            && self.uom_id.is_none()
            && self.tax_ids.is_empty()
            && !self.delete
    }
}

/// The child half of a create/update submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineFormset {
    pub total_forms: usize,
    pub initial_forms: usize,
    #[serde(default)]
    pub rows: Vec<LineRow>,
}

/// Outcome of validating one row that survives into the save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmittedLine {
    Keep {
        id: Option<LineItemId>,
        values: LineValues,
    },
    Remove(LineItemId),
}

impl LineFormset {
    /// Build a consistent formset from rows; rows carrying an id count as
    /// initial forms.
    pub fn from_rows(rows: Vec<LineRow>) -> Self {
        let initial_forms = rows.iter().filter(|r| r.id.is_some()).count();
        Self {
            total_forms: rows.len(),
            initial_forms,
            rows,
        }
    }

    /// Products mentioned by rows that will be validated.
    pub fn product_ids(&self) -> Vec<ProductId> {
        self.rows
            .iter()
            .filter(|r| !r.delete)
            .filter_map(|r| r.product_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Taxes mentioned by rows that will be validated.
    pub fn tax_ids(&self) -> Vec<TaxId> {
        self.rows
            .iter()
            .filter(|r| !r.delete)
            .flat_map(|r| r.tax_ids.iter().copied())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    fn check_management(&self, errors: &mut ValidationErrors) -> bool {
        if self.total_forms != self.rows.len() || self.initial_forms > self.total_forms {
            errors.add_non_field(TAMPERED);
            return false;
        }
        if self.total_forms > MAX_NUM_FORMS {
            errors.add_non_field(format!("Please submit at most {MAX_NUM_FORMS} forms."));
            return false;
        }
        true
    }

    /// Validate a formset for a document that does not exist yet.
    pub fn validate_new(
        &self,
        refs: &References,
        errors: &mut ValidationErrors,
    ) -> Vec<SubmittedLine> {
        if self.initial_forms != 0 {
            errors.add_non_field(TAMPERED);
            return Vec::new();
        }
        self.validate(&BTreeSet::new(), refs, errors)
    }

    /// Validate every row against the document's current line ids.
    ///
    /// Rows flagged for deletion are not field-validated; untouched extra rows
    /// are skipped. Errors are keyed by 0-based row index.
    pub fn validate(
        &self,
        existing: &BTreeSet<LineItemId>,
        refs: &References,
        errors: &mut ValidationErrors,
    ) -> Vec<SubmittedLine> {
        if !self.check_management(errors) {
            return Vec::new();
        }

        let mut kept = BTreeSet::new();
        let mut removed = BTreeSet::new();
        let mut submitted = Vec::with_capacity(self.rows.len());

        for (index, row) in self.rows.iter().enumerate() {
            // A delete flag wins over any other row carrying the same id.
            if row.delete {
                if let Some(id) = row.id {
                    if existing.contains(&id) && removed.insert(id) {
                        submitted.push(SubmittedLine::Remove(id));
                    }
                }
                continue;
            }

            if let Some(id) = row.id {
                if !existing.contains(&id) {
                    errors.add_row_field(index, "id", INVALID_CHOICE);
                    continue;
                }
                if !kept.insert(id) {
                    errors.add_row_non_field(
                        index,
                        "Please correct the duplicate data for id, which must be unique.",
                    );
                    continue;
                }
            } else if index >= self.initial_forms && row.is_blank() {
                continue;
            }

            if let Some(values) = validate_row(index, row, refs, errors) {
                submitted.push(SubmittedLine::Keep { id: row.id, values });
            }
        }

        submitted
    }
}

fn validate_row(
    index: usize,
    row: &LineRow,
    refs: &References,
    errors: &mut ValidationErrors,
) -> Option<LineValues> {
    let product = match row.product_id {
        None => {
            errors.add_row_field(index, "product_id", REQUIRED);
            None
        }
        Some(id) => {
            let product = refs.product(id);
            if product.is_none() {
                errors.add_row_field(index, "product_id", INVALID_CHOICE);
            }
            product
        }
    };

    match row.quantity {
        None => errors.add_row_field(index, "quantity", REQUIRED),
        Some(q) if q <= Decimal::ZERO => {
            errors.add_row_field(index, "quantity", "Ensure this value is greater than 0.")
        }
        Some(q) => check_digits(index, "quantity", q, AMOUNT_DECIMAL_PLACES, errors),
    }

    let price = row.price.or_else(|| product.map(|p| p.list_price));
    match price {
        Some(p) if p < Decimal::ZERO => errors.add_row_field(
            index,
            "price",
            "Ensure this value is greater than or equal to 0.",
        ),
        Some(p) => check_digits(index, "price", p, AMOUNT_DECIMAL_PLACES, errors),
        None => {}
    }

    let discount = row.discount.unwrap_or(Decimal::ZERO);
    if discount < Decimal::ZERO || discount > Decimal::ONE_HUNDRED {
        errors.add_row_field(index, "discount", "Ensure this value is between 0 and 100.");
    } else {
        check_digits(index, "discount", discount, DISCOUNT_DECIMAL_PLACES, errors);
    }

    for tax_id in &row.tax_ids {
        if refs.tax(*tax_id).is_none() {
            errors.add_row_field(
                index,
                "tax_ids",
                format!("Select a valid choice. {tax_id} is not one of the available choices."),
            );
        }
    }

    let description = row
        .description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty());
    if let Some(d) = description {
        if d.chars().count() > LINE_DESCRIPTION_MAX_LEN {
            errors.add_row_field(
                index,
                "description",
                format!("Ensure this value has at most {LINE_DESCRIPTION_MAX_LEN} characters."),
            );
        }
    }

    if errors.row(index).is_some() {
        return None;
    }
    let product = product?;

    Some(LineValues {
        product_id: product.id,
        description: description.map_or_else(|| product.name.clone(), str::to_string),
        quantity: row.quantity?,
        price: price?,
        discount,
        uom_id: row.uom_id.or(product.uom_id),
        tax_ids: dedup_preserving_order(&row.tax_ids),
    })
}

/// Column limits of the stored quantity, price and discount.
fn check_digits(
    index: usize,
    field: &str,
    value: Decimal,
    max_decimal_places: u32,
    errors: &mut ValidationErrors,
) {
    if value.abs().trunc() >= Decimal::from(INTEGER_DIGITS_LIMIT) {
        errors.add_row_field(
            index,
            field,
            format!(
                "Ensure that there are no more than {MAX_INTEGER_DIGITS} digits before the decimal point."
            ),
        );
    }
    if value.normalize().scale() > max_decimal_places {
        errors.add_row_field(
            index,
            field,
            format!("Ensure that there are no more than {max_decimal_places} decimal places."),
        );
    }
}

fn dedup_preserving_order(ids: &[TaxId]) -> Vec<TaxId> {
    let mut seen = BTreeSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

/// A line as it will exist after the save, with its final position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedLine {
    pub sequence: u32,
    pub values: LineValues,
}

/// Concrete writes that turn the stored line collection into the submitted one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcilePlan {
    pub insert: Vec<PlannedLine>,
    pub update: Vec<(LineItemId, PlannedLine)>,
    /// Ascending.
    pub delete: Vec<LineItemId>,
}

impl ReconcilePlan {
    /// Line writes the plan will issue: inserts, updates and deletes.
    pub fn write_count(&self) -> usize {
        self.insert.len() + self.update.len() + self.delete.len()
    }
}

/// Compare the stored line ids with the submitted rows and decide the writes.
///
/// Explicit removals win over a kept row with the same id. A kept row whose id
/// is not among `existing` is treated as new. Every existing id ends up in
/// exactly one of `update` or `delete`.
pub fn reconcile(existing: &BTreeSet<LineItemId>, submitted: Vec<SubmittedLine>) -> ReconcilePlan {
    let removed: BTreeSet<LineItemId> = submitted
        .iter()
        .filter_map(|line| match line {
            SubmittedLine::Remove(id) => Some(*id),
            SubmittedLine::Keep { .. } => None,
        })
        .collect();

    let mut plan = ReconcilePlan::default();
    let mut kept = BTreeSet::new();
    let mut sequence = 0u32;

    for line in submitted {
        let SubmittedLine::Keep { id, values } = line else {
            continue;
        };
        if id.is_some_and(|id| removed.contains(&id)) {
            continue;
        }

        sequence += 1;
        let planned = PlannedLine { sequence, values };
        match id {
            Some(id) if existing.contains(&id) && kept.insert(id) => plan.update.push((id, planned)),
            _ => plan.insert.push(planned),
        }
    }

    plan.delete = existing.difference(&kept).copied().collect();
    plan
}
