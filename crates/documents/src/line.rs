use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use docket_core::{CompanyId, Entity, serial_id};

use crate::catalog::{ProductId, TaxId, UomId};
use crate::document::DocumentId;
use crate::totals::LineAmounts;

serial_id!(
    /// Line item identifier.
    LineItemId,
    "LineItemId"
);

/// Validated, user-editable fields of a line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineValues {
    pub product_id: ProductId,
    pub description: String,
    pub quantity: Decimal,
    /// Unit price before discount and taxes.
    pub price: Decimal,
    /// Discount in percent, 0 to 100.
    pub discount: Decimal,
    pub uom_id: Option<UomId>,
    pub tax_ids: Vec<TaxId>,
}

impl LineValues {
    pub fn is_exempt(&self) -> bool {
        self.tax_ids.is_empty()
    }
}

/// A persisted line item, owned by exactly one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: LineItemId,
    pub document_id: DocumentId,
    pub company_id: CompanyId,
    /// 1-based position in the order the lines were submitted.
    pub sequence: u32,
    #[serde(flatten)]
    pub values: LineValues,
    #[serde(flatten)]
    pub amounts: LineAmounts,
    pub active: bool,
}

impl Entity for LineItem {
    type Id = LineItemId;

    fn id(&self) -> Self::Id {
        self.id
    }
}

/// Insert payload for a line. `document_id` is only known once the parent has
/// been written, which is what keeps children from pointing at nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLineItem {
    pub document_id: DocumentId,
    pub sequence: u32,
    pub values: LineValues,
    pub amounts: LineAmounts,
}

impl NewLineItem {
    pub fn into_line(self, id: LineItemId, company_id: CompanyId) -> LineItem {
        LineItem {
            id,
            document_id: self.document_id,
            company_id,
            sequence: self.sequence,
            values: self.values,
            amounts: self.amounts,
            active: true,
        }
    }
}
