//! Catalog records referenced by documents (partners, products, taxes).
//!
//! The catalog is maintained elsewhere; documents only read it, to check
//! foreign keys and to price lines.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use docket_core::{CompanyId, serial_id};

serial_id!(
    /// Counterparty (customer) identifier.
    PartnerId,
    "PartnerId"
);

serial_id!(
    /// Product identifier.
    ProductId,
    "ProductId"
);

serial_id!(
    /// Tax identifier.
    TaxId,
    "TaxId"
);

serial_id!(
    /// Unit of measure identifier.
    UomId,
    "UomId"
);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partner {
    pub id: PartnerId,
    pub company_id: CompanyId,
    pub name: String,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub company_id: CompanyId,
    pub name: String,
    pub description: Option<String>,
    /// Default unit price used when a line leaves its price blank.
    pub list_price: Decimal,
    pub uom_id: Option<UomId>,
    /// Taxes suggested for new lines of this product.
    pub tax_ids: Vec<TaxId>,
    pub active: bool,
}

/// How a tax is reported in document totals.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaxKind {
    /// Value-added tax, reported on its own total line.
    Iva,
    Other,
}

impl TaxKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TaxKind::Iva => "iva",
            TaxKind::Other => "other",
        }
    }
}

impl core::str::FromStr for TaxKind {
    type Err = docket_core::DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "iva" => Ok(TaxKind::Iva),
            "other" => Ok(TaxKind::Other),
            other => Err(docket_core::DomainError::validation(format!(
                "unknown tax kind: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tax {
    pub id: TaxId,
    pub company_id: CompanyId,
    pub name: String,
    /// Rate in percent (19 means 19%).
    pub rate: Decimal,
    pub kind: TaxKind,
    pub active: bool,
}

/// Catalog records resolved for a single submission.
///
/// The editor looks up every id a submission mentions, in the caller's scope,
/// and validation then works against this snapshot. An id missing from here
/// does not exist (or is not visible) for the caller.
#[derive(Debug, Clone, Default)]
pub struct References {
    partners: HashMap<PartnerId, Partner>,
    products: HashMap<ProductId, Product>,
    taxes: HashMap<TaxId, Tax>,
}

impl References {
    pub fn new(partners: Vec<Partner>, products: Vec<Product>, taxes: Vec<Tax>) -> Self {
        Self {
            partners: partners.into_iter().map(|p| (p.id, p)).collect(),
            products: products.into_iter().map(|p| (p.id, p)).collect(),
            taxes: taxes.into_iter().map(|t| (t.id, t)).collect(),
        }
    }

    pub fn partner(&self, id: PartnerId) -> Option<&Partner> {
        self.partners.get(&id)
    }

    pub fn product(&self, id: ProductId) -> Option<&Product> {
        self.products.get(&id)
    }

    pub fn tax(&self, id: TaxId) -> Option<&Tax> {
        self.taxes.get(&id)
    }
}
