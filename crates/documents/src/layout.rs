//! Screen layout descriptors for list, master, detail and totals panels.
//!
//! These are plain data served to the front end; nothing here renders.

use serde::Serialize;

use crate::document::DocumentKind;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum Align {
    #[serde(rename = "text-left")]
    Left,
    #[serde(rename = "text-center")]
    Center,
    #[serde(rename = "text-right")]
    Right,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldSpec {
    pub label: &'static str,
    pub field: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub align: Option<Align>,
    /// Format numbers for display (thousands separators and the like).
    pub humanize: bool,
}

impl FieldSpec {
    const fn plain(label: &'static str, field: &'static str) -> Self {
        Self {
            label,
            field,
            align: None,
            humanize: false,
        }
    }

    const fn numeric(label: &'static str, field: &'static str, align: Align) -> Self {
        Self {
            label,
            field,
            align: Some(align),
            humanize: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScreenLayout {
    pub kind: DocumentKind,
    pub list: Vec<FieldSpec>,
    pub master: Vec<FieldSpec>,
    pub detail: Vec<FieldSpec>,
    pub totals: Vec<FieldSpec>,
}

impl ScreenLayout {
    pub fn for_kind(kind: DocumentKind) -> Self {
        let partner = match kind {
            DocumentKind::Invoice => "Client",
            DocumentKind::SaleOrder => "Customer",
        };

        Self {
            kind,
            list: vec![
                FieldSpec::plain("Name", "name"),
                FieldSpec::plain(partner, "partner_id"),
                FieldSpec::plain("Date", "date"),
                FieldSpec::numeric("Net Amount", "amount_untaxed", Align::Right),
                FieldSpec::numeric("Total", "amount_total", Align::Right),
            ],
            master: vec![
                FieldSpec::plain("Name", "name"),
                FieldSpec::plain("Date", "date"),
                FieldSpec::plain(partner, "partner_id"),
            ],
            detail: vec![
                FieldSpec::plain("Product", "product_id"),
                FieldSpec::plain("Description", "description"),
                FieldSpec::numeric("Quantity", "quantity", Align::Center),
                FieldSpec::numeric("UOM", "uom_id", Align::Left),
                FieldSpec::numeric("Price", "price", Align::Right),
                FieldSpec::numeric("Discount", "discount", Align::Right),
                FieldSpec::plain("Tax", "tax_ids"),
                FieldSpec::numeric("Sub Total", "amount_total", Align::Right),
            ],
            totals: vec![
                FieldSpec::plain("Net Amount or Affection:", "amount_untaxed"),
                FieldSpec::plain("Exempt Amount:", "amount_exempt"),
                FieldSpec::plain("IVA:", "amount_tax_iva"),
                FieldSpec::plain("Other taxes:", "amount_tax_other"),
                FieldSpec::plain("Total taxes:", "amount_tax_total"),
                FieldSpec::plain("Total:", "amount_total"),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alignment_serializes_as_css_classes() {
        let layout = ScreenLayout::for_kind(DocumentKind::Invoice);
        let json = serde_json::to_value(&layout.list[3]).unwrap();
        assert_eq!(json["align"], "text-right");
        assert_eq!(json["humanize"], true);

        let json = serde_json::to_value(&layout.list[0]).unwrap();
        assert!(json.get("align").is_none());
    }

    #[test]
    fn totals_panel_covers_every_document_aggregate() {
        let fields: Vec<&str> = ScreenLayout::for_kind(DocumentKind::SaleOrder)
            .totals
            .iter()
            .map(|f| f.field)
            .collect();
        assert_eq!(
            fields,
            [
                "amount_untaxed",
                "amount_exempt",
                "amount_tax_iva",
                "amount_tax_other",
                "amount_tax_total",
                "amount_total"
            ]
        );
    }
}
