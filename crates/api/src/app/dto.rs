use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use docket_documents::{Document, HeaderForm, LineFormset, PartnerId, ProductId, TaxId};
use docket_infra::Submission;

// -------------------------
// Request DTOs
// -------------------------

/// Create/update body: header fields plus the line formset.
#[derive(Debug, Default, Deserialize)]
pub struct DocumentRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub partner_id: Option<PartnerId>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub lines: Option<LineFormset>,
}

impl DocumentRequest {
    pub fn into_submission(self) -> Submission {
        Submission {
            header: HeaderForm {
                name: self.name,
                partner_id: self.partner_id,
                date: self.date,
                description: self.description,
            },
            lines: self.lines.unwrap_or_default(),
        }
    }
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct DocumentListResponse {
    pub items: Vec<Document>,
}

// -------------------------
// Catalog lookup queries
// -------------------------

/// `?product=<id>`: the first `product` value, if any.
pub fn product_query(params: &[(String, String)]) -> Result<Option<ProductId>, String> {
    match params.iter().find(|(key, _)| key == "product") {
        None => Ok(None),
        Some((_, raw)) if raw.trim().is_empty() => Ok(None),
        Some((_, raw)) => raw
            .trim()
            .parse::<ProductId>()
            .map(Some)
            .map_err(|_| format!("invalid product id: {raw}")),
    }
}

/// `?tax=1,2`, `?tax=1&tax=2` and `?tax[]=1&tax[]=2` are all accepted.
pub fn tax_query(params: &[(String, String)]) -> Result<Vec<TaxId>, String> {
    let mut ids = Vec::new();
    for (_, raw) in params.iter().filter(|(key, _)| key == "tax" || key == "tax[]") {
        for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let id = part
                .parse::<TaxId>()
                .map_err(|_| format!("invalid tax id: {part}"))?;
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn product_query_reads_first_value() {
        assert_eq!(
            product_query(&params(&[("product", "3"), ("product", "4")])).unwrap(),
            Some(ProductId::new(3))
        );
        assert_eq!(product_query(&params(&[])).unwrap(), None);
        assert_eq!(product_query(&params(&[("product", "")])).unwrap(), None);
        assert!(product_query(&params(&[("product", "abc")])).is_err());
    }

    #[test]
    fn tax_query_accepts_lists_and_repeats() {
        let ids = tax_query(&params(&[("tax", "1, 2"), ("tax[]", "2"), ("tax[]", "5")])).unwrap();
        assert_eq!(ids, vec![TaxId::new(1), TaxId::new(2), TaxId::new(5)]);
        assert!(tax_query(&params(&[("tax", "1,x")])).is_err());
        assert!(tax_query(&params(&[("other", "1")])).unwrap().is_empty());
    }

    #[test]
    fn missing_lines_become_an_empty_formset() {
        let req: DocumentRequest =
            serde_json::from_value(serde_json::json!({"name": "INV-1", "partner_id": 7})).unwrap();
        let submission = req.into_submission();
        assert_eq!(submission.header.name.as_deref(), Some("INV-1"));
        assert_eq!(submission.header.partner_id, Some(PartnerId::new(7)));
        assert!(submission.lines.rows.is_empty());
    }
}
