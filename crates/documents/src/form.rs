//! Header form: the parent half of a create/update submission.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::catalog::{PartnerId, References};
use crate::document::DocumentHeader;
use crate::validation::{REQUIRED, ValidationErrors};

pub const NAME_MAX_LEN: usize = 80;
pub const DESCRIPTION_MAX_LEN: usize = 255;

/// Raw header values as submitted. Every field may be missing; `validate`
/// decides what is acceptable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderForm {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub partner_id: Option<PartnerId>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub description: Option<String>,
}

impl HeaderForm {
    /// Validate against the resolved catalog records.
    ///
    /// A missing date falls back to `default_date` (today on create, the stored
    /// date on update). Errors are recorded in `errors`; `None` is returned if
    /// any header field failed.
    pub fn validate(
        &self,
        refs: &References,
        default_date: NaiveDate,
        errors: &mut ValidationErrors,
    ) -> Option<DocumentHeader> {
        let before = errors.fields.len();

        let name = self.name.as_deref().map(str::trim).unwrap_or_default();
        if name.is_empty() {
            errors.add_field("name", REQUIRED);
        } else if name.chars().count() > NAME_MAX_LEN {
            errors.add_field(
                "name",
                format!("Ensure this value has at most {NAME_MAX_LEN} characters."),
            );
        }

        match self.partner_id {
            None => errors.add_field("partner_id", REQUIRED),
            Some(id) if refs.partner(id).is_none() => errors.add_field(
                "partner_id",
                "Select a valid choice. That choice is not one of the available choices.",
            ),
            Some(_) => {}
        }

        let description = self
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty());
        if let Some(d) = description {
            if d.chars().count() > DESCRIPTION_MAX_LEN {
                errors.add_field(
                    "description",
                    format!("Ensure this value has at most {DESCRIPTION_MAX_LEN} characters."),
                );
            }
        }

        if errors.fields.len() != before {
            return None;
        }

        Some(DocumentHeader {
            name: name.to_string(),
            partner_id: self.partner_id?,
            date: self.date.unwrap_or(default_date),
            description: description.map(str::to_string),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Partner;
    use docket_core::CompanyId;

    fn refs() -> References {
        References::new(
            vec![Partner {
                id: PartnerId::new(7),
                company_id: CompanyId::new(1),
                name: "ACME".to_string(),
                active: true,
            }],
            vec![],
            vec![],
        )
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    #[test]
    fn valid_header_trims_and_defaults_date() {
        let form = HeaderForm {
            name: Some("  INV-1 ".to_string()),
            partner_id: Some(PartnerId::new(7)),
            date: None,
            description: Some("   ".to_string()),
        };
        let mut errors = ValidationErrors::new();
        let header = form.validate(&refs(), today(), &mut errors).unwrap();

        assert!(errors.is_empty());
        assert_eq!(header.name, "INV-1");
        assert_eq!(header.date, today());
        assert_eq!(header.description, None);
    }

    #[test]
    fn missing_name_and_unknown_partner_are_field_errors() {
        let form = HeaderForm {
            name: None,
            partner_id: Some(PartnerId::new(8)),
            ..HeaderForm::default()
        };
        let mut errors = ValidationErrors::new();
        assert!(form.validate(&refs(), today(), &mut errors).is_none());
        assert!(errors.has_field("name"));
        assert!(errors.has_field("partner_id"));
    }

    #[test]
    fn overlong_name_is_rejected() {
        let form = HeaderForm {
            name: Some("x".repeat(NAME_MAX_LEN + 1)),
            partner_id: Some(PartnerId::new(7)),
            ..HeaderForm::default()
        };
        let mut errors = ValidationErrors::new();
        assert!(form.validate(&refs(), today(), &mut errors).is_none());
        assert_eq!(errors.fields["name"].len(), 1);
    }
}
