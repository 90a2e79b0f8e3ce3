//! Create-input rules. The read model needs no validator of its own: every
//! field of [`InvoiceRecord`](crate::model::InvoiceRecord) is optional and
//! serde defaults fill whatever the backend leaves out.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::ValidationErrors;
use crate::model::{Field, InvoiceCreateRequest, InvoiceInput};

// Vietnamese mobile/landline prefix followed by eight digits. The character
// class keeps the literal `|` the backend's own form accepts.
static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(84|0[3|5|7|8|9])+([0-9]{8})\b").expect("phone pattern"));

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("email pattern")
});

pub const INVOICE_CODE_REQUIRED: &str = "Invoice code is required";
pub const TAX_CODE_REQUIRED: &str = "Tax code is required";
pub const PHONE_INVALID: &str = "Invalid phone number";
pub const EMAIL_INVALID: &str = "Invalid email address";

pub fn is_valid_phone(phone: &str) -> bool {
    PHONE_RE.is_match(phone)
}

/// Empty means "not given" and always passes.
pub fn is_valid_email(email: &str) -> bool {
    email.is_empty() || EMAIL_RE.is_match(email)
}

/// Check `input` and build the request body, or report every failing field.
pub fn validate_create(input: &InvoiceInput) -> Result<InvoiceCreateRequest, ValidationErrors> {
    let mut errors = ValidationErrors::default();

    if input.invoice_code.is_empty() {
        errors.insert(Field::InvoiceCode, INVOICE_CODE_REQUIRED);
    }
    if input.tax_code.is_empty() {
        errors.insert(Field::TaxCode, TAX_CODE_REQUIRED);
    }
    if !is_valid_phone(&input.phone) {
        errors.insert(Field::Phone, PHONE_INVALID);
    }
    if !is_valid_email(&input.email) {
        errors.insert(Field::Email, EMAIL_INVALID);
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(InvoiceCreateRequest {
        invoice_code: input.invoice_code.clone(),
        tax_code: input.tax_code.clone(),
        partner_code: input.partner_code.unwrap_or_default(),
        full_name: non_empty(&input.full_name),
        address: non_empty(&input.address),
        phone: input.phone.clone(),
        email: non_empty(&input.email),
    })
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() { None } else { Some(value.to_string()) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PartnerCode;

    fn valid_input() -> InvoiceInput {
        InvoiceInput {
            invoice_code: "INV1".into(),
            tax_code: "0101234567".into(),
            partner_code: None,
            phone: "0912345678".into(),
            ..Default::default()
        }
    }

    #[test]
    fn phone_pattern() {
        for ok in ["0912345678", "0312345678", "8412345678", "0812345678"] {
            assert!(is_valid_phone(ok), "{ok} should pass");
        }
        for bad in ["12345", "", "0112345678", "091234567", "phone"] {
            assert!(!is_valid_phone(bad), "{bad} should fail");
        }
    }

    #[test]
    fn email_pattern() {
        assert!(is_valid_email(""));
        assert!(is_valid_email("a@b.com"));
        assert!(is_valid_email("first.last+tag@mail.example.vn"));
        assert!(!is_valid_email("abc"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a@b.c"));
    }

    #[test]
    fn partner_defaults_to_vnp() {
        let req = validate_create(&valid_input()).unwrap();
        assert_eq!(req.partner_code, PartnerCode::Vnp);
        assert_eq!(req.full_name, None);
        assert_eq!(req.email, None);
    }

    #[test]
    fn missing_required_fields_are_all_reported() {
        let errors = validate_create(&InvoiceInput::default()).unwrap_err();
        assert_eq!(errors.get(Field::InvoiceCode), Some(INVOICE_CODE_REQUIRED));
        assert_eq!(errors.get(Field::TaxCode), Some(TAX_CODE_REQUIRED));
        assert_eq!(errors.get(Field::Phone), Some(PHONE_INVALID));
        assert_eq!(errors.get(Field::Email), None);
    }

    #[test]
    fn bad_email_rejects_otherwise_valid_input() {
        let input = InvoiceInput {
            email: "abc".into(),
            ..valid_input()
        };
        let errors = validate_create(&input).unwrap_err();
        assert_eq!(errors.0.len(), 1);
        assert_eq!(errors.get(Field::Email), Some(EMAIL_INVALID));
    }

    #[test]
    fn optional_text_is_carried_through() {
        let input = InvoiceInput {
            partner_code: Some(PartnerCode::Misa),
            full_name: "Cong ty ABC".into(),
            address: "12 Ly Thai To".into(),
            email: "ketoan@abc.vn".into(),
            ..valid_input()
        };
        let req = validate_create(&input).unwrap();
        assert_eq!(req.partner_code, PartnerCode::Misa);
        assert_eq!(req.full_name.as_deref(), Some("Cong ty ABC"));
        assert_eq!(req.address.as_deref(), Some("12 Ly Thai To"));
        assert_eq!(req.email.as_deref(), Some("ketoan@abc.vn"));
    }
}
