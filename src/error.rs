//! Error types shared by the client, the lookup and the controllers.

use std::collections::BTreeMap;
use std::fmt;

use reqwest::StatusCode;
use thiserror::Error;

use crate::model::Field;

/// Fatal startup error: the process cannot talk to the invoicing API.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} environment variable is not set")]
    Missing(&'static str),

    #[error("{name} must be a valid absolute URL (got {value:?})")]
    Malformed { name: &'static str, value: String },

    #[error("failed to read settings file {path}: {reason}")]
    Settings { path: String, reason: String },
}

/// The remote operation an [`OperationFailed`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    CreateInvoice,
    GetInvoice,
    GetInvoicePdf,
    UpdateStatus,
    TaxCodeLookup,
}

impl Operation {
    /// Message shown when the backend gives us nothing better.
    pub fn fallback_message(self) -> &'static str {
        match self {
            Operation::CreateInvoice => "Failed to create invoice",
            Operation::GetInvoice => "Failed to get invoice",
            Operation::GetInvoicePdf => "Failed to get invoice pdf",
            Operation::UpdateStatus => "Failed to update status",
            Operation::TaxCodeLookup => "Failed to check tax code",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::CreateInvoice => "create invoice",
            Operation::GetInvoice => "get invoice",
            Operation::GetInvoicePdf => "get invoice pdf",
            Operation::UpdateStatus => "update status",
            Operation::TaxCodeLookup => "tax code lookup",
        };
        f.write_str(name)
    }
}

/// A remote call did not produce a usable response.
///
/// `message` is user-facing: the backend's own message when it sent one,
/// otherwise [`Operation::fallback_message`].
#[derive(Debug, Error)]
#[error("{message}")]
pub struct OperationFailed {
    pub operation: Operation,
    pub message: String,
    pub status: Option<StatusCode>,
    #[source]
    pub source: Option<BoxError>,
}

type BoxError = Box<dyn std::error::Error + Send + Sync>;

impl OperationFailed {
    pub fn new(operation: Operation, message: impl Into<String>) -> Self {
        Self {
            operation,
            message: message.into(),
            status: None,
            source: None,
        }
    }

    /// Non-success HTTP status; `backend_message` comes from the error body.
    pub fn from_status(
        operation: Operation,
        status: StatusCode,
        backend_message: Option<String>,
    ) -> Self {
        let message = backend_message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| operation.fallback_message().to_string());
        Self {
            operation,
            message,
            status: Some(status),
            source: None,
        }
    }

    /// Transport failure: nothing usable came back.
    pub fn from_transport(operation: Operation, err: reqwest::Error) -> Self {
        Self {
            operation,
            message: operation.fallback_message().to_string(),
            status: err.status(),
            source: Some(Box::new(err)),
        }
    }
}

/// Field-level messages from the create-input validator.
#[derive(Debug, Default, Clone, PartialEq, Eq, Error)]
#[error("invalid invoice input: {}", summary(.0))]
pub struct ValidationErrors(pub BTreeMap<Field, String>);

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    pub(crate) fn insert(&mut self, field: Field, message: &str) {
        self.0.entry(field).or_insert_with(|| message.to_string());
    }
}

fn summary(errors: &BTreeMap<Field, String>) -> String {
    errors
        .iter()
        .map(|(field, msg)| format!("{field}: {msg}"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_backend_message_falls_back() {
        let err = OperationFailed::from_status(
            Operation::GetInvoice,
            StatusCode::NOT_FOUND,
            Some("   ".into()),
        );
        assert_eq!(err.message, "Failed to get invoice");
        assert_eq!(err.status, Some(StatusCode::NOT_FOUND));
    }

    #[test]
    fn backend_message_wins() {
        let err = OperationFailed::from_status(
            Operation::CreateInvoice,
            StatusCode::BAD_REQUEST,
            Some("Invoice code already used".into()),
        );
        assert_eq!(err.to_string(), "Invoice code already used");
    }

    #[test]
    fn validation_summary_lists_fields() {
        let mut errors = ValidationErrors::default();
        errors.insert(Field::Phone, "Invalid phone number");
        errors.insert(Field::InvoiceCode, "Invoice code is required");
        assert_eq!(
            errors.to_string(),
            "invalid invoice input: invoiceCode: Invoice code is required, phone: Invalid phone number"
        );
    }
}
