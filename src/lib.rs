//! Client side of the e-invoice workflow: collect buyer details, create the
//! invoice on the remote invoicing service, then follow it through to
//! "sent" and its PDF.

pub mod client;
pub mod config;
pub mod detail;
pub mod error;
pub mod form;
pub mod model;
pub mod notice;
pub mod render;
pub mod tax_code;
pub mod validate;

#[cfg(test)]
mod testing;

pub use client::{InvoiceApi, InvoiceClient};
pub use config::{ApiConfig, Settings};
pub use detail::{CancelToken, DetailAction, InvoiceDetailController, SettleDelay};
pub use error::{ConfigError, OperationFailed, ValidationErrors};
pub use form::{FormPhase, InvoiceFormController, SubmitOutcome};
pub use tax_code::{TaxCodeLookup, TaxLookup};
