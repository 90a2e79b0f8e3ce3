//! Taxpayer lookup used to prefill buyer name and address.

use reqwest::Method;
use serde::Deserialize;

use crate::client::Transport;
use crate::config::ApiConfig;
use crate::error::{Operation, OperationFailed};
use crate::model::{PartnerCode, TaxLookupResult};

pub trait TaxLookup: Sync {
    /// `Err` means "not found or lookup failed"; the message is user-facing.
    fn lookup(
        &self,
        tax_code: &str,
        partner: PartnerCode,
    ) -> Result<TaxLookupResult, OperationFailed>;
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LookupEnvelope {
    data: Option<TaxLookupResult>,
}

#[derive(Debug, Clone)]
pub struct TaxCodeLookup {
    transport: Transport,
}

impl TaxCodeLookup {
    pub fn new(config: &ApiConfig) -> Self {
        Self {
            transport: Transport::new(config),
        }
    }
}

impl TaxLookup for TaxCodeLookup {
    fn lookup(
        &self,
        tax_code: &str,
        partner: PartnerCode,
    ) -> Result<TaxLookupResult, OperationFailed> {
        let (url, builder) = self.transport.request(Method::GET, &["tax-code", tax_code]);
        let builder = builder.query(&[("partnerCode", partner.as_str())]);
        let response = self
            .transport
            .send::<Option<LookupEnvelope>>(Operation::TaxCodeLookup, &url, builder)?;
        Ok(response.data.and_then(|e| e.data).unwrap_or_default())
    }
}
