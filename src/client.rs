//! Typed wrapper over the invoicing backend's REST surface.

use chrono::NaiveDate;
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use reqwest::{Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::ApiConfig;
use crate::error::{Operation, OperationFailed};
use crate::model::{ApiResponse, InvoiceCreateRequest, InvoicePdfDescriptor, InvoiceRecord};

/// Status code sent by [`InvoiceApi::update_status`]. The backend expects
/// this literal for the "send" action even though the display layer reads
/// 2 as cancelled; see DESIGN.md before changing it.
pub const UPDATE_STATUS_TARGET: i64 = 2;

/// Date format of the `invoiceDate` query parameter.
pub const INVOICE_DATE_FORMAT: &str = "%Y-%m-%d";

/// The four invoice operations the controllers depend on.
///
/// Every method makes exactly one attempt. `Ok` carries any 2xx response
/// untouched; callers interpret the status themselves.
pub trait InvoiceApi: Sync {
    fn create_invoice(
        &self,
        request: &InvoiceCreateRequest,
    ) -> Result<ApiResponse<InvoiceRecord>, OperationFailed>;

    fn get_invoice(&self, id: &str) -> Result<ApiResponse<InvoiceRecord>, OperationFailed>;

    fn get_invoice_pdf(
        &self,
        id: &str,
        invoice_date: NaiveDate,
    ) -> Result<ApiResponse<InvoicePdfDescriptor>, OperationFailed>;

    fn update_status(&self, id: &str) -> Result<ApiResponse<serde_json::Value>, OperationFailed>;
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<serde_json::Value>,
}

/// Pull a user-facing message out of an error body. Accepts a plain string
/// or a list of strings (joined).
pub(crate) fn backend_message(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    match parsed.message? {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Array(parts) => {
            let parts: Vec<&str> = parts.iter().filter_map(|p| p.as_str()).collect();
            if parts.is_empty() { None } else { Some(parts.join(", ")) }
        }
        _ => None,
    }
}

/// One HTTP exchange against the configured base URL. Shared by the
/// invoice client and the tax-code lookup.
#[derive(Debug, Clone)]
pub(crate) struct Transport {
    http: Client,
    config: ApiConfig,
}

impl Transport {
    pub(crate) fn new(config: &ApiConfig) -> Self {
        Self {
            http: Client::new(),
            config: config.clone(),
        }
    }

    pub(crate) fn request(&self, method: Method, segments: &[&str]) -> (Url, RequestBuilder) {
        let url = self.config.endpoint(segments);
        let builder = self.http.request(method, url.clone());
        (url, builder)
    }

    /// Send and decode. Non-2xx and transport errors become [`OperationFailed`].
    pub(crate) fn send<T: DeserializeOwned + Default>(
        &self,
        operation: Operation,
        url: &Url,
        builder: RequestBuilder,
    ) -> Result<ApiResponse<T>, OperationFailed> {
        debug!(%operation, %url, "sending request");
        let response = builder.send().map_err(|e| {
            warn!(%operation, error = %e, "request did not complete");
            OperationFailed::from_transport(operation, e)
        })?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| OperationFailed::from_transport(operation, e))?;

        if !status.is_success() {
            warn!(%operation, %status, "backend rejected request");
            return Err(OperationFailed::from_status(
                operation,
                status,
                backend_message(&body),
            ));
        }

        let data = decode(operation, &body);
        debug!(%operation, %status, "request completed");
        Ok(ApiResponse { data, status })
    }
}

// An empty body decodes as JSON null. A 2xx body that does not fit `T`
// still completed, so it reads as `T::default()`.
fn decode<T: DeserializeOwned + Default>(operation: Operation, body: &str) -> T {
    let parsed = if body.trim().is_empty() {
        serde_json::from_str("null")
    } else {
        serde_json::from_str(body)
    };
    parsed.unwrap_or_else(|e| {
        warn!(%operation, error = %e, "unreadable response body, using an empty value");
        T::default()
    })
}

fn json_header(builder: RequestBuilder) -> RequestBuilder {
    builder.header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
}

/// HTTP implementation of [`InvoiceApi`].
#[derive(Debug, Clone)]
pub struct InvoiceClient {
    transport: Transport,
}

impl InvoiceClient {
    pub fn new(config: &ApiConfig) -> Self {
        Self {
            transport: Transport::new(config),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PdfQuery<'a> {
    invoice_date: String,
    request_id: &'a str,
}

impl InvoiceApi for InvoiceClient {
    fn create_invoice(
        &self,
        request: &InvoiceCreateRequest,
    ) -> Result<ApiResponse<InvoiceRecord>, OperationFailed> {
        let (url, builder) = self.transport.request(Method::POST, &["invoices"]);
        self.transport
            .send(Operation::CreateInvoice, &url, builder.json(request))
    }

    fn get_invoice(&self, id: &str) -> Result<ApiResponse<InvoiceRecord>, OperationFailed> {
        let (url, builder) = self.transport.request(Method::GET, &["invoices", id]);
        self.transport.send(Operation::GetInvoice, &url, builder)
    }

    fn get_invoice_pdf(
        &self,
        id: &str,
        invoice_date: NaiveDate,
    ) -> Result<ApiResponse<InvoicePdfDescriptor>, OperationFailed> {
        let query = PdfQuery {
            invoice_date: invoice_date.format(INVOICE_DATE_FORMAT).to_string(),
            request_id: id,
        };
        let (url, builder) = self.transport.request(Method::GET, &["invoices-pdf"]);
        self.transport
            .send(Operation::GetInvoicePdf, &url, builder.query(&query))
    }

    fn update_status(&self, id: &str) -> Result<ApiResponse<serde_json::Value>, OperationFailed> {
        let (url, builder) =
            self.transport
                .request(Method::PATCH, &["invoices", id, "update-status"]);
        let builder = json_header(builder).query(&[("status", UPDATE_STATUS_TARGET)]);
        self.transport.send(Operation::UpdateStatus, &url, builder)
    }
}

/// Successful responses the create flow accepts as "created".
pub fn is_created(status: StatusCode) -> bool {
    status == StatusCode::CREATED
}
