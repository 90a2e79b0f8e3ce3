//! In-memory stand-ins for the backend, for controller tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::NaiveDate;
use reqwest::StatusCode;

use crate::client::InvoiceApi;
use crate::error::{Operation, OperationFailed};
use crate::model::{
    ApiResponse, InvoiceCreateRequest, InvoicePdfDescriptor, InvoiceRecord, PartnerCode,
    TaxLookupResult,
};
use crate::tax_code::TaxLookup;

pub(crate) type Reply<T> = Result<(StatusCode, T), String>;

fn answer<T: Clone>(operation: Operation, reply: &Reply<T>) -> Result<ApiResponse<T>, OperationFailed> {
    match reply {
        Ok((status, data)) => Ok(ApiResponse {
            data: data.clone(),
            status: *status,
        }),
        Err(message) => Err(OperationFailed::new(operation, message.clone())),
    }
}

pub(crate) fn record(id: &str, status: i64) -> InvoiceRecord {
    InvoiceRecord {
        id: Some(id.to_string()),
        invoice_code: Some("INV1".to_string()),
        status: Some(status),
        ..Default::default()
    }
}

pub(crate) struct FakeApi {
    pub create: Mutex<Reply<InvoiceRecord>>,
    /// Consumed front to back; the last entry keeps answering.
    pub invoices: Mutex<VecDeque<Reply<InvoiceRecord>>>,
    pub pdf: Mutex<Reply<InvoicePdfDescriptor>>,
    pub update: Mutex<Reply<serde_json::Value>>,
    pub calls: Mutex<Vec<String>>,
    pub created: Mutex<Vec<InvoiceCreateRequest>>,
}

impl Default for FakeApi {
    fn default() -> Self {
        Self {
            create: Mutex::new(Ok((StatusCode::CREATED, record("abc123", 0)))),
            invoices: Mutex::new(VecDeque::from([Ok((StatusCode::OK, record("abc123", 0)))])),
            pdf: Mutex::new(Ok((
                StatusCode::OK,
                InvoicePdfDescriptor {
                    download_url: Some("https://files.example.vn/abc123.pdf".into()),
                    ..Default::default()
                },
            ))),
            update: Mutex::new(Ok((StatusCode::OK, serde_json::Value::Null))),
            calls: Mutex::new(Vec::new()),
            created: Mutex::new(Vec::new()),
        }
    }
}

impl FakeApi {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    fn log(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

impl InvoiceApi for FakeApi {
    fn create_invoice(
        &self,
        request: &InvoiceCreateRequest,
    ) -> Result<ApiResponse<InvoiceRecord>, OperationFailed> {
        self.log("create".into());
        self.created.lock().unwrap().push(request.clone());
        answer(Operation::CreateInvoice, &self.create.lock().unwrap())
    }

    fn get_invoice(&self, id: &str) -> Result<ApiResponse<InvoiceRecord>, OperationFailed> {
        self.log(format!("get {id}"));
        let mut queue = self.invoices.lock().unwrap();
        let reply = if queue.len() > 1 {
            queue.pop_front().unwrap()
        } else {
            queue.front().cloned().unwrap()
        };
        answer(Operation::GetInvoice, &reply)
    }

    fn get_invoice_pdf(
        &self,
        id: &str,
        invoice_date: NaiveDate,
    ) -> Result<ApiResponse<InvoicePdfDescriptor>, OperationFailed> {
        self.log(format!("pdf {id} {invoice_date}"));
        answer(Operation::GetInvoicePdf, &self.pdf.lock().unwrap())
    }

    fn update_status(&self, id: &str) -> Result<ApiResponse<serde_json::Value>, OperationFailed> {
        self.log(format!("update {id}"));
        answer(Operation::UpdateStatus, &self.update.lock().unwrap())
    }
}

pub(crate) struct FakeLookup {
    pub reply: Mutex<Result<TaxLookupResult, String>>,
    pub calls: Mutex<Vec<(String, PartnerCode)>>,
}

impl FakeLookup {
    pub fn answering(result: Result<TaxLookupResult, String>) -> Self {
        Self {
            reply: Mutex::new(result),
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl TaxLookup for FakeLookup {
    fn lookup(
        &self,
        tax_code: &str,
        partner: PartnerCode,
    ) -> Result<TaxLookupResult, OperationFailed> {
        self.calls
            .lock()
            .unwrap()
            .push((tax_code.to_string(), partner));
        self.reply
            .lock()
            .unwrap()
            .clone()
            .map_err(|m| OperationFailed::new(Operation::TaxCodeLookup, m))
    }
}
