use std::fmt;
use std::str::FromStr;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

/// Upstream invoicing network the request is routed through.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PartnerCode {
    #[default]
    #[serde(rename = "VNP")]
    Vnp,
    #[serde(rename = "MISA")]
    Misa,
}

impl PartnerCode {
    pub const ALL: [PartnerCode; 2] = [PartnerCode::Vnp, PartnerCode::Misa];

    pub fn as_str(self) -> &'static str {
        match self {
            PartnerCode::Vnp => "VNP",
            PartnerCode::Misa => "MISA",
        }
    }
}

impl fmt::Display for PartnerCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PartnerCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "VNP" => Ok(PartnerCode::Vnp),
            "MISA" => Ok(PartnerCode::Misa),
            other => Err(format!("unknown partner code {other:?} (expected VNP or MISA)")),
        }
    }
}

/// Form fields, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    InvoiceCode,
    TaxCode,
    PartnerCode,
    FullName,
    Address,
    Phone,
    Email,
}

impl Field {
    pub fn name(self) -> &'static str {
        match self {
            Field::InvoiceCode => "invoiceCode",
            Field::TaxCode => "taxCode",
            Field::PartnerCode => "partnerCode",
            Field::FullName => "fullName",
            Field::Address => "address",
            Field::Phone => "phone",
            Field::Email => "email",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Raw values as the user typed them. `partner_code` is `None` until chosen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvoiceInput {
    pub invoice_code: String,
    pub tax_code: String,
    pub partner_code: Option<PartnerCode>,
    pub full_name: String,
    pub address: String,
    pub phone: String,
    pub email: String,
}

/// Validated body of `POST /invoices`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceCreateRequest {
    pub invoice_code: String,
    pub tax_code: String,
    pub partner_code: PartnerCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// What the client hands back for any completed 2xx exchange.
#[derive(Debug, Clone)]
pub struct ApiResponse<T> {
    pub data: T,
    pub status: StatusCode,
}

/// Invoice lifecycle stage as the display layer understands it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvoiceStatus {
    Pending,
    Paid,
    Cancelled,
}

impl InvoiceStatus {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(InvoiceStatus::Pending),
            1 => Some(InvoiceStatus::Paid),
            2 => Some(InvoiceStatus::Cancelled),
            _ => None,
        }
    }

    /// Badge text. Unknown or absent codes are shown as pending.
    pub fn badge(code: Option<i64>) -> &'static str {
        match code.and_then(InvoiceStatus::from_code) {
            Some(InvoiceStatus::Paid) => "Paid",
            Some(InvoiceStatus::Cancelled) => "Cancelled",
            Some(InvoiceStatus::Pending) | None => "Pending",
        }
    }
}

/// Decode a field on its own terms: a value of the wrong type reads as
/// absent instead of failing the whole response.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).ok())
}

/// Like [`lenient`], but numbers are kept as their decimal text.
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// `null`, a non-list, or unreadable entries all leave the list short.
fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Array(entries) => entries
            .into_iter()
            .filter_map(|entry| T::deserialize(entry).ok())
            .collect(),
        _ => Vec::new(),
    })
}

/// Backend-authored invoice. Every field is optional: the server is the
/// only writer and partial records must still render.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InvoiceRecord {
    #[serde(deserialize_with = "lenient_text")]
    pub id: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub invoice_code: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub created_date: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub lookup_code: Option<String>,
    #[serde(rename = "type", deserialize_with = "lenient")]
    pub kind: Option<i64>,
    #[serde(deserialize_with = "lenient")]
    pub status: Option<i64>,
    #[serde(deserialize_with = "lenient_text")]
    pub payment_method: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub currency_unit: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub currency_exchange_rate: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub total_tax_amount: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub total_amount_after_tax: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub total_sale_amount: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub total_discount_amount: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub total_amount_without_tax: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub total_amount: Option<f64>,
    #[serde(deserialize_with = "lenient_text")]
    pub bill_code: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub template_id: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub partner_id: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub store_id: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub invoice_detail: Option<InvoiceDetail>,
    #[serde(deserialize_with = "lenient_list")]
    pub items: Vec<InvoiceItem>,
    #[serde(deserialize_with = "lenient_list")]
    pub tax_types: Vec<TaxType>,
    #[serde(rename = "responsePartNer", deserialize_with = "lenient")]
    pub response_partner: Option<PartnerResponse>,
}

impl InvoiceRecord {
    pub fn status(&self) -> Option<InvoiceStatus> {
        self.status.and_then(InvoiceStatus::from_code)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InvoiceItem {
    #[serde(deserialize_with = "lenient")]
    pub ordinal_number: Option<i64>,
    #[serde(deserialize_with = "lenient_text")]
    pub code: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub quantity: Option<f64>,
    #[serde(deserialize_with = "lenient_text")]
    pub property: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub unit: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub price: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub discount_rate: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub discount_amount: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub amount_without_discount: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub amount: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub tax_amount: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub amount_after_tax: Option<f64>,
    #[serde(deserialize_with = "lenient_text")]
    pub tax: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaxType {
    #[serde(deserialize_with = "lenient_text")]
    pub tax: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub amount_without_tax: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub tax_amount: Option<f64>,
}

/// Buyer block of an invoice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InvoiceDetail {
    #[serde(deserialize_with = "lenient_text")]
    pub receipt_code: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub buyer_customer_code: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub buyer_tax_code: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub buyer_name: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub buyer_address: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub buyer_full_name: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub buyer_phone_number: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub buyer_email: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub buyer_bank_name: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub buyer_bank_account_number: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub invoice_note: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub internal_note: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub discount: Option<bool>,
    #[serde(deserialize_with = "lenient_text")]
    pub code: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub quantity: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub total_amount: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub discount_amount: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub final_amount: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PartnerResponse {
    #[serde(deserialize_with = "lenient_text")]
    pub code: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub message: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub data: Option<PartnerResponseData>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PartnerResponseData {
    #[serde(deserialize_with = "lenient_text")]
    pub request_id: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub invoice_number: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub invoice_symbol: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub invoice_type: Option<i64>,
    #[serde(deserialize_with = "lenient_text")]
    pub invoice_created_date: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub tax_authority_code: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub lookup_code: Option<String>,
}

/// Opaque PDF reference; only `downloadUrl` is relied on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InvoicePdfDescriptor {
    #[serde(deserialize_with = "lenient_text")]
    pub download_url: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaxLookupResult {
    #[serde(deserialize_with = "lenient_text")]
    pub tax_code: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub full_name: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub address_line: Option<String>,
}
