//! Terminal rendering of the invoice read model, one table per tab.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeDelta};
use comfy_table::{Attribute, Cell, Color, Table};

use crate::detail::INVOICE_DATE_OFFSET_HOURS;
use crate::model::{InvoiceInput, InvoiceRecord, InvoiceStatus, TaxLookupResult};

const GREEN: Color = Color::Rgb { r: 4, g: 120, b: 87 };
const RED: Color = Color::Rgb { r: 185, g: 28, b: 28 };
const AMBER: Color = Color::Rgb { r: 180, g: 83, b: 9 };
const BLUE: Color = Color::Rgb { r: 29, g: 78, b: 216 };

/// Vietnamese dong: whole units, `.` between thousands, `₫` suffix.
pub fn format_vnd(amount: Option<f64>) -> String {
    let rounded = amount.unwrap_or(0.0).round() as i64;
    let digits = rounded.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    let sign = if rounded < 0 { "-" } else { "" };
    format!("{sign}{grouped} ₫")
}

/// `d/m/yyyy` in Vietnam time. Unparseable input is shown as-is.
pub fn format_created_date(raw: Option<&str>) -> String {
    let Some(raw) = raw else {
        return String::new();
    };
    let date = if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        Some((dt.to_utc() + TimeDelta::hours(INVOICE_DATE_OFFSET_HOURS)).date_naive())
    } else if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        Some(dt.date())
    } else {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
    };
    match date {
        Some(d) => format!("{}/{}/{}", d.day(), d.month(), d.year()),
        None => raw.to_string(),
    }
}

fn text(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("")
}

fn number(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn label(name: &str) -> Cell {
    Cell::new(name).add_attribute(Attribute::Dim)
}

pub fn status_cell(code: Option<i64>) -> Cell {
    let color = match code.and_then(InvoiceStatus::from_code) {
        Some(InvoiceStatus::Paid) => GREEN,
        Some(InvoiceStatus::Cancelled) => RED,
        _ => AMBER,
    };
    Cell::new(InvoiceStatus::badge(code)).fg(color)
}

pub fn header(record: &InvoiceRecord) -> String {
    format!(
        "Invoice #{}\nCreated: {}",
        text(&record.invoice_code),
        format_created_date(record.created_date.as_deref())
    )
}

pub fn general_table(record: &InvoiceRecord) -> Table {
    let mut table = Table::new();
    table.set_header(vec![Cell::new("General"), Cell::new("")]);
    table.add_row(vec![label("Status"), status_cell(record.status)]);
    table.add_row(vec![label("Bill code"), Cell::new(text(&record.bill_code))]);
    table.add_row(vec![label("Lookup code"), Cell::new(text(&record.lookup_code))]);
    table.add_row(vec![label("Payment method"), Cell::new(text(&record.payment_method))]);
    table.add_row(vec![label("Currency"), Cell::new(text(&record.currency_unit))]);
    table.add_row(vec![
        label("Exchange rate"),
        Cell::new(number(record.currency_exchange_rate)),
    ]);
    table.add_row(vec![label("Sale amount"), Cell::new(format_vnd(record.total_sale_amount))]);
    table.add_row(vec![
        label("Discount"),
        Cell::new(format!("-{}", format_vnd(record.total_discount_amount))).fg(RED),
    ]);
    table.add_row(vec![
        label("Before tax"),
        Cell::new(format_vnd(record.total_amount_without_tax)),
    ]);
    table.add_row(vec![label("Tax"), Cell::new(format_vnd(record.total_tax_amount))]);
    table.add_row(vec![
        Cell::new("Total").add_attribute(Attribute::Bold),
        Cell::new(format_vnd(record.total_amount))
            .add_attribute(Attribute::Bold)
            .fg(BLUE),
    ]);
    table
}

pub fn items_table(record: &InvoiceRecord) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Item", "Code", "Quantity", "Price", "Discount", "Amount"]);
    for item in &record.items {
        let quantity = format!("{} {}", number(item.quantity), text(&item.unit));
        let discount = format!(
            "{}% ({})",
            item.discount_rate.unwrap_or(0.0),
            format_vnd(item.discount_amount)
        );
        table.add_row(vec![
            Cell::new(text(&item.name)),
            Cell::new(text(&item.code)),
            Cell::new(quantity.trim()),
            Cell::new(format_vnd(item.price)),
            Cell::new(discount),
            Cell::new(format_vnd(item.amount)).add_attribute(Attribute::Bold),
        ]);
    }
    table
}

pub fn customer_table(record: &InvoiceRecord) -> Table {
    let buyer = record.invoice_detail.clone().unwrap_or_default();
    let mut table = Table::new();
    table.set_header(vec![Cell::new("Customer"), Cell::new("")]);
    for (name, value) in [
        ("Name", &buyer.buyer_full_name),
        ("Tax code", &buyer.buyer_tax_code),
        ("Phone", &buyer.buyer_phone_number),
        ("Email", &buyer.buyer_email),
        ("Address", &buyer.buyer_address),
        ("Bank", &buyer.buyer_bank_name),
        ("Account", &buyer.buyer_bank_account_number),
    ] {
        table.add_row(vec![label(name), Cell::new(text(value))]);
    }
    table
}

pub fn tax_table(record: &InvoiceRecord) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Tax type", "Before tax", "Tax amount"]);
    for row in &record.tax_types {
        table.add_row(vec![
            Cell::new(text(&row.tax)),
            Cell::new(format_vnd(row.amount_without_tax)),
            Cell::new(format_vnd(row.tax_amount)),
        ]);
    }
    table
}

/// All four tabs, stacked.
pub fn render_invoice(record: &InvoiceRecord) -> String {
    format!(
        "{}\n\n--- General ---\n{}\n\n--- Items ---\n{}\n\n--- Customer ---\n{}\n\n--- Tax ---\n{}",
        header(record),
        general_table(record),
        items_table(record),
        customer_table(record),
        tax_table(record),
    )
}

pub fn input_table(input: &InvoiceInput) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Field", "Value"]);
    let partner = input.partner_code.map(|p| p.as_str()).unwrap_or("");
    for (name, value) in [
        ("Invoice code", input.invoice_code.as_str()),
        ("Partner", partner),
        ("Tax code", input.tax_code.as_str()),
        ("Full name", input.full_name.as_str()),
        ("Address", input.address.as_str()),
        ("Phone", input.phone.as_str()),
        ("Email", input.email.as_str()),
    ] {
        table.add_row(vec![label(name), Cell::new(value)]);
    }
    table
}

pub fn lookup_table(result: &TaxLookupResult) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Tax code", "Full name", "Address"]);
    table.add_row(vec![
        text(&result.tax_code),
        text(&result.full_name),
        text(&result.address_line),
    ]);
    table
}
