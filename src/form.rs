//! Create flow: edit, optional tax-code prefill, validate, submit.

use tracing::{info, warn};

use crate::client::{InvoiceApi, is_created};
use crate::error::ValidationErrors;
use crate::model::{Field, InvoiceInput, PartnerCode};
use crate::notice::{Notice, NoticeLevel, Notices};
use crate::tax_code::TaxLookup;
use crate::validate::validate_create;

pub const CREATED_MESSAGE: &str = "Invoice created successfully!";
pub const UNEXPECTED_STATUS_MESSAGE: &str = "Something went wrong, please try again.";
pub const SUBMIT_FAILED_MESSAGE: &str = "Submitting the form failed. Please try again.";
pub const TAX_CODE_FIRST_MESSAGE: &str = "Please enter a tax code first.";
pub const TAX_CODE_FILLED_MESSAGE: &str = "Filled in details from the tax code.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormPhase {
    Editing,
    Submitting,
    /// The detail view takes over with this id.
    Submitted { invoice_id: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Invalid(ValidationErrors),
    Created { invoice_id: String },
    Failed,
    /// A submit or tax-code check is already running.
    Busy,
}

pub struct InvoiceFormController<'a, A, L> {
    api: &'a A,
    lookup: &'a L,
    input: InvoiceInput,
    default_partner: PartnerCode,
    errors: ValidationErrors,
    phase: FormPhase,
    checking_tax_code: bool,
    notices: Notices,
}

impl<'a, A: InvoiceApi, L: TaxLookup> InvoiceFormController<'a, A, L> {
    pub fn new(api: &'a A, lookup: &'a L) -> Self {
        Self::with_default_partner(api, lookup, PartnerCode::default())
    }

    pub fn with_default_partner(api: &'a A, lookup: &'a L, default_partner: PartnerCode) -> Self {
        Self {
            api,
            lookup,
            input: blank_input(default_partner),
            default_partner,
            errors: ValidationErrors::default(),
            phase: FormPhase::Editing,
            checking_tax_code: false,
            notices: Notices::default(),
        }
    }

    pub fn input(&self) -> &InvoiceInput {
        &self.input
    }

    pub fn phase(&self) -> &FormPhase {
        &self.phase
    }

    pub fn is_checking_tax_code(&self) -> bool {
        self.checking_tax_code
    }

    pub fn is_busy(&self) -> bool {
        self.checking_tax_code || self.phase == FormPhase::Submitting
    }

    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    pub fn field_error(&self, field: Field) -> Option<&str> {
        self.errors.get(field)
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        self.notices.take()
    }

    /// Apply a user edit. A new tax code makes the prefilled name and
    /// address stale, so both are cleared in the same step.
    pub fn set_field(&mut self, field: Field, value: impl Into<String>) {
        if self.is_busy() {
            return;
        }
        if matches!(self.phase, FormPhase::Submitted { .. }) {
            self.phase = FormPhase::Editing;
        }
        let value = value.into();
        self.errors.0.remove(&field);
        match field {
            Field::InvoiceCode => self.input.invoice_code = value,
            Field::TaxCode => {
                self.input.tax_code = value;
                self.input.full_name.clear();
                self.input.address.clear();
            }
            Field::PartnerCode => match value.parse::<PartnerCode>() {
                Ok(partner) => self.input.partner_code = Some(partner),
                Err(e) => {
                    self.errors.insert(Field::PartnerCode, &e);
                }
            },
            Field::FullName => self.input.full_name = value,
            Field::Address => self.input.address = value,
            Field::Phone => self.input.phone = value,
            Field::Email => self.input.email = value,
        }
    }

    pub fn set_partner(&mut self, partner: PartnerCode) {
        self.set_field(Field::PartnerCode, partner.as_str());
    }

    /// Prefill from the taxpayer registry. Fields stay untouched when the
    /// lookup fails.
    pub fn check_tax_code(&mut self) -> bool {
        if self.is_busy() {
            return false;
        }
        if self.input.tax_code.is_empty() {
            self.notices.push(NoticeLevel::Warning, TAX_CODE_FIRST_MESSAGE);
            return false;
        }

        self.checking_tax_code = true;
        let partner = self.input.partner_code.unwrap_or(self.default_partner);
        let result = self.lookup.lookup(&self.input.tax_code, partner);
        self.checking_tax_code = false;

        match result {
            Ok(found) => {
                self.input.tax_code = found.tax_code.unwrap_or_default();
                self.input.full_name = found.full_name.unwrap_or_default();
                self.input.address = found.address_line.unwrap_or_default();
                self.notices.push(NoticeLevel::Success, TAX_CODE_FILLED_MESSAGE);
                true
            }
            Err(e) => {
                warn!(error = %e, "tax code lookup failed");
                self.notices.push(NoticeLevel::Error, e.message);
                false
            }
        }
    }

    pub fn submit(&mut self) -> SubmitOutcome {
        if self.is_busy() {
            return SubmitOutcome::Busy;
        }

        let mut input = self.input.clone();
        input.partner_code.get_or_insert(self.default_partner);
        // An unparsed partner never reached `input`; it must block the submit.
        let partner_error = self.errors.get(Field::PartnerCode).map(str::to_owned);
        let checked = match (validate_create(&input), partner_error) {
            (Ok(request), None) => Ok(request),
            (Ok(_), Some(message)) => {
                let mut errors = ValidationErrors::default();
                errors.insert(Field::PartnerCode, &message);
                Err(errors)
            }
            (Err(mut errors), Some(message)) => {
                errors.insert(Field::PartnerCode, &message);
                Err(errors)
            }
            (Err(errors), None) => Err(errors),
        };
        let request = match checked {
            Ok(request) => request,
            Err(errors) => {
                self.errors = errors.clone();
                self.phase = FormPhase::Editing;
                return SubmitOutcome::Invalid(errors);
            }
        };
        self.errors = ValidationErrors::default();

        self.phase = FormPhase::Submitting;
        let outcome = match self.api.create_invoice(&request) {
            Ok(response) if is_created(response.status) => match response.data.id {
                Some(invoice_id) => {
                    info!(%invoice_id, "invoice created");
                    self.notices.push(NoticeLevel::Success, CREATED_MESSAGE);
                    self.input = blank_input(self.default_partner);
                    self.phase = FormPhase::Submitted {
                        invoice_id: invoice_id.clone(),
                    };
                    return SubmitOutcome::Created { invoice_id };
                }
                None => {
                    warn!("create response carried no invoice id");
                    self.notices.push(NoticeLevel::Error, UNEXPECTED_STATUS_MESSAGE);
                    SubmitOutcome::Failed
                }
            },
            Ok(response) => {
                warn!(status = %response.status, "create did not return 201");
                self.notices.push(NoticeLevel::Error, UNEXPECTED_STATUS_MESSAGE);
                SubmitOutcome::Failed
            }
            Err(e) => {
                warn!(error = %e, "create invoice failed");
                self.notices.push(NoticeLevel::Error, SUBMIT_FAILED_MESSAGE);
                SubmitOutcome::Failed
            }
        };
        self.phase = FormPhase::Editing;
        outcome
    }
}

fn blank_input(partner: PartnerCode) -> InvoiceInput {
    InvoiceInput {
        partner_code: Some(partner),
        ..Default::default()
    }
}
