use std::process::{Command, ExitCode};

use anyhow::{Context, bail};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use inquire::{Confirm, InquireError, Select, Text};
use tracing_subscriber::EnvFilter;

use hoadon::config::{self, ApiConfig, Settings};
use hoadon::detail::{
    DetailAction, InvoiceDetailController, LoadState, SendOutcome, SettleDelay, cancel_on_ctrl_c,
    invoice_date_today,
};
use hoadon::form::{InvoiceFormController, SubmitOutcome};
use hoadon::model::{Field, InvoiceStatus, PartnerCode};
use hoadon::notice::{Notice, NoticeLevel};
use hoadon::render::{format_vnd, input_table, lookup_table, render_invoice};
use hoadon::{InvoiceApi, InvoiceClient, TaxCodeLookup, TaxLookup};

// ==========================================
// Structs & Enums
// ==========================================

#[derive(Parser)]
#[command(name = "hoadon", about = "Issue e-invoices through the invoicing service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fill in buyer details and create a new invoice (default)
    New,
    /// Show an existing invoice
    Show { id: String },
    /// Send a pending invoice to the tax authority
    Send { id: String },
    /// Print (or open) the PDF download link of an invoice
    Pdf {
        id: String,
        /// Invoice date, YYYY-MM-DD (defaults to today in Vietnam)
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Open the link in the browser
        #[arg(long)]
        open: bool,
    },
    /// Look up taxpayer details by tax code
    Lookup {
        tax_code: String,
        #[arg(long)]
        partner: Option<PartnerCode>,
    },
    /// Show the resolved configuration
    Config,
}

const SUBMIT_OPT: &str = "✅ Submit";
const EDIT_OPT: &str = "✏️  Edit again";
const QUIT_OPT: &str = "❌ Quit";
const CLOSE_OPT: &str = "❌ Close";

// ==========================================
// Main Function
// ==========================================

fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("hoadon=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("❌ Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    // Without an endpoint nothing below can work.
    let api_config = ApiConfig::from_env()?;
    let settings_path = config::settings_path();
    let settings = Settings::load(&settings_path)?;

    let client = InvoiceClient::new(&api_config);
    let lookup = TaxCodeLookup::new(&api_config);

    match cli.command.unwrap_or(Commands::New) {
        Commands::New => {
            if let Some(invoice_id) = create_invoice_wizard(&client, &lookup, &settings)? {
                detail_loop(&client, invoice_id, &settings)?;
            }
        }
        Commands::Show { id } => detail_loop(&client, id, &settings)?,
        Commands::Send { id } => send_invoice(&client, id, &settings)?,
        Commands::Pdf { id, date, open } => {
            let date = date.unwrap_or_else(invoice_date_today);
            let pdf = client.get_invoice_pdf(&id, date)?.data;
            let url = pdf
                .download_url
                .context("the invoice service returned no download link")?;
            println!("📄 {url}");
            if open {
                open_url(&url);
            }
        }
        Commands::Lookup { tax_code, partner } => {
            let partner = partner.unwrap_or(settings.default_partner);
            let found = lookup.lookup(&tax_code, partner)?;
            println!("{}", lookup_table(&found));
        }
        Commands::Config => {
            println!("🌐 Endpoint:     {}", api_config.base_url());
            println!("⚙️  Settings:     {}", settings_path.display());
            println!("⏱️  Settle delay: {}s", settings.settle_delay_secs);
            println!("🤝 Partner:      {}", settings.default_partner);
        }
    }
    Ok(())
}

// ==========================================
// 1. Create Flow
// ==========================================

/// Returns the new invoice id, or `None` if the user gave up.
fn create_invoice_wizard<A: InvoiceApi, L: TaxLookup>(
    api: &A,
    lookup: &L,
    settings: &Settings,
) -> anyhow::Result<Option<String>> {
    let mut form = InvoiceFormController::with_default_partner(api, lookup, settings.default_partner);
    println!("\n--- Invoice Details ---");
    println!("💡 The e-invoice will be emailed to the buyer. Double-check the email address.");

    loop {
        if !ask_for_fields(&mut form)? {
            return Ok(None);
        }

        println!("{}", input_table(form.input()));
        let choice = match Select::new("Ready?", vec![SUBMIT_OPT, EDIT_OPT, QUIT_OPT]).prompt() {
            Ok(c) => c,
            Err(e) if is_cancel(&e) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if choice == QUIT_OPT {
            return Ok(None);
        }
        if choice == EDIT_OPT {
            continue;
        }

        println!("⏳ Submitting...");
        let outcome = form.submit();
        print_notices(form.take_notices());
        match outcome {
            SubmitOutcome::Created { invoice_id } => return Ok(Some(invoice_id)),
            SubmitOutcome::Invalid(errors) => {
                for (field, message) in &errors.0 {
                    println!("⚠️  {field}: {message}");
                }
            }
            SubmitOutcome::Failed | SubmitOutcome::Busy => {}
        }
    }
}

/// Walk every field once, prefilled with what the form already holds.
/// Returns `false` when the user cancels.
fn ask_for_fields<A: InvoiceApi, L: TaxLookup>(
    form: &mut InvoiceFormController<'_, A, L>,
) -> anyhow::Result<bool> {
    macro_rules! ask {
        ($e:expr) => {
            match $e {
                Ok(v) => v,
                Err(e) if is_cancel(&e) => return Ok(false),
                Err(e) => return Err(e.into()),
            }
        };
    }

    let invoice_code = ask!(ask_text(form, Field::InvoiceCode, "Invoice code *:"));
    form.set_field(Field::InvoiceCode, invoice_code);

    let current = form.input().partner_code.unwrap_or_default();
    let start = PartnerCode::ALL.iter().position(|p| *p == current).unwrap_or(0);
    let partner = ask!(
        Select::new("Partner:", PartnerCode::ALL.to_vec())
            .with_starting_cursor(start)
            .prompt()
    );
    form.set_partner(partner);

    let tax_code = ask!(ask_text(form, Field::TaxCode, "Tax code *:"));
    if tax_code != form.input().tax_code {
        form.set_field(Field::TaxCode, tax_code);
    }
    if !form.input().tax_code.is_empty() {
        let check = ask!(
            Confirm::new("Look up buyer details from this tax code?")
                .with_default(form.input().full_name.is_empty())
                .prompt()
        );
        if check {
            println!("🔍 Checking tax code...");
            form.check_tax_code();
            print_notices(form.take_notices());
        }
    }

    let full_name = ask!(ask_text(form, Field::FullName, "Full name:"));
    form.set_field(Field::FullName, full_name);
    let address = ask!(ask_text(form, Field::Address, "Address:"));
    form.set_field(Field::Address, address);
    let phone = ask!(ask_text(form, Field::Phone, "Phone *:"));
    form.set_field(Field::Phone, phone);
    let email = ask!(ask_text(form, Field::Email, "Email:"));
    form.set_field(Field::Email, email);

    Ok(true)
}

fn ask_text<A: InvoiceApi, L: TaxLookup>(
    form: &InvoiceFormController<'_, A, L>,
    field: Field,
    prompt: &str,
) -> Result<String, InquireError> {
    let input = form.input();
    let current = match field {
        Field::InvoiceCode => input.invoice_code.as_str(),
        Field::TaxCode => input.tax_code.as_str(),
        Field::FullName => input.full_name.as_str(),
        Field::Address => input.address.as_str(),
        Field::Phone => input.phone.as_str(),
        Field::Email => input.email.as_str(),
        Field::PartnerCode => "",
    };
    let mut text = Text::new(prompt);
    if !current.is_empty() {
        text = text.with_initial_value(current);
    }
    if let Some(error) = form.field_error(field) {
        text = text.with_help_message(error);
    }
    text.prompt().map(|s| s.trim().to_string())
}

// ==========================================
// 2. Detail View
// ==========================================

fn detail_loop<A: InvoiceApi>(api: &A, invoice_id: String, settings: &Settings) -> anyhow::Result<()> {
    let settle = SettleDelay::new(settings.settle_delay());
    let mut view = InvoiceDetailController::mount(api, invoice_id, settle);

    loop {
        print_notices(view.take_notices());
        match view.record() {
            Some(record) => println!("\n{}\n", render_invoice(record)),
            None => println!("⏳ Loading invoice {}...", view.invoice_id()),
        }

        let action = view.action().unwrap_or(DetailAction::Reload);
        let action_opt = match action {
            DetailAction::Send => "📨 Send invoice",
            DetailAction::DownloadPdf => "📥 Download PDF",
            DetailAction::Reload => "🔄 Reload",
        };
        let choice = match Select::new("Action:", vec![action_opt, CLOSE_OPT]).prompt() {
            Ok(c) => c,
            Err(e) if is_cancel(&e) => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        if choice == CLOSE_OPT {
            return Ok(());
        }

        match action {
            DetailAction::Send => {
                println!(
                    "📨 Sending... waiting {}s for the tax authority (Ctrl-C to stop waiting).",
                    settle.duration.as_secs()
                );
                cancel_on_ctrl_c(|cancel| view.send(cancel));
            }
            DetailAction::DownloadPdf => match view.download_url() {
                Some(url) => {
                    println!("📥 Downloading...");
                    open_url(url);
                }
                None => println!("❌ No PDF link available yet."),
            },
            DetailAction::Reload => view.refresh(),
        }
    }
}

fn send_invoice<A: InvoiceApi>(api: &A, invoice_id: String, settings: &Settings) -> anyhow::Result<()> {
    let settle = SettleDelay::new(settings.settle_delay());
    let mut view = InvoiceDetailController::mount(api, invoice_id, settle);
    if view.load_state() == LoadState::Loading {
        print_notices(view.take_notices());
        bail!("could not load invoice {}", view.invoice_id());
    }

    println!(
        "📨 Sending... waiting {}s for the tax authority (Ctrl-C to stop waiting).",
        settle.duration.as_secs()
    );
    let outcome = cancel_on_ctrl_c(|cancel| view.send(cancel));
    print_notices(view.take_notices());
    match outcome {
        SendOutcome::Sent => {}
        SendOutcome::Failed => bail!("invoice {} was not sent", view.invoice_id()),
        SendOutcome::Cancelled => bail!(
            "stopped waiting for invoice {}; its status is unconfirmed",
            view.invoice_id()
        ),
        SendOutcome::Busy => bail!("invoice {} is already being sent", view.invoice_id()),
    }

    if let Some(record) = view.record() {
        println!(
            "📄 #{} {} ({})",
            record.invoice_code.as_deref().unwrap_or(view.invoice_id()),
            InvoiceStatus::badge(record.status),
            format_vnd(record.total_amount)
        );
    }
    Ok(())
}

// ==========================================
// 3. Utilities
// ==========================================

fn print_notices(notices: Vec<Notice>) {
    for notice in notices {
        let icon = match notice.level {
            NoticeLevel::Info => "ℹ️ ",
            NoticeLevel::Success => "✅",
            NoticeLevel::Warning => "⚠️ ",
            NoticeLevel::Error => "❌",
        };
        println!("{icon} {}", notice.message);
    }
}

fn is_cancel(err: &InquireError) -> bool {
    matches!(
        err,
        InquireError::OperationCanceled | InquireError::OperationInterrupted
    )
}

// Open a link in the default browser, printing it when that fails.
fn open_url(url: &str) {
    #[cfg(target_os = "macos")]
    let opened = Command::new("open").arg(url).spawn();

    #[cfg(target_os = "windows")]
    let opened = Command::new("explorer").arg(url).spawn();

    #[cfg(all(unix, not(target_os = "macos")))]
    let opened = Command::new("xdg-open").arg(url).spawn();

    #[cfg(not(any(unix, windows)))]
    let opened: std::io::Result<std::process::Child> =
        Err(std::io::Error::other("no opener on this platform"));

    if opened.is_err() {
        println!("🔗 {url}");
    }
}
