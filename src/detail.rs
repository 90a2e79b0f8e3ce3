//! Post-create flow: load an invoice with its PDF reference, pick the
//! action its status allows, and run the "send" transition.

use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use tokio::runtime;
use tokio::sync::oneshot;
use tracing::{info, warn};

use crate::client::InvoiceApi;
use crate::model::{InvoicePdfDescriptor, InvoiceRecord};
use crate::notice::{Notice, NoticeLevel, Notices};

/// How long the backend gets to finish its tax-authority submission before
/// the view refetches.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(10);

/// Invoice dates are calendar days in Vietnam (UTC+7).
pub const INVOICE_DATE_OFFSET_HOURS: i64 = 7;

pub const SENT_MESSAGE: &str = "Invoice sent successfully";
pub const SEND_FAILED_MESSAGE: &str = "An error occurred while sending the invoice";
pub const SEND_CANCELLED_MESSAGE: &str = "Stopped waiting for the invoice; reload to see its status";

pub fn invoice_date_at(now: DateTime<Utc>) -> NaiveDate {
    (now + TimeDelta::hours(INVOICE_DATE_OFFSET_HOURS)).date_naive()
}

pub fn invoice_date_today() -> NaiveDate {
    invoice_date_at(Utc::now())
}

/// Shared flag that cuts a [`SettleDelay`] short.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<(Mutex<bool>, Condvar)>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        let (flag, wake) = &*self.0;
        *flag.lock().unwrap_or_else(PoisonError::into_inner) = true;
        wake.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.0.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Block for `timeout` unless cancelled first. Returns `true` when the
    /// full time elapsed.
    fn sleep(&self, timeout: Duration) -> bool {
        let (flag, wake) = &*self.0;
        let guard = flag.lock().unwrap_or_else(PoisonError::into_inner);
        let (guard, _) = wake
            .wait_timeout_while(guard, timeout, |cancelled| !*cancelled)
            .unwrap_or_else(PoisonError::into_inner);
        !*guard
    }
}

/// Run `f` with a token that Ctrl-C cancels. The signal listener lives on
/// its own thread and stops once `f` returns.
pub fn cancel_on_ctrl_c<T>(f: impl FnOnce(&CancelToken) -> T) -> T {
    let token = CancelToken::new();
    let (done_tx, done_rx) = oneshot::channel::<()>();

    let listener = {
        let token = token.clone();
        thread::spawn(move || {
            let runtime = match runtime::Builder::new_current_thread().enable_all().build() {
                Ok(runtime) => runtime,
                Err(e) => {
                    warn!(error = %e, "ctrl-c listener unavailable");
                    return;
                }
            };
            runtime.block_on(async {
                tokio::select! {
                    signal = tokio::signal::ctrl_c() => match signal {
                        Ok(()) => {
                            info!("interrupted, cancelling wait");
                            token.cancel();
                        }
                        Err(e) => warn!(error = %e, "failed to listen for ctrl-c"),
                    },
                    _ = done_rx => {}
                }
            });
        })
    };

    let result = f(&token);
    drop(done_tx);
    if listener.join().is_err() {
        warn!("ctrl-c listener panicked");
    }
    result
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettleDelay {
    pub duration: Duration,
}

impl Default for SettleDelay {
    fn default() -> Self {
        Self {
            duration: DEFAULT_SETTLE_DELAY,
        }
    }
}

impl SettleDelay {
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }

    pub fn wait(&self, cancel: &CancelToken) -> bool {
        cancel.sleep(self.duration)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Loading,
    Ready,
}

/// The single action the footer offers for the current status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailAction {
    Send,
    DownloadPdf,
    Reload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Sent,
    Failed,
    Cancelled,
    /// Another send is still running.
    Busy,
}

pub struct InvoiceDetailController<'a, A> {
    api: &'a A,
    invoice_id: String,
    record: Option<InvoiceRecord>,
    pdf: Option<InvoicePdfDescriptor>,
    updating: bool,
    settle: SettleDelay,
    notices: Notices,
}

impl<'a, A: InvoiceApi> InvoiceDetailController<'a, A> {
    /// Build the view and run the first load.
    pub fn mount(api: &'a A, invoice_id: impl Into<String>, settle: SettleDelay) -> Self {
        let mut view = Self::unloaded(api, invoice_id, settle);
        view.refresh();
        view
    }

    pub fn unloaded(api: &'a A, invoice_id: impl Into<String>, settle: SettleDelay) -> Self {
        Self {
            api,
            invoice_id: invoice_id.into(),
            record: None,
            pdf: None,
            updating: false,
            settle,
            notices: Notices::default(),
        }
    }

    /// Reload with today's invoice date.
    pub fn refresh(&mut self) {
        self.refresh_for(invoice_date_today());
    }

    /// Fetch the record and the PDF reference side by side. A failure on
    /// either side is logged and leaves that side's previous value alone.
    pub fn refresh_for(&mut self, invoice_date: NaiveDate) {
        let api = self.api;
        let id = self.invoice_id.as_str();

        let (invoice, pdf) = thread::scope(|s| {
            let pdf = s.spawn(move || api.get_invoice_pdf(id, invoice_date));
            let invoice = api.get_invoice(id);
            let pdf = pdf.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic));
            (invoice, pdf)
        });

        match invoice {
            Ok(response) => self.record = Some(response.data),
            Err(e) => warn!(invoice_id = %self.invoice_id, error = %e, "failed to load invoice"),
        }
        match pdf {
            Ok(response) => self.pdf = Some(response.data),
            Err(e) => warn!(invoice_id = %self.invoice_id, error = %e, "failed to load invoice pdf"),
        }
    }

    pub fn invoice_id(&self) -> &str {
        &self.invoice_id
    }

    pub fn record(&self) -> Option<&InvoiceRecord> {
        self.record.as_ref()
    }

    pub fn pdf(&self) -> Option<&InvoicePdfDescriptor> {
        self.pdf.as_ref()
    }

    pub fn download_url(&self) -> Option<&str> {
        self.pdf.as_ref()?.download_url.as_deref()
    }

    /// No record yet means still loading, whatever the fetches reported.
    pub fn load_state(&self) -> LoadState {
        if self.record.is_some() {
            LoadState::Ready
        } else {
            LoadState::Loading
        }
    }

    pub fn action(&self) -> Option<DetailAction> {
        let record = self.record.as_ref()?;
        Some(match record.status {
            Some(0) => DetailAction::Send,
            Some(1) => DetailAction::DownloadPdf,
            _ => DetailAction::Reload,
        })
    }

    pub fn is_updating(&self) -> bool {
        self.updating
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        self.notices.take()
    }

    /// Request the status transition, give the backend [`SettleDelay`] to
    /// finish, then refetch. A failed request skips the wait.
    pub fn send(&mut self, cancel: &CancelToken) -> SendOutcome {
        if self.updating {
            return SendOutcome::Busy;
        }
        self.updating = true;

        let id = self
            .record
            .as_ref()
            .and_then(|r| r.id.clone())
            .unwrap_or_else(|| self.invoice_id.clone());

        let outcome = match self.api.update_status(&id) {
            Ok(_) => {
                info!(invoice_id = %id, delay = ?self.settle.duration, "status update requested, waiting");
                if self.settle.wait(cancel) {
                    self.refresh();
                    self.notices.push(NoticeLevel::Success, SENT_MESSAGE);
                    SendOutcome::Sent
                } else {
                    self.notices.push(NoticeLevel::Info, SEND_CANCELLED_MESSAGE);
                    SendOutcome::Cancelled
                }
            }
            Err(e) => {
                warn!(invoice_id = %id, error = %e, "status update failed");
                self.notices.push(NoticeLevel::Error, SEND_FAILED_MESSAGE);
                SendOutcome::Failed
            }
        };

        self.updating = false;
        outcome
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;
    use crate::testing::{FakeApi, record};
    use reqwest::StatusCode;

    fn fixed_day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 14).unwrap()
    }

    fn mount(api: &FakeApi) -> InvoiceDetailController<'_, FakeApi> {
        let mut view = InvoiceDetailController::unloaded(api, "abc123", SettleDelay::new(Duration::ZERO));
        view.refresh_for(fixed_day());
        view
    }

    #[test]
    fn date_rolls_over_at_utc_plus_seven() {
        let evening = DateTime::parse_from_rfc3339("2024-12-31T17:30:00Z").unwrap().to_utc();
        assert_eq!(invoice_date_at(evening), NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        let morning = DateTime::parse_from_rfc3339("2024-12-31T16:59:59Z").unwrap().to_utc();
        assert_eq!(invoice_date_at(morning), NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());
    }

    #[test]
    fn mount_fetches_record_and_pdf() {
        let api = FakeApi::default();
        let view = mount(&api);

        assert_eq!(view.load_state(), LoadState::Ready);
        assert_eq!(view.download_url(), Some("https://files.example.vn/abc123.pdf"));
        let mut calls = api.calls();
        calls.sort();
        assert_eq!(calls, vec!["get abc123", "pdf abc123 2025-03-14"]);
    }

    #[test]
    fn pdf_failure_does_not_block_record() {
        let api = FakeApi::default();
        *api.pdf.lock().unwrap() = Err("Failed to get invoice pdf".into());
        let view = mount(&api);

        assert_eq!(view.load_state(), LoadState::Ready);
        assert_eq!(view.download_url(), None);
        assert_eq!(view.action(), Some(DetailAction::Send));
    }

    #[test]
    fn missing_record_stays_loading() {
        let api = FakeApi::default();
        api.invoices.lock().unwrap()[0] = Err("Failed to get invoice".into());
        let view = mount(&api);

        assert_eq!(view.load_state(), LoadState::Loading);
        assert_eq!(view.action(), None);
        assert!(view.download_url().is_some());
    }

    #[test]
    fn action_follows_status() {
        for (status, action) in [
            (Some(0), DetailAction::Send),
            (Some(1), DetailAction::DownloadPdf),
            (Some(2), DetailAction::Reload),
            (Some(9), DetailAction::Reload),
            (None, DetailAction::Reload),
        ] {
            let api = FakeApi::default();
            let mut rec = record("abc123", 0);
            rec.status = status;
            api.invoices.lock().unwrap()[0] = Ok((StatusCode::OK, rec));
            assert_eq!(mount(&api).action(), Some(action), "status {status:?}");
        }
    }

    #[test]
    fn send_updates_waits_and_refetches() {
        let api = FakeApi::default();
        api.invoices
            .lock()
            .unwrap()
            .push_back(Ok((StatusCode::OK, record("abc123", 1))));
        let mut view = mount(&api);
        assert_eq!(view.action(), Some(DetailAction::Send));

        let outcome = view.send(&CancelToken::new());

        assert_eq!(outcome, SendOutcome::Sent);
        assert_eq!(api.count("update abc123"), 1);
        assert_eq!(api.count("get abc123"), 2);
        assert_eq!(view.action(), Some(DetailAction::DownloadPdf));
        assert!(!view.is_updating());
        assert_eq!(view.take_notices()[0].message, SENT_MESSAGE);
    }

    #[test]
    fn send_uses_the_records_own_id() {
        let api = FakeApi::default();
        api.invoices.lock().unwrap()[0] = Ok((StatusCode::OK, record("server-id", 0)));
        let mut view = mount(&api);

        view.send(&CancelToken::new());

        assert_eq!(api.count("update server-id"), 1);
    }

    #[test]
    fn failed_send_skips_wait_and_refetch() {
        let api = FakeApi::default();
        *api.update.lock().unwrap() = Err("Failed to update status".into());
        let mut view = InvoiceDetailController::unloaded(&api, "abc123", SettleDelay::new(Duration::from_secs(30)));
        view.refresh_for(fixed_day());

        let started = Instant::now();
        let outcome = view.send(&CancelToken::new());

        assert_eq!(outcome, SendOutcome::Failed);
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(api.count("get abc123"), 1);
        assert!(!view.is_updating());
        let notices = view.take_notices();
        assert_eq!(notices[0].level, NoticeLevel::Error);
    }

    #[test]
    fn cancelled_wait_skips_refetch() {
        let api = FakeApi::default();
        let mut view = InvoiceDetailController::unloaded(&api, "abc123", SettleDelay::new(Duration::from_secs(30)));
        view.refresh_for(fixed_day());

        let cancel = CancelToken::new();
        let trigger = cancel.clone();
        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            trigger.cancel();
        });

        let started = Instant::now();
        let outcome = view.send(&cancel);
        canceller.join().unwrap();

        assert_eq!(outcome, SendOutcome::Cancelled);
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(api.count("update abc123"), 1);
        assert_eq!(api.count("get abc123"), 1);
        assert!(cancel.is_cancelled());
        assert!(!view.is_updating());
    }

    #[test]
    fn refresh_asks_for_todays_pdf() {
        let api = FakeApi::default();
        let mut view = InvoiceDetailController::unloaded(&api, "abc123", SettleDelay::default());
        view.refresh();

        let expected = format!("pdf abc123 {}", invoice_date_today());
        assert_eq!(api.count(&expected), 1);
    }

    #[test]
    fn ctrl_c_guard_returns_and_releases_listener() {
        let started = Instant::now();
        let seen = cancel_on_ctrl_c(|cancel| {
            assert!(!cancel.is_cancelled());
            SettleDelay::new(Duration::from_millis(20)).wait(cancel)
        });
        assert!(seen);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn ctrl_c_guard_token_cancels_the_wait() {
        let api = FakeApi::default();
        let mut view = InvoiceDetailController::unloaded(&api, "abc123", SettleDelay::new(Duration::from_secs(30)));
        view.refresh_for(fixed_day());

        let outcome = cancel_on_ctrl_c(|cancel| {
            let trigger = cancel.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(50));
                trigger.cancel();
            });
            view.send(cancel)
        });

        assert_eq!(outcome, SendOutcome::Cancelled);
        assert_eq!(api.count("get abc123"), 1);
    }

    #[test]
    fn settle_delay_waits_its_duration() {
        let delay = SettleDelay::new(Duration::from_millis(40));
        let started = Instant::now();
        assert!(delay.wait(&CancelToken::new()));
        assert!(started.elapsed() >= Duration::from_millis(40));
        assert_eq!(SettleDelay::default().duration, Duration::from_secs(10));
    }
}
