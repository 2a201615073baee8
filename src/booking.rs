// Booking submission: the form on a room page, the request sent to the
// backend and the state machine guarding a single in-flight submission

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use parking_lot::Mutex;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::StorefrontConfig;
use crate::contact::{
    resolve_contact_email, DeviceEmailStore, EmailPrompt, InMemoryEmailStore, NoPrompt,
};
use crate::dates::{parse_entered_date, IncompleteReason, StayRange};
use crate::models::{AuthContext, Room};
use crate::pricing::PriceQuote;

// Fallback when the backend rejects a booking without saying why
pub const DEFAULT_BOOKING_ERROR: &str = "Failed to book room";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentMethod {
    #[default]
    #[serde(rename = "Pay At Hotel")]
    PayAtHotel,
    #[serde(rename = "Credit Card")]
    CreditCard,
    #[serde(rename = "UPI")]
    Upi,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 3] = [
        PaymentMethod::PayAtHotel,
        PaymentMethod::CreditCard,
        PaymentMethod::Upi,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            PaymentMethod::PayAtHotel => "Pay At Hotel",
            PaymentMethod::CreditCard => "Credit Card",
            PaymentMethod::Upi => "UPI",
        }
    }

    // Everything except paying at the hotel counts as paid up front
    pub fn is_paid(&self) -> bool {
        *self != PaymentMethod::PayAtHotel
    }
}

impl FromStr for PaymentMethod {
    type Err = BookingError;

    fn from_str(label: &str) -> Result<Self, Self::Err> {
        PaymentMethod::ALL
            .into_iter()
            .find(|method| method.label().eq_ignore_ascii_case(label.trim()))
            .ok_or_else(|| BookingError::Validation(format!("Unknown payment method: {label:?}")))
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// Body of `POST /api/bookings`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    pub user_id: String,
    pub room_id: String,
    pub hotel_id: String,
    pub check_in_date: String,
    pub check_out_date: String,
    pub total_price: i64,
    pub guests: u32,
    pub payment_method: PaymentMethod,
    pub is_paid: bool,
    pub user_email: String,
    pub user_name: String,
}

// The booking as created by the backend
#[derive(Debug, Clone, PartialEq)]
pub struct BookingConfirmation {
    pub booking_id: Option<String>,
    pub payload: serde_json::Value,
}

impl BookingConfirmation {
    /// Picks the booking reference out of the created-booking JSON. The
    /// backend answers either with the booking itself or wrapped in
    /// `{"booking": {...}}`.
    pub fn from_payload(payload: serde_json::Value) -> Self {
        let booking = payload.get("booking").unwrap_or(&payload);
        let booking_id = ["_id", "id", "bookingId"]
            .iter()
            .find_map(|key| booking.get(*key).and_then(|v| v.as_str()))
            .map(str::to_string);

        Self {
            booking_id,
            payload,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BookingApiError {
    #[error("{message}")]
    Rejected { status: u16, message: String },

    #[error("Booking service unreachable: {0}")]
    Transport(String),
}

#[async_trait]
pub trait BookingApi: Send + Sync + 'static {
    // Sends exactly one booking request; implementations must not retry
    async fn create_booking(
        &self,
        request: &BookingRequest,
        token: &str,
    ) -> Result<BookingConfirmation, BookingApiError>;
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BookingError {
    #[error("{0}")]
    Validation(String),

    #[error("Email is required to complete booking")]
    MissingContactEmail,

    #[error("{0}")]
    Rejected(String),

    #[error("{0}")]
    Unreachable(String),

    #[error("A booking is already being submitted")]
    SubmissionInFlight,

    #[error("This booking has already been completed")]
    AlreadyCompleted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingPhase {
    Idle,
    Validating,
    Submitting,
    Succeeded,
    Failed,
}

// Values entered on the room page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingForm {
    pub check_in: Option<String>,
    pub check_out: Option<String>,
    pub guests: u32,
    pub payment_method: PaymentMethod,
}

impl Default for BookingForm {
    fn default() -> Self {
        Self {
            check_in: None,
            check_out: None,
            guests: 1,
            payment_method: PaymentMethod::default(),
        }
    }
}

impl BookingForm {
    /// Pre-fills the form from the page's query parameters. An unreadable
    /// guest count falls back to one; anything else is clamped into
    /// `1..=max_guests`.
    pub fn from_page_params(
        check_in: Option<&str>,
        check_out: Option<&str>,
        guests: Option<&str>,
        max_guests: u32,
    ) -> Self {
        let guests = guests
            .and_then(|raw| raw.trim().parse::<u32>().ok())
            .unwrap_or(1)
            .clamp(1, max_guests.max(1));

        Self {
            check_in: check_in.map(str::to_string),
            check_out: check_out.map(str::to_string),
            guests,
            payment_method: PaymentMethod::default(),
        }
    }

    pub fn stay(&self) -> Result<StayRange, crate::dates::DateError> {
        StayRange::resolve_raw(self.check_in.as_deref(), self.check_out.as_deref())
    }
}

struct WorkflowState {
    phase: BookingPhase,
    form: BookingForm,
    last_error: Option<String>,
    confirmation: Option<BookingConfirmation>,
    trace: Vec<BookingPhase>,
}

/// Booking flow for one room page.
///
/// Only one submission can be in flight: while the workflow is validating or
/// submitting, further submits and form edits are refused. A failed
/// submission goes back to [`BookingPhase::Idle`] with the form untouched; a
/// successful one stays in [`BookingPhase::Succeeded`] until [`reset`].
///
/// [`reset`]: BookingWorkflow::reset
pub struct BookingWorkflow {
    api: Arc<dyn BookingApi>,
    emails: Arc<dyn DeviceEmailStore>,
    prompt: Arc<dyn EmailPrompt>,
    room: Room,
    tax_rate: Decimal,
    max_guests: u32,
    today: Option<NaiveDate>,
    state: Mutex<WorkflowState>,
}

impl BookingWorkflow {
    pub fn new(room: Room, api: Arc<dyn BookingApi>, config: &StorefrontConfig) -> Self {
        Self {
            api,
            emails: Arc::new(InMemoryEmailStore::new()),
            prompt: Arc::new(NoPrompt),
            room,
            tax_rate: config.tax_rate,
            max_guests: config.max_guests,
            today: None,
            state: Mutex::new(WorkflowState {
                phase: BookingPhase::Idle,
                form: BookingForm::default(),
                last_error: None,
                confirmation: None,
                trace: Vec::new(),
            }),
        }
    }

    pub fn with_email_store(mut self, store: Arc<dyn DeviceEmailStore>) -> Self {
        self.emails = store;
        self
    }

    pub fn with_prompt(mut self, prompt: Arc<dyn EmailPrompt>) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn with_form(self, form: BookingForm) -> Self {
        self.state.lock().form = form;
        self
    }

    // Pins "today" for the check-in-not-in-the-past rule
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn phase(&self) -> BookingPhase {
        self.state.lock().phase
    }

    pub fn form(&self) -> BookingForm {
        self.state.lock().form.clone()
    }

    pub fn last_error(&self) -> Option<String> {
        self.state.lock().last_error.clone()
    }

    pub fn confirmation(&self) -> Option<BookingConfirmation> {
        self.state.lock().confirmation.clone()
    }

    // Every phase entered since the last reset, in order
    pub fn attempt_trace(&self) -> Vec<BookingPhase> {
        self.state.lock().trace.clone()
    }

    pub fn set_check_in(&self, value: Option<&str>) -> Result<(), BookingError> {
        self.edit_form(|form| form.check_in = value.map(str::to_string))
    }

    pub fn set_check_out(&self, value: Option<&str>) -> Result<(), BookingError> {
        self.edit_form(|form| form.check_out = value.map(str::to_string))
    }

    pub fn set_guests(&self, guests: u32) -> Result<(), BookingError> {
        self.edit_form(|form| form.guests = guests)
    }

    pub fn set_payment_method(&self, method: PaymentMethod) -> Result<(), BookingError> {
        self.edit_form(|form| form.payment_method = method)
    }

    fn edit_form(&self, edit: impl FnOnce(&mut BookingForm)) -> Result<(), BookingError> {
        let mut state = self.state.lock();
        match state.phase {
            BookingPhase::Validating | BookingPhase::Submitting => {
                Err(BookingError::SubmissionInFlight)
            }
            BookingPhase::Succeeded => Err(BookingError::AlreadyCompleted),
            BookingPhase::Idle | BookingPhase::Failed => {
                edit(&mut state.form);
                Ok(())
            }
        }
    }

    // Live quote for the current form; unreadable dates quote zero nights
    pub fn quote(&self) -> PriceQuote {
        let nights = self
            .state
            .lock()
            .form
            .stay()
            .map(|stay| stay.nights())
            .unwrap_or(0);
        PriceQuote::for_display(&self.room.price_per_night, nights, self.tax_rate)
    }

    /// Back to a fresh [`BookingPhase::Idle`] after a completed booking.
    /// The entered form is kept.
    pub fn reset(&self) -> Result<(), BookingError> {
        let mut state = self.state.lock();
        if matches!(
            state.phase,
            BookingPhase::Validating | BookingPhase::Submitting
        ) {
            return Err(BookingError::SubmissionInFlight);
        }

        state.phase = BookingPhase::Idle;
        state.last_error = None;
        state.confirmation = None;
        state.trace.clear();
        Ok(())
    }

    /// Submits the current form for `auth`.
    ///
    /// Guard violations (no identity, incomplete dates, past check-in, guest
    /// count out of bounds) leave the workflow in `Idle` and never reach the
    /// network. A rejected or failed call is reported verbatim and the
    /// workflow returns to `Idle` with the form preserved.
    pub async fn submit(
        &self,
        auth: Option<&AuthContext>,
    ) -> Result<BookingConfirmation, BookingError> {
        let (auth, form, nights) = {
            let mut state = self.state.lock();
            match state.phase {
                BookingPhase::Validating | BookingPhase::Submitting => {
                    debug!(room_id = %self.room.id, "rejecting re-entrant booking submit");
                    return Err(BookingError::SubmissionInFlight);
                }
                BookingPhase::Succeeded => return Err(BookingError::AlreadyCompleted),
                BookingPhase::Idle | BookingPhase::Failed => {}
            }

            match self.check_entry(&state.form, auth) {
                Ok((auth, nights)) => {
                    state.last_error = None;
                    Self::enter(&mut state, BookingPhase::Validating);
                    (auth, state.form.clone(), nights)
                }
                Err(err) => {
                    warn!(room_id = %self.room.id, error = %err, "booking guard failed");
                    state.last_error = Some(err.to_string());
                    return Err(err);
                }
            }
        };

        let request = match self.build_request(auth, &form, nights) {
            Ok(request) => request,
            Err(err) => {
                let mut state = self.state.lock();
                state.last_error = Some(err.to_string());
                Self::enter(&mut state, BookingPhase::Idle);
                return Err(err);
            }
        };

        self.enter_phase(BookingPhase::Submitting);
        info!(
            room_id = %request.room_id,
            hotel_id = %request.hotel_id,
            total = request.total_price,
            guests = request.guests,
            payment_method = %request.payment_method,
            "submitting booking"
        );

        let result = self.api.create_booking(&request, &auth.token).await;

        let mut state = self.state.lock();
        match result {
            Ok(confirmation) => {
                info!(booking_id = ?confirmation.booking_id, "booking created");
                state.confirmation = Some(confirmation.clone());
                Self::enter(&mut state, BookingPhase::Succeeded);
                Ok(confirmation)
            }
            Err(err) => {
                warn!(room_id = %request.room_id, error = %err, "booking failed");
                let err = match err {
                    BookingApiError::Rejected { message, .. } => BookingError::Rejected(message),
                    BookingApiError::Transport(message) => BookingError::Unreachable(message),
                };
                state.last_error = Some(err.to_string());
                Self::enter(&mut state, BookingPhase::Failed);
                Self::enter(&mut state, BookingPhase::Idle);
                Err(err)
            }
        }
    }

    fn check_entry<'a>(
        &self,
        form: &BookingForm,
        auth: Option<&'a AuthContext>,
    ) -> Result<(&'a AuthContext, u32), BookingError> {
        let auth = auth
            .filter(|auth| {
                !auth.identity.user_id.trim().is_empty() && !auth.token.trim().is_empty()
            })
            .ok_or_else(|| BookingError::Validation("Please log in to book a room".to_string()))?;

        let stay = form
            .stay()
            .map_err(|err| BookingError::Validation(err.to_string()))?;
        let nights = match stay {
            StayRange::Complete { nights, .. } => nights,
            StayRange::Incomplete(
                IncompleteReason::MissingCheckIn | IncompleteReason::MissingCheckOut,
            ) => {
                return Err(BookingError::Validation(
                    "Please select check-in and check-out dates".to_string(),
                ));
            }
            StayRange::Incomplete(_) => {
                return Err(BookingError::Validation(
                    "Check-out date must be after check-in date".to_string(),
                ));
            }
        };

        // The day the guest picked, not its UTC instant
        let check_in = parse_entered_date(form.check_in.as_deref().unwrap_or_default())
            .map_err(|err| BookingError::Validation(err.to_string()))?;
        let today = self.today.unwrap_or_else(|| Utc::now().date_naive());
        if check_in < today {
            return Err(BookingError::Validation(
                "Check-in date cannot be in the past".to_string(),
            ));
        }

        if form.guests < 1 || form.guests > self.max_guests {
            return Err(BookingError::Validation(format!(
                "Guests must be between 1 and {}",
                self.max_guests
            )));
        }

        Ok((auth, nights))
    }

    fn build_request(
        &self,
        auth: &AuthContext,
        form: &BookingForm,
        nights: u32,
    ) -> Result<BookingRequest, BookingError> {
        let (user_email, source) =
            resolve_contact_email(&auth.identity, self.emails.as_ref(), self.prompt.as_ref())
                .ok_or(BookingError::MissingContactEmail)?;
        debug!(?source, "resolved contact email");

        let quote = PriceQuote::from_price_label(&self.room.price_per_night, nights, self.tax_rate)
            .map_err(|err| BookingError::Validation(err.to_string()))?;
        let total_price = quote.rounded_total().to_i64().ok_or_else(|| {
            BookingError::Validation(format!("Total price out of range: {}", quote.total))
        })?;

        Ok(BookingRequest {
            user_id: auth.identity.user_id.clone(),
            room_id: self.room.id.clone(),
            hotel_id: self.room.hotel_id().to_string(),
            check_in_date: trimmed(&form.check_in),
            check_out_date: trimmed(&form.check_out),
            total_price,
            guests: form.guests,
            payment_method: form.payment_method,
            is_paid: form.payment_method.is_paid(),
            user_email,
            user_name: auth.identity.display_name(),
        })
    }

    fn enter_phase(&self, phase: BookingPhase) {
        Self::enter(&mut self.state.lock(), phase);
    }

    fn enter(state: &mut WorkflowState, phase: BookingPhase) {
        debug!(from = ?state.phase, to = ?phase, "booking phase change");
        state.phase = phase;
        state.trace.push(phase);
    }
}

fn trimmed(value: &Option<String>) -> String {
    value.as_deref().map(str::trim).unwrap_or_default().to_string()
}
