//! Six-digit verification code entry.
//!
//! [`CodeEntry`] is the state behind the one-time-code form: six single-digit
//! boxes, which box has focus, the inline error, and the submit/resend flags.
//! It never talks to the network. [`VerificationPrompt`] pairs an entry with an
//! injected [`VerificationBackend`] that performs the two network operations.
//!
//! # Example
//!
//! ```
//! use vanguard_core::CodeEntry;
//!
//! let mut entry = CodeEntry::new();
//! assert!(entry.paste("482913"));
//! assert_eq!(entry.focus(), 5);
//! assert!(entry.can_submit());
//!
//! // Partial pastes are rejected outright
//! let mut entry = CodeEntry::new();
//! assert!(!entry.paste("4829"));
//! assert_eq!(entry.value(), "");
//! ```

use std::future::Future;

use thiserror::Error;

use crate::types::{CODE_LENGTH, OperationResult, VerificationCode, VerificationCodeError};

/// Seconds the resend action stays disabled after a successful resend.
pub const DEFAULT_RESEND_COOLDOWN_SECS: u32 = 60;

/// Message shown when the email the code was sent to is unknown.
const MISSING_EMAIL_MESSAGE: &str = "Email address is missing. Please sign up again.";

/// Reasons a submission is refused locally, before any network call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodeEntryError {
    /// Not every box holds a digit.
    #[error("{}", VerificationCodeError::WrongLength)]
    Incomplete,
    /// A verification request is already in flight.
    #[error("Verification already in progress")]
    SubmitPending,
}

/// State of the six-box verification code form.
#[derive(Debug, Clone)]
pub struct CodeEntry {
    digits: [Option<u8>; CODE_LENGTH],
    focus: usize,
    error: Option<String>,
    verifying: bool,
    resending: bool,
    resend_cooldown: u32,
    cooldown_remaining: u32,
}

impl Default for CodeEntry {
    fn default() -> Self {
        Self::new()
    }
}

impl CodeEntry {
    /// Empty form with focus on the first box.
    #[must_use]
    pub const fn new() -> Self {
        Self::with_resend_cooldown(DEFAULT_RESEND_COOLDOWN_SECS)
    }

    /// Empty form with a custom resend cooldown (in seconds).
    #[must_use]
    pub const fn with_resend_cooldown(seconds: u32) -> Self {
        Self {
            digits: [None; CODE_LENGTH],
            focus: 0,
            error: None,
            verifying: false,
            resending: false,
            resend_cooldown: seconds,
            cooldown_remaining: 0,
        }
    }

    // =========================================================================
    // Editing
    // =========================================================================

    /// Handle a change event on box `index`.
    ///
    /// Values containing anything but ASCII digits are ignored. An empty value
    /// clears the box. Otherwise the last digit typed wins and focus moves to
    /// the next box.
    ///
    /// Returns `true` if the form changed.
    pub fn input(&mut self, index: usize, value: &str) -> bool {
        if !value.bytes().all(|b| b.is_ascii_digit()) {
            return false;
        }
        let Some(slot) = self.digits.get_mut(index) else {
            return false;
        };

        match value.bytes().last() {
            None => *slot = None,
            Some(b) => {
                *slot = Some(b - b'0');
                if index + 1 < CODE_LENGTH {
                    self.focus = index + 1;
                } else {
                    self.focus = index;
                }
            }
        }
        self.error = None;
        true
    }

    /// Handle a backspace key press on box `index`.
    ///
    /// A filled box is cleared in place; an empty box moves focus back one.
    pub fn backspace(&mut self, index: usize) {
        let Some(slot) = self.digits.get_mut(index) else {
            return;
        };
        if slot.is_some() {
            *slot = None;
            self.focus = index;
        } else if index > 0 {
            self.focus = index - 1;
        }
    }

    /// Handle a clipboard paste.
    ///
    /// Only a value that is exactly six digits (surrounding whitespace aside)
    /// is accepted; it fills every box and focuses the last one.
    ///
    /// Returns `true` if the paste was applied.
    pub fn paste(&mut self, text: &str) -> bool {
        let trimmed = text.trim();
        if trimmed.len() != CODE_LENGTH || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return false;
        }
        for (slot, b) in self.digits.iter_mut().zip(trimmed.bytes()) {
            *slot = Some(b - b'0');
        }
        self.focus = CODE_LENGTH - 1;
        self.error = None;
        true
    }

    /// Empty every box and focus the first.
    pub fn clear(&mut self) {
        self.digits = [None; CODE_LENGTH];
        self.focus = 0;
    }

    // =========================================================================
    // Submission
    // =========================================================================

    /// Whether every box holds a digit.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.digits.iter().all(Option::is_some)
    }

    /// Whether the verify button is enabled.
    #[must_use]
    pub fn can_submit(&self) -> bool {
        self.is_complete() && !self.verifying
    }

    /// The entered code, if complete.
    #[must_use]
    pub fn code(&self) -> Option<VerificationCode> {
        let mut digits = [0u8; CODE_LENGTH];
        for (out, slot) in digits.iter_mut().zip(self.digits.iter()) {
            *out = (*slot)?;
        }
        VerificationCode::from_digits(digits)
    }

    /// Start a verification attempt.
    ///
    /// # Errors
    ///
    /// Returns [`CodeEntryError::Incomplete`] (and shows it as the inline
    /// error) if any box is empty, or [`CodeEntryError::SubmitPending`] if an
    /// attempt is already running.
    pub fn begin_submit(&mut self) -> Result<VerificationCode, CodeEntryError> {
        if self.verifying {
            return Err(CodeEntryError::SubmitPending);
        }
        let Some(code) = self.code() else {
            self.error = Some(CodeEntryError::Incomplete.to_string());
            return Err(CodeEntryError::Incomplete);
        };
        self.verifying = true;
        self.error = None;
        Ok(code)
    }

    /// The server accepted the code.
    pub fn submit_succeeded(&mut self) {
        self.verifying = false;
        self.error = None;
    }

    /// The server rejected the code: show `message`, clear every box, refocus the first.
    pub fn submit_failed(&mut self, message: impl Into<String>) {
        self.verifying = false;
        self.error = Some(message.into());
        self.clear();
    }

    // =========================================================================
    // Resend
    // =========================================================================

    /// Whether the resend action is enabled.
    #[must_use]
    pub const fn can_resend(&self) -> bool {
        !self.resending && self.cooldown_remaining == 0
    }

    /// Start a resend request. Returns `false` while one is pending or cooling down.
    pub fn begin_resend(&mut self) -> bool {
        if !self.can_resend() {
            return false;
        }
        self.resending = true;
        self.error = None;
        true
    }

    /// Record the outcome of a resend request.
    ///
    /// Success clears the boxes and starts the cooldown; failure shows the error.
    pub fn resend_finished(&mut self, result: Result<(), String>) {
        self.resending = false;
        match result {
            Ok(()) => {
                self.clear();
                self.cooldown_remaining = self.resend_cooldown;
            }
            Err(message) => self.error = Some(message),
        }
    }

    /// Advance the resend cooldown by one second.
    pub const fn tick_cooldown(&mut self) {
        self.cooldown_remaining = self.cooldown_remaining.saturating_sub(1);
    }

    // =========================================================================
    // View
    // =========================================================================

    /// Digit shown in box `index`.
    #[must_use]
    pub fn digit(&self, index: usize) -> Option<char> {
        self.digits
            .get(index)
            .copied()
            .flatten()
            .map(|d| char::from(b'0' + d))
    }

    /// Filled digits in order, skipping empty boxes.
    #[must_use]
    pub fn value(&self) -> String {
        (0..CODE_LENGTH).filter_map(|i| self.digit(i)).collect()
    }

    /// Index of the focused box.
    #[must_use]
    pub const fn focus(&self) -> usize {
        self.focus
    }

    /// Inline error message.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Whether a verification request is in flight.
    #[must_use]
    pub const fn is_verifying(&self) -> bool {
        self.verifying
    }

    /// Whether a resend request is in flight (spinner state).
    #[must_use]
    pub const fn is_resending(&self) -> bool {
        self.resending
    }

    /// Seconds until resend is enabled again.
    #[must_use]
    pub const fn cooldown_remaining(&self) -> u32 {
        self.cooldown_remaining
    }
}

/// Network operations the verification form depends on.
///
/// Implemented by the onboarding API client and by test doubles.
pub trait VerificationBackend {
    /// Check `code` for `email`.
    fn verify_email_with_code(
        &self,
        email: &str,
        code: &VerificationCode,
    ) -> impl Future<Output = OperationResult> + Send;

    /// Issue and email a fresh code for `email`.
    fn resend_verification_code(&self, email: &str) -> impl Future<Output = OperationResult> + Send;
}

/// A verification form bound to an email address and a backend.
pub struct VerificationPrompt<B> {
    backend: B,
    email: String,
    entry: CodeEntry,
}

impl<B: VerificationBackend> VerificationPrompt<B> {
    /// Create a prompt for the address the code was sent to.
    pub fn new(backend: B, email: impl Into<String>) -> Self {
        Self::with_entry(backend, email, CodeEntry::new())
    }

    /// Create a prompt around an existing entry (e.g. with a custom cooldown).
    pub fn with_entry(backend: B, email: impl Into<String>, entry: CodeEntry) -> Self {
        Self {
            backend,
            email: email.into(),
            entry,
        }
    }

    /// The form state.
    #[must_use]
    pub const fn entry(&self) -> &CodeEntry {
        &self.entry
    }

    /// Mutable form state, for input/backspace/paste events.
    pub const fn entry_mut(&mut self) -> &mut CodeEntry {
        &mut self.entry
    }

    /// The address being verified.
    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Submit the entered code.
    ///
    /// Local validation failures never reach the backend. On success
    /// `on_success` runs once; on failure the returned message is shown and
    /// the boxes are cleared.
    ///
    /// Returns `true` if the code was accepted.
    pub async fn submit<F: FnOnce()>(&mut self, on_success: F) -> bool {
        if self.email.trim().is_empty() {
            self.entry.error = Some(MISSING_EMAIL_MESSAGE.to_string());
            return false;
        }
        let Ok(code) = self.entry.begin_submit() else {
            return false;
        };

        match self
            .backend
            .verify_email_with_code(&self.email, &code)
            .await
            .into_result()
        {
            Ok(()) => {
                self.entry.submit_succeeded();
                on_success();
                true
            }
            Err(message) => {
                self.entry.submit_failed(message);
                false
            }
        }
    }

    /// Ask the backend to send a new code.
    ///
    /// Returns `true` if a new code was sent. Nothing is shown on success
    /// besides the cleared boxes and the cooldown.
    pub async fn resend(&mut self) -> bool {
        if self.email.trim().is_empty() {
            self.entry.error = Some(MISSING_EMAIL_MESSAGE.to_string());
            return false;
        }
        if !self.entry.begin_resend() {
            return false;
        }

        let result = self
            .backend
            .resend_verification_code(&self.email)
            .await
            .into_result();
        let sent = result.is_ok();
        self.entry.resend_finished(result);
        sent
    }
}
