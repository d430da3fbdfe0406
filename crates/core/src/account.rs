//! Sign-in form and the forgot-password modal.

use std::{
    future::Future,
    pin::Pin,
    time::{Duration, Instant},
};

use tracing::{error, info, warn};

use crate::{
    booking::ControlState,
    error::{DeliveryFailure, ResetError, ValidationError},
    forms::{self, FieldKind, FormField},
    notice::{self, Notice, DEFAULT_NOTICE_DURATION},
};

const SEND_LABEL: &str = "Send Reset Link";
const SENDING_LABEL: &str = "Sending...";

/// Future returned by a [`ResetMailer`].
pub type DeliveryFuture = Pin<Box<dyn Future<Output = Result<(), DeliveryFailure>> + Send + 'static>>;

/// Sends password reset links.
pub trait ResetMailer: Send + Sync {
    /// Deliver a reset link to `email`.
    fn send_reset_link(&self, email: String) -> DeliveryFuture;
}

/// Mailer stand-in that answers after a fixed delay.
#[derive(Debug, Clone)]
pub struct SimulatedMailer {
    delay: Duration,
    fail_with: Option<String>,
}

impl SimulatedMailer {
    /// Mailer that always delivers after `delay`.
    pub fn delivering(delay: Duration) -> Self {
        Self {
            delay,
            fail_with: None,
        }
    }

    /// Mailer that always fails after `delay`.
    pub fn failing(delay: Duration, reason: impl Into<String>) -> Self {
        Self {
            delay,
            fail_with: Some(reason.into()),
        }
    }
}

impl ResetMailer for SimulatedMailer {
    fn send_reset_link(&self, email: String) -> DeliveryFuture {
        let delay = self.delay;
        let fail_with = self.fail_with.clone();
        Box::pin(async move {
            tokio::time::sleep(delay).await;
            match fail_with {
                Some(reason) => Err(DeliveryFailure::new(reason)),
                None => {
                    info!(%email, "Simulated reset link delivered");
                    Ok(())
                }
            }
        })
    }
}

/// Email and password inputs of the sign-in page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignInForm {
    /// Email input.
    pub email: String,
    /// Password input.
    pub password: String,
}

impl SignInForm {
    /// Validate the inputs, returning the trimmed email on success.
    pub fn submit(&self) -> Result<String, ValidationError> {
        forms::validate(&[
            FormField::required("email", FieldKind::Email, self.email.as_str()),
            FormField::required("password", FieldKind::Password, self.password.as_str()),
        ])?;
        let email = self.email.trim().to_string();
        info!(%email, "Sign-in form accepted");
        Ok(email)
    }
}

/// The forgot-password modal.
#[derive(Debug)]
pub struct PasswordResetFlow {
    open: bool,
    email: String,
    submit: ControlState,
    notice: Option<Notice>,
    notice_duration: Duration,
}

impl Default for PasswordResetFlow {
    fn default() -> Self {
        Self::new()
    }
}

impl PasswordResetFlow {
    /// A closed modal.
    pub fn new() -> Self {
        Self {
            open: false,
            email: String::new(),
            submit: ControlState::new(SEND_LABEL),
            notice: None,
            notice_duration: DEFAULT_NOTICE_DURATION,
        }
    }

    /// Override how long inline validation errors stay visible.
    pub fn with_notice_duration(mut self, duration: Duration) -> Self {
        self.notice_duration = duration;
        self
    }

    /// Whether the modal is shown (and page scrolling suppressed).
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Whether a reset email is in flight.
    pub fn is_sending(&self) -> bool {
        self.submit.is_busy()
    }

    /// Email input.
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Mutable email input; ignored edits while sending are the caller's concern.
    pub fn email_mut(&mut self) -> &mut String {
        &mut self.email
    }

    /// The send control.
    pub fn control(&self) -> &ControlState {
        &self.submit
    }

    /// Current message, if any.
    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    /// Hide an inline error once its display time has passed.
    pub fn expire_notice(&mut self, now: Instant) -> bool {
        notice::clear_expired(&mut self.notice, now)
    }

    /// Show the modal with `prefill` in the email input.
    pub fn open(&mut self, prefill: &str) {
        self.open = true;
        self.email = prefill.trim().to_string();
        self.notice = None;
        info!("Password reset opened");
    }

    /// Hide the modal and restore scrolling.
    pub fn close(&mut self) -> Result<(), ResetError> {
        if self.is_sending() {
            warn!("Close requested while reset link is sending");
            return Err(ResetError::AlreadySending);
        }
        self.open = false;
        Ok(())
    }

    /// Validate the email and start sending; returns the address to mail.
    pub fn submit(&mut self) -> Result<String, ResetError> {
        if !self.open {
            return Err(ResetError::NotOpen);
        }
        if self.is_sending() {
            return Err(ResetError::AlreadySending);
        }
        let fields = [FormField::required(
            "email",
            FieldKind::Email,
            self.email.as_str(),
        )];
        if let Err(err) = forms::validate(&fields) {
            warn!(%err, "Reset email rejected");
            self.notice = Some(Notice::transient_error(err.to_string(), self.notice_duration));
            return Err(err.into());
        }
        self.submit.begin(SENDING_LABEL);
        self.notice = None;
        let email = self.email.trim().to_string();
        info!(%email, "Sending reset link");
        Ok(email)
    }

    /// Apply the mailer's answer.
    ///
    /// Fails with [`ResetError::NotSending`] when no reset link is in flight.
    pub fn complete(&mut self, result: Result<(), DeliveryFailure>) -> Result<(), ResetError> {
        if !self.is_sending() {
            warn!("Reset delivery result arrived with nothing sending");
            return Err(ResetError::NotSending);
        }
        self.submit.finish();
        match result {
            Ok(()) => {
                self.notice = Some(Notice::success(
                    "Password reset link has been sent to your email",
                ));
                self.open = false;
                Ok(())
            }
            Err(failure) => {
                error!(reason = %failure.reason, "Reset link delivery failed");
                self.notice = Some(Notice::transient_error(
                    "Failed to send reset link. Please try again.",
                    self.notice_duration,
                ));
                Err(failure.into())
            }
        }
    }

    /// Submit, wait for `mailer` and apply its answer in one go.
    pub async fn submit_and_send<M>(&mut self, mailer: &M) -> Result<(), ResetError>
    where
        M: ResetMailer + ?Sized,
    {
        let email = self.submit()?;
        let result = mailer.send_reset_link(email).await;
        self.complete(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notice::NoticeKind;

    #[test]
    fn sign_in_validates_fields() {
        let form = SignInForm {
            email: "nour@example.com".to_string(),
            password: "abc".to_string(),
        };
        assert_eq!(form.submit(), Err(ValidationError::PasswordTooShort));

        let form = SignInForm {
            email: " nour@example.com ".to_string(),
            password: "abcdef".to_string(),
        };
        assert_eq!(form.submit(), Ok("nour@example.com".to_string()));
    }

    #[test]
    fn malformed_email_never_starts_sending() {
        let mut flow = PasswordResetFlow::new();
        flow.open("nour@");
        assert_eq!(
            flow.submit(),
            Err(ResetError::Validation(ValidationError::MalformedEmail))
        );
        assert!(!flow.is_sending());
        assert!(flow.control().is_enabled());
        assert_eq!(flow.notice().map(|n| n.kind), Some(NoticeKind::Error));
    }

    #[test]
    fn submit_requires_open_modal() {
        let mut flow = PasswordResetFlow::new();
        assert_eq!(flow.submit(), Err(ResetError::NotOpen));
    }

    #[tokio::test(start_paused = true)]
    async fn delivered_link_closes_modal() {
        let mut flow = PasswordResetFlow::new();
        flow.open("nour@example.com");
        let mailer = SimulatedMailer::delivering(Duration::from_millis(1500));
        flow.submit_and_send(&mailer).await.unwrap();
        assert!(!flow.is_open());
        assert_eq!(flow.control().label(), "Send Reset Link");
        assert_eq!(
            flow.notice().map(|n| n.message.as_str()),
            Some("Password reset link has been sent to your email")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn failed_delivery_keeps_modal_open() {
        let mut flow = PasswordResetFlow::new();
        flow.open("nour@example.com");
        let email = flow.submit().unwrap();
        assert!(flow.is_sending());
        assert_eq!(flow.control().label(), "Sending...");
        assert_eq!(flow.close(), Err(ResetError::AlreadySending));
        assert_eq!(flow.submit(), Err(ResetError::AlreadySending));

        let mailer = SimulatedMailer::failing(Duration::from_millis(1500), "smtp down");
        let result = mailer.send_reset_link(email).await;
        assert!(flow.complete(result).is_err());
        assert!(flow.is_open());
        assert!(flow.control().is_enabled());
        assert_eq!(
            flow.notice().map(|n| n.message.as_str()),
            Some("Failed to send reset link. Please try again.")
        );
        flow.close().unwrap();
        assert!(!flow.is_open());
    }

    #[test]
    fn completion_without_sending_changes_nothing() {
        let mut flow = PasswordResetFlow::new();
        flow.open("nour@example.com");
        assert_eq!(flow.complete(Ok(())), Err(ResetError::NotSending));
        assert!(flow.is_open());
        assert!(flow.notice().is_none());

        let mut closed = PasswordResetFlow::new();
        assert_eq!(closed.complete(Ok(())), Err(ResetError::NotSending));
        assert!(!closed.is_open());
        assert!(closed.notice().is_none());
    }
}
