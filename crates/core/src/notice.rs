//! User-visible notifications.

use std::time::{Duration, Instant};

/// Default lifetime of an inline error message.
pub const DEFAULT_NOTICE_DURATION: Duration = Duration::from_millis(3000);

/// Tone of a notice, used by front-ends to pick colours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    /// Operation completed.
    Success,
    /// Operation attempted and failed; the user may retry.
    Failure,
    /// Input rejected before anything started.
    Error,
}

/// A message for the user, optionally expiring after a fixed duration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Tone.
    pub kind: NoticeKind,
    /// Text shown to the user.
    pub message: String,
    expires_at: Option<Instant>,
}

impl Notice {
    /// A notice that stays until replaced or dismissed.
    pub fn new(kind: NoticeKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            expires_at: None,
        }
    }

    /// Success notice.
    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NoticeKind::Success, message)
    }

    /// Failure notice.
    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(NoticeKind::Failure, message)
    }

    /// Inline error that hides itself after `duration`.
    pub fn transient_error(message: impl Into<String>, duration: Duration) -> Self {
        Self {
            kind: NoticeKind::Error,
            message: message.into(),
            expires_at: Some(Instant::now() + duration),
        }
    }

    /// Whether the notice should no longer be shown at `now`.
    pub fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.map(|deadline| now >= deadline).unwrap_or(false)
    }
}

/// Drop `slot`'s notice if it has expired. Returns `true` when something was cleared.
pub fn clear_expired(slot: &mut Option<Notice>, now: Instant) -> bool {
    if slot.as_ref().map(|notice| notice.is_expired(now)).unwrap_or(false) {
        *slot = None;
        return true;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_errors_expire() {
        let mut slot = Some(Notice::transient_error(
            "Please fill in all required fields",
            Duration::from_millis(3000),
        ));
        let now = Instant::now();
        assert!(!clear_expired(&mut slot, now));
        assert!(clear_expired(&mut slot, now + Duration::from_millis(3001)));
        assert!(slot.is_none());
    }

    #[test]
    fn sticky_notices_never_expire() {
        let notice = Notice::success("done");
        assert!(!notice.is_expired(Instant::now() + Duration::from_secs(3600)));
    }
}
