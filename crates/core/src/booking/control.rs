/// A push button that shows a busy label and refuses presses while work is in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlState {
    default_label: String,
    label: String,
    enabled: bool,
    busy: bool,
}

impl ControlState {
    /// An enabled control showing `label`.
    pub fn new(label: impl Into<String>) -> Self {
        let label = label.into();
        Self {
            default_label: label.clone(),
            label,
            enabled: true,
            busy: false,
        }
    }

    /// Disable the control and show `busy_label`. Returns `false` if it was already busy.
    pub fn begin(&mut self, busy_label: &str) -> bool {
        if self.busy {
            return false;
        }
        self.busy = true;
        self.enabled = false;
        self.label = busy_label.to_string();
        true
    }

    /// Re-enable the control with its default label.
    pub fn finish(&mut self) {
        self.busy = false;
        self.enabled = true;
        self.label = self.default_label.clone();
    }

    /// Current label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Whether presses are accepted.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Whether work started from this control is still running.
    pub fn is_busy(&self) -> bool {
        self.busy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn begin_is_not_reentrant() {
        let mut control = ControlState::new("Book Now");
        assert!(control.begin("Processing..."));
        assert!(!control.is_enabled());
        assert_eq!(control.label(), "Processing...");
        assert!(!control.begin("Processing..."));

        control.finish();
        assert!(control.is_enabled());
        assert!(!control.is_busy());
        assert_eq!(control.label(), "Book Now");
    }
}
