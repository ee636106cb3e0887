//! The authoritative finite-state record for one flow instance.
//!
//! `StepState` is mutated exclusively by the transition reducer; all
//! other components read it through the selector layer or the runtime's
//! watch channel.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AuthError;
use crate::model::UserRecord;
use crate::step::Step;

/// Pending SMS validation bookkeeping. Advisory only: the
/// authoritative expiry check happens at verification time against the
/// SMS service, not against this timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhoneValidation {
    /// The phone number the code was sent to.
    pub id: String,
    pub expires_at: DateTime<Utc>,
}

/// One-time TOTP enrollment payload. Write-once per flow instance:
/// regenerating would invalidate an already-scanned QR code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MfaSetupDetails {
    pub secret_key: String,
    pub qr_payload: String,
    pub setup_uri: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepState {
    pub current_step: Step,
    pub current_user: Option<UserRecord>,
    pub current_email: String,
    pub is_loading: bool,
    pub error: Option<AuthError>,
    pub user_exists: bool,
    pub phone_validation: Option<PhoneValidation>,
    pub mfa_setup_details: Option<MfaSetupDetails>,
    pub session_active: bool,
    /// Verified reset code held between PasswordResetVerify and
    /// PasswordResetConfirm.
    pub reset_code: Option<String>,
    /// Non-destructive steps visited, for back navigation.
    pub history: Vec<Step>,
}

impl StepState {
    pub fn initial() -> Self {
        Self {
            current_step: Step::EmailEntry,
            current_user: None,
            current_email: String::new(),
            is_loading: false,
            error: None,
            user_exists: false,
            phone_validation: None,
            mfa_setup_details: None,
            session_active: false,
            reset_code: None,
            history: Vec::new(),
        }
    }

    /// Advance to `step`, recording the departed step in history and
    /// dropping state that must not outlive its step scope.
    pub(crate) fn advance(&mut self, step: Step) {
        if step == self.current_step {
            return;
        }
        if !self.current_step.is_destructive() {
            self.history.push(self.current_step);
        }
        self.current_step = step;
        self.is_loading = false;
        self.error = None;
        if !step.carries_phone_validation() {
            self.phone_validation = None;
        }
        if !matches!(step, Step::PasswordResetVerify | Step::PasswordResetConfirm) {
            self.reset_code = None;
        }
    }

    /// Return to the most recent non-destructive step, if any.
    pub(crate) fn step_back(&mut self) -> bool {
        match self.history.pop() {
            Some(step) => {
                self.current_step = step;
                self.is_loading = false;
                self.error = None;
                if !step.carries_phone_validation() {
                    self.phone_validation = None;
                }
                true
            }
            None => false,
        }
    }

    /// Populate the MFA enrollment payload. No-op once populated.
    pub(crate) fn cache_mfa_details(&mut self, details: MfaSetupDetails) {
        if self.mfa_setup_details.is_none() {
            self.mfa_setup_details = Some(details);
        }
    }
}

impl Default for StepState {
    fn default() -> Self {
        Self::initial()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let state = StepState::initial();
        assert_eq!(state.current_step, Step::EmailEntry);
        assert!(state.current_user.is_none());
        assert!(!state.is_loading);
        assert!(state.error.is_none());
        assert!(state.phone_validation.is_none());
        assert!(state.mfa_setup_details.is_none());
        assert!(!state.session_active);
    }

    #[test]
    fn test_advance_records_history_and_clears_transients() {
        let mut state = StepState::initial();
        state.is_loading = true;
        state.error = Some(AuthError::CodeMismatch);
        state.advance(Step::PasswordSetup);

        assert_eq!(state.current_step, Step::PasswordSetup);
        assert_eq!(state.history, vec![Step::EmailEntry]);
        assert!(!state.is_loading);
        assert!(state.error.is_none());
    }

    #[test]
    fn test_advance_does_not_record_destructive_steps() {
        let mut state = StepState::initial();
        state.advance(Step::EmailVerify);
        state.advance(Step::PhoneSetup);
        // EmailVerify must not appear in history.
        assert_eq!(state.history, vec![Step::EmailEntry]);
    }

    #[test]
    fn test_advance_to_same_step_is_noop() {
        let mut state = StepState::initial();
        state.advance(Step::EmailEntry);
        assert!(state.history.is_empty());
    }

    #[test]
    fn test_phone_validation_dropped_outside_its_scope() {
        let mut state = StepState::initial();
        state.advance(Step::PhoneSetup);
        state.phone_validation = Some(PhoneValidation {
            id: "+15551234567".into(),
            expires_at: Utc::now(),
        });

        state.advance(Step::PhoneVerify);
        assert!(state.phone_validation.is_some(), "kept within scope");

        state.advance(Step::MfaSetup);
        assert!(state.phone_validation.is_none(), "dropped on leaving scope");
    }

    #[test]
    fn test_step_back_pops_history() {
        let mut state = StepState::initial();
        state.advance(Step::PasswordSetup);
        state.advance(Step::PhoneSetup);

        assert!(state.step_back());
        assert_eq!(state.current_step, Step::PasswordSetup);
        assert!(state.step_back());
        assert_eq!(state.current_step, Step::EmailEntry);
        assert!(!state.step_back(), "empty history");
    }

    #[test]
    fn test_mfa_details_write_once() {
        let mut state = StepState::initial();
        let first = MfaSetupDetails {
            secret_key: "SECRET1".into(),
            qr_payload: "QR1".into(),
            setup_uri: "otpauth://1".into(),
        };
        let second = MfaSetupDetails {
            secret_key: "SECRET2".into(),
            qr_payload: "QR2".into(),
            setup_uri: "otpauth://2".into(),
        };

        state.cache_mfa_details(first.clone());
        state.cache_mfa_details(second);
        assert_eq!(state.mfa_setup_details, Some(first));
    }
}
