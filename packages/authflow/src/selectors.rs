//! Derived UI-facing values.
//!
//! Thin, pure projections over [`StepState`]. The flow core owns the
//! state; a UI layer consumes only the step value and the copy derived
//! here.

use crate::state::StepState;
use crate::step::Step;

/// Number of milestones shown in the progress indicator. Steps that
/// belong to the same milestone (enter password vs. set password)
/// share an ordinal.
pub const PROGRESS_TOTAL: u8 = 7;

/// Everything a rendering layer needs for the active step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepView {
    pub title: &'static str,
    pub button_label: &'static str,
    /// 1-based milestone position, paired with [`PROGRESS_TOTAL`].
    pub ordinal: u8,
    pub can_go_back: bool,
    pub can_resend: bool,
    pub is_loading: bool,
}

pub fn view(state: &StepState) -> StepView {
    let step = state.current_step;
    StepView {
        title: title(step),
        button_label: button_label(step),
        ordinal: ordinal(step),
        can_go_back: !step.is_destructive() && !state.history.is_empty(),
        can_resend: step.has_resend(),
        is_loading: state.is_loading,
    }
}

pub fn title(step: Step) -> &'static str {
    match step {
        Step::EmailEntry => "Sign in or create an account",
        Step::PasswordEntry => "Enter your password",
        Step::PasswordSetup => "Create a password",
        Step::EmailVerify => "Check your email",
        Step::SignIn => "Signing you in",
        Step::NameSetup => "What should we call you?",
        Step::PhoneSetup => "Add a phone number",
        Step::PhoneVerify => "Check your phone",
        Step::MfaSetup => "Set up your authenticator",
        Step::MfaVerify => "Enter your authenticator code",
        Step::PasswordReset => "Reset your password",
        Step::PasswordResetVerify => "Check your email",
        Step::PasswordResetConfirm => "Choose a new password",
        Step::Complete => "You're all set",
    }
}

pub fn button_label(step: Step) -> &'static str {
    match step {
        Step::EmailEntry => "Continue",
        Step::PasswordEntry => "Sign in",
        Step::PasswordSetup => "Create account",
        Step::EmailVerify | Step::PhoneVerify | Step::MfaVerify | Step::PasswordResetVerify => {
            "Verify"
        }
        Step::SignIn => "Please wait",
        Step::NameSetup => "Save",
        Step::PhoneSetup => "Send code",
        Step::MfaSetup => "I've added it",
        Step::PasswordReset => "Send reset code",
        Step::PasswordResetConfirm => "Set password",
        Step::Complete => "Done",
    }
}

fn ordinal(step: Step) -> u8 {
    match step {
        Step::EmailEntry => 1,
        Step::PasswordEntry
        | Step::PasswordSetup
        | Step::PasswordReset
        | Step::PasswordResetVerify
        | Step::PasswordResetConfirm => 2,
        Step::EmailVerify => 3,
        Step::PhoneSetup | Step::PhoneVerify => 4,
        Step::SignIn | Step::MfaSetup | Step::MfaVerify => 5,
        Step::NameSetup => 6,
        Step::Complete => 7,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordinals_are_monotonic_along_the_happy_path() {
        let path = [
            Step::EmailEntry,
            Step::PasswordSetup,
            Step::EmailVerify,
            Step::PhoneSetup,
            Step::PhoneVerify,
            Step::MfaSetup,
            Step::NameSetup,
            Step::Complete,
        ];
        let ordinals: Vec<u8> = path.iter().map(|s| ordinal(*s)).collect();
        let mut sorted = ordinals.clone();
        sorted.sort_unstable();
        assert_eq!(ordinals, sorted);
        assert_eq!(*ordinals.last().unwrap(), PROGRESS_TOTAL);
    }

    #[test]
    fn test_back_hidden_on_destructive_steps() {
        let mut state = StepState::initial();
        state.history = vec![Step::EmailEntry];
        state.current_step = Step::EmailVerify;
        assert!(!view(&state).can_go_back);

        state.current_step = Step::PhoneSetup;
        assert!(view(&state).can_go_back);
    }

    #[test]
    fn test_resend_only_on_code_steps() {
        for step in [Step::EmailVerify, Step::PhoneVerify, Step::PasswordResetVerify] {
            let mut state = StepState::initial();
            state.current_step = step;
            assert!(view(&state).can_resend, "{step:?}");
        }
        let mut state = StepState::initial();
        state.current_step = Step::PasswordEntry;
        assert!(!view(&state).can_resend);
    }

    #[test]
    fn test_every_step_has_copy() {
        for step in [
            Step::EmailEntry,
            Step::PasswordEntry,
            Step::PasswordSetup,
            Step::EmailVerify,
            Step::SignIn,
            Step::NameSetup,
            Step::PhoneSetup,
            Step::PhoneVerify,
            Step::MfaSetup,
            Step::MfaVerify,
            Step::PasswordReset,
            Step::PasswordResetVerify,
            Step::PasswordResetConfirm,
            Step::Complete,
        ] {
            assert!(!title(step).is_empty());
            assert!(!button_label(step).is_empty());
            assert!((1..=PROGRESS_TOTAL).contains(&ordinal(step)));
        }
    }
}
