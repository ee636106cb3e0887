//! The step graph: one active node at a time.

use serde::{Deserialize, Serialize};

/// A node in the authentication flow graph. Exactly one step is active
/// at any time; the active step determines which intents are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Step {
    /// Collect the email and look it up in the directory.
    EmailEntry,
    /// Existing user enters their password.
    PasswordEntry,
    /// New user establishes a password.
    PasswordSetup,
    /// Waiting on the emailed verification code.
    EmailVerify,
    /// Password accepted, session being established.
    SignIn,
    /// Collect first/last name for a record without one.
    NameSetup,
    /// Collect the phone number and trigger the SMS code.
    PhoneSetup,
    /// Waiting on the SMS verification code.
    PhoneVerify,
    /// Display the TOTP enrollment secret/QR.
    MfaSetup,
    /// Waiting on the authenticator code.
    MfaVerify,
    /// Request a password reset code.
    PasswordReset,
    /// Waiting on the reset code.
    PasswordResetVerify,
    /// Establish the replacement password.
    PasswordResetConfirm,
    Complete,
}

impl Step {
    /// Destructive steps hold one-time-code state; re-entering them
    /// mid-flight could desynchronize a pending code, so back
    /// navigation is rejected while they are active.
    pub fn is_destructive(self) -> bool {
        matches!(
            self,
            Step::EmailVerify
                | Step::PhoneVerify
                | Step::MfaVerify
                | Step::PasswordResetVerify
                | Step::Complete
        )
    }

    /// Steps where a resend-code intent makes sense.
    pub fn has_resend(self) -> bool {
        matches!(
            self,
            Step::EmailVerify | Step::PhoneVerify | Step::PasswordResetVerify
        )
    }

    /// Whether the phone-validation cache is allowed to be populated
    /// while this step is active.
    pub fn carries_phone_validation(self) -> bool {
        matches!(self, Step::PhoneSetup | Step::PhoneVerify)
    }
}
