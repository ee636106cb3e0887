//! Identity-provider capability trait.

use async_trait::async_trait;

use crate::error::AuthError;
use crate::model::SessionClaims;
use crate::state::MfaSetupDetails;

/// Which channel a verification code belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodeChannel {
    Email,
    Phone,
    /// TOTP authenticator challenge.
    Mfa,
    /// Password reset code.
    PasswordReset,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignUpOutcome {
    pub subject_id: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SignInOutcome {
    pub authenticated: bool,
    /// An MFA challenge must be answered before the session is usable.
    pub mfa_required: bool,
    /// The account has MFA mandated but not yet enrolled.
    pub mfa_setup_required: bool,
    /// Enrollment payload, present only when setup is required and the
    /// provider issued one with the sign-in response.
    pub mfa_setup: Option<MfaSetupDetails>,
}

/// The provider's authoritative view of MFA configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MfaStatus {
    pub enabled: bool,
    pub setup_complete: bool,
}

impl MfaStatus {
    pub fn is_configured(self) -> bool {
        self.enabled && self.setup_complete
    }
}

/// Capability surface of the managed identity provider. The protocol
/// behind it is out of scope; the flow only composes these calls.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, AuthError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<SignInOutcome, AuthError>;

    /// Verify a one-time code for the given channel. `Ok(false)` means
    /// the code did not match; transport and provider failures are `Err`.
    async fn verify_code(&self, channel: CodeChannel, code: &str) -> Result<bool, AuthError>;

    /// Re-send the pending code for a channel without resetting flow state.
    async fn resend_code(&self, channel: CodeChannel) -> Result<(), AuthError>;

    /// Current authenticated session, if one exists.
    async fn check_session(&self) -> Result<Option<SessionClaims>, AuthError>;

    /// Force a session token refresh. Used as a consistency probe
    /// during MFA-setup confirmation; callers may ignore the outcome.
    async fn session_refresh(&self) -> Result<(), AuthError>;

    /// Authoritative email-verified status, bypassing any cached record.
    async fn email_verified(&self, email: &str) -> Result<bool, AuthError>;

    /// Authoritative MFA configuration, bypassing any cached record.
    async fn mfa_status(&self, email: &str) -> Result<MfaStatus, AuthError>;

    /// Issue a TOTP enrollment payload. Callers must cache the result:
    /// a second issuance invalidates an already-scanned QR code.
    async fn setup_mfa(&self) -> Result<MfaSetupDetails, AuthError>;

    async fn start_password_reset(&self, email: &str) -> Result<(), AuthError>;

    async fn confirm_password_reset(
        &self,
        email: &str,
        code: &str,
        new_password: &str,
    ) -> Result<(), AuthError>;

    async fn sign_out(&self) -> Result<(), AuthError>;
}
