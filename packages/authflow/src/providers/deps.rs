//! Dependency container handed to the orchestration layer.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use verify_sms::{CodeCheck, VerifyClient, VerifyError};

use crate::error::AuthError;
use crate::providers::{IdentityProvider, SmsService, UserDirectory};

/// Default MFA-confirmation probe delays: checks land at roughly
/// 1s, 3s, and 7s after the record touch.
pub(crate) const DEFAULT_MFA_CONFIRM_DELAYS: [Duration; 3] = [
    Duration::from_secs(1),
    Duration::from_secs(2),
    Duration::from_secs(4),
];

/// Advisory lifetime of an SMS code, displayed to the user.
pub(crate) const DEFAULT_SMS_CODE_TTL: chrono::Duration = chrono::Duration::minutes(10);

/// Collaborators and tuning for one flow instance.
#[derive(Clone)]
pub struct FlowDeps {
    pub identity: Arc<dyn IdentityProvider>,
    pub directory: Arc<dyn UserDirectory>,
    pub sms: Arc<dyn SmsService>,
    /// Sequential delays before each MFA-confirmation session probe.
    pub mfa_confirm_delays: Vec<Duration>,
    /// Advisory display lifetime for SMS codes.
    pub sms_code_ttl: chrono::Duration,
}

impl FlowDeps {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        directory: Arc<dyn UserDirectory>,
        sms: Arc<dyn SmsService>,
    ) -> Self {
        Self {
            identity,
            directory,
            sms,
            mfa_confirm_delays: DEFAULT_MFA_CONFIRM_DELAYS.to_vec(),
            sms_code_ttl: DEFAULT_SMS_CODE_TTL,
        }
    }

    /// Override the MFA-confirmation probe schedule (tests use
    /// millisecond delays).
    pub fn with_mfa_confirm_delays(mut self, delays: Vec<Duration>) -> Self {
        self.mfa_confirm_delays = delays;
        self
    }
}

// =============================================================================
// VerifyClient adapter (implements SmsService)
// =============================================================================

/// Wrapper around [`VerifyClient`] that implements the [`SmsService`]
/// trait and normalizes transport failures to flow error kinds.
pub struct VerifySmsAdapter(pub Arc<VerifyClient>);

impl VerifySmsAdapter {
    pub fn new(client: Arc<VerifyClient>) -> Self {
        Self(client)
    }
}

fn map_verify_error(e: VerifyError) -> AuthError {
    match e {
        VerifyError::Transport(e) => AuthError::Connectivity(e.to_string()),
        VerifyError::Rejected { status, .. } => AuthError::Provider {
            code: format!("VerifyRejected{}", status.as_u16()),
        },
        VerifyError::MalformedResponse(detail) => AuthError::Provider {
            code: format!("VerifyMalformedResponse: {detail}"),
        },
    }
}

#[async_trait]
impl SmsService for VerifySmsAdapter {
    async fn send_code(&self, phone_number: &str) -> Result<(), AuthError> {
        self.0
            .send_code(phone_number)
            .await
            .map(|_| ())
            .map_err(map_verify_error)
    }

    async fn verify_code(&self, phone_number: &str, code: &str) -> Result<bool, AuthError> {
        match self.0.check_code(phone_number, code).await {
            Ok(CodeCheck::Approved) => Ok(true),
            Ok(CodeCheck::Mismatch) => Ok(false),
            Ok(CodeCheck::Expired) => Err(AuthError::CodeExpired),
            Err(e) => Err(map_verify_error(e)),
        }
    }
}
