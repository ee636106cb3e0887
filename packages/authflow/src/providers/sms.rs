//! SMS verification capability trait.

use async_trait::async_trait;

use crate::error::AuthError;

/// Capability surface of the SMS verification service. Codes are
/// short-lived and owned by the service; local expiry bookkeeping is
/// advisory.
#[async_trait]
pub trait SmsService: Send + Sync {
    async fn send_code(&self, phone_number: &str) -> Result<(), AuthError>;

    /// `Ok(false)` means the code did not match. An expired or
    /// already-consumed code surfaces as [`AuthError::CodeExpired`].
    async fn verify_code(&self, phone_number: &str, code: &str) -> Result<bool, AuthError>;
}
