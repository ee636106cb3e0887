//! Structured error kinds for the authentication flow.
//!
//! # The Error Boundary Rule
//!
//! No error ever crosses the runtime boundary as a propagated `Err`.
//! Every collaborator failure is caught by the orchestration layer and
//! turned into a state-carrying `Failed` event, so the user lands back
//! on the same step with the error visible and the form re-enabled.
//!
//! Raw provider error codes are never shown to users. [`AuthError::user_message`]
//! translates known codes and falls back to generic copy for anything
//! unmatched.

use thiserror::Error;

/// Failure kinds surfaced by the flow, one per recovery policy.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    /// Network-class failure (DNS, reset, timeout). Retryable by
    /// resubmitting the same intent.
    #[error("could not reach the service: {0}")]
    Connectivity(String),

    /// Wrong email/password pair. Needs new input, not a retry.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The submitted verification code did not match.
    #[error("verification code did not match")]
    CodeMismatch,

    /// The verification code aged out or was already consumed.
    /// Recoverable via resend.
    #[error("verification code expired")]
    CodeExpired,

    /// More than one directory record exists for one email. Fatal;
    /// requires manual resolution, never retried.
    #[error("duplicate account records for {email}")]
    DuplicateAccount { email: String },

    /// Authorization failure from a collaborator, surfaced verbatim
    /// in kind but never silently treated as success.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Lookup found nothing. For email lookup this is a valid
    /// "does not exist" outcome, not a user-facing failure.
    #[error("not found")]
    NotFound,

    /// Identity-provider error identified only by its code.
    #[error("provider error {code}")]
    Provider { code: String },
}

impl AuthError {
    /// Whether resubmitting the same intent can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AuthError::Connectivity(_) | AuthError::CodeMismatch | AuthError::CodeExpired
        )
    }

    /// Fatal errors block all further progress on the current step.
    pub fn is_fatal(&self) -> bool {
        matches!(self, AuthError::DuplicateAccount { .. })
    }

    /// Human-readable copy for the UI. Provider codes go through the
    /// translation table; unmatched codes get generic copy rather than
    /// leaking raw provider text.
    pub fn user_message(&self) -> String {
        match self {
            AuthError::Connectivity(_) => {
                "We couldn't reach the server. Check your connection and try again.".to_string()
            }
            AuthError::InvalidCredentials => {
                "That email and password combination is incorrect.".to_string()
            }
            AuthError::CodeMismatch => {
                "That code didn't match. Double-check it and try again.".to_string()
            }
            AuthError::CodeExpired => {
                "That code has expired. Request a new one and try again.".to_string()
            }
            AuthError::DuplicateAccount { .. } => {
                "There is a problem with this account. Please contact support to resolve it."
                    .to_string()
            }
            AuthError::Unauthorized(_) => {
                "You are not authorized to perform this action.".to_string()
            }
            AuthError::NotFound => "We couldn't find that account.".to_string(),
            AuthError::Provider { code } => translate_provider_code(code).to_string(),
        }
    }
}

/// Translation table for identity-provider error codes.
fn translate_provider_code(code: &str) -> &'static str {
    match code {
        "UserNotFoundException" => "We couldn't find an account for that email.",
        "UsernameExistsException" => "An account with that email already exists.",
        "NotAuthorizedException" => "That email and password combination is incorrect.",
        "CodeMismatchException" => "That code didn't match. Double-check it and try again.",
        "ExpiredCodeException" => "That code has expired. Request a new one and try again.",
        "InvalidPasswordException" => {
            "Password doesn't meet the requirements. Use at least 8 characters with a mix of letters, numbers, and symbols."
        }
        "LimitExceededException" | "TooManyRequestsException" => {
            "Too many attempts. Wait a few minutes before trying again."
        }
        "PasswordResetRequiredException" => "A password reset is required for this account.",
        "UserNotConfirmedException" => "This account hasn't finished email verification yet.",
        _ => "Something went wrong. Try again, or contact support if it keeps happening.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connectivity_is_retryable() {
        assert!(AuthError::Connectivity("timeout".into()).is_retryable());
        assert!(AuthError::CodeMismatch.is_retryable());
        assert!(AuthError::CodeExpired.is_retryable());
    }

    #[test]
    fn test_non_retryable_kinds() {
        assert!(!AuthError::InvalidCredentials.is_retryable());
        assert!(!AuthError::DuplicateAccount { email: "a@x.com".into() }.is_retryable());
        assert!(!AuthError::Unauthorized("denied".into()).is_retryable());
    }

    #[test]
    fn test_only_duplicate_account_is_fatal() {
        assert!(AuthError::DuplicateAccount { email: "a@x.com".into() }.is_fatal());
        assert!(!AuthError::Connectivity("reset".into()).is_fatal());
        assert!(!AuthError::InvalidCredentials.is_fatal());
    }

    #[test]
    fn test_known_provider_code_translates() {
        let err = AuthError::Provider {
            code: "CodeMismatchException".into(),
        };
        assert!(err.user_message().contains("didn't match"));
    }

    #[test]
    fn test_unknown_provider_code_gets_generic_copy() {
        let err = AuthError::Provider {
            code: "InternalErrorException".into(),
        };
        let msg = err.user_message();
        assert!(msg.contains("contact support"));
        assert!(!msg.contains("InternalErrorException"), "raw code must not leak");
    }

    #[test]
    fn test_duplicate_account_message_does_not_leak_email() {
        let err = AuthError::DuplicateAccount {
            email: "secret@x.com".into(),
        };
        assert!(!err.user_message().contains("secret@x.com"));
    }
}
