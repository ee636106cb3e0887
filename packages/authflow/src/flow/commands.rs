//! Flow commands: requests for exactly one external call each.
//!
//! Commands are decided by the machine and executed by the effects
//! layer. One intent maps to at most one command, and one command maps
//! to one collaborator round-trip (except the MFA confirmation
//! sequence, which is a single bounded sub-protocol).

use crate::model::UserRecord;
use crate::providers::CodeChannel;

#[derive(Debug, Clone, PartialEq)]
pub enum FlowCommand {
    /// Directory lookup-by-email.
    CheckEmail { email: String },
    /// Identity-provider sign-in.
    SignIn { email: String, password: String },
    /// Identity-provider sign-up plus directory record creation.
    CreateUser { email: String, password: String },
    /// Verify a one-time code and stamp the matching `*_verified`
    /// flag on the cached record before reconciliation runs.
    VerifyCode {
        channel: CodeChannel,
        code: String,
        user: Option<UserRecord>,
        /// Target number for the SMS channel.
        phone_number: Option<String>,
    },
    /// SMS service send-code.
    SendPhoneCode { phone_number: String },
    /// Re-invoke the pending code send for a provider channel.
    ResendCode { channel: CodeChannel },
    /// Issue the TOTP enrollment payload (only when none is cached).
    FetchMfaSetup,
    /// Run the bounded MFA-setup confirmation sequence.
    ConfirmMfaSetup { user: UserRecord },
    /// Run the reconciliation decision chain.
    Reconcile { user: UserRecord },
    /// Plain directory update (name capture).
    UpdateRecord { user: UserRecord },
    StartPasswordReset { email: String },
    ConfirmPasswordReset {
        email: String,
        code: String,
        new_password: String,
    },
    ResumeSession,
    SignOut,
}
