//! Flow events: user intents and effect-produced facts.
//!
//! One enum flows through the queue, but events have roles: **Input**
//! events originate at the UI edge, **Fact** events are produced by
//! effects and describe what actually happened. The reducer gates
//! Input events on the active step and the loading flag; Facts are
//! always applied.

use crate::error::AuthError;
use crate::model::{SessionClaims, UserRecord};
use crate::providers::{CodeChannel, SignInOutcome};
use crate::state::{MfaSetupDetails, PhoneValidation};
use crate::step::Step;

/// The role of an event in the flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventRole {
    /// Edge-originated (user requests).
    Input,
    /// Effect-produced ground truth.
    Fact,
}

#[derive(Debug, Clone)]
pub enum FlowEvent {
    // ── Intents ──────────────────────────────────────────────────
    /// Email typed on EmailEntry, or the reset form on PasswordReset.
    EmailSubmitted { email: String },
    /// Password on PasswordEntry/PasswordSetup/PasswordResetConfirm.
    PasswordSubmitted { password: String },
    /// One-time code on any `*Verify` step.
    CodeSubmitted { code: String },
    /// Phone number on PhoneSetup.
    PhoneSubmitted { phone_number: String },
    /// First/last name on NameSetup.
    NameSubmitted { first_name: String, last_name: String },
    /// User confirmed they finished enrolling their authenticator.
    MfaSetupAcknowledged,
    ResendRequested,
    BackRequested,
    StartOverRequested,
    ForgotPasswordRequested,
    /// Try to resume an existing provider session.
    ResumeRequested,
    SignOutRequested,

    // ── Facts ────────────────────────────────────────────────────
    /// Directory lookup finished. `None` means no record exists,
    /// which is a valid outcome, not an error.
    EmailChecked { user: Option<UserRecord> },
    /// Sign-up succeeded and the directory record was created.
    UserCreated { user: UserRecord },
    SignedIn { outcome: SignInOutcome },
    /// A code was accepted; for email/phone channels `user` carries
    /// the record updated with the stamped `*_verified` flag.
    CodeAccepted {
        channel: CodeChannel,
        user: Option<UserRecord>,
    },
    /// A code was (re)sent on a channel. `validation` is present for
    /// freshly issued SMS codes.
    CodeSent {
        channel: CodeChannel,
        validation: Option<PhoneValidation>,
    },
    /// TOTP enrollment payload issued by the provider.
    MfaSetupIssued { details: MfaSetupDetails },
    /// The MFA confirmation sequence ran to completion; `user` is the
    /// record as healed by the final status check.
    MfaSetupConfirmed { user: UserRecord },
    RecordUpdated { user: UserRecord },
    /// Reconciliation picked the next outstanding requirement.
    Reconciled { step: Step, user: UserRecord },
    SessionResumed {
        user: UserRecord,
        claims: SessionClaims,
    },
    /// Resume found no authenticated session.
    SessionMissing,
    PasswordResetStarted,
    /// The reset code checked out; held for the confirm call.
    ResetCodeVerified { code: String },
    PasswordResetCompleted,
    SignedOut,
    /// A collaborator call failed; the flow stays on its step.
    Failed { error: AuthError },
}

impl FlowEvent {
    pub fn role(&self) -> EventRole {
        match self {
            FlowEvent::EmailSubmitted { .. }
            | FlowEvent::PasswordSubmitted { .. }
            | FlowEvent::CodeSubmitted { .. }
            | FlowEvent::PhoneSubmitted { .. }
            | FlowEvent::NameSubmitted { .. }
            | FlowEvent::MfaSetupAcknowledged
            | FlowEvent::ResendRequested
            | FlowEvent::BackRequested
            | FlowEvent::StartOverRequested
            | FlowEvent::ForgotPasswordRequested
            | FlowEvent::ResumeRequested
            | FlowEvent::SignOutRequested => EventRole::Input,
            _ => EventRole::Fact,
        }
    }
}
