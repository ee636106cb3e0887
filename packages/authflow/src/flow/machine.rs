//! The flow machine: applies the reducer and decides on commands.
//!
//! `decide` is pure like the reducer: given the pre-transition state
//! and an event it returns at most one command, with the same
//! step/loading gates the reducer applies. The machine owns the state
//! and is driven serially by the runtime - no locking, no interleaving.

use crate::flow::commands::FlowCommand;
use crate::flow::events::{EventRole, FlowEvent};
use crate::flow::reducer::reduce;
use crate::providers::CodeChannel;
use crate::state::StepState;
use crate::step::Step;

pub struct FlowMachine {
    state: StepState,
}

impl FlowMachine {
    pub fn new() -> Self {
        Self {
            state: StepState::initial(),
        }
    }

    /// Resume from a rehydrated state snapshot.
    pub fn with_state(state: StepState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &StepState {
        &self.state
    }

    /// Process one event: derive the follow-up command from the
    /// pre-transition state, then advance the state.
    pub fn handle(&mut self, event: &FlowEvent) -> Option<FlowCommand> {
        let command = decide(&self.state, event);
        self.state = reduce(&self.state, event);
        command
    }
}

impl Default for FlowMachine {
    fn default() -> Self {
        Self::new()
    }
}

/// Map an event to the single external call it requires, if any.
pub fn decide(state: &StepState, event: &FlowEvent) -> Option<FlowCommand> {
    if event.role() == EventRole::Input && state.is_loading {
        return None;
    }

    match event {
        // ── Intents ──────────────────────────────────────────────
        FlowEvent::EmailSubmitted { email } => match state.current_step {
            Step::EmailEntry => Some(FlowCommand::CheckEmail { email: email.clone() }),
            Step::PasswordReset => Some(FlowCommand::StartPasswordReset { email: email.clone() }),
            _ => None,
        },

        FlowEvent::PasswordSubmitted { password } => match state.current_step {
            Step::PasswordEntry => Some(FlowCommand::SignIn {
                email: state.current_email.clone(),
                password: password.clone(),
            }),
            Step::PasswordSetup => Some(FlowCommand::CreateUser {
                email: state.current_email.clone(),
                password: password.clone(),
            }),
            Step::PasswordResetConfirm => {
                state
                    .reset_code
                    .as_ref()
                    .map(|code| FlowCommand::ConfirmPasswordReset {
                        email: state.current_email.clone(),
                        code: code.clone(),
                        new_password: password.clone(),
                    })
            }
            _ => None,
        },

        FlowEvent::CodeSubmitted { code } => match state.current_step {
            Step::EmailVerify => Some(FlowCommand::VerifyCode {
                channel: CodeChannel::Email,
                code: code.clone(),
                user: state.current_user.clone(),
                phone_number: None,
            }),
            Step::PhoneVerify => {
                // The code was sent to the number in the pending
                // validation; the record's number is not stamped yet.
                let phone_number = state
                    .phone_validation
                    .as_ref()
                    .map(|v| v.id.clone())
                    .or_else(|| state.current_user.as_ref().map(|u| u.phone_number.clone()))?;
                Some(FlowCommand::VerifyCode {
                    channel: CodeChannel::Phone,
                    code: code.clone(),
                    user: state.current_user.clone(),
                    phone_number: Some(phone_number),
                })
            }
            Step::MfaVerify => Some(FlowCommand::VerifyCode {
                channel: CodeChannel::Mfa,
                code: code.clone(),
                user: None,
                phone_number: None,
            }),
            Step::PasswordResetVerify => Some(FlowCommand::VerifyCode {
                channel: CodeChannel::PasswordReset,
                code: code.clone(),
                user: None,
                phone_number: None,
            }),
            _ => None,
        },

        FlowEvent::PhoneSubmitted { phone_number } => {
            (state.current_step == Step::PhoneSetup).then(|| FlowCommand::SendPhoneCode {
                phone_number: phone_number.clone(),
            })
        }

        FlowEvent::NameSubmitted {
            first_name,
            last_name,
        } => {
            if state.current_step != Step::NameSetup {
                return None;
            }
            let mut user = state.current_user.clone()?;
            user.first_name = first_name.clone();
            user.last_name = last_name.clone();
            Some(FlowCommand::UpdateRecord { user })
        }

        FlowEvent::MfaSetupAcknowledged => {
            if state.current_step != Step::MfaSetup {
                return None;
            }
            state
                .current_user
                .clone()
                .map(|user| FlowCommand::ConfirmMfaSetup { user })
        }

        FlowEvent::ResendRequested => match state.current_step {
            Step::EmailVerify => Some(FlowCommand::ResendCode {
                channel: CodeChannel::Email,
            }),
            Step::PhoneVerify => {
                let phone_number = state.phone_validation.as_ref().map(|v| v.id.clone())?;
                Some(FlowCommand::SendPhoneCode { phone_number })
            }
            Step::PasswordResetVerify => Some(FlowCommand::ResendCode {
                channel: CodeChannel::PasswordReset,
            }),
            _ => None,
        },

        FlowEvent::ResumeRequested => {
            (state.current_step == Step::EmailEntry).then_some(FlowCommand::ResumeSession)
        }

        FlowEvent::SignOutRequested => Some(FlowCommand::SignOut),

        FlowEvent::BackRequested
        | FlowEvent::StartOverRequested
        | FlowEvent::ForgotPasswordRequested => None,

        // ── Facts ────────────────────────────────────────────────
        FlowEvent::SignedIn { outcome } => {
            if state.current_step != Step::PasswordEntry {
                return None;
            }
            if outcome.mfa_required {
                None
            } else if outcome.mfa_setup_required {
                // Fetch the enrollment payload only when neither the
                // cache nor the sign-in response carries one.
                (state.mfa_setup_details.is_none() && outcome.mfa_setup.is_none())
                    .then_some(FlowCommand::FetchMfaSetup)
            } else {
                // Adopted policy: a verified password is sufficient;
                // no second sign-in call. Straight to reconciliation.
                state
                    .current_user
                    .clone()
                    .map(|user| FlowCommand::Reconcile { user })
            }
        }

        FlowEvent::CodeAccepted { channel, user } => match channel {
            CodeChannel::Email | CodeChannel::Phone => user
                .clone()
                .map(|user| FlowCommand::Reconcile { user }),
            CodeChannel::Mfa | CodeChannel::PasswordReset => None,
        },

        // Reconcile with the healed record from the confirmation
        // sequence, not the cached one it superseded.
        FlowEvent::MfaSetupConfirmed { user } => {
            Some(FlowCommand::Reconcile { user: user.clone() })
        }

        FlowEvent::RecordUpdated { user } => (state.current_step == Step::NameSetup)
            .then(|| FlowCommand::Reconcile { user: user.clone() }),

        FlowEvent::Reconciled { step, .. } => {
            // Entering MfaSetup needs the enrollment payload exactly
            // once per flow instance.
            (*step == Step::MfaSetup && state.mfa_setup_details.is_none())
                .then_some(FlowCommand::FetchMfaSetup)
        }

        FlowEvent::SessionResumed { user, .. } => {
            Some(FlowCommand::Reconcile { user: user.clone() })
        }

        FlowEvent::EmailChecked { .. }
        | FlowEvent::UserCreated { .. }
        | FlowEvent::CodeSent { .. }
        | FlowEvent::MfaSetupIssued { .. }
        | FlowEvent::SessionMissing
        | FlowEvent::PasswordResetStarted
        | FlowEvent::ResetCodeVerified { .. }
        | FlowEvent::PasswordResetCompleted
        | FlowEvent::SignedOut
        | FlowEvent::Failed { .. } => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::UserRecord;
    use crate::providers::SignInOutcome;
    use crate::state::{MfaSetupDetails, PhoneValidation};

    fn machine_at(step: Step) -> FlowMachine {
        let mut machine = FlowMachine::new();
        machine.state.current_step = step;
        machine
    }

    fn user() -> UserRecord {
        UserRecord::new("sub-1".into(), "a@x.com".into())
    }

    #[test]
    fn test_email_submitted_issues_lookup() {
        let mut machine = FlowMachine::new();
        let cmd = machine.handle(&FlowEvent::EmailSubmitted { email: "a@x.com".into() });
        assert_eq!(cmd, Some(FlowCommand::CheckEmail { email: "a@x.com".into() }));
        assert!(machine.state().is_loading);
    }

    #[test]
    fn test_intent_while_loading_issues_nothing() {
        let mut machine = FlowMachine::new();
        machine.handle(&FlowEvent::EmailSubmitted { email: "a@x.com".into() });
        let cmd = machine.handle(&FlowEvent::EmailSubmitted { email: "b@x.com".into() });
        assert_eq!(cmd, None);
        assert_eq!(machine.state().current_email, "a@x.com");
    }

    #[test]
    fn test_password_on_entry_vs_setup() {
        let mut machine = machine_at(Step::PasswordEntry);
        machine.state.current_email = "a@x.com".into();
        let cmd = machine.handle(&FlowEvent::PasswordSubmitted { password: "pw".into() });
        assert!(matches!(cmd, Some(FlowCommand::SignIn { .. })));

        let mut machine = machine_at(Step::PasswordSetup);
        machine.state.current_email = "a@x.com".into();
        let cmd = machine.handle(&FlowEvent::PasswordSubmitted { password: "pw".into() });
        assert!(matches!(cmd, Some(FlowCommand::CreateUser { .. })));
    }

    #[test]
    fn test_code_on_phone_verify_uses_validation_number() {
        let mut machine = machine_at(Step::PhoneVerify);
        machine.state.phone_validation = Some(PhoneValidation {
            id: "+15551234567".into(),
            expires_at: chrono::Utc::now(),
        });
        let cmd = machine.handle(&FlowEvent::CodeSubmitted { code: "123456".into() });
        match cmd {
            Some(FlowCommand::VerifyCode { channel, phone_number, .. }) => {
                assert_eq!(channel, CodeChannel::Phone);
                assert_eq!(phone_number.as_deref(), Some("+15551234567"));
            }
            other => panic!("expected VerifyCode, got {other:?}"),
        }
    }

    #[test]
    fn test_signed_in_without_mfa_triggers_reconcile() {
        let mut machine = machine_at(Step::PasswordEntry);
        machine.state.current_user = Some(user());
        let cmd = machine.handle(&FlowEvent::SignedIn {
            outcome: SignInOutcome { authenticated: true, ..Default::default() },
        });
        assert!(matches!(cmd, Some(FlowCommand::Reconcile { .. })));
        assert_eq!(machine.state().current_step, Step::SignIn);
    }

    #[test]
    fn test_signed_in_needing_setup_with_payload_skips_fetch() {
        let mut machine = machine_at(Step::PasswordEntry);
        let cmd = machine.handle(&FlowEvent::SignedIn {
            outcome: SignInOutcome {
                authenticated: true,
                mfa_setup_required: true,
                mfa_setup: Some(MfaSetupDetails {
                    secret_key: "S".into(),
                    qr_payload: "Q".into(),
                    setup_uri: "otpauth://x".into(),
                }),
                ..Default::default()
            },
        });
        assert_eq!(cmd, None, "payload came with the response");
        assert!(machine.state().mfa_setup_details.is_some());
    }

    #[test]
    fn test_reconciled_into_mfa_setup_fetches_payload_once() {
        let mut machine = machine_at(Step::SignIn);
        let cmd = machine.handle(&FlowEvent::Reconciled {
            step: Step::MfaSetup,
            user: user(),
        });
        assert_eq!(cmd, Some(FlowCommand::FetchMfaSetup));

        // Re-entry with a cached payload fetches nothing.
        let mut machine = machine_at(Step::SignIn);
        machine.state.mfa_setup_details = Some(MfaSetupDetails {
            secret_key: "S".into(),
            qr_payload: "Q".into(),
            setup_uri: "otpauth://x".into(),
        });
        let cmd = machine.handle(&FlowEvent::Reconciled {
            step: Step::MfaSetup,
            user: user(),
        });
        assert_eq!(cmd, None);
    }

    #[test]
    fn test_code_accepted_email_reconciles_with_stamped_record() {
        let mut machine = machine_at(Step::EmailVerify);
        let mut stamped = user();
        stamped.email_verified = true;
        let cmd = machine.handle(&FlowEvent::CodeAccepted {
            channel: CodeChannel::Email,
            user: Some(stamped.clone()),
        });
        assert_eq!(cmd, Some(FlowCommand::Reconcile { user: stamped }));
    }

    #[test]
    fn test_mfa_confirmed_reconciles_with_healed_record() {
        let mut machine = machine_at(Step::MfaSetup);
        machine.state.current_user = Some(user()); // stale: flags false

        let mut healed = user();
        healed.mfa_enabled = true;
        healed.mfa_setup_complete = true;

        let cmd = machine.handle(&FlowEvent::MfaSetupConfirmed { user: healed.clone() });
        assert_eq!(cmd, Some(FlowCommand::Reconcile { user: healed.clone() }));
        assert_eq!(
            machine.state().current_user,
            Some(healed),
            "state adopts the healed record"
        );
    }

    #[test]
    fn test_resend_maps_to_step_channel() {
        let mut machine = machine_at(Step::EmailVerify);
        let cmd = machine.handle(&FlowEvent::ResendRequested);
        assert_eq!(cmd, Some(FlowCommand::ResendCode { channel: CodeChannel::Email }));

        let mut machine = machine_at(Step::PhoneVerify);
        machine.state.phone_validation = Some(PhoneValidation {
            id: "+15550001111".into(),
            expires_at: chrono::Utc::now(),
        });
        let cmd = machine.handle(&FlowEvent::ResendRequested);
        assert_eq!(
            cmd,
            Some(FlowCommand::SendPhoneCode { phone_number: "+15550001111".into() })
        );
    }

    #[test]
    fn test_unknown_combination_is_noop_everywhere() {
        let mut machine = machine_at(Step::Complete);
        let before = machine.state().clone();
        let cmd = machine.handle(&FlowEvent::PhoneSubmitted {
            phone_number: "+15551234567".into(),
        });
        assert_eq!(cmd, None);
        assert_eq!(machine.state(), &before);
    }
}
