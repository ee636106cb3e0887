//! The transition reducer: pure, total, no IO.
//!
//! `reduce` maps `(state, event)` to a new state. Unknown
//! (step, event) combinations return the state unchanged - never
//! panic, never error. Intents arriving while `is_loading` is true are
//! ignored; the single-consumer runtime makes this a structural
//! re-entrancy guard rather than a lock.

use crate::flow::events::{EventRole, FlowEvent};
use crate::providers::CodeChannel;
use crate::state::StepState;
use crate::step::Step;

pub fn reduce(state: &StepState, event: &FlowEvent) -> StepState {
    let mut next = state.clone();

    // Intents are gated; facts always apply.
    if event.role() == EventRole::Input && state.is_loading {
        return next;
    }

    match event {
        // ── Intents ──────────────────────────────────────────────
        FlowEvent::EmailSubmitted { email } => match state.current_step {
            Step::EmailEntry => {
                next.current_email = email.clone();
                next.is_loading = true;
                next.error = None;
            }
            Step::PasswordReset => {
                // The reset form may carry a different address than
                // the one typed at entry; the confirm call must target
                // the address the code was sent to.
                next.current_email = email.clone();
                next.is_loading = true;
                next.error = None;
            }
            _ => {}
        },

        FlowEvent::PasswordSubmitted { .. } => {
            if matches!(
                state.current_step,
                Step::PasswordEntry | Step::PasswordSetup | Step::PasswordResetConfirm
            ) {
                next.is_loading = true;
                next.error = None;
            }
        }

        FlowEvent::CodeSubmitted { .. } => {
            if matches!(
                state.current_step,
                Step::EmailVerify | Step::PhoneVerify | Step::MfaVerify | Step::PasswordResetVerify
            ) {
                next.is_loading = true;
                next.error = None;
            }
        }

        FlowEvent::PhoneSubmitted { .. } => {
            if state.current_step == Step::PhoneSetup {
                next.is_loading = true;
                next.error = None;
            }
        }

        FlowEvent::NameSubmitted { .. } => {
            if state.current_step == Step::NameSetup {
                next.is_loading = true;
                next.error = None;
            }
        }

        FlowEvent::MfaSetupAcknowledged => {
            if state.current_step == Step::MfaSetup {
                next.is_loading = true;
                next.error = None;
            }
        }

        FlowEvent::ResendRequested => {
            if state.current_step.has_resend() {
                next.is_loading = true;
                next.error = None;
            }
        }

        FlowEvent::BackRequested => {
            // Destructive steps hold one-time-code state; leaving them
            // mid-flight could desynchronize a pending code.
            if !state.current_step.is_destructive() {
                next.step_back();
            }
        }

        FlowEvent::StartOverRequested => {
            next = StepState::initial();
        }

        FlowEvent::ForgotPasswordRequested => {
            if state.current_step == Step::PasswordEntry {
                next.advance(Step::PasswordReset);
            }
        }

        FlowEvent::ResumeRequested => {
            if state.current_step == Step::EmailEntry {
                next.is_loading = true;
                next.error = None;
            }
        }

        // The machine issues the sign-out command; state resets on the
        // SignedOut fact.
        FlowEvent::SignOutRequested => {}

        // ── Facts ────────────────────────────────────────────────
        FlowEvent::EmailChecked { user } => {
            if state.current_step == Step::EmailEntry {
                next.user_exists = user.is_some();
                next.current_user = user.clone();
                let target = if user.is_some() {
                    Step::PasswordEntry
                } else {
                    Step::PasswordSetup
                };
                next.advance(target);
            }
        }

        FlowEvent::UserCreated { user } => {
            if state.current_step == Step::PasswordSetup {
                next.current_user = Some(user.clone());
                next.user_exists = true;
                next.advance(Step::EmailVerify);
            }
        }

        FlowEvent::SignedIn { outcome } => {
            if state.current_step == Step::PasswordEntry {
                next.session_active = true;
                if let Some(details) = &outcome.mfa_setup {
                    next.cache_mfa_details(details.clone());
                }
                let target = if outcome.mfa_required {
                    Step::MfaVerify
                } else if outcome.mfa_setup_required {
                    Step::MfaSetup
                } else {
                    Step::SignIn
                };
                next.advance(target);
            }
        }

        FlowEvent::CodeAccepted { channel, user } => {
            if let Some(user) = user {
                next.current_user = Some(user.clone());
            }
            match channel {
                // MFA challenge accepted: the session is already
                // established, no reconciliation pass needed.
                CodeChannel::Mfa => {
                    if state.current_step == Step::MfaVerify {
                        next.advance(Step::Complete);
                    }
                }
                // Email/phone acceptance hands over to reconciliation;
                // the step changes when the Reconciled fact lands.
                // Without a record no reconciliation can follow, so
                // holding the loading flag would hang the form.
                _ => {
                    next.is_loading = user.is_some();
                }
            }
        }

        FlowEvent::CodeSent {
            channel,
            validation,
        } => {
            match (state.current_step, channel) {
                (Step::PhoneSetup, CodeChannel::Phone) => {
                    next.advance(Step::PhoneVerify);
                    next.phone_validation = validation.clone();
                }
                // Resend on PhoneVerify refreshes the pending
                // validation without changing step.
                (Step::PhoneVerify, CodeChannel::Phone) => {
                    next.is_loading = false;
                    if validation.is_some() {
                        next.phone_validation = validation.clone();
                    }
                }
                _ => {
                    next.is_loading = false;
                }
            }
        }

        FlowEvent::MfaSetupIssued { details } => {
            // Write-once: a reissued payload never replaces one the
            // user may have already scanned.
            next.cache_mfa_details(details.clone());
            next.is_loading = false;
        }

        FlowEvent::MfaSetupConfirmed { user } => {
            // Reconciliation follows; keep the form disabled meanwhile.
            next.current_user = Some(user.clone());
            next.is_loading = true;
        }

        FlowEvent::RecordUpdated { user } => {
            next.current_user = Some(user.clone());
            next.is_loading = true;
        }

        FlowEvent::Reconciled { step, user } => {
            next.current_user = Some(user.clone());
            next.advance(*step);
        }

        FlowEvent::SessionResumed { user, .. } => {
            next.session_active = true;
            next.current_email = user.email.clone();
            next.user_exists = !user.is_provisional();
            next.current_user = Some(user.clone());
            next.is_loading = true;
        }

        FlowEvent::SessionMissing => {
            next.is_loading = false;
        }

        FlowEvent::PasswordResetStarted => {
            if state.current_step == Step::PasswordReset {
                next.advance(Step::PasswordResetVerify);
            }
        }

        FlowEvent::ResetCodeVerified { code } => {
            if state.current_step == Step::PasswordResetVerify {
                next.advance(Step::PasswordResetConfirm);
                next.reset_code = Some(code.clone());
            }
        }

        FlowEvent::PasswordResetCompleted => {
            if state.current_step == Step::PasswordResetConfirm {
                next.advance(Step::PasswordEntry);
            }
        }

        FlowEvent::SignedOut => {
            next = StepState::initial();
        }

        FlowEvent::Failed { error } => {
            next.is_loading = false;
            next.error = Some(error.clone());
        }
    }

    next
}
