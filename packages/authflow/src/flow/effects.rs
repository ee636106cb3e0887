//! Command execution against the injected collaborators.
//!
//! Each command performs its one external round-trip and returns the
//! fact describing what happened. Errors never propagate past the
//! runtime boundary: the runtime wraps them into `Failed` events.
//! `Ok(None)` means the flow was torn down mid-command and no fact may
//! be applied.

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::AuthError;
use crate::flow::commands::FlowCommand;
use crate::flow::events::FlowEvent;
use crate::flow::reconcile;
use crate::model::UserRecord;
use crate::providers::{CodeChannel, FlowDeps};
use crate::state::PhoneValidation;

pub struct FlowEffects {
    deps: FlowDeps,
}

impl FlowEffects {
    pub fn new(deps: FlowDeps) -> Self {
        Self { deps }
    }

    pub async fn execute(
        &self,
        cmd: FlowCommand,
        cancel: &CancellationToken,
    ) -> Result<Option<FlowEvent>, AuthError> {
        match cmd {
            FlowCommand::CheckEmail { email } => self.check_email(&email).await.map(Some),
            FlowCommand::SignIn { email, password } => {
                self.sign_in(&email, &password).await.map(Some)
            }
            FlowCommand::CreateUser { email, password } => {
                self.create_user(&email, &password).await.map(Some)
            }
            FlowCommand::VerifyCode {
                channel,
                code,
                user,
                phone_number,
            } => self
                .verify_code(channel, &code, user, phone_number.as_deref())
                .await
                .map(Some),
            FlowCommand::SendPhoneCode { phone_number } => {
                self.send_phone_code(&phone_number).await.map(Some)
            }
            FlowCommand::ResendCode { channel } => {
                debug!(?channel, "re-sending code");
                self.deps.identity.resend_code(channel).await?;
                Ok(Some(FlowEvent::CodeSent {
                    channel,
                    validation: None,
                }))
            }
            FlowCommand::FetchMfaSetup => {
                let details = self.deps.identity.setup_mfa().await?;
                info!("MFA enrollment payload issued");
                Ok(Some(FlowEvent::MfaSetupIssued { details }))
            }
            FlowCommand::ConfirmMfaSetup { user } => {
                match reconcile::confirm_mfa_setup(&self.deps, user, cancel).await? {
                    Some(user) => Ok(Some(FlowEvent::MfaSetupConfirmed { user })),
                    None => Ok(None),
                }
            }
            FlowCommand::Reconcile { user } => {
                let (step, user) = reconcile::next_requirement(&self.deps, user).await?;
                info!(?step, "reconciliation resolved");
                Ok(Some(FlowEvent::Reconciled { step, user }))
            }
            FlowCommand::UpdateRecord { user } => {
                let user = self.deps.directory.update(user).await?;
                Ok(Some(FlowEvent::RecordUpdated { user }))
            }
            FlowCommand::StartPasswordReset { email } => {
                self.deps.identity.start_password_reset(&email).await?;
                info!("password reset started");
                Ok(Some(FlowEvent::PasswordResetStarted))
            }
            FlowCommand::ConfirmPasswordReset {
                email,
                code,
                new_password,
            } => {
                self.deps
                    .identity
                    .confirm_password_reset(&email, &code, &new_password)
                    .await?;
                info!("password reset completed");
                Ok(Some(FlowEvent::PasswordResetCompleted))
            }
            FlowCommand::ResumeSession => self.resume_session().await.map(Some),
            FlowCommand::SignOut => {
                self.deps.identity.sign_out().await?;
                Ok(Some(FlowEvent::SignedOut))
            }
        }
    }

    async fn check_email(&self, email: &str) -> Result<FlowEvent, AuthError> {
        debug!(email, "looking up directory record");
        let records = match self.deps.directory.find_by_email(email).await {
            Ok(records) => records,
            // "Not found" is a valid outcome for email lookup, treated
            // identically to an empty result.
            Err(AuthError::NotFound) => Vec::new(),
            Err(e) => return Err(e),
        };

        match records.len() {
            0 => Ok(FlowEvent::EmailChecked { user: None }),
            1 => Ok(FlowEvent::EmailChecked {
                user: records.into_iter().next(),
            }),
            n => {
                // Data integrity failure; retrying cannot fix it.
                warn!(email, count = n, "duplicate directory records");
                Err(AuthError::DuplicateAccount {
                    email: email.to_string(),
                })
            }
        }
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<FlowEvent, AuthError> {
        let outcome = self.deps.identity.sign_in(email, password).await?;
        if !outcome.authenticated && !outcome.mfa_required && !outcome.mfa_setup_required {
            return Err(AuthError::InvalidCredentials);
        }
        info!(
            mfa_required = outcome.mfa_required,
            mfa_setup_required = outcome.mfa_setup_required,
            "sign-in accepted"
        );
        Ok(FlowEvent::SignedIn { outcome })
    }

    async fn create_user(&self, email: &str, password: &str) -> Result<FlowEvent, AuthError> {
        let signup = self.deps.identity.sign_up(email, password).await?;
        let record = UserRecord::new(signup.subject_id, email.to_string());
        let user = self.deps.directory.create(record).await?;
        info!(user_id = %user.user_id, "user created");
        Ok(FlowEvent::UserCreated { user })
    }

    async fn verify_code(
        &self,
        channel: CodeChannel,
        code: &str,
        user: Option<UserRecord>,
        phone_number: Option<&str>,
    ) -> Result<FlowEvent, AuthError> {
        match channel {
            CodeChannel::Email => {
                // Reconciliation needs a record to run on; without one
                // the acceptance could never advance the flow.
                let mut user = user.ok_or(AuthError::NotFound)?;
                if !self.deps.identity.verify_code(CodeChannel::Email, code).await? {
                    return Err(AuthError::CodeMismatch);
                }
                // Stamp the flag before reconciliation runs so the
                // cached record reflects the verification.
                user.email_verified = true;
                let user = self.deps.directory.update(user).await?;
                Ok(FlowEvent::CodeAccepted {
                    channel: CodeChannel::Email,
                    user: Some(user),
                })
            }
            CodeChannel::Phone => {
                let mut user = user.ok_or(AuthError::NotFound)?;
                let phone_number = phone_number.ok_or(AuthError::NotFound)?;
                if !self.deps.sms.verify_code(phone_number, code).await? {
                    return Err(AuthError::CodeMismatch);
                }
                user.phone_number = phone_number.to_string();
                user.phone_verified = true;
                let user = self.deps.directory.update(user).await?;
                Ok(FlowEvent::CodeAccepted {
                    channel: CodeChannel::Phone,
                    user: Some(user),
                })
            }
            CodeChannel::Mfa => {
                if !self.deps.identity.verify_code(CodeChannel::Mfa, code).await? {
                    return Err(AuthError::CodeMismatch);
                }
                Ok(FlowEvent::CodeAccepted {
                    channel: CodeChannel::Mfa,
                    user: None,
                })
            }
            CodeChannel::PasswordReset => {
                if !self
                    .deps
                    .identity
                    .verify_code(CodeChannel::PasswordReset, code)
                    .await?
                {
                    return Err(AuthError::CodeMismatch);
                }
                Ok(FlowEvent::ResetCodeVerified {
                    code: code.to_string(),
                })
            }
        }
    }

    async fn send_phone_code(&self, phone_number: &str) -> Result<FlowEvent, AuthError> {
        self.deps.sms.send_code(phone_number).await?;
        info!("SMS code sent");
        Ok(FlowEvent::CodeSent {
            channel: CodeChannel::Phone,
            validation: Some(PhoneValidation {
                id: phone_number.to_string(),
                expires_at: Utc::now() + self.deps.sms_code_ttl,
            }),
        })
    }

    async fn resume_session(&self) -> Result<FlowEvent, AuthError> {
        let claims = match self.deps.identity.check_session().await? {
            Some(claims) => claims,
            None => return Ok(FlowEvent::SessionMissing),
        };

        let user = match self.deps.directory.find_by_email(&claims.email).await {
            Ok(mut records) => match records.len() {
                1 => records.remove(0),
                // A missing record must not lock the user out of an
                // otherwise valid session.
                0 => {
                    info!("no directory record for session, using provisional record");
                    UserRecord::provisional(&claims)
                }
                _ => {
                    return Err(AuthError::DuplicateAccount {
                        email: claims.email.clone(),
                    })
                }
            },
            // Same for a directory outage.
            Err(e) => {
                warn!(error = %e, "directory unreachable during resume, using provisional record");
                UserRecord::provisional(&claims)
            }
        };

        Ok(FlowEvent::SessionResumed { user, claims })
    }
}
