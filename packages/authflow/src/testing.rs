//! In-memory fakes for the provider traits.
//!
//! Each fake is `Clone` and shares its interior through `Arc<Mutex>`,
//! so a test can keep a handle for assertions after moving a clone
//! into [`crate::providers::FlowDeps`].

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::AuthError;
use crate::model::{SessionClaims, UserRecord};
use crate::providers::{
    CodeChannel, IdentityProvider, MfaStatus, SignInOutcome, SignUpOutcome, SmsService,
    UserDirectory,
};
use crate::state::MfaSetupDetails;

#[derive(Default)]
struct IdentityState {
    subject_id: String,
    email_verified: bool,
    mfa_status: MfaStatus,
    code_valid: bool,
    sign_in_outcome: Option<SignInOutcome>,
    session: Option<SessionClaims>,
    mfa_setup: Option<MfaSetupDetails>,
    session_refresh_calls: usize,
    mfa_status_calls: usize,
    resend_calls: Vec<CodeChannel>,
    reset_started: Vec<String>,
    reset_confirmed: Vec<(String, String)>,
    signed_out: bool,
}

#[derive(Clone)]
pub struct FakeIdentityProvider {
    state: Arc<Mutex<IdentityState>>,
}

impl FakeIdentityProvider {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(IdentityState {
                subject_id: "sub-fake".into(),
                code_valid: true,
                ..Default::default()
            })),
        }
    }

    pub fn with_subject_id(self, subject_id: &str) -> Self {
        self.state.lock().unwrap().subject_id = subject_id.into();
        self
    }

    pub fn with_email_verified(self, verified: bool) -> Self {
        self.state.lock().unwrap().email_verified = verified;
        self
    }

    pub fn with_mfa_status(self, status: MfaStatus) -> Self {
        self.state.lock().unwrap().mfa_status = status;
        self
    }

    /// Flip the provider-side MFA status mid-test, as real enrollment
    /// would.
    pub fn set_mfa_status(&self, status: MfaStatus) {
        self.state.lock().unwrap().mfa_status = status;
    }

    pub fn with_code_valid(self, valid: bool) -> Self {
        self.state.lock().unwrap().code_valid = valid;
        self
    }

    pub fn set_code_valid(&self, valid: bool) {
        self.state.lock().unwrap().code_valid = valid;
    }

    pub fn with_sign_in_outcome(self, outcome: SignInOutcome) -> Self {
        self.state.lock().unwrap().sign_in_outcome = Some(outcome);
        self
    }

    pub fn with_session(self, claims: SessionClaims) -> Self {
        self.state.lock().unwrap().session = Some(claims);
        self
    }

    pub fn with_mfa_setup(self, details: MfaSetupDetails) -> Self {
        self.state.lock().unwrap().mfa_setup = Some(details);
        self
    }

    pub fn session_refresh_calls(&self) -> usize {
        self.state.lock().unwrap().session_refresh_calls
    }

    pub fn mfa_status_calls(&self) -> usize {
        self.state.lock().unwrap().mfa_status_calls
    }

    pub fn resend_calls(&self) -> Vec<CodeChannel> {
        self.state.lock().unwrap().resend_calls.clone()
    }

    pub fn reset_started(&self) -> Vec<String> {
        self.state.lock().unwrap().reset_started.clone()
    }

    pub fn reset_confirmed(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().reset_confirmed.clone()
    }

    pub fn signed_out(&self) -> bool {
        self.state.lock().unwrap().signed_out
    }
}

impl Default for FakeIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentityProvider {
    async fn sign_up(&self, _email: &str, _password: &str) -> Result<SignUpOutcome, AuthError> {
        let state = self.state.lock().unwrap();
        Ok(SignUpOutcome {
            subject_id: state.subject_id.clone(),
        })
    }

    async fn sign_in(&self, _email: &str, _password: &str) -> Result<SignInOutcome, AuthError> {
        let state = self.state.lock().unwrap();
        Ok(state.sign_in_outcome.clone().unwrap_or(SignInOutcome {
            authenticated: true,
            ..Default::default()
        }))
    }

    async fn verify_code(&self, _channel: CodeChannel, _code: &str) -> Result<bool, AuthError> {
        Ok(self.state.lock().unwrap().code_valid)
    }

    async fn resend_code(&self, channel: CodeChannel) -> Result<(), AuthError> {
        self.state.lock().unwrap().resend_calls.push(channel);
        Ok(())
    }

    async fn check_session(&self) -> Result<Option<SessionClaims>, AuthError> {
        Ok(self.state.lock().unwrap().session.clone())
    }

    async fn session_refresh(&self) -> Result<(), AuthError> {
        self.state.lock().unwrap().session_refresh_calls += 1;
        Ok(())
    }

    async fn email_verified(&self, _email: &str) -> Result<bool, AuthError> {
        Ok(self.state.lock().unwrap().email_verified)
    }

    async fn mfa_status(&self, _email: &str) -> Result<MfaStatus, AuthError> {
        let mut state = self.state.lock().unwrap();
        state.mfa_status_calls += 1;
        Ok(state.mfa_status)
    }

    async fn setup_mfa(&self) -> Result<MfaSetupDetails, AuthError> {
        let state = self.state.lock().unwrap();
        Ok(state.mfa_setup.clone().unwrap_or(MfaSetupDetails {
            secret_key: "JBSWY3DPEHPK3PXP".into(),
            qr_payload: "otpauth://totp/fake".into(),
            setup_uri: "otpauth://totp/fake".into(),
        }))
    }

    async fn start_password_reset(&self, email: &str) -> Result<(), AuthError> {
        self.state.lock().unwrap().reset_started.push(email.into());
        Ok(())
    }

    async fn confirm_password_reset(
        &self,
        email: &str,
        code: &str,
        _new_password: &str,
    ) -> Result<(), AuthError> {
        self.state
            .lock()
            .unwrap()
            .reset_confirmed
            .push((email.into(), code.into()));
        Ok(())
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.state.lock().unwrap().signed_out = true;
        Ok(())
    }
}

#[derive(Default)]
struct DirectoryState {
    records: Vec<UserRecord>,
    find_error: Option<AuthError>,
    create_calls: usize,
    update_calls: Vec<UserRecord>,
}

#[derive(Clone, Default)]
pub struct FakeDirectory {
    state: Arc<Mutex<DirectoryState>>,
}

impl FakeDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(self, record: UserRecord) -> Self {
        self.state.lock().unwrap().records.push(record);
        self
    }

    pub fn with_find_error(self, error: AuthError) -> Self {
        self.state.lock().unwrap().find_error = Some(error);
        self
    }

    pub fn create_calls(&self) -> usize {
        self.state.lock().unwrap().create_calls
    }

    pub fn update_calls(&self) -> Vec<UserRecord> {
        self.state.lock().unwrap().update_calls.clone()
    }
}

#[async_trait]
impl UserDirectory for FakeDirectory {
    async fn find_by_email(&self, email: &str) -> Result<Vec<UserRecord>, AuthError> {
        let state = self.state.lock().unwrap();
        if let Some(err) = &state.find_error {
            return Err(err.clone());
        }
        Ok(state
            .records
            .iter()
            .filter(|r| r.email == email)
            .cloned()
            .collect())
    }

    async fn create(&self, record: UserRecord) -> Result<UserRecord, AuthError> {
        let mut state = self.state.lock().unwrap();
        state.create_calls += 1;
        state.records.push(record.clone());
        Ok(record)
    }

    async fn update(&self, record: UserRecord) -> Result<UserRecord, AuthError> {
        let mut state = self.state.lock().unwrap();
        state.update_calls.push(record.clone());
        if let Some(existing) = state
            .records
            .iter_mut()
            .find(|r| r.user_id == record.user_id)
        {
            *existing = record.clone();
        }
        Ok(record)
    }
}

#[derive(Default)]
struct SmsState {
    code_valid: bool,
    send_calls: Vec<String>,
    verify_calls: Vec<(String, String)>,
}

#[derive(Clone)]
pub struct FakeSms {
    state: Arc<Mutex<SmsState>>,
}

impl FakeSms {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(SmsState {
                code_valid: true,
                ..Default::default()
            })),
        }
    }

    pub fn with_code_valid(self, valid: bool) -> Self {
        self.state.lock().unwrap().code_valid = valid;
        self
    }

    pub fn send_calls(&self) -> Vec<String> {
        self.state.lock().unwrap().send_calls.clone()
    }

    pub fn verify_calls(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().verify_calls.clone()
    }
}

impl Default for FakeSms {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SmsService for FakeSms {
    async fn send_code(&self, phone_number: &str) -> Result<(), AuthError> {
        self.state.lock().unwrap().send_calls.push(phone_number.into());
        Ok(())
    }

    async fn verify_code(&self, phone_number: &str, code: &str) -> Result<bool, AuthError> {
        let mut state = self.state.lock().unwrap();
        state
            .verify_calls
            .push((phone_number.into(), code.into()));
        Ok(state.code_valid)
    }
}
