//! Thin client for a Twilio-Verify-shaped SMS verification service.
//!
//! Two operations: send a short-lived numeric code to a phone number,
//! and check a code the user typed back. The service owns code
//! lifetimes; callers should treat any local expiry bookkeeping as
//! advisory and rely on [`VerifyClient::check_code`] for the
//! authoritative answer.

use std::collections::HashMap;

pub mod models;

use reqwest::{header, Client, StatusCode};
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::{ApiErrorBody, CheckCodeResponse, SendCodeResponse};

#[derive(Debug, Error)]
pub enum VerifyError {
    /// The request never produced a usable HTTP response.
    #[error("verification service unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    /// The service answered with an error status.
    #[error("verification service rejected the request ({status}): {message}")]
    Rejected { status: StatusCode, message: String },

    /// The response body did not match the documented shape.
    #[error("unexpected verification service response: {0}")]
    MalformedResponse(String),
}

/// Outcome of a code check. A wrong code is a normal outcome here,
/// not an error; only transport and service failures are `Err`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeCheck {
    Approved,
    /// The code did not match the pending verification.
    Mismatch,
    /// No pending verification exists for this number (consumed or
    /// expired server-side).
    Expired,
}

#[derive(Debug, Clone)]
pub struct VerifyOptions {
    pub account_sid: String,
    pub auth_token: String,
    pub service_sid: String,
    /// Base URL, overridable for tests.
    pub base_url: String,
}

impl VerifyOptions {
    pub fn new(account_sid: String, auth_token: String, service_sid: String) -> Self {
        Self {
            account_sid,
            auth_token,
            service_sid,
            base_url: "https://verify.twilio.com/v2".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct VerifyClient {
    options: VerifyOptions,
    http: Client,
}

impl VerifyClient {
    pub fn new(options: VerifyOptions) -> Self {
        Self {
            options,
            http: Client::new(),
        }
    }

    fn form_headers() -> header::HeaderMap {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            "Content-Type",
            header::HeaderValue::from_static("application/x-www-form-urlencoded"),
        );
        headers
    }

    /// Ask the service to send a fresh code to `phone_number` over SMS.
    pub async fn send_code(&self, phone_number: &str) -> Result<SendCodeResponse, VerifyError> {
        let url = format!(
            "{}/Services/{}/Verifications",
            self.options.base_url, self.options.service_sid
        );

        let mut form_body: HashMap<&str, String> = HashMap::new();
        form_body.insert("To", phone_number.to_string());
        form_body.insert("Channel", "sms".to_string());

        let response = self
            .http
            .post(url)
            .basic_auth(&self.options.account_sid, Some(&self.options.auth_token))
            .headers(Self::form_headers())
            .form(&form_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = read_error_message(response).await;
            warn!(%status, %message, "verification send rejected");
            return Err(VerifyError::Rejected { status, message });
        }

        let parsed = response
            .json::<SendCodeResponse>()
            .await
            .map_err(|e| VerifyError::MalformedResponse(e.to_string()))?;
        debug!(sid = %parsed.sid, status = %parsed.status, "verification code sent");
        Ok(parsed)
    }

    /// Check a code the user typed back against the pending
    /// verification for `phone_number`.
    pub async fn check_code(
        &self,
        phone_number: &str,
        code: &str,
    ) -> Result<CodeCheck, VerifyError> {
        let url = format!(
            "{}/Services/{}/VerificationCheck",
            self.options.base_url, self.options.service_sid
        );

        let mut form_body: HashMap<&str, &str> = HashMap::new();
        form_body.insert("To", phone_number);
        form_body.insert("Code", code);

        let response = self
            .http
            .post(url)
            .basic_auth(&self.options.account_sid, Some(&self.options.auth_token))
            .headers(Self::form_headers())
            .form(&form_body)
            .send()
            .await?;

        let status = response.status();
        // The service answers 404 once the verification is consumed or
        // has aged out, which for callers means "get a new code".
        if status == StatusCode::NOT_FOUND {
            return Ok(CodeCheck::Expired);
        }
        if !status.is_success() {
            let message = read_error_message(response).await;
            warn!(%status, %message, "verification check rejected");
            return Err(VerifyError::Rejected { status, message });
        }

        let parsed = response
            .json::<CheckCodeResponse>()
            .await
            .map_err(|e| VerifyError::MalformedResponse(e.to_string()))?;

        if parsed.status == "approved" {
            Ok(CodeCheck::Approved)
        } else {
            Ok(CodeCheck::Mismatch)
        }
    }
}

async fn read_error_message(response: reqwest::Response) -> String {
    match response.json::<ApiErrorBody>().await {
        Ok(body) => body.message.unwrap_or_else(|| "no detail".to_string()),
        Err(_) => "no detail".to_string(),
    }
}
