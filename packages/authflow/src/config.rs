//! Environment-sourced configuration.

use std::env;
use std::time::Duration;

use anyhow::{Context, Result};
use verify_sms::VerifyOptions;

use crate::providers::FlowDeps;

#[derive(Debug, Clone)]
pub struct Config {
    pub verify_account_sid: String,
    pub verify_auth_token: String,
    pub verify_service_sid: String,
    /// Override for the verification service base URL (test stubs).
    pub verify_base_url: Option<String>,
    /// Override for the MFA-confirmation probe schedule.
    pub mfa_confirm_delays: Option<Vec<Duration>>,
    /// Override for the advisory SMS code lifetime.
    pub sms_code_ttl: Option<chrono::Duration>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let verify_account_sid =
            env::var("VERIFY_ACCOUNT_SID").context("VERIFY_ACCOUNT_SID must be set")?;
        let verify_auth_token =
            env::var("VERIFY_AUTH_TOKEN").context("VERIFY_AUTH_TOKEN must be set")?;
        let verify_service_sid =
            env::var("VERIFY_SERVICE_SID").context("VERIFY_SERVICE_SID must be set")?;
        let verify_base_url = env::var("VERIFY_BASE_URL").ok();

        let mfa_confirm_delays = match env::var("MFA_CONFIRM_DELAYS_MS") {
            Ok(raw) => Some(parse_delays_ms(&raw).context("invalid MFA_CONFIRM_DELAYS_MS")?),
            Err(_) => None,
        };
        let sms_code_ttl = match env::var("SMS_CODE_TTL_MINUTES") {
            Ok(raw) => {
                let minutes: i64 = raw.parse().context("invalid SMS_CODE_TTL_MINUTES")?;
                Some(chrono::Duration::minutes(minutes))
            }
            Err(_) => None,
        };

        Ok(Self {
            verify_account_sid,
            verify_auth_token,
            verify_service_sid,
            verify_base_url,
            mfa_confirm_delays,
            sms_code_ttl,
        })
    }

    pub fn verify_options(&self) -> VerifyOptions {
        let mut options = VerifyOptions::new(
            self.verify_account_sid.clone(),
            self.verify_auth_token.clone(),
            self.verify_service_sid.clone(),
        );
        if let Some(base_url) = &self.verify_base_url {
            options.base_url = base_url.clone();
        }
        options
    }

    /// Apply tuning overrides to an already-wired dependency container.
    pub fn tune(&self, mut deps: FlowDeps) -> FlowDeps {
        if let Some(delays) = &self.mfa_confirm_delays {
            deps.mfa_confirm_delays = delays.clone();
        }
        if let Some(ttl) = self.sms_code_ttl {
            deps.sms_code_ttl = ttl;
        }
        deps
    }
}

/// Comma-separated milliseconds, e.g. `1000,2000,4000`.
fn parse_delays_ms(raw: &str) -> Result<Vec<Duration>> {
    raw.split(',')
        .map(|part| {
            let ms: u64 = part
                .trim()
                .parse()
                .with_context(|| format!("bad delay value: {part:?}"))?;
            Ok(Duration::from_millis(ms))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_delays() {
        let delays = parse_delays_ms("1000, 2000,4000").unwrap();
        assert_eq!(
            delays,
            vec![
                Duration::from_millis(1000),
                Duration::from_millis(2000),
                Duration::from_millis(4000),
            ]
        );
    }

    #[test]
    fn test_parse_delays_rejects_garbage() {
        assert!(parse_delays_ms("1000,soon").is_err());
        assert!(parse_delays_ms("").is_err());
    }

    #[test]
    fn test_verify_options_base_url_override() {
        let config = Config {
            verify_account_sid: "AC1".into(),
            verify_auth_token: "token".into(),
            verify_service_sid: "VA1".into(),
            verify_base_url: Some("http://localhost:9000/v2".into()),
            mfa_confirm_delays: None,
            sms_code_ttl: None,
        };
        assert_eq!(config.verify_options().base_url, "http://localhost:9000/v2");
    }
}
