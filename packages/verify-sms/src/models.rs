use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Response from POST /Verifications (send a code).
#[derive(Debug, Clone, Deserialize)]
pub struct SendCodeResponse {
    pub sid: String,
    pub to: String,
    pub channel: String,
    pub status: String,
    pub date_created: Option<DateTime<Utc>>,
}

/// Response from POST /VerificationCheck (check a submitted code).
#[derive(Debug, Clone, Deserialize)]
pub struct CheckCodeResponse {
    pub sid: Option<String>,
    pub to: Option<String>,
    pub status: String,
    pub valid: Option<bool>,
}

/// Error body returned by the verification API on 4xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    pub code: Option<i64>,
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_code_response_parses() {
        let body = r#"{
            "sid": "VE123",
            "to": "+15551234567",
            "channel": "sms",
            "status": "pending",
            "date_created": "2026-01-15T12:00:00Z"
        }"#;
        let parsed: SendCodeResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.sid, "VE123");
        assert_eq!(parsed.status, "pending");
        assert!(parsed.date_created.is_some());
    }

    #[test]
    fn test_check_code_response_parses_approved() {
        let body = r#"{"sid": "VE123", "to": "+15551234567", "status": "approved", "valid": true}"#;
        let parsed: CheckCodeResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.status, "approved");
        assert_eq!(parsed.valid, Some(true));
    }

    #[test]
    fn test_check_code_response_parses_without_optional_fields() {
        let body = r#"{"status": "pending"}"#;
        let parsed: CheckCodeResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.status, "pending");
        assert!(parsed.valid.is_none());
    }

    #[test]
    fn test_api_error_body_parses() {
        let body = r#"{"code": 60202, "message": "Max check attempts reached"}"#;
        let parsed: ApiErrorBody = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.code, Some(60202));
    }
}
