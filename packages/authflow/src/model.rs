//! Durable identity records and session claims.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Server-derived account status. The client never writes a terminal
/// status directly; the directory derives it from the verification
/// booleans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserStatus {
    Pending,
    Active,
    Inactive,
}

/// The directory's view of a user. The flow holds a write-through
/// cached copy in [`crate::state::StepState`]; the directory owns the
/// authoritative row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Durable directory id, distinct from the identity provider's
    /// subject id. Equal to `subject_id` only on provisional records.
    pub user_id: String,
    pub subject_id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub email_verified: bool,
    pub phone_verified: bool,
    pub mfa_enabled: bool,
    pub mfa_setup_complete: bool,
    pub groups: Vec<String>,
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRecord {
    /// Fresh record for a just-signed-up user. Verification booleans
    /// start false; the directory will flip status as they change.
    pub fn new(subject_id: String, email: String) -> Self {
        let now = Utc::now();
        Self {
            user_id: Uuid::new_v4().to_string(),
            subject_id,
            email,
            first_name: String::new(),
            last_name: String::new(),
            phone_number: String::new(),
            email_verified: false,
            phone_verified: false,
            mfa_enabled: false,
            mfa_setup_complete: false,
            groups: Vec::new(),
            status: UserStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    /// Minimal record synthesized from identity-provider session
    /// claims when the directory is unreachable. Flagged provisional
    /// by carrying the subject id as its user id, so the flow is not
    /// locked out by a transient directory outage.
    pub fn provisional(claims: &SessionClaims) -> Self {
        let now = Utc::now();
        Self {
            user_id: claims.subject.clone(),
            subject_id: claims.subject.clone(),
            email: claims.email.clone(),
            first_name: claims.given_name.clone().unwrap_or_default(),
            last_name: claims.family_name.clone().unwrap_or_default(),
            phone_number: claims.phone_number.clone().unwrap_or_default(),
            email_verified: claims.email_verified,
            phone_verified: claims.phone_verified,
            mfa_enabled: false,
            mfa_setup_complete: false,
            groups: claims.groups.clone(),
            status: UserStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_provisional(&self) -> bool {
        self.user_id == self.subject_id
    }

    pub fn has_name(&self) -> bool {
        !self.first_name.trim().is_empty() || !self.last_name.trim().is_empty()
    }
}

/// Claims carried by an authenticated identity-provider session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub subject: String,
    pub email: String,
    pub email_verified: bool,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub phone_number: Option<String>,
    pub phone_verified: bool,
    pub groups: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims() -> SessionClaims {
        SessionClaims {
            subject: "sub-123".into(),
            email: "a@x.com".into(),
            email_verified: true,
            given_name: Some("Ada".into()),
            family_name: Some("Lovelace".into()),
            phone_number: None,
            phone_verified: false,
            groups: vec!["admins".into()],
        }
    }

    #[test]
    fn test_new_record_starts_pending_and_unverified() {
        let record = UserRecord::new("sub-1".into(), "a@x.com".into());
        assert_eq!(record.status, UserStatus::Pending);
        assert!(!record.email_verified);
        assert!(!record.phone_verified);
        assert!(!record.mfa_enabled);
        assert_ne!(record.user_id, record.subject_id);
        assert!(!record.is_provisional());
    }

    #[test]
    fn test_provisional_record_carries_subject_as_user_id() {
        let record = UserRecord::provisional(&claims());
        assert!(record.is_provisional());
        assert_eq!(record.user_id, "sub-123");
        assert_eq!(record.email, "a@x.com");
        assert!(record.email_verified);
        assert_eq!(record.groups, vec!["admins".to_string()]);
    }

    #[test]
    fn test_has_name() {
        let mut record = UserRecord::new("sub-1".into(), "a@x.com".into());
        assert!(!record.has_name());
        record.first_name = "Ada".into();
        assert!(record.has_name());
        record.first_name = "   ".into();
        assert!(!record.has_name());
    }
}
