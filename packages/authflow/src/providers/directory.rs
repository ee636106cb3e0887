//! User-directory capability trait.

use async_trait::async_trait;

use crate::error::AuthError;
use crate::model::UserRecord;

/// Capability surface of the user directory service, keyed by the
/// durable user id.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// All records matching an email. Zero matches is a valid
    /// "does not exist" outcome; more than one is a data integrity
    /// problem the caller must surface as fatal.
    async fn find_by_email(&self, email: &str) -> Result<Vec<UserRecord>, AuthError>;

    async fn create(&self, record: UserRecord) -> Result<UserRecord, AuthError>;

    async fn update(&self, record: UserRecord) -> Result<UserRecord, AuthError>;
}
