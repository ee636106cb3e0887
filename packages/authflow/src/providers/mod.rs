//! Collaborator capability traits and the dependency container.
//!
//! These are infrastructure seams only - no flow logic. The
//! orchestration layer receives them as `Arc<dyn …>` so tests can
//! substitute scripted fakes.

mod deps;
mod directory;
mod identity;
mod sms;

pub use deps::{FlowDeps, VerifySmsAdapter};
pub use directory::UserDirectory;
pub use identity::{CodeChannel, IdentityProvider, MfaStatus, SignInOutcome, SignUpOutcome};
pub use sms::SmsService;
