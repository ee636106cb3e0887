//! Multi-step authentication flow engine.
//!
//! A client drives one [`flow::FlowHandle`] per flow instance: user
//! intents go in as [`flow::FlowEvent`]s, state snapshots come out on
//! a watch channel, and [`selectors::view`] projects the active step
//! into UI copy. All external calls go through the capability traits
//! in [`providers`], so the engine runs identically against the real
//! identity provider, directory, and SMS service or against the fakes
//! in [`testing`].

pub mod config;
pub mod error;
pub mod flow;
pub mod model;
pub mod providers;
pub mod selectors;
pub mod state;
pub mod step;
pub mod testing;

pub use config::Config;
pub use error::AuthError;
pub use flow::{FlowEvent, FlowHandle};
pub use model::{SessionClaims, UserRecord, UserStatus};
pub use state::{MfaSetupDetails, PhoneValidation, StepState};
pub use step::Step;
