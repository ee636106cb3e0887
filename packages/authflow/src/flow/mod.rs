//! Event-driven flow core.
//!
//! The split mirrors the step graph's contract: the reducer and the
//! machine are pure and synchronous, effects perform the external
//! calls, and the runtime serializes everything through a
//! single-consumer queue.

pub mod commands;
pub mod effects;
pub mod events;
pub mod machine;
pub mod reconcile;
pub mod reducer;
pub mod runtime;

pub use commands::FlowCommand;
pub use events::{EventRole, FlowEvent};
pub use machine::FlowMachine;
pub use reducer::reduce;
pub use runtime::FlowHandle;
