/// Append-only event store with filtered queries and a retention sweep
pub mod event_store;

pub use event_store::{EventFilter, EventStore, ResolveOutcome};
