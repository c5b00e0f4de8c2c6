//! SMD2 Events - best-effort lifecycle notifications
//!
//! Mutations of a resource produce a [`LifecycleEvent`] that is queued on an
//! [`EventEmitter`] and delivered asynchronously to every registered
//! [`EventSink`]. Publishing never blocks the caller and a delivery failure
//! never reaches it: failures are logged and counted, nothing more.
//!
//! # Ordering
//!
//! A single worker drains the queue and hands each event to the sinks in turn,
//! so subscribers observe events for the same uid in the order the mutations
//! were published.

mod emitter;
mod error;
mod event;
mod hub;
mod sink;

pub use emitter::{DeliveryFailureHook, EventEmitter, EventEmitterBuilder};
pub use error::EventError;
pub use event::{EventAction, LifecycleEvent};
pub use hub::EventHub;
pub use sink::{EventSink, TracingSink};

/// Default bound of the emitter's work queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Default broadcast buffer of an [`EventHub`].
pub const DEFAULT_STREAM_CAPACITY: usize = 1000;
