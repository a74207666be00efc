//! Reactive-observable substrate consumed by the imagine binding engine.
//!
//! Three primitives, all single-threaded and synchronous-on-write:
//!
//! - [`Observable`] — a boxed mutable value with get/set and change
//!   subscription. Writing a new value invokes every subscriber before
//!   `set` returns; writing an equal value is a no-op.
//! - [`ObservableArray`] — an observable sequence with splice-, item- and
//!   whole-replacement-level change notifications.
//! - [`Computed`] — a value derived from other observables, recomputed when
//!   a tracked source changes, optionally writable back through a write
//!   function.
//!
//! Subscriptions are represented by [`Subscription`] handles; dropping a
//! handle detaches the listener, [`Subscription::forget`] leaves it
//! attached for the lifetime of the observed value.

mod array;
mod computed;
mod subscriber;
mod value;

pub use array::{ArrayChange, ObservableArray};
pub use computed::Computed;
pub use subscriber::{Subscription, SubscriberList};
pub use value::{Observable, ValueChange};
