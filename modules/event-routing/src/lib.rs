#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Event routing: pub/sub topic rules bound to handlers.
//!
//! Each binding carries its own invoke grant, scoped to the rule that
//! triggers the handler.

pub mod binder;
pub mod rules;

pub use binder::{EventBinder, EventBinding, InvokeGrant, bind_standard_events};
pub use rules::{DEFAULT_TOPIC_NAMESPACE, EventFilter, TopicRule};
