#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Access-role synthesis.
//!
//! Every handler gets its own execution role. A role carries the shared
//! coarse managed grants plus the fine-grained inline overlays from
//! [`SharedCapabilities`].

pub mod capabilities;
pub mod synthesizer;

pub use capabilities::{MAX_MANAGED_GRANTS, SharedCapabilities};
pub use synthesizer::{RoleSynthesizer, role_name, synthesize_role};
