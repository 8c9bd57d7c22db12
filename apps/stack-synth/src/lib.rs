#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Composition root of the handler and route graph synthesis.

pub mod config;
pub mod outputs;
pub mod pipeline;

pub use config::StackConfig;
pub use outputs::{Outputs, StackOutput};
pub use pipeline::{StackBuilder, SynthesizedStack, synthesize};
