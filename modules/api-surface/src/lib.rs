#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Route surface synthesis.
//!
//! Owns the declarative route manifest, the authorization strategy, the
//! hierarchical route tree with its handlers and the filter chain placed in
//! front of the surface.

pub mod auth;
pub mod config;
pub mod filter_chain;
pub mod handlers;
pub mod manifest;
pub mod policy;
pub mod route_tree;
pub mod surface;
pub mod synth;

pub use auth::{AuthorizationStrategy, Authorizer, MethodAuthorization, select_strategy};
pub use config::ApiSurfaceConfig;
pub use filter_chain::{
    FilterChain, FilterRule, StageAssociation, StageAssociations, build_filter_chain,
};
pub use handlers::{HandlerFactory, HandlerSettings};
pub use manifest::{Availability, HttpVerb, RouteManifest, RouteManifestEntry, VerbSet};
pub use policy::{ResolvedRoute, RoutePolicy};
pub use route_tree::{BoundMethod, MethodBinding, RouteSegment, RouteTree, SegmentId};
pub use surface::RouteSurface;
pub use synth::{RouteSynthesis, RouteSynthesizer};
