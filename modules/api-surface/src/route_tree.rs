//! Hierarchical route tree.
//!
//! Segments live in an arena and are addressed by [`SegmentId`]. Creation is
//! memoized per `(parent, label)` so siblings always share their parent.

use std::collections::BTreeMap;

use serde::Serialize;
use stack_model::{HandlerDescriptor, ResourceRef, SynthError, SynthResult};
use tracing::debug;

use crate::auth::{AuthorizationStrategy, MethodAuthorization};
use crate::manifest::{HttpVerb, VerbSet, check_label};

/// Label of the catch-all child created for ANY entries.
pub const PROXY_LABEL: &str = "{proxy+}";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SegmentId(usize);

impl SegmentId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Method a binding answers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BoundMethod {
    #[serde(rename = "ANY")]
    Any,
    #[serde(untagged)]
    Verb(HttpVerb),
}

/// One method bound to a handler integration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodBinding {
    pub method: BoundMethod,
    /// Deployed handler name.
    pub handler: String,
    pub integration: ResourceRef,
    pub authorization: MethodAuthorization,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorizer: Option<String>,
}

impl MethodBinding {
    fn new(
        method: BoundMethod,
        handler: &HandlerDescriptor,
        strategy: &AuthorizationStrategy,
    ) -> Self {
        Self {
            method,
            handler: handler.name.clone(),
            integration: handler.arn(),
            authorization: strategy.method_authorization(),
            authorizer: strategy.authorizer_ref().map(str::to_owned),
        }
    }

    #[must_use]
    pub fn is_proxy(&self) -> bool {
        self.method == BoundMethod::Any
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteSegment {
    pub id: SegmentId,
    pub label: String,
    pub parent: Option<SegmentId>,
    /// Absolute path, e.g. `/v1/ui/admin`.
    pub path: String,
    pub children: BTreeMap<String, SegmentId>,
    pub methods: Vec<MethodBinding>,
}

impl RouteSegment {
    #[must_use]
    pub fn child(&self, label: &str) -> Option<SegmentId> {
        self.children.get(label).copied()
    }

    #[must_use]
    pub fn is_proxy(&self) -> bool {
        self.label == PROXY_LABEL
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteTree {
    segments: Vec<RouteSegment>,
    /// Authorization and authorizer of the first binding; every later
    /// binding must carry the same pair.
    #[serde(skip)]
    strategy: Option<(MethodAuthorization, Option<String>)>,
}

impl Default for RouteTree {
    fn default() -> Self {
        Self::new()
    }
}

impl RouteTree {
    #[must_use]
    pub fn new() -> Self {
        let root = RouteSegment {
            id: SegmentId(0),
            label: String::new(),
            parent: None,
            path: "/".to_owned(),
            children: BTreeMap::new(),
            methods: Vec::new(),
        };
        Self {
            segments: vec![root],
            strategy: None,
        }
    }

    #[must_use]
    pub fn root(&self) -> SegmentId {
        SegmentId(0)
    }

    #[must_use]
    pub fn segment(&self, id: SegmentId) -> Option<&RouteSegment> {
        self.segments.get(id.0)
    }

    /// Number of segments, root included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Always false: the root segment exists from construction.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> impl Iterator<Item = &RouteSegment> {
        self.segments.iter()
    }

    /// Every method binding paired with its segment, in creation order.
    pub fn bindings(&self) -> impl Iterator<Item = (&RouteSegment, &MethodBinding)> {
        self.segments
            .iter()
            .flat_map(|s| s.methods.iter().map(move |m| (s, m)))
    }

    /// Find the segment at an absolute path such as `/v1/ui`.
    #[must_use]
    pub fn find(&self, path: &str) -> Option<SegmentId> {
        path.split('/')
            .filter(|p| !p.is_empty())
            .try_fold(self.root(), |id, label| self.segment(id)?.child(label))
    }

    /// Authorization shared by every binding registered so far.
    #[must_use]
    pub fn authorization(&self) -> Option<MethodAuthorization> {
        self.strategy.as_ref().map(|(authorization, _)| *authorization)
    }

    /// Authorizer shared by every binding registered so far.
    #[must_use]
    pub fn authorizer(&self) -> Option<&str> {
        self.strategy
            .as_ref()
            .and_then(|(_, authorizer)| authorizer.as_deref())
    }

    fn segment_mut(&mut self, id: SegmentId) -> SynthResult<&mut RouteSegment> {
        self.segments.get_mut(id.0).ok_or_else(|| unknown_segment(id))
    }

    /// Return the child `label` of `parent`, creating it on first use.
    ///
    /// # Errors
    /// Returns [`SynthError::Configuration`] for an unknown `parent` or an
    /// invalid label.
    pub fn resolve_or_create(&mut self, parent: SegmentId, label: &str) -> SynthResult<SegmentId> {
        let parent_segment = self.segment(parent).ok_or_else(|| unknown_segment(parent))?;
        if let Some(existing) = parent_segment.child(label) {
            return Ok(existing);
        }
        if label != PROXY_LABEL {
            check_label(label, "path segment", label)?;
        }

        let id = SegmentId(self.segments.len());
        let path = if parent_segment.path == "/" {
            format!("/{label}")
        } else {
            format!("{}/{label}", parent_segment.path)
        };
        debug!(segment = %path, "route segment created");
        self.segments.push(RouteSegment {
            id,
            label: label.to_owned(),
            parent: Some(parent),
            path,
            children: BTreeMap::new(),
            methods: Vec::new(),
        });
        self.segment_mut(parent)?
            .children
            .insert(label.to_owned(), id);
        Ok(id)
    }

    /// Attach `handler` at `parent/resource_name`.
    ///
    /// ANY registers one catch-all proxy under the new segment. An explicit
    /// set registers one binding per verb in POST, PUT, GET, DELETE order.
    /// An empty set registers nothing. Returns the resource segment so
    /// nested resources can be attached beneath it.
    ///
    /// # Errors
    /// Returns [`SynthError::Configuration`] for an unknown parent, an invalid
    /// label, a conflicting binding on the same method, or a binding whose
    /// authorization differs from the rest of the tree.
    pub fn register_route(
        &mut self,
        parent: SegmentId,
        resource_name: &str,
        handler: &HandlerDescriptor,
        verbs: &VerbSet,
        strategy: &AuthorizationStrategy,
    ) -> SynthResult<SegmentId> {
        let segment = self.resolve_or_create(parent, resource_name)?;
        match verbs {
            VerbSet::Any => {
                let proxy = self.resolve_or_create(segment, PROXY_LABEL)?;
                self.bind(proxy, MethodBinding::new(BoundMethod::Any, handler, strategy))?;
            }
            VerbSet::Only(_) => {
                for verb in verbs.verbs() {
                    self.bind(
                        segment,
                        MethodBinding::new(BoundMethod::Verb(verb), handler, strategy),
                    )?;
                }
            }
        }
        Ok(segment)
    }

    /// Add a binding to `segment`. Re-binding an identical method is a no-op.
    ///
    /// # Errors
    /// Returns [`SynthError::Configuration`] for an unknown segment, a
    /// different binding already on the same method, or an authorization or
    /// authorizer that differs from the rest of the tree.
    pub fn bind(&mut self, segment: SegmentId, binding: MethodBinding) -> SynthResult<()> {
        if let Some((authorization, authorizer)) = &self.strategy
            && (*authorization != binding.authorization || *authorizer != binding.authorizer)
        {
            return Err(SynthError::configuration(
                binding.handler,
                format!(
                    "route uses {} but the surface uses {}",
                    strategy_label(binding.authorization, binding.authorizer.as_deref()),
                    strategy_label(*authorization, authorizer.as_deref())
                ),
            ));
        }

        let target = self.segment_mut(segment)?;
        if let Some(existing) = target.methods.iter().find(|m| m.method == binding.method) {
            if *existing == binding {
                return Ok(());
            }
            return Err(SynthError::configuration(
                binding.handler,
                format!(
                    "{} is already bound to '{}'",
                    method_label(binding.method, &target.path),
                    existing.handler
                ),
            ));
        }
        debug!(
            segment = %target.path,
            method = %method_label(binding.method, ""),
            handler = %binding.handler,
            "method bound"
        );
        let strategy = (binding.authorization, binding.authorizer.clone());
        target.methods.push(binding);
        self.strategy = Some(strategy);
        Ok(())
    }
}

fn method_label(method: BoundMethod, path: &str) -> String {
    let verb = match method {
        BoundMethod::Any => "ANY",
        BoundMethod::Verb(v) => v.as_str(),
    };
    if path.is_empty() {
        verb.to_owned()
    } else {
        format!("{verb} {path}")
    }
}

fn strategy_label(authorization: MethodAuthorization, authorizer: Option<&str>) -> String {
    match authorizer {
        Some(name) => format!("'{}' authorization via '{name}'", authorization.as_str()),
        None => format!("'{}' authorization", authorization.as_str()),
    }
}

fn unknown_segment(id: SegmentId) -> SynthError {
    SynthError::configuration("route tree", format!("unknown segment #{}", id.0))
}
