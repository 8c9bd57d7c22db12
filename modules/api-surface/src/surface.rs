use std::collections::BTreeMap;

use serde::Serialize;
use stack_model::{Naming, ResourceRef, SynthResult, Taggable};

use crate::config::ApiSurfaceConfig;
use crate::manifest::HttpVerb;
use crate::route_tree::{RouteTree, SegmentId};

pub const ENDPOINT_TYPE: &str = "REGIONAL";

/// Deployed stage of the route surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeployedStage {
    pub name: String,
    pub logging_level: String,
    pub data_trace_enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CorsPreflight {
    pub allow_origins: Vec<String>,
    pub allow_methods: Vec<String>,
}

/// The REST surface: route tree plus deployment settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteSurface {
    pub name: String,
    pub description: String,
    pub endpoint_type: String,
    pub stage: DeployedStage,
    pub cors: CorsPreflight,
    /// Segment manifest parents hang from, e.g. `/v1`.
    pub root_segment: SegmentId,
    pub tree: RouteTree,
    pub tags: BTreeMap<String, String>,
}

impl RouteSurface {
    /// Surface `<prefix>_rest_api` with its root segment already created.
    ///
    /// # Errors
    /// Returns [`stack_model::SynthError::Configuration`] when the configured
    /// root segment is not a valid path label.
    pub fn new(naming: &Naming, config: &ApiSurfaceConfig) -> SynthResult<Self> {
        let mut tree = RouteTree::new();
        let root_segment = tree.resolve_or_create(tree.root(), &config.root_segment)?;
        Ok(Self {
            name: naming.resource("rest_api"),
            description: format!("API for {} stage", naming.stage()),
            endpoint_type: ENDPOINT_TYPE.to_owned(),
            stage: DeployedStage {
                name: naming.stage().to_owned(),
                logging_level: config.logging_level.clone(),
                data_trace_enabled: false,
            },
            cors: CorsPreflight {
                allow_origins: config.cors_allow_origins.clone(),
                allow_methods: HttpVerb::ALL.iter().map(ToString::to_string).collect(),
            },
            root_segment,
            tree,
            tags: BTreeMap::new(),
        })
    }

    #[must_use]
    pub fn reference(&self) -> ResourceRef {
        ResourceRef::rest_api(&self.name)
    }

    /// Stage ARN the filter chain is associated with.
    #[must_use]
    pub fn stage_arn(&self, region: &str) -> String {
        format!(
            "arn:aws:apigateway:{region}::/restapis/{}/stages/{}",
            self.reference(),
            self.stage.name
        )
    }

    #[must_use]
    pub fn endpoint_url(&self, region: &str) -> String {
        format!(
            "https://{}.execute-api.{region}.amazonaws.com/{}/",
            self.reference(),
            self.stage.name
        )
    }
}

impl Taggable for RouteSurface {
    fn tags_mut(&mut self) -> &mut BTreeMap<String, String> {
        &mut self.tags
    }
}
