use std::collections::BTreeMap;

use api_surface::RouteSurface;
use serde::Serialize;
use stack_model::{HandlerDescriptor, Naming, snake_to_camel};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StackOutput {
    pub value: String,
    pub description: String,
}

/// Named values recorded for later deployment phases and operator tooling.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Outputs(BTreeMap<String, StackOutput>);

impl Outputs {
    #[must_use]
    pub fn collect<'a>(
        naming: &Naming,
        surface: &RouteSurface,
        region: &str,
        handlers: impl IntoIterator<Item = &'a HandlerDescriptor>,
    ) -> Self {
        let mut outputs = Self::default()
            .with("apiEndpoint", surface.endpoint_url(region), "REST API endpoint")
            .with("restApiName", surface.name.clone(), "REST API name")
            .with("stageName", surface.stage.name.clone(), "Deployed stage")
            .with("namePrefix", naming.prefix(), "Resource name prefix")
            .with(
                "tenantIdSuffix",
                naming.tenant_id().as_str(),
                "Tenant id suffix of globally unique names",
            );
        for handler in handlers {
            let key = snake_to_camel(&handler.name);
            outputs = outputs
                .with(&format!("{key}Arn"), handler.arn().to_string(), "Handler ARN")
                .with(&key, handler.name.clone(), "Handler name");
        }
        outputs
    }

    #[must_use]
    fn with(mut self, key: &str, value: impl Into<String>, description: &str) -> Self {
        self.0.insert(
            key.to_owned(),
            StackOutput {
                value: value.into(),
                description: description.to_owned(),
            },
        );
        self
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(|o| o.value.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
