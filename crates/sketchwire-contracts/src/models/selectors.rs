use super::registry::{ModelRegistry, ModelSpec};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSelection {
    pub model: ModelSpec,
    pub requested: Option<String>,
    pub fallback_reason: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ModelSelector {
    pub registry: ModelRegistry,
}

impl ModelSelector {
    pub fn new(registry: Option<ModelRegistry>) -> Self {
        Self {
            registry: registry.unwrap_or_else(|| ModelRegistry::new(None)),
        }
    }

    /// Resolve a model for one capability. An unavailable or unsuitable
    /// request falls back to the first registered model with the capability,
    /// with the reason recorded for the surface to display.
    pub fn select(
        &self,
        requested: Option<&str>,
        capability: &str,
    ) -> Result<ModelSelection, String> {
        if let Some(name) = requested {
            if let Some(model) = self.registry.ensure(name, capability) {
                return Ok(ModelSelection {
                    model,
                    requested: Some(name.to_string()),
                    fallback_reason: None,
                });
            }
        }

        let Some(model) = self.registry.by_capability(capability).into_iter().next() else {
            return Err(format!("No models available for capability '{capability}'."));
        };

        let fallback_reason = match requested {
            Some(name) => {
                format!("Requested model '{name}' unavailable for capability '{capability}'.")
            }
            None => "No model specified; using default.".to_string(),
        };
        Ok(ModelSelection {
            model,
            requested: requested.map(str::to_string),
            fallback_reason: Some(fallback_reason),
        })
    }
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;

    use super::*;

    fn vision_model(name: &str) -> ModelSpec {
        ModelSpec {
            name: name.to_string(),
            provider: "dryrun".to_string(),
            capabilities: vec!["vision".to_string()],
            context_window: None,
        }
    }

    #[test]
    fn requested_model_with_capability_is_used_directly() {
        let selection = ModelSelector::new(None)
            .select(Some("gemini-3-pro-preview"), "vision")
            .unwrap();
        assert_eq!(selection.model.name, "gemini-3-pro-preview");
        assert!(selection.fallback_reason.is_none());
    }

    #[test]
    fn unavailable_request_falls_back_with_reason() {
        let mut models = IndexMap::new();
        models.insert("sketch-default".to_string(), vision_model("sketch-default"));
        let selector = ModelSelector::new(Some(ModelRegistry::new(Some(models))));
        let selection = selector.select(Some("missing"), "vision").unwrap();
        assert_eq!(selection.model.name, "sketch-default");
        assert_eq!(selection.requested.as_deref(), Some("missing"));
        assert_eq!(
            selection.fallback_reason.as_deref(),
            Some("Requested model 'missing' unavailable for capability 'vision'.")
        );
    }

    #[test]
    fn no_request_uses_default_with_explanation() {
        let selection = ModelSelector::new(None).select(None, "text").unwrap();
        assert_eq!(
            selection.fallback_reason.as_deref(),
            Some("No model specified; using default.")
        );
    }

    #[test]
    fn empty_capability_pool_is_an_error() {
        let mut models = IndexMap::new();
        models.insert("text-only".to_string(), {
            let mut spec = vision_model("text-only");
            spec.capabilities = vec!["text".to_string()];
            spec
        });
        let selector = ModelSelector::new(Some(ModelRegistry::new(Some(models))));
        let err = selector.select(Some("text-only"), "vision").unwrap_err();
        assert_eq!(err, "No models available for capability 'vision'.");
    }
}
