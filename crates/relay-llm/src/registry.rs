//! Model name to adapter mapping
//!
//! Built once from every configured backend and read-only afterwards.

use std::collections::HashMap;
use std::sync::Arc;

use relay_config::LlmConfig;
use tokio::sync::OnceCell;

use crate::error::LlmError;
use crate::provider::{Provider, ProviderFactory};

/// A backend that was skipped while building the registry
#[derive(Debug)]
pub struct BackendFailure {
    /// Backend name, as configured
    pub name: String,
    pub error: LlmError,
}

/// Immutable model name to adapter mapping
pub struct Registry {
    models: HashMap<String, Arc<dyn Provider>>,
    failures: Vec<BackendFailure>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("models", &self.models())
            .field("failures", &self.failures)
            .finish()
    }
}

impl Registry {
    /// Validate every backend, build its adapter and register its models
    ///
    /// Backends are visited in configuration order. One that fails
    /// validation or construction is logged, recorded in [`Self::failures`]
    /// and skipped. When two backends serve the same model name the later
    /// one wins.
    ///
    /// # Errors
    ///
    /// `LlmError::NoProviders` when no model ended up registered.
    pub fn from_config(config: &LlmConfig, factory: &dyn ProviderFactory) -> Result<Self, LlmError> {
        let mut models: HashMap<String, Arc<dyn Provider>> = HashMap::new();
        let mut failures = Vec::new();

        for (name, provider_config) in &config.providers {
            let built = provider_config
                .validate()
                .map_err(LlmError::from)
                .and_then(|spec| factory.build(name, &spec));

            let provider = match built {
                Ok(provider) => provider,
                Err(error) => {
                    tracing::error!(provider = %name, error = %error, "skipping provider");
                    failures.push(BackendFailure {
                        name: name.clone(),
                        error,
                    });
                    continue;
                }
            };

            if provider.list_models().is_empty() {
                tracing::warn!(provider = %name, "provider serves no models, configure `models` to route to it");
            }

            for model in provider.list_models() {
                if let Some(previous) = models.insert(model.clone(), Arc::clone(&provider)) {
                    tracing::warn!(
                        model = %model,
                        previous = %previous.name(),
                        provider = %name,
                        "model served by more than one provider, using the later one"
                    );
                }
            }

            tracing::debug!(provider = %name, models = provider.list_models().len(), "registered provider");
        }

        if models.is_empty() {
            return Err(LlmError::NoProviders);
        }

        Ok(Self { models, failures })
    }

    /// Adapter serving `model`
    pub fn resolve(&self, model: &str) -> Result<Arc<dyn Provider>, LlmError> {
        if model.is_empty() {
            return Err(LlmError::EmptyModel);
        }

        self.models
            .get(model)
            .cloned()
            .ok_or_else(|| LlmError::ModelNotFound {
                model: model.to_owned(),
            })
    }

    /// Every registered model name, sorted
    pub fn models(&self) -> Vec<String> {
        let mut models: Vec<_> = self.models.keys().cloned().collect();
        models.sort_unstable();
        models
    }

    /// Backends skipped during construction, in configuration order
    pub fn failures(&self) -> &[BackendFailure] {
        &self.failures
    }
}

/// Registry built on first use
///
/// Concurrent first callers wait for the same construction. A failed
/// construction is not cached, the next call tries again.
pub struct LazyRegistry {
    cell: OnceCell<Registry>,
    config: LlmConfig,
    factory: Arc<dyn ProviderFactory>,
}

impl LazyRegistry {
    pub fn new(config: LlmConfig, factory: Arc<dyn ProviderFactory>) -> Self {
        Self {
            cell: OnceCell::new(),
            config,
            factory,
        }
    }

    /// The registry, building it if this is the first call
    pub async fn get(&self) -> Result<&Registry, LlmError> {
        self.cell
            .get_or_try_init(|| async { Registry::from_config(&self.config, self.factory.as_ref()) })
            .await
    }

    /// Adapter serving `model`, building the registry if needed
    pub async fn resolve(&self, model: &str) -> Result<Arc<dyn Provider>, LlmError> {
        self.get().await?.resolve(model)
    }
}
