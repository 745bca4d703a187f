use std::path::Path;

use crate::Config;

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Reads the file, expands `{{ env.VAR }}` placeholders, then parses and
    /// validates the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, placeholder expansion or
    /// parsing fails, or validation fails
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;

        Self::from_toml(&raw)
    }

    /// Parse configuration from TOML text
    ///
    /// # Errors
    ///
    /// Returns an error if placeholder expansion, parsing, or validation fails
    pub fn from_toml(raw: &str) -> anyhow::Result<Self> {
        let expanded =
            crate::env::expand_env(raw).map_err(|e| anyhow::anyhow!("config variable expansion failed: {e}"))?;

        let config: Self = toml::from_str(&expanded).map_err(|e| anyhow::anyhow!("failed to parse config: {e}"))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration-wide constraints
    ///
    /// Individual providers are validated when the registry is built, so a
    /// single broken backend does not block the rest.
    ///
    /// # Errors
    ///
    /// Returns an error if no provider is configured or a provider name is blank
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.llm.providers.is_empty() {
            anyhow::bail!("at least one LLM provider must be configured under [llm.providers]");
        }

        if self.llm.providers.keys().any(|name| name.trim().is_empty()) {
            anyhow::bail!("provider names must not be empty");
        }

        for (name, provider) in &self.llm.providers {
            match provider.provider_type() {
                Some("") => tracing::warn!(provider = %name, "provider has no type and will be skipped"),
                None => tracing::warn!(provider = %name, "provider table is malformed and will be skipped"),
                Some(_) => {}
            }
        }

        Ok(())
    }
}
