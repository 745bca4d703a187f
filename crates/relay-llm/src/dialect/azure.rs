//! Azure OpenAI deployment-mapped upstreams

use http::HeaderValue;
use relay_config::AzureSpec;
use secrecy::ExposeSecret;

#[derive(Debug, Clone)]
pub struct AzureDialect {
    /// Everything before `/<deployment>`
    base: String,
    spec: AzureSpec,
}

impl AzureDialect {
    /// `https://<resource>.openai.azure.com/openai/deployments/...`
    pub fn direct(spec: AzureSpec) -> Self {
        Self {
            base: format!("https://{}.openai.azure.com/openai/deployments", spec.resource_name),
            spec,
        }
    }

    /// `<gateway provider url>/<resource>/...`
    pub fn gateway(provider_url: &str, spec: AzureSpec) -> Self {
        Self {
            base: format!("{provider_url}/{}", spec.resource_name),
            spec,
        }
    }

    /// Chat completions URL for the deployment serving `model`
    pub fn url(&self, model: &str) -> Result<String, String> {
        let deployment = self
            .spec
            .deployment(model)
            .ok_or_else(|| format!("no deployment mapped for model `{model}`"))?;

        Ok(format!(
            "{}/{deployment}/chat/completions?api-version={}",
            self.base, self.spec.api_version
        ))
    }

    pub fn api_key(&self) -> Result<HeaderValue, http::header::InvalidHeaderValue> {
        let mut value = HeaderValue::from_str(self.spec.api_key.expose_secret())?;
        value.set_sensitive(true);
        Ok(value)
    }
}
