//! SigV4-signed Claude-on-Bedrock upstreams

use http::HeaderMap;
use relay_config::BedrockSpec;

use crate::signing::{SigV4Signer, SigningError};

#[derive(Debug, Clone)]
pub struct BedrockDialect {
    /// Everything before `/model/<model>/invoke`
    base: String,
    signer: SigV4Signer,
    /// Streamed answers come back as events rather than one JSON body
    event_stream: bool,
}

impl BedrockDialect {
    /// `https://bedrock-runtime.<region>.amazonaws.com/...`
    pub fn direct(spec: &BedrockSpec) -> Self {
        Self {
            base: format!("https://bedrock-runtime.{}.amazonaws.com", spec.region),
            signer: SigV4Signer::new(spec),
            event_stream: false,
        }
    }

    /// `<gateway provider url>/bedrock-runtime/<region>/...`
    pub fn gateway(provider_url: &str, spec: &BedrockSpec) -> Self {
        Self {
            base: format!("{provider_url}/bedrock-runtime/{}", spec.region),
            signer: SigV4Signer::new(spec),
            event_stream: true,
        }
    }

    /// `/invoke` answers with a single JSON body; only the gateway hop
    /// re-frames it as events
    pub const fn streams_events(&self) -> bool {
        self.event_stream
    }

    pub fn url(&self, model: &str) -> String {
        format!("{}/model/{model}/invoke", self.base)
    }

    /// Signature headers for `body`, computed over the native endpoint
    pub fn sign(&self, model: &str, headers: &HeaderMap, body: &[u8]) -> Result<HeaderMap, SigningError> {
        self.signer.sign(&self.signer.invoke_url(model), headers, body)
    }
}
