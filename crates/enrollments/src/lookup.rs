use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Street-level fragment resolved from a postal code. Ephemeral; used to
/// validate and enrich a submission, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostalLookupResult {
    pub street: String,
    pub complement: String,
    pub neighborhood: String,
    pub city: String,
    pub state: String,
}

#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("postal code rejected upstream: {status} {status_text}")]
    Request { status: u16, status_text: String },
    #[error("postal code not recognized")]
    NotFound,
    #[error("lookup transport failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("lookup payload malformed: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Seam over the postal-code resolution endpoint so the orchestrator can be
/// exercised without network access.
#[async_trait]
pub trait PostalLookup: Send + Sync {
    async fn resolve(&self, postal_code: &str) -> Result<PostalLookupResult, LookupError>;
}

/// Upstream payload naming (ViaCEP). The `erro` marker is present, with
/// varying shape across API versions, when the code is well-formed but
/// unknown.
#[derive(Debug, Deserialize)]
struct ViaCepPayload {
    #[serde(default)]
    erro: Option<serde_json::Value>,
    #[serde(default)]
    logradouro: Option<String>,
    #[serde(default)]
    complemento: Option<String>,
    #[serde(default)]
    bairro: Option<String>,
    #[serde(default)]
    localidade: Option<String>,
    #[serde(default)]
    uf: Option<String>,
}

impl From<ViaCepPayload> for PostalLookupResult {
    fn from(payload: ViaCepPayload) -> Self {
        Self {
            street: payload.logradouro.unwrap_or_default(),
            complement: payload.complemento.unwrap_or_default(),
            neighborhood: payload.bairro.unwrap_or_default(),
            city: payload.localidade.unwrap_or_default(),
            state: payload.uf.unwrap_or_default(),
        }
    }
}

/// ViaCEP-backed lookup client. One round trip per call, no retries, and the
/// transport default timeout; the base URL is injected at construction.
pub struct ViaCepClient {
    base_url: String,
    client: Client,
}

impl ViaCepClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            client: Client::new(),
        }
    }
}

#[async_trait]
impl PostalLookup for ViaCepClient {
    async fn resolve(&self, postal_code: &str) -> Result<PostalLookupResult, LookupError> {
        let url = format!("{}/{}/json/", self.base_url, postal_code);
        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if status.is_client_error() {
            return Err(LookupError::Request {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or("").to_string(),
            });
        }

        let body = response.bytes().await?;
        if body.is_empty() {
            return Err(LookupError::NotFound);
        }

        let payload: ViaCepPayload =
            serde_json::from_slice(&body).map_err(LookupError::Decode)?;
        if payload.erro.is_some() {
            return Err(LookupError::NotFound);
        }

        Ok(PostalLookupResult::from(payload))
    }
}
