//! HTTP-backed ImageProvider, calling out to the external AI image
//! generation service. The `reqwest::Client` construction and
//! HTTP-status-to-error-kind mapping follow
//! `turul-mcp-client/src/transport/http.rs`'s shape (timeout-configured
//! client, status check before body decode).

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use logoforge_domain::PreserveAspect;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::error::ImageProviderError;
use crate::traits::{ImageProvider, PaletteColors, ProposedPalette};

/// Per-call timeout (spec.md §5: "ImageProvider 120 s").
const PROVIDER_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone)]
pub struct HttpImageProviderConfig {
    pub base_url: String,
    pub api_key: String,
}

pub struct HttpImageProvider {
    client: Client,
    config: HttpImageProviderConfig,
}

impl HttpImageProvider {
    pub fn new(config: HttpImageProviderConfig) -> Result<Self, ImageProviderError> {
        let client = Client::builder()
            .timeout(PROVIDER_TIMEOUT)
            .user_agent("logoforge-image-provider/0.1")
            .build()
            .map_err(|e| ImageProviderError::Permanent(format!("failed to build http client: {e}")))?;
        Ok(Self { client, config })
    }

    /// Classify a non-2xx response: 5xx and 429 are transient (worth
    /// retrying), everything else is a permanent rejection (spec.md §7).
    fn classify_status(status: StatusCode, body: &str) -> ImageProviderError {
        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            ImageProviderError::Transient(format!("provider returned {status}: {body}"))
        } else {
            ImageProviderError::Permanent(format!("provider returned {status}: {body}"))
        }
    }

    async fn send_for_image(&self, path: &str, payload: impl Serialize) -> Result<Vec<u8>, ImageProviderError> {
        let response = self
            .client
            .post(format!("{}{path}", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() || e.is_connect() {
                    ImageProviderError::Transient(e.to_string())
                } else {
                    ImageProviderError::Permanent(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::classify_status(status, &body));
        }

        let decoded: ImageResponse =
            response.json().await.map_err(|e| ImageProviderError::Permanent(format!("malformed response: {e}")))?;
        base64::engine::general_purpose::STANDARD
            .decode(decoded.image_base64)
            .map_err(|e| ImageProviderError::Permanent(format!("malformed image payload: {e}")))
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    logo_description: &'a str,
    theme_description: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    palette_colors: &'a PaletteColors,
}

#[derive(Serialize)]
struct RefineRequest<'a> {
    base_image_base64: String,
    instructions: &'a str,
    preserve_aspects: &'a [PreserveAspect],
    #[serde(skip_serializing_if = "Option::is_none")]
    updated_logo_description: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    updated_theme_description: Option<&'a str>,
}

#[derive(Serialize)]
struct PaletteProposalRequest<'a> {
    logo_description: &'a str,
    theme_description: &'a str,
    count: u8,
}

#[derive(Deserialize)]
struct ImageResponse {
    image_base64: String,
}

#[derive(Deserialize)]
struct PaletteProposalResponse {
    palettes: Vec<ProposedPalette>,
}

// `ProposedPalette` needs (de)serialization only on the http path; derive
// here rather than on the shared struct to keep the trait module free of a
// wire-format dependency.
impl<'de> Deserialize<'de> for ProposedPalette {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            name: String,
            colors: Vec<String>,
        }
        let raw = Raw::deserialize(deserializer)?;
        Ok(ProposedPalette { name: raw.name, colors: raw.colors })
    }
}

#[async_trait]
impl ImageProvider for HttpImageProvider {
    fn backend_name(&self) -> &'static str {
        "http"
    }

    async fn generate(
        &self,
        logo_description: &str,
        theme_description: &str,
        palette_colors: PaletteColors,
    ) -> Result<Vec<u8>, ImageProviderError> {
        self.send_for_image(
            "/v1/generate",
            GenerateRequest { logo_description, theme_description, palette_colors: &palette_colors },
        )
        .await
    }

    async fn refine(
        &self,
        base_bytes: &[u8],
        instructions: &str,
        preserve_aspects: &[PreserveAspect],
        updated_logo_description: Option<&str>,
        updated_theme_description: Option<&str>,
    ) -> Result<Vec<u8>, ImageProviderError> {
        let base_image_base64 = base64::engine::general_purpose::STANDARD.encode(base_bytes);
        self.send_for_image(
            "/v1/refine",
            RefineRequest {
                base_image_base64,
                instructions,
                preserve_aspects,
                updated_logo_description,
                updated_theme_description,
            },
        )
        .await
    }

    async fn propose_palettes(
        &self,
        logo_description: &str,
        theme_description: &str,
        n: u8,
    ) -> Result<Vec<ProposedPalette>, ImageProviderError> {
        let response = self
            .client
            .post(format!("{}/v1/palettes", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&PaletteProposalRequest { logo_description, theme_description, count: n.saturating_sub(1) })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() || e.is_connect() {
                    ImageProviderError::Transient(e.to_string())
                } else {
                    ImageProviderError::Permanent(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::classify_status(status, &body));
        }

        let decoded: PaletteProposalResponse =
            response.json().await.map_err(|e| ImageProviderError::Permanent(format!("malformed response: {e}")))?;
        Ok(decoded.palettes)
    }
}
