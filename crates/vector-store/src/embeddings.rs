use crate::error::{Result, VectorStoreError};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::env;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";
pub const DEFAULT_EMBEDDING_MODEL: &str = "nomic-embed-text";
pub const STUB_DIMENSION: usize = 384;

const WARMUP_PROMPT: &str = "test";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Backend selector, read from `BUGTRACE_EMBEDDING_MODE`
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EmbeddingMode {
    Ollama,
    /// Deterministic offline vectors
    Stub,
}

impl EmbeddingMode {
    pub fn from_env() -> Result<Self> {
        let raw = env::var("BUGTRACE_EMBEDDING_MODE")
            .unwrap_or_else(|_| "ollama".to_string())
            .to_ascii_lowercase();
        match raw.trim() {
            "" | "ollama" => Ok(Self::Ollama),
            "stub" => Ok(Self::Stub),
            other => Err(VectorStoreError::Config(format!(
                "Unsupported BUGTRACE_EMBEDDING_MODE '{other}' (expected 'ollama' or 'stub')"
            ))),
        }
    }
}

/// What the embedder needs from project configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedderSettings {
    /// LLM provider name; embeddings follow the same provider
    pub provider: String,
    pub model: String,
}

impl Default for EmbedderSettings {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
        }
    }
}

/// A raw embedding backend.
///
/// Implementations only see non-blank texts and may return unnormalized vectors;
/// [`EmbeddingModel`] enforces the remaining contract.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Stable identity of the model; a change invalidates stored vectors
    fn model_id(&self) -> &str;

    fn dimension(&self) -> usize;

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Embedding front-end shared by indexing and search
#[derive(Clone)]
pub struct EmbeddingModel {
    provider: Arc<dyn EmbeddingProvider>,
}

impl std::fmt::Debug for EmbeddingModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingModel")
            .field("model_id", &self.model_id())
            .field("dimension", &self.dimension())
            .finish()
    }
}

impl EmbeddingModel {
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self { provider }
    }

    /// Build the configured backend.
    ///
    /// The Ollama backend embeds a test prompt here, so an unreachable server fails
    /// before any indexing work starts.
    pub async fn from_config(settings: &EmbedderSettings) -> Result<Self> {
        match EmbeddingMode::from_env()? {
            EmbeddingMode::Stub => {
                log::debug!("Using stub embeddings for model {}", settings.model);
                Ok(Self::new(Arc::new(StubProvider::new(
                    format!("stub:{}", settings.model),
                    STUB_DIMENSION,
                ))))
            }
            EmbeddingMode::Ollama => match settings.provider.as_str() {
                "ollama" => {
                    let provider = OllamaProvider::connect(&ollama_base_url(), &settings.model).await?;
                    Ok(Self::new(Arc::new(provider)))
                }
                other => Err(VectorStoreError::Config(format!(
                    "Unsupported embedding provider: {other} (only 'ollama' provides embeddings)"
                ))),
            },
        }
    }

    #[must_use]
    pub fn model_id(&self) -> &str {
        self.provider.model_id()
    }

    #[must_use]
    pub fn dimension(&self) -> usize {
        self.provider.dimension()
    }

    /// Embed a query string
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut embeddings = self.embed_batch(&[text.to_string()]).await?;
        embeddings
            .pop()
            .ok_or_else(|| VectorStoreError::EmbeddingError("Empty embedding result".to_string()))
    }

    /// One normalized vector per input, in input order.
    ///
    /// Blank texts get an all-zero vector without reaching the provider.
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let dimension = self.dimension();
        let pending: Vec<usize> = texts
            .iter()
            .enumerate()
            .filter(|(_, text)| !text.trim().is_empty())
            .map(|(idx, _)| idx)
            .collect();

        let mut out = vec![vec![0.0; dimension]; texts.len()];
        if pending.is_empty() {
            return Ok(out);
        }

        let batch: Vec<String> = pending.iter().map(|&idx| texts[idx].clone()).collect();
        let vectors = self.provider.embed_batch(&batch).await?;
        if vectors.len() != batch.len() {
            return Err(VectorStoreError::CountMismatch {
                sent: batch.len(),
                received: vectors.len(),
            });
        }

        for (idx, mut vector) in pending.into_iter().zip(vectors) {
            if vector.len() != dimension {
                return Err(VectorStoreError::InvalidDimension {
                    expected: dimension,
                    actual: vector.len(),
                });
            }
            normalize(&mut vector);
            out[idx] = vector;
        }

        Ok(out)
    }

    #[must_use]
    pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() {
            return 0.0;
        }

        let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }

        dot_product / (norm_a * norm_b)
    }
}

/// Base URL from `OLLAMA_HOST`, defaulting to the local daemon
pub fn ollama_base_url() -> String {
    let raw = env::var("OLLAMA_HOST").unwrap_or_default();
    let raw = raw.trim().trim_end_matches('/');
    if raw.is_empty() {
        DEFAULT_OLLAMA_HOST.to_string()
    } else if raw.starts_with("http://") || raw.starts_with("https://") {
        raw.to_string()
    } else {
        format!("http://{raw}")
    }
}

#[derive(Serialize)]
struct OllamaEmbedRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct OllamaEmbedResponse {
    embedding: Vec<f32>,
}

/// Ollama `/api/embeddings` backend
pub struct OllamaProvider {
    client: reqwest::Client,
    url: String,
    model: String,
    dimension: usize,
}

impl OllamaProvider {
    /// Connect and embed a test prompt; its length gives the dimension
    pub async fn connect(base_url: &str, model: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| VectorStoreError::Connection(format!("http client build: {e}")))?;

        let url = format!("{}/api/embeddings", base_url.trim_end_matches('/'));
        let mut provider = Self {
            client,
            url,
            model: model.to_string(),
            dimension: 0,
        };

        let sample = provider.request(WARMUP_PROMPT).await.map_err(|e| {
            VectorStoreError::Connection(format!(
                "Failed to connect to Ollama at {base_url} with model '{model}'. \
                 Make sure Ollama is running and the model is pulled (ollama pull {model}): {e}"
            ))
        })?;

        if sample.is_empty() {
            return Err(VectorStoreError::Connection(format!(
                "Ollama returned an empty embedding for model '{model}'"
            )));
        }

        provider.dimension = sample.len();
        log::info!(
            "Connected to Ollama embeddings ({model}, dimension {})",
            provider.dimension
        );
        Ok(provider)
    }

    async fn request(&self, prompt: &str) -> Result<Vec<f32>> {
        let req = OllamaEmbedRequest {
            model: &self.model,
            prompt,
        };

        let resp = self
            .client
            .post(&self.url)
            .json(&req)
            .send()
            .await
            .map_err(|e| VectorStoreError::EmbeddingError(format!("POST {}: {e}", self.url)))?;

        if resp.status() != StatusCode::OK {
            let code = resp.status();
            let body = resp
                .text()
                .await
                .unwrap_or_else(|_| "<failed to read body>".into());
            return Err(VectorStoreError::EmbeddingError(format!(
                "ollama embeddings non-200: {code}; body: {body}"
            )));
        }

        let parsed: OllamaEmbedResponse = resp
            .json()
            .await
            .map_err(|e| VectorStoreError::EmbeddingError(format!("parse embeddings json: {e}")))?;

        Ok(parsed.embedding)
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaProvider {
    fn model_id(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.request(text).await?);
        }
        Ok(out)
    }
}

/// Deterministic hash-seeded vectors for offline use
#[derive(Debug, Clone)]
pub struct StubProvider {
    model_id: String,
    dimension: usize,
}

impl StubProvider {
    pub fn new(model_id: impl Into<String>, dimension: usize) -> Self {
        Self {
            model_id: model_id.into(),
            dimension,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for StubProvider {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|text| stub_embed(text, self.dimension))
            .collect())
    }
}

pub(crate) fn normalize(vec: &mut [f32]) {
    let norm = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm == 0.0 {
        return;
    }
    for value in vec {
        *value /= norm;
    }
}

fn stub_embed(text: &str, dimension: usize) -> Vec<f32> {
    let mut state =
        fnv1a_64(text.as_bytes()) ^ (dimension as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    let mut vec = Vec::with_capacity(dimension);
    for _ in 0..dimension {
        let bits = splitmix64(&mut state);
        let high = (bits >> 32) as u32;
        let mantissa = high >> 9;
        let unit = f32::from_bits(0x3f80_0000 | mantissa) - 1.0;
        vec.push(unit.mul_add(2.0, -1.0));
    }
    normalize(&mut vec);
    vec
}

fn fnv1a_64(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
