//! Completion service client.
//!
//! The [`CompletionClient`] trait is the boundary to the text-completion
//! service. Tests use scripted clients that return predetermined batches
//! without network access.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::core::types::Completion;
use crate::io::config::CompletionConfig;

/// Environment variable holding the completion service credential.
pub const TOKEN_ENV: &str = "OPENAI_TOKEN";

/// Dotenv file under the home directory that may define [`TOKEN_ENV`].
pub const CREDENTIALS_FILE: &str = ".config/atcoder-auto-submitter/.env";

/// Stop sequence that ends a sampled function before the next top-level block.
const STOP_SEQUENCE: &str = "\n\n\n";

const STREAM_DONE: &str = "[DONE]";

/// Location of [`CREDENTIALS_FILE`] for the current user.
pub fn credentials_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(CREDENTIALS_FILE))
}

/// Load variables from the dotenv file at `path` into the process environment.
///
/// Variables that are already set keep their values. A missing or unreadable
/// file is not an error; returns whether the file was loaded.
pub fn load_credentials(path: &Path) -> bool {
    match dotenvy::from_path(path) {
        Ok(()) => {
            debug!(path = %path.display(), "loaded credentials file");
            true
        }
        Err(err) => {
            debug!(path = %path.display(), %err, "credentials file not loaded");
            false
        }
    }
}

/// Abstraction over completion backends.
pub trait CompletionClient {
    /// Request `n` sampled continuations of `prompt`, ordered by index.
    fn complete(&self, prompt: &str, n: usize) -> Result<Vec<Completion>>;
}

/// Client for an OpenAI-style streaming completions endpoint.
pub struct HttpCompletionClient {
    config: CompletionConfig,
    token: String,
    http: reqwest::blocking::Client,
}

impl HttpCompletionClient {
    pub fn new(config: CompletionConfig, token: String) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("build http client")?;
        Ok(Self {
            config,
            token,
            http,
        })
    }

    /// Build a client using the credential from [`TOKEN_ENV`].
    ///
    /// A missing credential is a configuration error and is never retried.
    pub fn from_env(config: CompletionConfig) -> Result<Self> {
        let token = std::env::var(TOKEN_ENV)
            .ok()
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| anyhow!("{TOKEN_ENV} is not set"))?;
        Self::new(config, token)
    }

    fn request_body(&self, prompt: &str, n: usize) -> Result<Value> {
        let mut body =
            serde_json::to_value(&self.config.parameters).context("serialize parameters")?;
        let object = body
            .as_object_mut()
            .ok_or_else(|| anyhow!("completion parameters must serialize to an object"))?;
        object.insert("prompt".to_string(), Value::from(prompt));
        object.insert("n".to_string(), Value::from(n));
        object.insert("stop".to_string(), Value::from(vec![STOP_SEQUENCE]));
        object.insert("stream".to_string(), Value::from(true));
        Ok(body)
    }
}

impl CompletionClient for HttpCompletionClient {
    #[instrument(skip(self, prompt), fields(endpoint = %self.config.endpoint))]
    fn complete(&self, prompt: &str, n: usize) -> Result<Vec<Completion>> {
        info!(n, "requesting completions");
        let body = self.request_body(prompt, n)?;

        let response = self
            .http
            .post(&self.config.endpoint)
            .bearer_auth(&self.token)
            .header("Accept", "application/json")
            .json(&body)
            .send()
            .context("send completion request")?;
        let status = response.status();
        let text = response.text().context("read completion response")?;
        if !status.is_success() {
            bail!("completion request failed with {status}: {}", text.trim());
        }

        let completions = parse_event_stream(&text)?;
        info!(received = completions.len(), "extracted completions");
        Ok(completions)
    }
}

#[derive(Debug, Deserialize)]
struct StreamEvent {
    #[serde(default)]
    choices: Option<Vec<StreamChoice>>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    index: usize,
    #[serde(default)]
    text: String,
}

/// Accumulate streamed choice fragments per index until the `[DONE]` sentinel.
///
/// Each non-empty line is a JSON event, optionally prefixed with `data: `.
pub fn parse_event_stream(body: &str) -> Result<Vec<Completion>> {
    let mut outputs: BTreeMap<usize, String> = BTreeMap::new();

    for (line_no, line) in body.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let payload = line.strip_prefix("data:").map(str::trim_start).unwrap_or(line);
        if payload == STREAM_DONE {
            debug!(line_no, "stream terminator reached");
            break;
        }

        let event: StreamEvent = serde_json::from_str(payload)
            .with_context(|| format!("parse completion event on line {}", line_no + 1))?;
        for choice in event.choices.unwrap_or_default() {
            outputs.entry(choice.index).or_default().push_str(&choice.text);
        }
    }

    Ok(outputs
        .into_iter()
        .map(|(index, text)| Completion { index, text })
        .collect())
}
