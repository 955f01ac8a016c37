//! HTTP client for a running bridge
//!
//! Used by the `dbg-agent` binary to talk to the plain HTTP frontend.

use std::time::Duration;

use serde::Deserialize;
use serde_json::json;

use crate::error::{AgentError, Result};

/// Bridge URL used when neither the flag nor the environment names one
pub const DEFAULT_URL: &str = "http://127.0.0.1:9999";

/// Environment variable consulted for the bridge URL
pub const URL_ENV: &str = "DBG_AGENT_URL";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const READ_TIMEOUT: Duration = Duration::from_secs(120);

/// `--url` flag, then `DBG_AGENT_URL`, then [`DEFAULT_URL`]
#[must_use]
pub fn resolve_url(flag: Option<&str>) -> String {
    flag.map(str::to_string)
        .or_else(|| std::env::var(URL_ENV).ok())
        .filter(|url| !url.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_URL.to_string())
        .trim_end_matches('/')
        .to_string()
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    output: Option<String>,
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl Envelope {
    fn into_result(self, reply: Option<String>) -> Result<String> {
        if self.success {
            return Ok(reply.unwrap_or_default());
        }
        let message = self
            .error
            .or(reply)
            .unwrap_or_else(|| "request failed".to_string());
        Err(AgentError::frontend(message))
    }
}

/// Client for the `/exec`, `/ask`, `/status` and `/shutdown` endpoints
#[derive(Debug, Clone)]
pub struct BridgeClient {
    http: reqwest::Client,
    base_url: String,
}

impl BridgeClient {
    /// Build a client for `base_url`
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be constructed
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .read_timeout(READ_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Run a raw debugger command
    ///
    /// # Errors
    /// Returns error on transport failure or an unsuccessful reply
    pub async fn exec(&self, command: &str) -> Result<String> {
        let env = self.post("/exec", json!({ "command": command })).await?;
        let output = env.output.clone();
        env.into_result(output)
    }

    /// Ask the assistant
    ///
    /// # Errors
    /// Returns error on transport failure or an unsuccessful reply
    pub async fn ask(&self, query: &str) -> Result<String> {
        let env = self.post("/ask", json!({ "query": query })).await?;
        let response = env.response.clone();
        env.into_result(response)
    }

    /// Server status string ("ready")
    ///
    /// # Errors
    /// Returns error if the server is unreachable
    pub async fn status(&self) -> Result<String> {
        let env: Envelope = self
            .http
            .get(format!("{}/status", self.base_url))
            .send()
            .await?
            .json()
            .await?;
        let status = env.status.clone();
        env.into_result(status)
    }

    /// Ask the server to stop
    ///
    /// # Errors
    /// Returns error if the server is unreachable
    pub async fn shutdown(&self) -> Result<String> {
        let env = self.post("/shutdown", json!({})).await?;
        let status = env.status.clone();
        env.into_result(status)
    }

    async fn post(&self, path: &str, body: serde_json::Value) -> Result<Envelope> {
        let url = format!("{}{path}", self.base_url);
        log::debug!("POST {url}");
        let envelope = self.http.post(url).json(&body).send().await?.json().await?;
        Ok(envelope)
    }
}
