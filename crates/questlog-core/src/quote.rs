use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, anyhow};
use serde_json::{Value, json};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::config::Config;
use crate::state::Action;

/// Substituted whenever the motivational line cannot be fetched.
pub const FALLBACK_QUOTE: &str = "Make today count.";

const QUOTE_PROMPT: &str = "Give me a single short, highly motivational quote to start a productive day. \
                            No author name, just the quote.";

pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Remote text generation, seen from the application side.
pub trait QuoteSource {
    fn motivational_line(&self) -> impl Future<Output = anyhow::Result<String>> + Send;

    fn suggest_tasks(&self, goal: &str) -> impl Future<Output = anyhow::Result<Vec<String>>> + Send;
}

#[derive(Debug, Clone)]
pub struct QuoteSettings {
    pub enabled: bool,
    pub model: String,
    pub endpoint: String,
    pub api_key_env: String,
    pub timeout: Option<Duration>,
}

impl QuoteSettings {
    pub fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        let timeout = match cfg.get("quote.timeout") {
            Some(raw) => {
                let secs: u64 = raw
                    .trim()
                    .parse()
                    .with_context(|| format!("invalid quote.timeout: {raw}"))?;
                (secs > 0).then(|| Duration::from_secs(secs))
            }
            None => None,
        };

        Ok(Self {
            enabled: cfg.get_bool("quote.enabled").unwrap_or(true),
            model: cfg.get("quote.model").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            endpoint: cfg
                .get("quote.endpoint")
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            api_key_env: cfg
                .get("quote.api_key_env")
                .unwrap_or_else(|| DEFAULT_API_KEY_ENV.to_string()),
            timeout,
        })
    }
}

#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    model: String,
    endpoint: String,
    api_key_env: String,
}

impl GeminiClient {
    pub fn new(settings: &QuoteSettings) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = settings.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .context("failed building HTTP client for quote fetch")?;

        Ok(Self {
            http,
            model: settings.model.clone(),
            endpoint: settings.endpoint.trim_end_matches('/').to_string(),
            api_key_env: settings.api_key_env.clone(),
        })
    }

    fn api_key(&self) -> anyhow::Result<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| anyhow!("{} is not set", self.api_key_env))
    }

    #[instrument(skip(self, body))]
    async fn generate(&self, body: Value) -> anyhow::Result<String> {
        let key = self.api_key()?;
        let url = format!("{}/models/{}:generateContent", self.endpoint, self.model);
        debug!(%url, "requesting generated text");

        let payload = serde_json::to_vec(&body)?;
        let response = self
            .http
            .post(url.as_str())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header("x-goog-api-key", key)
            .body(payload)
            .send()
            .await
            .with_context(|| format!("failed requesting {url}"))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .context("failed reading generation response body")?;
        if !status.is_success() {
            return Err(anyhow!("generation request returned HTTP {status}"));
        }

        let parsed: Value = serde_json::from_str(&text).context("generation response is not JSON")?;
        extract_text(&parsed)
    }
}

impl QuoteSource for GeminiClient {
    async fn motivational_line(&self) -> anyhow::Result<String> {
        let body = json!({
            "contents": [{ "parts": [{ "text": QUOTE_PROMPT }] }]
        });
        let line = self.generate(body).await?;
        Ok(line.trim().to_string())
    }

    async fn suggest_tasks(&self, goal: &str) -> anyhow::Result<Vec<String>> {
        let prompt = format!(
            "Suggest a list of 5-7 actionable daily tasks for someone whose goal today is: \"{goal}\". \
             Provide only the tasks as a JSON array of strings."
        );
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": { "type": "ARRAY", "items": { "type": "STRING" } }
            }
        });
        let raw = self.generate(body).await?;
        let tasks: Vec<String> =
            serde_json::from_str(raw.trim()).context("suggestion response is not a JSON array of strings")?;
        Ok(tasks)
    }
}

/// Concatenates the text parts of the first candidate.
fn extract_text(response: &Value) -> anyhow::Result<String> {
    let parts = response
        .pointer("/candidates/0/content/parts")
        .and_then(Value::as_array)
        .ok_or_else(|| anyhow!("generation response has no candidates"))?;

    let text: String = parts
        .iter()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect();
    if text.trim().is_empty() {
        return Err(anyhow!("generation response contained no text"));
    }
    Ok(text)
}

async fn with_timeout<T>(
    timeout: Option<Duration>,
    fut: impl Future<Output = anyhow::Result<T>>,
) -> anyhow::Result<T> {
    match timeout {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| anyhow!("timed out after {}s", limit.as_secs()))?,
        None => fut.await,
    }
}

/// Never fails: any error, including a timeout or an empty answer, yields
/// [`FALLBACK_QUOTE`].
#[instrument(skip(source))]
pub async fn motivational_line_or_fallback<Q>(source: &Q, timeout: Option<Duration>) -> String
where
    Q: QuoteSource + ?Sized,
{
    match with_timeout(timeout, source.motivational_line()).await {
        Ok(line) if !line.trim().is_empty() => line.trim().to_string(),
        Ok(_) => {
            warn!("quote source returned an empty line; using fallback");
            FALLBACK_QUOTE.to_string()
        }
        Err(err) => {
            warn!(error = %format!("{err:#}"), "quote fetch failed; using fallback");
            FALLBACK_QUOTE.to_string()
        }
    }
}

#[instrument(skip(source))]
pub async fn suggest_tasks_or_empty<Q>(source: &Q, goal: &str, timeout: Option<Duration>) -> Vec<String>
where
    Q: QuoteSource + ?Sized,
{
    match with_timeout(timeout, source.suggest_tasks(goal)).await {
        Ok(tasks) => tasks
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect(),
        Err(err) => {
            warn!(error = %format!("{err:#}"), "task suggestion failed");
            Vec::new()
        }
    }
}

/// Handle to the one-shot startup fetch.
#[derive(Debug)]
pub struct QuoteFetch {
    handle: JoinHandle<()>,
}

impl QuoteFetch {
    pub fn cancel(&self) {
        self.handle.abort();
    }
}

/// Starts the quote fetch on the current tokio runtime. The result, real or
/// fallback, is sent back as [`Action::QuoteLoaded`]. Must be called from
/// within a runtime.
pub fn spawn_quote_fetch<Q>(source: Arc<Q>, timeout: Option<Duration>, tx: UnboundedSender<Action>) -> QuoteFetch
where
    Q: QuoteSource + Send + Sync + 'static,
{
    let handle = tokio::spawn(async move {
        let line = motivational_line_or_fallback(source.as_ref(), timeout).await;
        if tx.send(Action::QuoteLoaded(line)).is_err() {
            debug!("quote receiver dropped before delivery");
        } else {
            info!("quote delivered");
        }
    });
    QuoteFetch { handle }
}
