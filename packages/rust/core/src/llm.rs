//! Language-model collaborators.
//!
//! Two narrow traits keep the pipeline testable:
//! - [`QueryGenerator`] turns a question into a SQL query string
//! - [`AnswerGenerator`] turns a system prompt plus user message into prose
//!
//! [`OpenRouterClient`] implements both against an OpenAI-compatible
//! `/chat/completions` endpoint.

use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use medsource_shared::{MedSourceError, OpenRouterConfig, Result};

/// Instructions given to the answer generator with every question.
pub const SYSTEM_PROMPT: &str = "\
You are a medical side-effects assistant.

Your job:
- Summarize side-effect information from structured SQLite based FDA data and scraped web documents.
- Annotate each side effect with its source(s) using the SOURCE MAP.
- Never invent side effects or sources.
- If information is missing, say so.
- Keep explanations clear and patient-friendly.

Format example:
- nausea (FDA Data from SQLite)
- dizziness (drugs.com)
- rash (fda.gov, mayoclinic.org)
";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Produces a natural-language answer.
pub trait AnswerGenerator: Send + Sync {
    fn generate(
        &self,
        system_prompt: &str,
        user_message: &str,
    ) -> impl Future<Output = Result<String>> + Send;
}

/// Produces a SQL query for a question. The result is untrusted.
pub trait QueryGenerator: Send + Sync {
    fn generate_query(
        &self,
        question: &str,
        medication: Option<&str>,
    ) -> impl Future<Output = Result<String>> + Send;
}

/// System prompt for SQL generation against `table`.
pub fn query_prompt(table: &str, medication: Option<&str>) -> String {
    let mut prompt = format!(
        "You are a SQL generator. Convert the user's natural-language question \
         into a safe SQLite SELECT query against a table named {table} with columns: \
         medication, side_effect, drug_manufacturer, drug_suspicion, outcome.\n\
         \n\
         Rules:\n\
         - ALWAYS use: SELECT * FROM {table}\n\
         - NEVER select individual columns.\n\
         - Never modify, insert, update, or delete data.\n\
         - Use LIKE for fuzzy matching.\n\
         - If a medication name is provided, ALWAYS filter using: \
         WHERE LOWER(medication) LIKE '%<medication>%'\n\
         - Return only SQL, no explanation.\n"
    );

    if let Some(med) = medication.map(str::trim).filter(|m| !m.is_empty()) {
        prompt.push_str(&format!(
            "\nThe medication name is '{med}'. Always include a WHERE clause that \
             filters medication using LIKE '%{}%'.\n",
            med.to_lowercase()
        ));
    }

    prompt
}

// ---------------------------------------------------------------------------
// OpenRouter client
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Chat-completions client for OpenRouter (or any OpenAI-compatible API).
#[derive(Clone)]
pub struct OpenRouterClient {
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    table: String,
    client: Client,
}

impl OpenRouterClient {
    /// Build a client. `table` names the table generated queries must target.
    pub fn new(config: &OpenRouterConfig, api_key: String, table: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| MedSourceError::Llm(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.default_model.clone(),
            temperature: config.temperature,
            table: table.to_string(),
            client,
        })
    }

    /// Override the model from config.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    #[instrument(skip_all, fields(model = %self.model))]
    async fn chat(&self, system_prompt: &str, user_message: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_message,
                },
            ],
            temperature: self.temperature,
        };

        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| MedSourceError::Llm(e.to_string()))?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(MedSourceError::Llm(format!("HTTP {status}: {text}")));
        }

        let payload: ChatResponse = res
            .json()
            .await
            .map_err(|e| MedSourceError::Llm(format!("malformed response: {e}")))?;

        let content = payload
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| MedSourceError::Llm("empty response".into()))?;

        debug!(chars = content.len(), "chat completion received");
        Ok(content)
    }
}

impl AnswerGenerator for OpenRouterClient {
    async fn generate(&self, system_prompt: &str, user_message: &str) -> Result<String> {
        self.chat(system_prompt, user_message).await
    }
}

impl QueryGenerator for OpenRouterClient {
    async fn generate_query(&self, question: &str, medication: Option<&str>) -> Result<String> {
        let prompt = query_prompt(&self.table, medication);
        self.chat(&prompt, question).await
    }
}
