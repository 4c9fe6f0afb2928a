// src/analyze/openai.rs
//! OpenAI-compatible chat-completions judge.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::analyze::judge::RelevanceJudge;
use crate::error::{ConfigError, JudgeError};
use crate::types::InterestProfile;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

const SYSTEM_PROMPT: &str = "You are a helpful assistant with expertise in scientific research that annotates papers according to the user's preferences. \
Answer with a JSON object with the keys \"reason\" (one or two sentences), \"is_relevant\" (boolean) and \"relevance_score\" \
(integer between 1 and 10, where 1 is the lowest and 10 is the highest). Be granular in your scores. \
If the user expressed both methodological and applied interests, papers matching both are more relevant than papers matching only one. \
Be selective, and do not be afraid to say that a paper is not relevant if it is barely related to the user's preferences.";

pub struct OpenAiJudge {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiJudge {
    pub fn new(
        api_key: String,
        base_url: Option<&str>,
        model: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, ConfigError> {
        if api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey("OPENAI_API_KEY".into()));
        }
        let http = reqwest::Client::builder()
            .user_agent(crate::ingest::fetch::DEFAULT_USER_AGENT)
            .connect_timeout(Duration::from_secs(5))
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;
        Ok(Self {
            http,
            api_key,
            base_url: base_url.unwrap_or(DEFAULT_BASE_URL).trim_end_matches('/').to_string(),
            model: model.unwrap_or(DEFAULT_MODEL).to_string(),
        })
    }
}

pub(crate) fn user_prompt(entry_text: &str, profile: &InterestProfile) -> String {
    format!(
        "<user_preferences>\n{}\n</user_preferences>\n\n<paper>\n{}\n</paper>",
        profile.as_str(),
        entry_text
    )
}

#[derive(Serialize)]
struct Msg<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
}

#[derive(Serialize)]
struct Req<'a> {
    model: &'a str,
    messages: Vec<Msg<'a>>,
    temperature: f32,
    max_tokens: u32,
    response_format: ResponseFormat<'a>,
}

#[derive(Deserialize)]
struct Resp {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMsg,
}

#[derive(Deserialize)]
struct ChoiceMsg {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl RelevanceJudge for OpenAiJudge {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn judge(&self, entry_text: &str, profile: &InterestProfile) -> Result<String, JudgeError> {
        let user = user_prompt(entry_text, profile);
        let req = Req {
            model: &self.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                Msg {
                    role: "user",
                    content: &user,
                },
            ],
            temperature: 0.0,
            max_tokens: 200,
            response_format: ResponseFormat { kind: "json_object" },
        };

        let resp = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .map_err(|e| JudgeError::Transient(e.to_string()))?;

        let status = resp.status();
        if status.as_u16() == 429 || status.is_server_error() {
            return Err(JudgeError::Transient(format!("HTTP {status}")));
        }
        if !status.is_success() {
            return Err(JudgeError::Rejected(format!("HTTP {status}")));
        }

        let body: Resp = resp
            .json()
            .await
            .map_err(|e| JudgeError::Transient(format!("reading response: {e}")))?;
        Ok(body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default())
    }
}
