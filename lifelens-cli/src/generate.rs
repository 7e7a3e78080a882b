//! Generation client: plain JSON POST to an OpenAI- or Anthropic-style chat
//! endpoint, plus the tolerant parsing of what comes back.
//!
//! The engine never trusts this layer: candidate items go through
//! `sanitize_candidate` and the allocator, polished findings are shape-checked
//! against the rule findings they rephrase.

use anyhow::{Context, Result, bail};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};

use lifelens_core::RawCandidate;

use crate::config::Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenAI,
    Anthropic,
}

pub const OPENAI_KEY_ENV: &str = "LIFELENS_OPENAI_API_KEY";
pub const ANTHROPIC_TOKEN_ENV: &str = "LIFELENS_ANTHROPIC_TOKEN";

/// Explicitly constructed per command; there is no process-wide client.
#[derive(Debug, Clone)]
pub struct GenerationClient {
    provider: Provider,
    model: String,
    base_url: String,
    temperature: f32,
    client: reqwest::Client,
}

impl GenerationClient {
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let provider = match cfg.generation.provider.trim().to_lowercase().as_str() {
            "openai" => Provider::OpenAI,
            "anthropic" => Provider::Anthropic,
            other => bail!("unknown generation provider: {other}"),
        };
        Ok(Self {
            provider,
            model: cfg.generation.model.clone(),
            base_url: cfg.generation.base_url.trim_end_matches('/').to_string(),
            temperature: cfg.generation.temperature,
            client: reqwest::Client::new(),
        })
    }

    pub async fn complete(&self, system: &str, user: &str) -> Result<String> {
        match self.provider {
            Provider::OpenAI => self.openai_complete(system, user).await,
            Provider::Anthropic => self.anthropic_complete(system, user).await,
        }
    }

    async fn openai_complete(&self, system: &str, user: &str) -> Result<String> {
        let key = std::env::var(OPENAI_KEY_ENV)
            .with_context(|| format!("{OPENAI_KEY_ENV} is not set"))?;

        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }

        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            temperature: f32,
        }

        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }

        #[derive(Deserialize)]
        struct Choice {
            message: MsgOut,
        }

        #[derive(Deserialize)]
        struct MsgOut {
            content: Option<String>,
        }

        let body = Req {
            model: &self.model,
            messages: vec![
                Msg { role: "system", content: system },
                Msg { role: "user", content: user },
            ],
            temperature: self.temperature,
        };

        let resp = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .header(AUTHORIZATION, format!("Bearer {key}"))
            .json(&body)
            .send()
            .await
            .context("openai request")?;

        let status = resp.status();
        if !status.is_success() {
            let txt = resp.text().await.unwrap_or_default();
            bail!("openai error: {status} {txt}");
        }

        let out: Resp = resp.json().await.context("parse openai response")?;
        let content = out
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();
        Ok(content.trim().to_string())
    }

    async fn anthropic_complete(&self, system: &str, user: &str) -> Result<String> {
        let token = std::env::var(ANTHROPIC_TOKEN_ENV)
            .with_context(|| format!("{ANTHROPIC_TOKEN_ENV} is not set"))?;

        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }

        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            max_tokens: i32,
            system: &'a str,
            messages: Vec<Msg<'a>>,
        }

        #[derive(Deserialize)]
        struct Resp {
            content: Vec<ContentBlock>,
        }

        #[derive(Deserialize)]
        struct ContentBlock {
            #[serde(rename = "type")]
            t: String,
            text: Option<String>,
        }

        let body = Req {
            model: &self.model,
            max_tokens: 2048,
            system,
            messages: vec![Msg { role: "user", content: user }],
        };

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {token}"))?);
        headers.insert("anthropic-version", HeaderValue::from_static("2023-06-01"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let resp = self
            .client
            .post("https://api.anthropic.com/v1/messages")
            .headers(headers)
            .json(&body)
            .send()
            .await
            .context("anthropic request")?;

        let status = resp.status();
        if !status.is_success() {
            let txt = resp.text().await.unwrap_or_default();
            bail!("anthropic error: {status} {txt}");
        }

        let out: Resp = resp.json().await.context("parse anthropic response")?;
        let mut s = String::new();
        for b in out.content {
            if b.t == "text"
                && let Some(t) = b.text
            {
                s.push_str(&t);
            }
        }
        Ok(s.trim().to_string())
    }
}

/// Strip a markdown code fence if the model wrapped its JSON in one.
pub fn extract_json(payload: &str) -> &str {
    let t = payload.trim();
    let Some(rest) = t.strip_prefix("```") else {
        return t;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.trim_start_matches(['\r', '\n'])
        .trim_end_matches('`')
        .trim()
}

/// Parse a candidate-items payload. Accepts `{"items": [...]}`, a bare
/// array, or `{"plan": [...]}`.
pub fn parse_items(payload: &str) -> Result<Vec<RawCandidate>> {
    let value: serde_json::Value =
        serde_json::from_str(extract_json(payload)).context("items payload is not valid JSON")?;
    let items = match &value {
        serde_json::Value::Array(items) => items.clone(),
        serde_json::Value::Object(map) => {
            match map.get("items").or_else(|| map.get("plan")) {
                Some(serde_json::Value::Array(items)) => items.clone(),
                _ => bail!("items payload has no items array"),
            }
        }
        _ => bail!("items payload has no items array"),
    };
    items
        .into_iter()
        .map(serde_json::from_value)
        .collect::<std::result::Result<_, _>>()
        .context("candidate rows are malformed")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_items_accepts_all_shapes() {
        let wrapped = r#"{"items": [{"title": "a", "start_time": "2026-04-02T09:00:00Z"}]}"#;
        let plan_key = r#"{"plan": [{"title": "a", "start_time": "2026-04-02T09:00:00Z"}]}"#;
        let bare = r#"[{"title": "a", "start_time": "2026-04-02T09:00:00Z"}]"#;
        for payload in [wrapped, plan_key, bare] {
            let items = parse_items(payload).unwrap();
            assert_eq!(items.len(), 1);
            assert_eq!(items[0].title.as_deref(), Some("a"));
        }
    }

    #[test]
    fn test_parse_items_strips_code_fence() {
        let fenced = "```json\n{\"items\": []}\n```";
        assert!(parse_items(fenced).unwrap().is_empty());
    }

    #[test]
    fn test_parse_items_rejects_other_shapes() {
        assert!(parse_items(r#"{"notes": "hi"}"#).is_err());
        assert!(parse_items("42").is_err());
        assert!(parse_items("not json at all").is_err());
    }
}
