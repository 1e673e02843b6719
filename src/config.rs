use anyhow::{Context, Result, bail};
use std::net::SocketAddr;
use std::time::Duration;

const DEFAULT_BIND: &str = "0.0.0.0:3000";
const DEFAULT_API_URL: &str = "http://localhost:11434/api/generate"; // Ollama
const DEFAULT_MODEL: &str = "llama2";
const DEFAULT_TEMPERATURE: f32 = 0.7;
const DEFAULT_MAX_BODY_BYTES: usize = 20 * 1024 * 1024;
const DEFAULT_SESSION_TTL_SECS: u64 = 60 * 60;

/// Wire protocol spoken by the generation backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiStyle {
    /// `POST /api/generate` with `{"prompt": ..}`, reply `{"response": ..}`.
    Ollama,
    /// OpenAI-compatible `POST /chat/completions`.
    OpenAi,
}

impl ApiStyle {
    fn infer(api_url: &str) -> Self {
        if api_url.trim_end_matches('/').ends_with("/chat/completions") {
            ApiStyle::OpenAi
        } else {
            ApiStyle::Ollama
        }
    }
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub style: ApiStyle,
    pub temperature: f32,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind: SocketAddr,
    pub max_body_bytes: usize,
    /// Sessions idle for longer than this are dropped.
    pub session_ttl: Duration,
    pub llm: LlmConfig,
}

impl Config {
    /// Loads `.env` (if present) and reads configuration from the environment.
    pub fn from_env() -> Result<Self> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                return Err(e).context("failed to read .env");
            }
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let bind = var("CURRICULENS_BIND")
            .unwrap_or_else(|| DEFAULT_BIND.to_string())
            .parse()
            .context("CURRICULENS_BIND must be a socket address")?;

        let max_body_bytes = match var("CURRICULENS_MAX_BODY_BYTES") {
            Some(raw) => raw
                .parse()
                .context("CURRICULENS_MAX_BODY_BYTES must be a byte count")?,
            None => DEFAULT_MAX_BODY_BYTES,
        };

        let session_ttl_secs: u64 = match var("CURRICULENS_SESSION_TTL_SECS") {
            Some(raw) => raw
                .parse()
                .context("CURRICULENS_SESSION_TTL_SECS must be a number of seconds")?,
            None => DEFAULT_SESSION_TTL_SECS,
        };
        if session_ttl_secs == 0 {
            bail!("CURRICULENS_SESSION_TTL_SECS must be greater than zero");
        }

        let api_url = var("LLM_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let style = match var("LLM_API_STYLE").as_deref().map(str::to_ascii_lowercase) {
            None => ApiStyle::infer(&api_url),
            Some(style) if style == "ollama" => ApiStyle::Ollama,
            Some(style) if style == "openai" => ApiStyle::OpenAi,
            Some(other) => bail!("LLM_API_STYLE must be 'ollama' or 'openai', got '{}'", other),
        };

        let temperature = match var("LLM_TEMPERATURE") {
            Some(raw) => raw.parse().context("LLM_TEMPERATURE must be a number")?,
            None => DEFAULT_TEMPERATURE,
        };

        Ok(Config {
            bind,
            max_body_bytes,
            session_ttl: Duration::from_secs(session_ttl_secs),
            llm: LlmConfig {
                api_key: var("LLM_API_KEY").or_else(|| var("OPENAI_API_KEY")),
                model: var("LLM_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
                api_url,
                style,
                temperature,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_target_local_ollama() {
        let config = load(&[]).unwrap();
        assert_eq!(config.bind.port(), 3000);
        assert_eq!(config.llm.api_url, DEFAULT_API_URL);
        assert_eq!(config.llm.style, ApiStyle::Ollama);
        assert_eq!(config.llm.model, "llama2");
        assert!(config.llm.api_key.is_none());
        assert_eq!(config.session_ttl, Duration::from_secs(3600));
    }

    #[test]
    fn session_ttl_is_read_in_seconds() {
        let config = load(&[("CURRICULENS_SESSION_TTL_SECS", "90")]).unwrap();
        assert_eq!(config.session_ttl, Duration::from_secs(90));
        assert!(load(&[("CURRICULENS_SESSION_TTL_SECS", "0")]).is_err());
        assert!(load(&[("CURRICULENS_SESSION_TTL_SECS", "soon")]).is_err());
    }

    #[test]
    fn openai_style_is_inferred_from_url() {
        let config = load(&[
            ("LLM_API_URL", "https://api.openai.com/v1/chat/completions"),
            ("OPENAI_API_KEY", "sk-test"),
        ])
        .unwrap();
        assert_eq!(config.llm.style, ApiStyle::OpenAi);
        assert_eq!(config.llm.api_key.as_deref(), Some("sk-test"));
    }

    #[test]
    fn explicit_key_wins_over_openai_key() {
        let config = load(&[("LLM_API_KEY", "mine"), ("OPENAI_API_KEY", "theirs")]).unwrap();
        assert_eq!(config.llm.api_key.as_deref(), Some("mine"));
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(load(&[("LLM_API_STYLE", "grpc")]).is_err());
        assert!(load(&[("LLM_TEMPERATURE", "warm")]).is_err());
        assert!(load(&[("CURRICULENS_BIND", "nowhere")]).is_err());
    }
}
