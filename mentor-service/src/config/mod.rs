use service_core::config as core_config;
use service_core::error::AppError;
use std::env;

#[derive(Debug, Clone)]
pub struct MentorConfig {
    pub common: core_config::Config,
    pub mongodb: MongoConfig,
    pub openai: OpenAiSettings,
    pub models: ModelConfig,
    pub pipeline: PipelineConfig,
    pub images: ImageStoreConfig,
}

#[derive(Debug, Clone)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
}

#[derive(Debug, Clone)]
pub struct OpenAiSettings {
    /// Bearer credential. May be empty in dev; every completion then
    /// fails with a "not configured" error rather than at startup.
    pub api_key: String,
    pub api_base: String,
}

#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// Model for ordinary text turns (e.g. gpt-4o-mini).
    pub chat_model: String,
    /// Vision-capable model selected when a turn carries an image.
    pub vision_model: String,
}

/// Prompt-size and trigger caps. These bound token cost and latency, not
/// correctness; all of them are env-tunable.
#[derive(Debug, Clone, Copy)]
pub struct PipelineConfig {
    /// Most recent messages replayed as conversation context.
    pub history_limit: usize,
    /// Knowledge-base matches folded into the prompt.
    pub knowledge_limit: usize,
    /// Per-snippet excerpt length in characters.
    pub snippet_chars: usize,
    /// Memory summarization runs only once a chat reaches this many messages.
    pub memory_trigger_floor: u64,
    /// ...and then only when the total is a multiple of this.
    pub memory_trigger_interval: u64,
    /// In-task guard: chats below this size are never summarized.
    pub memory_min_messages: usize,
    pub reply_max_tokens: u32,
    pub reply_temperature: f32,
}

#[derive(Debug, Clone)]
pub struct ImageStoreConfig {
    pub local_path: String,
    /// Base URL prefixed to signed download links.
    pub public_base_url: String,
    pub signing_secret: String,
    pub url_ttl_seconds: i64,
}

impl MentorConfig {
    pub fn load() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;
        let is_prod = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()) == "prod";

        Ok(MentorConfig {
            common: common_config,
            mongodb: MongoConfig {
                uri: get_env("MONGODB_URI", Some("mongodb://localhost:27017"), is_prod)?,
                database: get_env("MONGODB_DATABASE", Some("magister_db"), is_prod)?,
            },
            openai: OpenAiSettings {
                api_key: get_env("OPENAI_API_KEY", Some(""), is_prod)?,
                api_base: get_env("OPENAI_API_BASE", Some("https://api.openai.com/v1"), is_prod)?,
            },
            models: ModelConfig {
                chat_model: get_env("MENTOR_CHAT_MODEL", Some("gpt-4o-mini"), is_prod)?,
                vision_model: get_env("MENTOR_VISION_MODEL", Some("gpt-4o"), is_prod)?,
            },
            pipeline: PipelineConfig {
                history_limit: parse_env("MENTOR_HISTORY_LIMIT", 10, is_prod)?,
                knowledge_limit: parse_env("MENTOR_KNOWLEDGE_LIMIT", 3, is_prod)?,
                snippet_chars: parse_env("MENTOR_SNIPPET_CHARS", 500, is_prod)?,
                memory_trigger_floor: parse_env("MENTOR_MEMORY_TRIGGER_FLOOR", 6, is_prod)?,
                memory_trigger_interval: parse_env("MENTOR_MEMORY_TRIGGER_INTERVAL", 4, is_prod)?,
                memory_min_messages: parse_env("MENTOR_MEMORY_MIN_MESSAGES", 4, is_prod)?,
                reply_max_tokens: parse_env("MENTOR_REPLY_MAX_TOKENS", 1000, is_prod)?,
                reply_temperature: parse_env("MENTOR_REPLY_TEMPERATURE", 0.7, is_prod)?,
            },
            images: ImageStoreConfig {
                local_path: get_env("IMAGE_STORE_PATH", Some("./data/images"), is_prod)?,
                public_base_url: get_env(
                    "IMAGE_PUBLIC_BASE_URL",
                    Some("http://localhost:8080"),
                    is_prod,
                )?,
                signing_secret: get_env("IMAGE_SIGNING_SECRET", Some("dev-image-secret"), is_prod)?,
                url_ttl_seconds: parse_env("IMAGE_URL_TTL_SECONDS", 3600, is_prod)?,
            },
        })
    }

    /// Pick the model for a turn: the vision model when an image is
    /// attached, the lighter chat model otherwise.
    pub fn model_for_turn(&self, has_image: bool) -> &str {
        if has_image {
            &self.models.vision_model
        } else {
            &self.models.chat_model
        }
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}

fn parse_env<T>(key: &str, default: T, is_prod: bool) -> Result<T, AppError>
where
    T: std::str::FromStr + std::fmt::Display + Copy,
{
    let raw = get_env(key, Some(&default.to_string()), is_prod)?;
    Ok(raw.parse().unwrap_or(default))
}
