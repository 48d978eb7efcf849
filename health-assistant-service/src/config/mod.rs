use secrecy::Secret;
use service_core::config as core_config;
use service_core::error::AppError;
use service_core::retry::RetryPolicy;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Gemini API base URL.
pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

const DEFAULT_SYSTEM_INSTRUCTION: &str = "\
You are a virtual assistant specialised in health.
Only answer questions related to health.
If a question is not about health, reply: \"I'm sorry, I am only programmed to answer health-related questions.\"
Answer clearly, concisely and kindly.";

const DEFAULT_FALLBACK_MESSAGE: &str =
    "Sorry, the assistant is temporarily unavailable. Please try again in a moment.";

const DEFAULT_TIPS: [&str; 10] = [
    "Drink at least 1.5 litres of water a day.",
    "Walk for 30 minutes every day.",
    "Sleep 7 to 8 hours a night.",
    "Eat 5 portions of fruit and vegetables a day.",
    "Practise deep breathing.",
    "Take regular breaks.",
    "Wash your hands frequently.",
    "Limit screen time before going to bed.",
    "Stretch every day.",
    "See your doctor for regular check-ups.",
];

#[derive(Debug, Clone)]
pub struct AssistantConfig {
    pub common: core_config::Config,
    pub google: GoogleConfig,
    pub model: ModelConfig,
    pub retry: RetrySettings,
    pub assistant: AssistantSettings,
    pub cors: CorsConfig,
}

/// Whether a missing credential stops the process or only disables the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeploymentMode {
    Development,
    Production,
}

#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub api_key: Option<Secret<String>>,
    pub api_base: String,
}

#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// Model identifier (e.g., gemini-2.0-flash)
    pub text_model: String,
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<i32>,
    /// Budget for one model call including every retry. `None` disables it.
    pub request_timeout: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
}

#[derive(Debug, Clone)]
pub struct AssistantSettings {
    pub system_instruction: String,
    pub failure_policy: FailurePolicy,
    pub fallback_message: String,
    pub tip_source: TipSource,
    pub tips: Vec<String>,
    /// Keep only the most recent N history turns in chat prompts.
    pub max_history_turns: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct CorsConfig {
    /// Empty means any origin is allowed.
    pub allowed_origins: Vec<String>,
}

/// What a handler does when the model call ultimately fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Report a server error to the caller.
    Propagate,
    /// Answer with the configured apologetic message.
    Fallback,
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "propagate" | "error" => Ok(FailurePolicy::Propagate),
            "fallback" => Ok(FailurePolicy::Fallback),
            other => Err(format!("unknown failure policy '{}'", other)),
        }
    }
}

/// Where `/api/tip` gets its tip from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TipSource {
    /// One entry of the fixed list per calendar day.
    Daily,
    /// Generated by the model.
    Model,
}

impl FromStr for TipSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" | "list" => Ok(TipSource::Daily),
            "model" | "generated" => Ok(TipSource::Model),
            other => Err(format!("unknown tip source '{}'", other)),
        }
    }
}

impl AssistantConfig {
    pub fn load() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;
        Self::from_source(common_config, |key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_source<F>(common: core_config::Config, lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let source = Source { lookup };

        let mode = match source.get("ENVIRONMENT").as_deref() {
            Some("prod") | Some("production") => DeploymentMode::Production,
            _ => DeploymentMode::Development,
        };

        let api_key = source.get("GOOGLE_API_KEY").filter(|k| !k.trim().is_empty());
        if api_key.is_none() && mode == DeploymentMode::Production {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "GOOGLE_API_KEY is required in production but not set"
            )));
        }

        let max_attempts: u32 = source.parse("MODEL_MAX_ATTEMPTS", 3)?;
        if max_attempts == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "MODEL_MAX_ATTEMPTS must be at least 1"
            )));
        }
        let initial_delay_ms: u64 = source.parse("MODEL_INITIAL_DELAY_MS", 1000)?;
        if initial_delay_ms == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "MODEL_INITIAL_DELAY_MS must be greater than 0"
            )));
        }
        let max_delay_ms: u64 = source.parse("MODEL_MAX_DELAY_MS", 30_000)?;

        let timeout_secs: u64 = source.parse("MODEL_REQUEST_TIMEOUT_SECS", 60)?;
        let max_history_turns: usize = source.parse("MAX_HISTORY_TURNS", 0)?;

        let tips: Vec<String> = DEFAULT_TIPS.iter().map(|t| t.to_string()).collect();

        Ok(AssistantConfig {
            common,
            google: GoogleConfig {
                api_key: api_key.map(Secret::new),
                api_base: source.get_or("GEMINI_API_BASE", DEFAULT_GEMINI_API_BASE),
            },
            model: ModelConfig {
                text_model: source.get_or("GENAI_TEXT_MODEL", "gemini-2.0-flash"),
                temperature: source.parse_opt("GENAI_TEMPERATURE")?,
                max_output_tokens: source.parse_opt("GENAI_MAX_OUTPUT_TOKENS")?,
                request_timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
            },
            retry: RetrySettings {
                max_attempts,
                initial_delay_ms,
                max_delay_ms: max_delay_ms.max(initial_delay_ms),
            },
            assistant: AssistantSettings {
                system_instruction: source
                    .get("SYSTEM_INSTRUCTION")
                    .filter(|s| !s.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_SYSTEM_INSTRUCTION.to_string()),
                failure_policy: source.parse("MODEL_FAILURE_POLICY", FailurePolicy::Propagate)?,
                fallback_message: source.get_or("MODEL_FALLBACK_MESSAGE", DEFAULT_FALLBACK_MESSAGE),
                tip_source: source.parse("TIP_SOURCE", TipSource::Daily)?,
                tips,
                max_history_turns: (max_history_turns > 0).then_some(max_history_turns),
            },
            cors: CorsConfig {
                allowed_origins: parse_origins(source.get("CORS_ALLOWED_ORIGINS").as_deref()),
            },
        })
    }

    /// Retry policy for model calls.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry.max_attempts,
            Duration::from_millis(self.retry.initial_delay_ms),
        )
        .with_max_delay(Duration::from_millis(self.retry.max_delay_ms))
    }
}

fn parse_origins(raw: Option<&str>) -> Vec<String> {
    let origins: Vec<String> = raw
        .unwrap_or("*")
        .split(',')
        .map(|o| o.trim().to_string())
        .filter(|o| !o.is_empty())
        .collect();

    if origins.iter().any(|o| o == "*") {
        Vec::new()
    } else {
        origins
    }
}

struct Source<F> {
    lookup: F,
}

impl<F> Source<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
    }

    fn get_or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    fn parse<T>(&self, key: &str, default: T) -> Result<T, AppError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        Ok(self.parse_opt(key)?.unwrap_or(default))
    }

    fn parse_opt<T>(&self, key: &str) -> Result<Option<T>, AppError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get(key) {
            None => Ok(None),
            Some(raw) if raw.trim().is_empty() => Ok(None),
            Some(raw) => raw.trim().parse().map(Some).map_err(|e: T::Err| {
                AppError::ConfigError(anyhow::anyhow!("{} has an invalid value '{}': {}", key, raw, e))
            }),
        }
    }
}
