//! Runtime configuration, read once from the process environment at cold start.

use serde::Deserialize;

fn default_model_id() -> String {
    "anthropic.claude-v2:1".to_string()
}

fn default_max_tokens() -> u32 {
    600
}

fn default_language_code() -> String {
    "ja".to_string()
}

fn default_top_n() -> usize {
    5
}

fn default_region() -> String {
    "ap-northeast-1".to_string()
}

fn default_slack_api_base_url() -> String {
    "https://slack.com/api".to_string()
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("{0} must not be empty")]
    Empty(&'static str),
    #[error("{name} out of range: {value}")]
    OutOfRange { name: &'static str, value: usize },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Mention token that addresses the bot, e.g. `<@U0123ABCD>` (`SLACK_MENTION_ID`).
    pub slack_mention_id: String,
    /// Kendra index to retrieve from (`KENDRA_INDEX_ID`).
    pub kendra_index_id: String,
    /// Channel that receives answers (`SLACK_CHANNEL_ID`).
    pub slack_channel_id: String,
    /// Bot token for `chat.postMessage` (`SLACK_BOT_TOKEN`).
    pub slack_bot_token: String,
    /// Enables request signature verification when set (`SLACK_SIGNING_SECRET`).
    #[serde(default)]
    pub slack_signing_secret: Option<String>,
    #[serde(default = "default_model_id")]
    pub bedrock_model_id: String,
    #[serde(default = "default_max_tokens")]
    pub bedrock_max_tokens: u32,
    #[serde(default = "default_language_code")]
    pub kendra_language_code: String,
    #[serde(default = "default_top_n")]
    pub kendra_top_n: usize,
    #[serde(default = "default_region")]
    pub aws_service_region: String,
    #[serde(default = "default_slack_api_base_url")]
    pub slack_api_base_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::build(config::Environment::default())
    }

    /// Loads from an explicit variable set instead of the process environment.
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars: config::Map<String, String> = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self::build(config::Environment::default().source(Some(vars)))
    }

    fn build(env: config::Environment) -> Result<Self, ConfigError> {
        let config: Config = config::Config::builder()
            .add_source(env)
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("SLACK_MENTION_ID", &self.slack_mention_id),
            ("KENDRA_INDEX_ID", &self.kendra_index_id),
            ("SLACK_CHANNEL_ID", &self.slack_channel_id),
            ("SLACK_BOT_TOKEN", &self.slack_bot_token),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::Empty(name));
            }
        }

        if self.bedrock_max_tokens == 0 {
            return Err(ConfigError::OutOfRange {
                name: "BEDROCK_MAX_TOKENS",
                value: 0,
            });
        }
        // Kendra's Retrieve API returns at most 100 passages.
        if !(1..=100).contains(&self.kendra_top_n) {
            return Err(ConfigError::OutOfRange {
                name: "KENDRA_TOP_N",
                value: self.kendra_top_n,
            });
        }

        Ok(())
    }

    /// Signing secret, ignoring a blank value.
    pub fn signing_secret(&self) -> Option<&str> {
        self.slack_signing_secret
            .as_deref()
            .filter(|s| !s.trim().is_empty())
    }
}
