use crate::error::{to_env_var, ConfigError};
use config::{Config, Environment};
use heron::agent::DEFAULT_MAX_ITERATIONS;
use heron::providers::configs::{OpenAiProviderConfig, OPENAI_HOST, OPENAI_MODEL};
use heron::tools::mcp::{McpToolHostConfig, McpTransport, MCP_URL};
use serde::Deserialize;
use std::net::{AddrParseError, SocketAddr};

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerSettings {
    pub fn socket_addr(&self) -> Result<SocketAddr, AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderSettings {
    #[serde(default = "default_provider_host")]
    pub host: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<i32>,
    #[serde(default = "default_provider_timeout")]
    pub timeout_secs: u64,
}

impl ProviderSettings {
    pub fn to_config(&self) -> OpenAiProviderConfig {
        OpenAiProviderConfig {
            host: self.host.clone(),
            api_key: self.api_key.clone(),
            model: self.model.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            timeout_secs: self.timeout_secs,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ToolSettings {
    #[serde(default = "default_tools_url")]
    pub url: String,
    #[serde(default = "default_tools_timeout")]
    pub timeout_secs: u64,
    /// `sse` or `streamable_http`; detected from the URL when unset
    #[serde(default)]
    pub transport: Option<McpTransport>,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            url: default_tools_url(),
            timeout_secs: default_tools_timeout(),
            transport: None,
        }
    }
}

impl ToolSettings {
    pub fn to_config(&self) -> McpToolHostConfig {
        McpToolHostConfig {
            url: self.url.clone(),
            timeout_secs: self.timeout_secs,
            transport: self.transport,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgentSettings {
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    pub provider: ProviderSettings,
    #[serde(default)]
    pub tools: ToolSettings,
    #[serde(default)]
    pub agent: AgentSettings,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::load_and_validate()
    }

    fn load_and_validate() -> Result<Self, ConfigError> {
        let config = Config::builder()
            // Server defaults
            .set_default("server.host", default_host())?
            .set_default("server.port", default_port())?
            // Provider defaults
            .set_default("provider.host", default_provider_host())?
            .set_default("provider.model", default_model())?
            // Tool service defaults
            .set_default("tools.url", default_tools_url())?
            // Layer on the environment variables
            .add_source(
                Environment::with_prefix("HERON")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Self = match config.try_deserialize() {
            Ok(settings) => settings,
            Err(err) => {
                tracing::debug!("Configuration error: {:?}", &err);
                return Err(missing_field_error(err));
            }
        };

        if settings.provider.api_key.is_empty() {
            return Err(ConfigError::MissingEnvVar {
                env_var: to_env_var("provider.api_key"),
            });
        }
        Ok(settings)
    }
}

/// Report a missing field as the environment variable that would supply it
fn missing_field_error(err: config::ConfigError) -> ConfigError {
    if let config::ConfigError::NotFound(field) = &err {
        return ConfigError::MissingEnvVar {
            env_var: to_env_var(field),
        };
    }

    // "missing field `api_key`", optionally followed by the key it belongs to
    let message = err.to_string();
    let field = message
        .strip_prefix("missing field `")
        .and_then(|rest| rest.split_once('`'));
    match field {
        Some((field, _)) => ConfigError::MissingEnvVar {
            env_var: to_env_var(field),
        },
        None => ConfigError::Other(err),
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_provider_host() -> String {
    OPENAI_HOST.to_string()
}

fn default_model() -> String {
    OPENAI_MODEL.to_string()
}

fn default_provider_timeout() -> u64 {
    600
}

fn default_tools_url() -> String {
    MCP_URL.to_string()
}

fn default_tools_timeout() -> u64 {
    60
}

fn default_max_iterations() -> usize {
    DEFAULT_MAX_ITERATIONS
}
