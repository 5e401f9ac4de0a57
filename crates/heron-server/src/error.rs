use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {env_var}")]
    MissingEnvVar { env_var: String },
    #[error("Configuration error: {0}")]
    Other(#[from] config::ConfigError),
}

/// Map a dotted configuration key onto the environment variable that sets it,
/// e.g. `provider.api_key` -> `HERON_PROVIDER__API_KEY`
pub fn to_env_var(field_path: &str) -> String {
    format!(
        "HERON_{}",
        field_path.replace('.', "__").to_uppercase()
    )
}
