use thiserror::Error;

/// Errors raised while loading or validating `nagbot.toml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("config error: {0}")]
    Invalid(String),

    #[error("environment variable '{0}' is not set")]
    MissingEnv(String),
}

/// Errors that prevent the relay from starting. Once running, nothing is fatal.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("alert listener error: {0}")]
    Listener(#[from] nagbot_alert::AlertError),
}
