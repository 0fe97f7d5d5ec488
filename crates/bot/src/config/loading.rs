use std::path::Path;
use std::time::Duration;

use nagbot_irc::SessionConfig;

use super::types::{Config, ReconnectConfig};
use crate::backoff::Backoff;
use crate::error::ConfigError;

impl Config {
    /// Parse config from a TOML string, then apply environment overrides,
    /// resolve `${VAR}` secrets and validate.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Self::from_toml_with(toml_str, |key| std::env::var(key).ok())
    }

    /// Load config from a file path.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    /// Like [`Config::from_toml`] with an explicit environment lookup.
    pub fn from_toml_with<F>(toml_str: &str, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config: Self = toml::from_str(toml_str)?;
        config.apply_env_overrides(&lookup);
        config.resolve_secrets(&lookup)?;
        config.apply_secret_overrides(&lookup);
        config.validate()?;
        Ok(config)
    }

    /// Identity and channel table for each IRC session.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            nickname: self.irc.nickname.clone(),
            realname: self.irc.realname.clone(),
            nickserv_password: self.irc.nickserv_password.clone(),
            oper: self.irc.oper.clone(),
            channels: self.channels.clone(),
        }
    }

    // ── Environment variable overrides ──────────────────────────────

    /// Apply environment variable overrides.
    ///
    /// - `NAGBOT_IRC_SERVER` -> `irc.server`
    /// - `NAGBOT_IRC_PORT` -> `irc.port`
    /// - `NAGBOT_IRC_NICKNAME` -> `irc.nickname`
    /// - `NAGBOT_LISTEN_PORT` -> `listener.port`
    ///
    /// Unparseable port values are ignored.
    pub(crate) fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("NAGBOT_IRC_SERVER") {
            self.irc.server = v;
        }
        if let Some(v) = lookup("NAGBOT_IRC_PORT") {
            if let Ok(port) = v.parse::<u16>() {
                self.irc.port = port;
            }
        }
        if let Some(v) = lookup("NAGBOT_IRC_NICKNAME") {
            self.irc.nickname = v;
        }
        if let Some(v) = lookup("NAGBOT_LISTEN_PORT") {
            if let Ok(port) = v.parse::<u16>() {
                self.listener.port = port;
            }
        }
    }

    /// Secrets set directly in the environment. Applied after `${VAR}`
    /// resolution, so the value is used verbatim.
    ///
    /// - `NAGBOT_NICKSERV_PASSWORD` -> `irc.nickserv_password`
    pub(crate) fn apply_secret_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("NAGBOT_NICKSERV_PASSWORD") {
            self.irc.nickserv_password = Some(v);
        }
    }

    /// Replace `${VAR}` references in every secret field.
    pub(crate) fn resolve_secrets<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(password) = self.irc.nickserv_password.as_mut() {
            *password = resolve_env_refs(password, &lookup)?;
        }
        if let Some(oper) = self.irc.oper.as_mut() {
            oper.password = resolve_env_refs(&oper.password, &lookup)?;
        }
        for channel in self.channels.values_mut() {
            if let Some(password) = channel.password.as_mut() {
                *password = resolve_env_refs(password, &lookup)?;
            }
        }
        Ok(())
    }
}

impl ReconnectConfig {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_secs(self.max_delay_secs)
    }

    pub fn stable_after(&self) -> Duration {
        Duration::from_secs(self.stable_after_secs)
    }

    /// Fresh backoff state for one supervisor.
    pub fn backoff(&self) -> Backoff {
        Backoff::new(self.initial_delay(), self.max_delay(), self.factor)
            .with_stable_after(self.stable_after())
    }
}

/// Expand `${VAR_NAME}` patterns in `input` via `lookup`.
pub(crate) fn resolve_env_refs<F>(input: &str, lookup: F) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next();
            let mut var_name = String::new();
            let mut closed = false;
            for c in chars.by_ref() {
                if c == '}' {
                    closed = true;
                    break;
                }
                var_name.push(c);
            }
            if !closed {
                return Err(ConfigError::Invalid(
                    "unclosed environment variable reference".into(),
                ));
            }
            let value = lookup(&var_name).ok_or(ConfigError::MissingEnv(var_name))?;
            result.push_str(&value);
        } else {
            result.push(ch);
        }
    }

    Ok(result)
}
