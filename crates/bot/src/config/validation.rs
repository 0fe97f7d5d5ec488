use super::types::Config;
use crate::error::ConfigError;

impl Config {
    /// Validate the config: reject values the relay could never run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_irc()?;
        self.validate_channels()?;
        self.validate_listener()?;
        self.validate_reconnect()?;
        Ok(())
    }

    fn validate_irc(&self) -> Result<(), ConfigError> {
        if self.irc.server.trim().is_empty() {
            return Err(ConfigError::Invalid("irc.server must not be empty".into()));
        }
        if self.irc.port == 0 {
            return Err(ConfigError::Invalid("irc.port must not be 0".into()));
        }
        let nick = &self.irc.nickname;
        if nick.is_empty() || nick.contains(char::is_whitespace) {
            return Err(ConfigError::Invalid(format!(
                "invalid irc.nickname '{nick}'"
            )));
        }
        let timeouts = [
            ("connect_timeout_secs", self.irc.connect_timeout_secs),
            ("ping_interval_secs", self.irc.ping_interval_secs),
            ("ping_timeout_secs", self.irc.ping_timeout_secs),
            ("write_timeout_secs", self.irc.write_timeout_secs),
        ];
        for (key, secs) in timeouts {
            if secs == 0 {
                return Err(ConfigError::Invalid(format!("irc.{key} must be positive")));
            }
        }
        Ok(())
    }

    /// Channel names need a `#` or `&` prefix and no spaces or commas.
    fn validate_channels(&self) -> Result<(), ConfigError> {
        if self.channels.is_empty() {
            return Err(ConfigError::Invalid("no channels configured".into()));
        }
        for name in self.channels.keys() {
            let prefixed = name.starts_with('#') || name.starts_with('&');
            if !prefixed || name.len() < 2 || name.contains([' ', ',', '\x07']) {
                return Err(ConfigError::Invalid(format!(
                    "invalid channel name '{name}'"
                )));
            }
        }
        Ok(())
    }

    fn validate_listener(&self) -> Result<(), ConfigError> {
        if self.listener.port == 0 {
            return Err(ConfigError::Invalid("listener.port must not be 0".into()));
        }
        Ok(())
    }

    fn validate_reconnect(&self) -> Result<(), ConfigError> {
        let r = &self.reconnect;
        if r.factor.is_nan() || r.factor < 1.0 {
            return Err(ConfigError::Invalid(format!(
                "reconnect.factor must be at least 1.0, got {}",
                r.factor
            )));
        }
        if r.initial_delay_ms == 0 {
            return Err(ConfigError::Invalid(
                "reconnect.initial_delay_ms must be positive".into(),
            ));
        }
        if r.initial_delay() > r.max_delay() {
            return Err(ConfigError::Invalid(
                "reconnect.initial_delay_ms exceeds reconnect.max_delay_secs".into(),
            ));
        }
        Ok(())
    }
}
