use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AlertError;

/// The closed set of alert kinds accepted on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    Service,
    Host,
    Rebuild,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Service => "service",
            Self::Host => "host",
            Self::Rebuild => "rebuild",
        }
    }
}

impl FromStr for AlertKind {
    type Err = AlertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "service" => Ok(Self::Service),
            "host" => Ok(Self::Host),
            "rebuild" => Ok(Self::Rebuild),
            other => Err(AlertError::UnknownKind(other.to_string())),
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed alert, one variant per [`AlertKind`].
///
/// Notification types and states are kept as the raw Nagios tokens
/// (`PROBLEM`, `CRITICAL`, `UNREACHABLE`, ...). Unrecognized values are valid
/// and simply render without color.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AlertRecord {
    Service {
        notification_type: String,
        host_name: String,
        service_description: String,
        service_state: String,
        service_output: String,
    },
    Host {
        notification_type: String,
        host_name: String,
        host_state: String,
        host_output: String,
    },
    Rebuild {
        details: Vec<String>,
    },
}

impl AlertRecord {
    pub fn kind(&self) -> AlertKind {
        match self {
            Self::Service { .. } => AlertKind::Service,
            Self::Host { .. } => AlertKind::Host,
            Self::Rebuild { .. } => AlertKind::Rebuild,
        }
    }

    /// Host the alert is about, if any. Used as a logging field.
    pub fn host_name(&self) -> Option<&str> {
        match self {
            Self::Service { host_name, .. } | Self::Host { host_name, .. } => Some(host_name),
            Self::Rebuild { .. } => None,
        }
    }
}
