use thiserror::Error;

/// Errors raised while receiving or decoding alert datagrams.
#[derive(Debug, Error)]
pub enum AlertError {
    #[error("empty alert payload")]
    Empty,

    #[error("unknown alert kind: {0:?}")]
    UnknownKind(String),

    #[error("{kind} alert is missing field '{field}'")]
    MissingField {
        kind: &'static str,
        field: &'static str,
    },

    #[error("listener I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AlertError {
    /// True for malformed-packet errors (the packet is dropped, the listener keeps going).
    pub fn is_parse_error(&self) -> bool {
        !matches!(self, Self::Io(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_kind_is_a_parse_error() {
        assert!(AlertError::UnknownKind("disk".into()).is_parse_error());
        assert!(AlertError::Empty.is_parse_error());
        let io = AlertError::from(std::io::Error::other("boom"));
        assert!(!io.is_parse_error());
    }

    #[test]
    fn missing_field_message_names_kind_and_field() {
        let err = AlertError::MissingField {
            kind: "host",
            field: "host_state",
        };
        assert_eq!(err.to_string(), "host alert is missing field 'host_state'");
    }
}
