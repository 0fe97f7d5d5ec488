//! Decoding of `kind||~||field||~||...` datagram payloads.

use crate::error::AlertError;
use crate::record::{AlertKind, AlertRecord};

/// Field separator. Chosen so it never shows up in normal plugin output.
pub const FIELD_DELIMITER: &str = "||~||";

/// Make a raw payload single-line.
///
/// The trailing line break added by `echo` is dropped, any remaining CR/LF is
/// escaped to the literal two-character sequences `\r` / `\n`, and surrounding
/// whitespace is trimmed.
pub fn sanitize(raw: &str) -> String {
    raw.trim_end_matches(['\r', '\n'])
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .trim()
        .to_string()
}

/// Parse a datagram payload into an [`AlertRecord`].
///
/// `service` needs 5 fields after the kind, `host` needs 4, and `rebuild`
/// needs at least one. Extra fields on `service`/`host` are ignored.
pub fn parse_payload(raw: &str) -> Result<AlertRecord, AlertError> {
    let line = sanitize(raw);
    if line.is_empty() {
        return Err(AlertError::Empty);
    }

    let mut parts = line.split(FIELD_DELIMITER);
    // split() always yields at least one item
    let kind: AlertKind = parts.next().unwrap_or_default().parse()?;
    let mut fields = Fields {
        kind: kind.as_str(),
        parts,
    };

    let record = match kind {
        AlertKind::Service => AlertRecord::Service {
            notification_type: fields.take("notification_type")?,
            host_name: fields.take("host_name")?,
            service_description: fields.take("service_description")?,
            service_state: fields.take("service_state")?,
            service_output: fields.take("service_output")?,
        },
        AlertKind::Host => AlertRecord::Host {
            notification_type: fields.take("notification_type")?,
            host_name: fields.take("host_name")?,
            host_state: fields.take("host_state")?,
            host_output: fields.take("host_output")?,
        },
        AlertKind::Rebuild => {
            let details: Vec<String> = fields.parts.map(str::to_string).collect();
            if details.is_empty() {
                return Err(AlertError::MissingField {
                    kind: "rebuild",
                    field: "details",
                });
            }
            AlertRecord::Rebuild { details }
        }
    };

    Ok(record)
}

struct Fields<I> {
    kind: &'static str,
    parts: I,
}

impl<'a, I: Iterator<Item = &'a str>> Fields<I> {
    fn take(&mut self, field: &'static str) -> Result<String, AlertError> {
        self.parts
            .next()
            .map(str::to_string)
            .ok_or(AlertError::MissingField {
                kind: self.kind,
                field,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_service_alert() {
        let rec = parse_payload(
            "service||~||PROBLEM||~||web01||~||HTTP||~||CRITICAL||~||Connection refused\n",
        )
        .unwrap();
        assert_eq!(
            rec,
            AlertRecord::Service {
                notification_type: "PROBLEM".into(),
                host_name: "web01".into(),
                service_description: "HTTP".into(),
                service_state: "CRITICAL".into(),
                service_output: "Connection refused".into(),
            }
        );
    }

    #[test]
    fn parse_host_alert() {
        let rec = parse_payload("host||~||RECOVERY||~||db01||~||UP||~||PING OK - 0% loss").unwrap();
        assert_eq!(
            rec,
            AlertRecord::Host {
                notification_type: "RECOVERY".into(),
                host_name: "db01".into(),
                host_state: "UP".into(),
                host_output: "PING OK - 0% loss".into(),
            }
        );
    }

    #[test]
    fn parse_rebuild_keeps_every_token() {
        let rec = parse_payload("rebuild||~||cache||~||invalidated||~||by deploy").unwrap();
        assert_eq!(
            rec,
            AlertRecord::Rebuild {
                details: vec!["cache".into(), "invalidated".into(), "by deploy".into()],
            }
        );
    }

    #[test]
    fn rebuild_without_details_is_rejected() {
        let err = parse_payload("rebuild").unwrap_err();
        assert!(matches!(
            err,
            AlertError::MissingField { kind: "rebuild", field: "details" }
        ));
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let err = parse_payload("disk||~||PROBLEM||~||web01").unwrap_err();
        assert!(matches!(err, AlertError::UnknownKind(k) if k == "disk"));
    }

    #[test]
    fn missing_service_field_is_reported() {
        let err = parse_payload("service||~||PROBLEM||~||web01||~||HTTP").unwrap_err();
        assert!(matches!(
            err,
            AlertError::MissingField { kind: "service", field: "service_state" }
        ));
    }

    #[test]
    fn empty_payload_is_rejected() {
        assert!(matches!(parse_payload("\r\n"), Err(AlertError::Empty)));
        assert!(matches!(parse_payload(""), Err(AlertError::Empty)));
    }

    #[test]
    fn embedded_newlines_are_escaped_not_kept() {
        let rec = parse_payload(
            "service||~||PROBLEM||~||web01||~||HTTP||~||CRITICAL||~||line one\nline two\r\n",
        )
        .unwrap();
        match rec {
            AlertRecord::Service { service_output, .. } => {
                assert_eq!(service_output, "line one\\nline two");
                assert!(!service_output.contains('\n'));
            }
            other => panic!("expected service alert, got {other:?}"),
        }
    }

    #[test]
    fn sanitize_escapes_carriage_returns() {
        assert_eq!(sanitize("a\rb\n"), "a\\rb");
        assert_eq!(sanitize("  padded  \n"), "padded");
    }

    #[test]
    fn single_pipes_and_tildes_stay_inside_fields() {
        let rec = parse_payload("host||~||PROBLEM||~||h||~||DOWN||~||a | b ~ c ||~ d").unwrap();
        match rec {
            AlertRecord::Host { host_output, .. } => assert_eq!(host_output, "a | b ~ c ||~ d"),
            other => panic!("expected host alert, got {other:?}"),
        }
    }

    #[test]
    fn extra_service_fields_are_ignored() {
        let rec =
            parse_payload("service||~||PROBLEM||~||h||~||d||~||OK||~||out||~||surplus").unwrap();
        assert!(matches!(rec, AlertRecord::Service { service_output, .. } if service_output == "out"));
    }
}
