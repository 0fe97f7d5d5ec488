//! Rendering of [`AlertRecord`]s as single IRC lines.

use crate::error::AlertError;
use crate::palette::{IrcColor, Palette, Style};
use crate::parser::parse_payload;
use crate::record::AlertRecord;

/// Bracket color of `[[...]]` badges.
const BADGE_BRACKETS: Style = Style::Color(IrcColor::Purple);
/// Text color inside badges and of descriptions/outputs.
const EMPHASIS: Style = Style::Color(IrcColor::Black);

/// Renders alerts with the colors of a [`Palette`].
#[derive(Debug, Clone)]
pub struct AlertFormatter {
    palette: Palette,
}

impl Default for AlertFormatter {
    fn default() -> Self {
        Self::new(Palette::standard())
    }
}

impl AlertFormatter {
    pub fn new(palette: Palette) -> Self {
        Self { palette }
    }

    /// Render a record.
    ///
    /// Segments are space separated:
    /// - service: type, `[[host]]`, description, state, output
    /// - host: type, `[[host]]`, state, output
    /// - rebuild: `[[REBUILD]]`, details
    pub fn format(&self, record: &AlertRecord) -> String {
        match record {
            AlertRecord::Service {
                notification_type,
                host_name,
                service_description,
                service_state,
                service_output,
            } => [
                self.palette.notification.style(notification_type).paint(notification_type),
                badge(host_name),
                EMPHASIS.paint(service_description),
                self.palette.service.style(service_state).paint(service_state),
                EMPHASIS.paint(service_output),
            ]
            .join(" "),
            AlertRecord::Host {
                notification_type,
                host_name,
                host_state,
                host_output,
            } => [
                self.palette.notification.style(notification_type).paint(notification_type),
                badge(host_name),
                self.palette.host.style(host_state).paint(host_state),
                EMPHASIS.paint(host_output),
            ]
            .join(" "),
            AlertRecord::Rebuild { details } => {
                format!("{} {}", badge("REBUILD"), details.join(" "))
            }
        }
    }

    /// Parse a raw datagram payload and render it.
    pub fn format_payload(&self, raw: &str) -> Result<String, AlertError> {
        parse_payload(raw).map(|record| self.format(&record))
    }
}

/// `[[label]]` with colored brackets and an emphasized label.
fn badge(label: &str) -> String {
    format!(
        "{}{}{}",
        BADGE_BRACKETS.paint("[["),
        EMPHASIS.paint(label),
        BADGE_BRACKETS.paint("]]")
    )
}
