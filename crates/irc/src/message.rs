//! IRC protocol lines (RFC 1459 framing, IRCv3 tags skipped).

use std::fmt;

use crate::error::IrcError;

/// Numeric replies the session reacts to.
pub mod numeric {
    pub const RPL_WELCOME: &str = "001";
    pub const ERR_NICKNAMEINUSE: &str = "433";
    pub const ERR_NICKCOLLISION: &str = "436";
    pub const ERR_CHANNELISFULL: &str = "471";
    pub const ERR_INVITEONLYCHAN: &str = "473";
    pub const ERR_BANNEDFROMCHAN: &str = "474";
    pub const ERR_BADCHANNELKEY: &str = "475";
    pub const RPL_YOUREOPER: &str = "381";
}

/// One IRC line: optional prefix, command, and parameters.
///
/// The last parameter is the trailing one; on the wire it is written with a
/// leading `:` whenever it needs one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IrcMessage {
    pub prefix: Option<String>,
    pub command: String,
    pub params: Vec<String>,
}

impl IrcMessage {
    pub fn new<I, S>(command: impl Into<String>, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prefix: None,
            command: command.into(),
            params: params.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse a line received from the server. Trailing CR/LF is ignored.
    pub fn parse(line: &str) -> Result<Self, IrcError> {
        let mut rest = line.trim_end_matches(['\r', '\n']);

        if rest.starts_with('@') {
            rest = rest
                .split_once(' ')
                .map(|(_, r)| r)
                .ok_or_else(|| IrcError::Parse(line.to_string()))?;
        }

        let prefix = match rest.strip_prefix(':') {
            Some(stripped) => {
                let (prefix, r) = stripped
                    .split_once(' ')
                    .ok_or_else(|| IrcError::Parse(line.to_string()))?;
                rest = r;
                Some(prefix.to_string())
            }
            None => None,
        };

        let (head, trailing) = match rest.strip_prefix(':') {
            Some(t) => ("", Some(t)),
            None => match rest.split_once(" :") {
                Some((h, t)) => (h, Some(t)),
                None => (rest, None),
            },
        };

        let mut words = head.split_ascii_whitespace();
        let command = words
            .next()
            .ok_or_else(|| IrcError::Parse(line.to_string()))?
            .to_ascii_uppercase();
        let mut params: Vec<String> = words.map(str::to_string).collect();
        if let Some(t) = trailing {
            params.push(t.to_string());
        }

        Ok(Self {
            prefix,
            command,
            params,
        })
    }

    /// Nickname part of a `nick!user@host` prefix.
    pub fn source_nick(&self) -> Option<&str> {
        self.prefix
            .as_deref()
            .map(|p| p.split_once('!').map_or(p, |(nick, _)| nick))
    }

    pub fn param(&self, index: usize) -> Option<&str> {
        self.params.get(index).map(String::as_str)
    }

    // ── Outgoing commands ───────────────────────────────────────────

    pub fn nick(nickname: &str) -> Self {
        Self::new("NICK", [nickname])
    }

    pub fn user(username: &str, realname: &str) -> Self {
        Self::new("USER", [username, "0", "*", realname])
    }

    pub fn ping(token: &str) -> Self {
        Self::new("PING", [token])
    }

    pub fn pong(token: &str) -> Self {
        Self::new("PONG", [token])
    }

    /// `MODE <target> +<mode> [<argument>]`.
    pub fn mode(target: &str, mode: &str, argument: Option<&str>) -> Self {
        let mut params = vec![target.to_string(), format!("+{mode}")];
        params.extend(argument.map(str::to_string));
        Self::new("MODE", params)
    }

    pub fn privmsg(target: &str, text: &str) -> Self {
        Self::new("PRIVMSG", [target, text])
    }

    pub fn oper(user: &str, password: &str) -> Self {
        Self::new("OPER", [user, password])
    }

    pub fn join(channel: &str, key: Option<&str>) -> Self {
        let mut params = vec![channel.to_string()];
        params.extend(key.map(str::to_string));
        Self::new("JOIN", params)
    }

    pub fn quit(reason: &str) -> Self {
        Self::new("QUIT", [reason])
    }
}

impl fmt::Display for IrcMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(prefix) = &self.prefix {
            write!(f, ":{prefix} ")?;
        }
        f.write_str(&self.command)?;

        if let Some((last, middle)) = self.params.split_last() {
            for param in middle {
                write!(f, " {param}")?;
            }
            if last.is_empty() || last.contains(' ') || last.starts_with(':') {
                write!(f, " :{last}")?;
            } else {
                write!(f, " {last}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_with_prefix_and_trailing() {
        let msg = IrcMessage::parse(":kicker!op@host KICK #nagios Nagios :go away\r\n").unwrap();
        assert_eq!(msg.prefix.as_deref(), Some("kicker!op@host"));
        assert_eq!(msg.command, "KICK");
        assert_eq!(msg.params, vec!["#nagios", "Nagios", "go away"]);
        assert_eq!(msg.source_nick(), Some("kicker"));
    }

    #[test]
    fn parse_ping_without_prefix() {
        let msg = IrcMessage::parse("PING :irc.example.net").unwrap();
        assert_eq!(msg.prefix, None);
        assert_eq!(msg.command, "PING");
        assert_eq!(msg.param(0), Some("irc.example.net"));
    }

    #[test]
    fn parse_numeric_reply() {
        let msg = IrcMessage::parse(":irc.example.net 433 * Nagios :Nickname is already in use")
            .unwrap();
        assert_eq!(msg.command, numeric::ERR_NICKNAMEINUSE);
        assert_eq!(msg.params.len(), 3);
        // server prefixes have no '!'
        assert_eq!(msg.source_nick(), Some("irc.example.net"));
    }

    #[test]
    fn parse_skips_tags_and_uppercases_command() {
        let msg = IrcMessage::parse("@time=2024-01-01T00:00:00Z :n!u@h join #ops").unwrap();
        assert_eq!(msg.command, "JOIN");
        assert_eq!(msg.params, vec!["#ops"]);
    }

    #[test]
    fn parse_rejects_empty_and_prefix_only() {
        assert!(IrcMessage::parse("").is_err());
        assert!(IrcMessage::parse(":lonely.prefix").is_err());
    }

    #[test]
    fn serialize_adds_colon_only_when_needed() {
        assert_eq!(IrcMessage::privmsg("#ops", "hello world").to_string(), "PRIVMSG #ops :hello world");
        assert_eq!(IrcMessage::privmsg("#ops", "hi").to_string(), "PRIVMSG #ops hi");
        assert_eq!(IrcMessage::privmsg("#ops", "").to_string(), "PRIVMSG #ops :");
        assert_eq!(IrcMessage::privmsg("#ops", ":)").to_string(), "PRIVMSG #ops ::)");
    }

    #[test]
    fn outgoing_command_shapes() {
        assert_eq!(IrcMessage::user("Nagios", "Nagios relay").to_string(), "USER Nagios 0 * :Nagios relay");
        assert_eq!(IrcMessage::mode("Nagios", "B", None).to_string(), "MODE Nagios +B");
        assert_eq!(IrcMessage::mode("#ops", "o", Some("Nagios")).to_string(), "MODE #ops +o Nagios");
        assert_eq!(IrcMessage::join("#ops", Some("s3cret")).to_string(), "JOIN #ops s3cret");
        assert_eq!(IrcMessage::join("#ops", None).to_string(), "JOIN #ops");
        assert_eq!(IrcMessage::quit("bye now").to_string(), "QUIT :bye now");
    }

    #[test]
    fn parse_then_display_is_stable() {
        let line = ":srv 001 Nagios :Welcome to the network";
        assert_eq!(IrcMessage::parse(line).unwrap().to_string(), line);
    }
}
