//! Parsing protocol lines into events.
//!
//! One CRLF-stripped line becomes an [`Event`]: sender, command, leading
//! parameters and trailing free text. The trailing delimiter (`:`) is
//! position-dependent: when the line carries a full `nick!user@host`
//! prefix the search starts after the first space following the `@`,
//! otherwise at position 1 so a lone leading colon never counts.
//!
//! The parser is deliberately lenient. Malformed lines degrade to
//! best-effort partial events; only a line with fewer than two header
//! fields yields nothing at all.

use tracing::debug;

use crate::prefix::Source;

const CTCP_DELIMITER: char = '\u{1}';
const ACTION_PREFIX: &str = "\u{1}ACTION ";

/// A parsed protocol event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Nick portion of the source only; `user@host` is stripped at the
    /// first `!`. Server-originated lines keep the server name.
    pub sender: String,
    /// Command name, uppercase, or a three-digit numeric.
    pub command: String,
    /// Leading parameters, in wire order.
    pub params: Vec<String>,
    /// Trailing free text; empty when the line has no free-text segment.
    pub trailing: String,
}

impl Event {
    /// Parse one protocol line.
    ///
    /// Returns `None` only when the line has fewer than two header
    /// fields, in which case nothing sensible can be dispatched.
    pub fn parse(line: &str) -> Option<Event> {
        let (header, trailing) = split_trailing(line);

        let headers: Vec<&str> = header.trim().split(' ').filter(|s| !s.is_empty()).collect();
        if headers.len() < 2 {
            debug!(%line, "unhelpful number of fields in line");
            return None;
        }

        let sender = Source::parse(headers[0]).nick.to_string();
        let mut command = headers[1].to_ascii_uppercase();
        let params: Vec<String> = headers[2..].iter().map(|s| s.to_string()).collect();

        let mut trailing = trailing.to_string();
        if command == "PRIVMSG" {
            if let Some(action) = unwrap_action(&trailing) {
                command = "ACTION".to_string();
                trailing = action.to_string();
            }
        }

        Some(Event {
            sender,
            command,
            params,
            trailing,
        })
    }
}

/// Split a line into its header section and trailing text.
///
/// The returned header has the leading `:` removed when present; the
/// trailing text is empty when no delimiter is found.
fn split_trailing(line: &str) -> (&str, &str) {
    let search_from = match line.find('@') {
        Some(at) => match line[at..].find(' ') {
            // First space after the `@` ends the prefix; the delimiter
            // can only appear past it.
            Some(gap) => Some(at + gap + 1),
            None => None,
        },
        // No prefix host: skip only a possible leading colon.
        None => Some(1),
    };

    let delimiter = search_from
        .filter(|&from| from <= line.len())
        .and_then(|from| line[from..].find(':').map(|i| from + i));

    match delimiter {
        Some(idx) => (strip_lead_colon(&line[..idx]), &line[idx + 1..]),
        None => (strip_lead_colon(line), ""),
    }
}

fn strip_lead_colon(s: &str) -> &str {
    s.strip_prefix(':').unwrap_or(s)
}

/// The inner text of a CTCP `ACTION`-wrapped message, if it is one.
fn unwrap_action(trailing: &str) -> Option<&str> {
    trailing
        .strip_prefix(ACTION_PREFIX)
        .and_then(|rest| rest.strip_suffix(CTCP_DELIMITER))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_channel_message() {
        let event = Event::parse(":nick!user@host PRIVMSG #chan :hello").unwrap();
        assert_eq!(event.sender, "nick");
        assert_eq!(event.command, "PRIVMSG");
        assert_eq!(event.params, vec!["#chan"]);
        assert_eq!(event.trailing, "hello");
    }

    #[test]
    fn test_parse_numeric_reply() {
        let event = Event::parse(":irc.example.org 001 testbot :Welcome to the network").unwrap();
        assert_eq!(event.sender, "irc.example.org");
        assert_eq!(event.command, "001");
        assert_eq!(event.params, vec!["testbot"]);
        assert_eq!(event.trailing, "Welcome to the network");
    }

    #[test]
    fn test_parse_whois_numeric() {
        let event = Event::parse(":irc.example.org 318 asker bob :End of /WHOIS list").unwrap();
        assert_eq!(event.command, "318");
        assert_eq!(event.params, vec!["asker", "bob"]);
    }

    #[test]
    fn test_parse_no_trailing() {
        let event = Event::parse(":nick!user@host JOIN #chan").unwrap();
        assert_eq!(event.sender, "nick");
        assert_eq!(event.command, "JOIN");
        assert_eq!(event.params, vec!["#chan"]);
        assert_eq!(event.trailing, "");
    }

    #[test]
    fn test_parse_empty_trailing() {
        let event = Event::parse(":nick!user@host PRIVMSG #chan :").unwrap();
        assert_eq!(event.trailing, "");
    }

    #[test]
    fn test_colon_in_trailing_preserved() {
        let event = Event::parse(":nick!user@host PRIVMSG #chan :a:b:c").unwrap();
        assert_eq!(event.trailing, "a:b:c");
    }

    #[test]
    fn test_action_rewrite() {
        let event =
            Event::parse(":nick!user@host PRIVMSG #chan :\u{1}ACTION waves\u{1}").unwrap();
        assert_eq!(event.command, "ACTION");
        assert_eq!(event.trailing, "waves");
    }

    #[test]
    fn test_unterminated_action_left_alone() {
        let event = Event::parse(":nick!user@host PRIVMSG #chan :\u{1}ACTION waves").unwrap();
        assert_eq!(event.command, "PRIVMSG");
        assert_eq!(event.trailing, "\u{1}ACTION waves");
    }

    #[test]
    fn test_sender_truncated_at_bang() {
        let event = Event::parse(":alice!ident@example.org TOPIC #chan :new topic").unwrap();
        assert_eq!(event.sender, "alice");
    }

    #[test]
    fn test_too_few_headers_suppressed() {
        assert!(Event::parse(":loneword").is_none());
        assert!(Event::parse("ERROR :Closing Link").is_none());
        assert!(Event::parse("").is_none());
    }

    #[test]
    fn test_lowercase_command_normalized() {
        let event = Event::parse(":nick!user@host privmsg #chan :hi").unwrap();
        assert_eq!(event.command, "PRIVMSG");
    }

    #[test]
    fn test_delimiter_search_skips_prefix_host_colon() {
        // An IPv6-ish host contains colons; they sit before the first
        // space after the `@` and must not open the trailing text.
        let event = Event::parse(":nick!user@2001:db8::1 PRIVMSG #chan :real").unwrap();
        assert_eq!(event.sender, "nick");
        assert_eq!(event.params, vec!["#chan"]);
        assert_eq!(event.trailing, "real");
    }

    #[test]
    fn test_mode_line_without_trailing() {
        let event = Event::parse(":nick!user@host MODE #chan +b *!*@spam.example").unwrap();
        assert_eq!(event.command, "MODE");
        assert_eq!(event.params, vec!["#chan", "+b", "*!*@spam.example"]);
        assert_eq!(event.trailing, "");
    }
}
