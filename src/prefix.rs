//! IRC source prefixes (`nick!user@host`).
//!
//! A line's prefix is either a server name or a full `nick!user@host`
//! annotation. [`Source`] splits the latter with nom; anything without a
//! `!` is treated as a bare sender name, which matches how servers
//! identify themselves.

use nom::{
    bytes::complete::take_while1,
    character::complete::char,
    combinator::{opt, rest},
    error::{context, VerboseError},
    sequence::preceded,
    IResult,
};

type ParseResult<'a, O> = IResult<&'a str, O, VerboseError<&'a str>>;

/// Nick portion: everything before the first `!`.
fn parse_nick(input: &str) -> ParseResult<'_, &str> {
    context("parsing nick", take_while1(|c: char| c != '!'))(input)
}

/// User (ident) portion: after `!`, up to the `@`.
fn parse_user(input: &str) -> ParseResult<'_, &str> {
    context(
        "parsing user",
        preceded(char('!'), take_while1(|c: char| c != '@')),
    )(input)
}

/// Host portion: everything after the `@`.
fn parse_host(input: &str) -> ParseResult<'_, &str> {
    context("parsing host", preceded(char('@'), rest))(input)
}

/// A parsed message source with borrowed string slices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Source<'a> {
    /// Nick, or the whole prefix when no `!` is present.
    pub nick: &'a str,
    /// Ident, when the prefix carried one.
    pub user: Option<&'a str>,
    /// Host, when the prefix carried one.
    pub host: Option<&'a str>,
    /// The unparsed prefix.
    pub raw: &'a str,
}

impl<'a> Source<'a> {
    /// Split a prefix into its parts.
    ///
    /// Never fails: a prefix with no `!` yields the whole string as the
    /// nick, with no user or host.
    pub fn parse(raw: &'a str) -> Source<'a> {
        let (nick, remainder) = match parse_nick(raw) {
            Ok((remainder, nick)) => (nick, remainder),
            Err(_) => (raw, ""),
        };

        if remainder.is_empty() {
            return Source {
                nick: raw,
                user: None,
                host: None,
                raw,
            };
        }

        let (user, host) = match parse_user(remainder) {
            Ok((after_user, user)) => {
                let host = match opt(parse_host)(after_user) {
                    Ok((_, host)) => host,
                    Err(_) => None,
                };
                (Some(user), host)
            }
            Err(_) => (None, None),
        };

        Source {
            nick,
            user,
            host,
            raw,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_source() {
        let source = Source::parse("alice!ident@host.example.org");
        assert_eq!(source.nick, "alice");
        assert_eq!(source.user, Some("ident"));
        assert_eq!(source.host, Some("host.example.org"));
        assert_eq!(source.raw, "alice!ident@host.example.org");
    }

    #[test]
    fn test_parse_server_name() {
        let source = Source::parse("irc.example.org");
        assert_eq!(source.nick, "irc.example.org");
        assert!(source.user.is_none());
        assert!(source.host.is_none());
    }

    #[test]
    fn test_no_bang_keeps_at_sign() {
        // A prefix with `@` but no `!` is not a user prefix; the whole
        // string stays the sender name.
        let source = Source::parse("odd@name");
        assert_eq!(source.nick, "odd@name");
        assert!(source.host.is_none());
    }

    #[test]
    fn test_bang_without_host() {
        let source = Source::parse("alice!ident");
        assert_eq!(source.nick, "alice");
        assert_eq!(source.user, Some("ident"));
        assert!(source.host.is_none());
    }

    #[test]
    fn test_empty_prefix() {
        let source = Source::parse("");
        assert_eq!(source.nick, "");
        assert!(source.user.is_none());
    }
}
