//! Parses script and prompt lines into events.
//!
//! The same syntax serves command files and the interactive prompt: one
//! event per line, with `TIME` (or, at the prompt, a blank line) marking the
//! tick boundary.

use crate::events::Event;
use crate::packet::Address;

/// A command line failed to parse.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    #[error("bad node address: {0}")]
    BadAddress(String),
    #[error("{0} requires a node address")]
    MissingAddress(&'static str),
    #[error("a node command requires a command string")]
    MissingCommand,
}

/// Parses one command line.
///
/// Returns `Ok(None)` for blank lines and `//` comments. Recognized forms:
///
/// ```text
/// TIME                advance one tick
/// EXIT                stop the simulation
/// ECHO <text…>        print text when the event executes
/// START <addr>        start or restart a node
/// FAIL <addr>         fail a node (deprecated; still honored)
/// <addr> <command…>   deliver a command string to a node
/// ```
pub fn parse_line(line: &str) -> Result<Option<Event>, ParseError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with("//") {
        return Ok(None);
    }

    let mut parts = line.splitn(2, char::is_whitespace);
    let head = parts.next().unwrap_or_default();
    let rest = parts.next().unwrap_or("").trim();

    match head {
        "TIME" => Ok(Some(Event::TimeAdvance)),
        "EXIT" => Ok(Some(Event::Exit)),
        "ECHO" => Ok(Some(Event::Echo {
            message: rest.to_owned(),
        })),
        "START" => {
            let node = parse_address(rest, "START")?;
            Ok(Some(Event::Start { node }))
        }
        "FAIL" => {
            tracing::warn!("FAIL commands are deprecated; prefer failure modes");
            let node = parse_address(rest, "FAIL")?;
            Ok(Some(Event::Failure { node }))
        }
        _ => {
            let node = head
                .parse::<u8>()
                .map(Address::new)
                .map_err(|_| ParseError::UnknownCommand(head.to_owned()))?;
            if !node.is_valid() {
                return Err(ParseError::BadAddress(head.to_owned()));
            }
            if rest.is_empty() {
                return Err(ParseError::MissingCommand);
            }
            Ok(Some(Event::Command {
                node,
                command: rest.to_owned(),
            }))
        }
    }
}

fn parse_address(token: &str, keyword: &'static str) -> Result<Address, ParseError> {
    if token.is_empty() {
        return Err(ParseError::MissingAddress(keyword));
    }
    let address = token
        .parse::<u8>()
        .map(Address::new)
        .map_err(|_| ParseError::BadAddress(token.to_owned()))?;
    if !address.is_valid() {
        return Err(ParseError::BadAddress(token.to_owned()));
    }
    Ok(address)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_and_comment_lines_are_skipped() {
        assert_eq!(parse_line(""), Ok(None));
        assert_eq!(parse_line("   "), Ok(None));
        assert_eq!(parse_line("// a comment"), Ok(None));
    }

    #[test]
    fn keywords() {
        assert!(matches!(parse_line("TIME"), Ok(Some(Event::TimeAdvance))));
        assert!(matches!(parse_line("EXIT"), Ok(Some(Event::Exit))));
        match parse_line("ECHO hello there").unwrap().unwrap() {
            Event::Echo { message } => assert_eq!(message, "hello there"),
            other => panic!("unexpected event: {other}"),
        }
        match parse_line("START 4").unwrap().unwrap() {
            Event::Start { node } => assert_eq!(node, Address::new(4)),
            other => panic!("unexpected event: {other}"),
        }
        match parse_line("FAIL 2").unwrap().unwrap() {
            Event::Failure { node } => assert_eq!(node, Address::new(2)),
            other => panic!("unexpected event: {other}"),
        }
    }

    #[test]
    fn node_commands() {
        match parse_line("3 send 1 hi").unwrap().unwrap() {
            Event::Command { node, command } => {
                assert_eq!(node, Address::new(3));
                assert_eq!(command, "send 1 hi");
            }
            other => panic!("unexpected event: {other}"),
        }
    }

    #[test]
    fn malformed_lines() {
        assert_eq!(
            parse_line("bounce 1"),
            Err(ParseError::UnknownCommand("bounce".into()))
        );
        assert_eq!(
            parse_line("START"),
            Err(ParseError::MissingAddress("START"))
        );
        assert_eq!(
            parse_line("START 300"),
            Err(ParseError::BadAddress("300".into()))
        );
        assert_eq!(
            parse_line("START 255"),
            Err(ParseError::BadAddress("255".into()))
        );
        assert_eq!(parse_line("7"), Err(ParseError::MissingCommand));
    }
}
