//! Loads command files into event scripts.
//!
//! A command file holds one event per line in the syntax of
//! [`lockstep_core::command`], with `//` comments and blank lines ignored
//! and `TIME` lines marking tick boundaries.

use lockstep_core::command;
use lockstep_core::Event;
use std::fs;

/// Reads and parses a command file.
pub fn load(path: &str) -> Result<Vec<Event>, String> {
    let text =
        fs::read_to_string(path).map_err(|e| format!("unable to read {path}: {e}"))?;
    parse(&text).map_err(|e| format!("errors in {path}:\n{e}"))
}

/// Parses command-file text, reporting the first malformed line.
pub fn parse(text: &str) -> Result<Vec<Event>, String> {
    let mut events = Vec::new();
    for (number, line) in text.lines().enumerate() {
        match command::parse_line(line) {
            Ok(Some(event)) => events.push(event),
            Ok(None) => {}
            Err(e) => return Err(format!("line {}: {e}", number + 1)),
        }
    }
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lockstep_core::Address;

    #[test]
    fn parses_a_small_script() {
        let events = parse(
            "// boot chatter\n\
             0 send 1 hi\n\
             TIME\n\
             ECHO round two\n\
             TIME\n\
             EXIT\n",
        )
        .unwrap();
        assert_eq!(events.len(), 5);
        assert!(matches!(
            &events[0],
            Event::Command { node, .. } if *node == Address::new(0)
        ));
        assert!(matches!(events[1], Event::TimeAdvance));
        assert!(matches!(events[4], Event::Exit));
    }

    #[test]
    fn reports_the_offending_line() {
        let error = parse("TIME\nbogus line\n").unwrap_err();
        assert!(error.contains("line 2"), "unexpected error: {error}");
    }
}
