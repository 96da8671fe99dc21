//! Command line parsing for the interactive debug shell.

use anyhow::{anyhow, bail, Context, Result};
use asdf_core::protocol::codec::LEVER_VALUE_MAX;
use asdf_core::protocol::commands::{CMD_DIAGNOSTIC, CMD_LVR_RELS, CMD_POLL, CMD_RESET};
use asdf_core::protocol::LeverMask;

/// One line typed at the prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellInput {
    Reset,
    Poll,
    Release,
    /// `lvrset`; the mask is known when the opcode was typed directly
    LeverSet(Option<LeverMask>),
    Diagnostic,
    Help,
    Quit,
}

/// Parse a command name or its decimal opcode
pub fn parse_input(line: &str) -> Result<Option<ShellInput>> {
    let word = line.trim();
    if word.is_empty() {
        return Ok(None);
    }

    let input = match word.to_ascii_lowercase().as_str() {
        "reset" => ShellInput::Reset,
        "poll" => ShellInput::Poll,
        "lvrrels" => ShellInput::Release,
        "lvrset" => ShellInput::LeverSet(None),
        "asdf" => ShellInput::Diagnostic,
        "help" | "?" => ShellInput::Help,
        "quit" | "exit" | "q" => ShellInput::Quit,
        other => parse_opcode(other)?,
    };
    Ok(Some(input))
}

fn parse_opcode(word: &str) -> Result<ShellInput> {
    let opcode: u8 = word
        .parse()
        .map_err(|_| anyhow!("unknown command '{}' (type 'help')", word))?;

    Ok(match opcode {
        CMD_RESET => ShellInput::Reset,
        CMD_POLL => ShellInput::Poll,
        CMD_LVR_RELS => ShellInput::Release,
        CMD_DIAGNOSTIC => ShellInput::Diagnostic,
        other => match LeverMask::from_opcode(other) {
            Some(mask) => ShellInput::LeverSet(Some(mask)),
            None => bail!("opcode {} ({:#04x}) is not a device command", other, other),
        },
    })
}

/// Parse space separated lever values
pub fn parse_values(line: &str) -> Result<Vec<i32>> {
    line.split_whitespace()
        .map(|v| {
            v.parse::<i32>()
                .with_context(|| format!("'{}' is not an integer", v))
        })
        .collect()
}

/// Prompt for the values a `LeverSet` with `mask` carries
pub fn values_prompt(mask: LeverMask) -> String {
    format!("{} value(s) 0-{}> ", mask.lever_count(), LEVER_VALUE_MAX)
}

pub const HELP: &str = "\
commands (name or decimal opcode):
  reset    (128)  reboot the device and wait for it
  poll     (129)  read lever positions
  lvrset   (130, 146, ... 242)  drive levers, prompts for bitmask and values
  lvrrels  (131)  release the levers
  asdf     (255)  diagnostic ping
  help            show this list
  quit            leave the shell";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_names_and_opcodes() {
        assert_eq!(parse_input("poll").unwrap(), Some(ShellInput::Poll));
        assert_eq!(parse_input(" 129 ").unwrap(), Some(ShellInput::Poll));
        assert_eq!(parse_input("RESET").unwrap(), Some(ShellInput::Reset));
        assert_eq!(parse_input("131").unwrap(), Some(ShellInput::Release));
        assert_eq!(parse_input("255").unwrap(), Some(ShellInput::Diagnostic));
        assert_eq!(parse_input("").unwrap(), None);
    }

    #[test]
    fn test_parse_lever_set() {
        assert_eq!(
            parse_input("lvrset").unwrap(),
            Some(ShellInput::LeverSet(None))
        );
        // 0xB2
        assert_eq!(
            parse_input("178").unwrap(),
            Some(ShellInput::LeverSet(Some(LeverMask::THROTTLES)))
        );
    }

    #[test]
    fn test_parse_rejects_unknown() {
        assert!(parse_input("jump").is_err());
        assert!(parse_input("1").is_err());
        assert!(parse_input("300").is_err());
    }

    #[test]
    fn test_values_prompt_matches_encoded_range() {
        assert_eq!(values_prompt(LeverMask::THROTTLES), "2 value(s) 0-255> ");
        assert_eq!(values_prompt(LeverMask::ALL), "3 value(s) 0-255> ");
    }

    #[test]
    fn test_parse_values() {
        assert_eq!(parse_values("10 20  30").unwrap(), vec![10, 20, 30]);
        assert_eq!(parse_values("").unwrap(), Vec::<i32>::new());
        assert!(parse_values("10 x").is_err());
    }
}
