//! Command variants and the text parser.
//!
//! Input is one line with the trigger (`/marquee`) already removed. Tokens
//! are separated by any run of whitespace; the first token picks the command.
//! Anything unrecognised is `help`.

use crate::error::{CommandError, CommandResult};

/// Usage text returned by `help` and by unrecognised input.
pub const HELP_TEXT: &str = "/marquee help: This message
/marquee deploy myPlaybookID myInstanceID: Deploy a new instance";

const SETVAR_SYNTAX: &str = "That's not the proper syntax. ex: var1=val1";

/// A parsed operator command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    /// `setvar <playbook> <instance> <key=value>...`
    SetVar {
        playbook_id: String,
        instance_id: String,
        assignments: Vec<(String, String)>,
    },
    /// `deploy <playbook> <instance>`
    Deploy {
        playbook_id: String,
        instance_id: String,
    },
}

impl Command {
    /// Parse a line of operator text.
    ///
    /// Every `key=value` token of a `setvar` is validated here, so a command
    /// that parses never carries a malformed assignment.
    pub fn parse(text: &str) -> CommandResult<Self> {
        let terms: Vec<&str> = text.split_whitespace().collect();
        match terms.as_slice() {
            ["setvar", args @ ..] => parse_setvar(args),
            ["deploy", playbook_id, instance_id, ..] => Ok(Command::Deploy {
                playbook_id: playbook_id.to_string(),
                instance_id: instance_id.to_string(),
            }),
            // Includes "help", an empty line, and a deploy missing its ids.
            _ => Ok(Command::Help),
        }
    }
}

fn parse_setvar(args: &[&str]) -> CommandResult<Command> {
    let [playbook_id, instance_id, pairs @ ..] = args else {
        return Err(CommandError::InvalidSyntax(SETVAR_SYNTAX.to_string()));
    };
    if pairs.is_empty() {
        return Err(CommandError::InvalidSyntax(SETVAR_SYNTAX.to_string()));
    }

    let assignments = pairs
        .iter()
        .map(|pair| parse_assignment(pair))
        .collect::<CommandResult<Vec<_>>>()?;

    Ok(Command::SetVar {
        playbook_id: playbook_id.to_string(),
        instance_id: instance_id.to_string(),
        assignments,
    })
}

/// Split `key=value` on the first `=`. Both sides must be non-empty.
fn parse_assignment(pair: &str) -> CommandResult<(String, String)> {
    match pair.split_once('=') {
        Some((key, value)) if !key.is_empty() && !value.is_empty() => {
            Ok((key.to_string(), value.to_string()))
        }
        _ => {
            tracing::warn!(%pair, "setvar given a badly formatted variable");
            Err(CommandError::InvalidSyntax(SETVAR_SYNTAX.to_string()))
        }
    }
}
