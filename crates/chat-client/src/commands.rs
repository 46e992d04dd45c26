//! Slash commands that steer the session without calling the gateway.

use crate::cli::{ChatMode, parse_max_tokens, parse_mode, parse_temperature};

#[derive(Debug, Clone, PartialEq)]
pub enum ChatCommand {
    /// Reset the transcript to empty.
    Clear,
    /// Re-render the whole transcript.
    History,
    Help,
    Quit,
    Mode(ChatMode),
    Temperature(f64),
    MaxTokens(u32),
    /// A recognized slash prefix with a bad command or argument.
    Invalid(String),
}

/// Returns `None` when `input` is a message for the gateway.
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();
    let body = input.strip_prefix('/')?;

    let mut parts = body.splitn(2, ' ');
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(str::trim).filter(|arg| !arg.is_empty());

    let result = match command.as_str() {
        "clear" => ChatCommand::Clear,
        "history" => ChatCommand::History,
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        "mode" => match argument {
            Some(arg) => match parse_mode(arg) {
                Some(mode) => ChatCommand::Mode(mode),
                None => ChatCommand::Invalid(format!(
                    "/mode expects chat, rag, or weather (got {arg})"
                )),
            },
            None => ChatCommand::Invalid("/mode requires a mode name".to_string()),
        },
        "temperature" => match argument {
            Some(arg) => match parse_temperature(arg) {
                Some(value) => ChatCommand::Temperature(value),
                None => {
                    ChatCommand::Invalid("/temperature expects a value between 0 and 1".to_string())
                }
            },
            None => ChatCommand::Invalid("/temperature requires a value".to_string()),
        },
        "max-tokens" | "max_tokens" => match argument {
            Some(arg) => match parse_max_tokens(arg) {
                Some(value) => ChatCommand::MaxTokens(value),
                None => ChatCommand::Invalid("/max-tokens expects a positive integer".to_string()),
            },
            None => ChatCommand::Invalid("/max-tokens requires a value".to_string()),
        },
        _ => ChatCommand::Invalid(format!("Unknown command: /{command}")),
    };

    Some(result)
}

pub fn help_text() -> &'static str {
    r#"Available commands:
  /mode <chat|rag|weather>  Switch mode
  /temperature <v>          Set chat temperature 0.0-1.0
  /max-tokens <n>           Set chat response token budget
  /history                  Show the whole conversation
  /clear                    Clear the conversation
  /help                     Show this help message
  /quit                     Exit"#
}
