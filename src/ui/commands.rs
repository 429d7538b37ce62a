use std::str::FromStr;

use strum::{AsRefStr, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

/// Commands invoked by starting a message with a leading slash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, EnumIter, AsRefStr, IntoStaticStr)]
#[strum(serialize_all = "kebab-case")]
pub enum SlashCommand {
    /// Reset the session and start a fresh conversation.
    New,
    /// Show help.
    Help,
    /// Exit the application.
    Quit,
}

impl SlashCommand {
    /// Command string without the leading '/'.
    pub fn keyword(self) -> &'static str {
        self.into()
    }

    /// User-visible description shown in help.
    pub fn description(self) -> &'static str {
        match self {
            SlashCommand::New => "start a new chat (the session forgets everything)",
            SlashCommand::Help => "show available commands",
            SlashCommand::Quit => "exit flashchat",
        }
    }
}

/// Parse a slash command from user input.
pub fn parse_slash_command(input: &str) -> Option<SlashCommand> {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return None;
    }

    let head = trimmed[1..].split_whitespace().next()?;
    SlashCommand::from_str(head)
        .ok()
        .or_else(|| match head.to_lowercase().as_str() {
            "n" | "reset" | "clear" => Some(SlashCommand::New),
            "h" | "?" => Some(SlashCommand::Help),
            "q" | "exit" | "bye" => Some(SlashCommand::Quit),
            _ => None,
        })
}

/// Get help text for all available commands.
pub fn help_text() -> String {
    let mut help = String::from("Available commands:\n\n");
    for command in SlashCommand::iter() {
        help.push_str(&format!("/{} - {}\n", command.keyword(), command.description()));
    }
    help.push_str("\nAliases: /n for /new, /h for /help, /q for /quit.");
    help.push_str("\nEnter sends a message, Shift+Enter inserts a newline.");
    help
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_commands() {
        assert_eq!(parse_slash_command("/new"), Some(SlashCommand::New));
        assert_eq!(parse_slash_command("/help"), Some(SlashCommand::Help));
        assert_eq!(parse_slash_command("/quit"), Some(SlashCommand::Quit));
    }

    #[test]
    fn parses_aliases() {
        assert_eq!(parse_slash_command("/n"), Some(SlashCommand::New));
        assert_eq!(parse_slash_command("/reset"), Some(SlashCommand::New));
        assert_eq!(parse_slash_command("/q"), Some(SlashCommand::Quit));
        assert_eq!(parse_slash_command("/?"), Some(SlashCommand::Help));
    }

    #[test]
    fn ignores_plain_text_and_unknown_commands() {
        assert_eq!(parse_slash_command("hello there"), None);
        assert_eq!(parse_slash_command("/frobnicate"), None);
        assert_eq!(parse_slash_command(""), None);
    }

    #[test]
    fn trailing_arguments_are_tolerated() {
        assert_eq!(parse_slash_command("/new please"), Some(SlashCommand::New));
        assert_eq!(parse_slash_command("  /quit now  "), Some(SlashCommand::Quit));
    }

    #[test]
    fn help_lists_every_command() {
        let help = help_text();
        for command in SlashCommand::iter() {
            assert!(help.contains(&format!("/{}", command.keyword())));
        }
    }
}
