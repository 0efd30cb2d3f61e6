use std::str::FromStr;

use strum::{AsRefStr, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

/// Commands invoked by starting a message with a leading slash.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, EnumIter, AsRefStr, IntoStaticStr,
)]
#[strum(serialize_all = "kebab-case")]
pub enum SlashCommand {
    /// Start a fresh thread (forgets the current thread id)
    New,
    /// Show help
    Help,
    /// Exit the application
    Quit,
}

impl SlashCommand {
    /// User-visible description shown in help.
    pub fn description(self) -> &'static str {
        match self {
            SlashCommand::New => "start a new thread",
            SlashCommand::Help => "show available commands",
            SlashCommand::Quit => "exit",
        }
    }

    /// Command string without the leading '/'.
    pub fn command(self) -> &'static str {
        self.into()
    }
}

/// Parse a slash command from user input
pub fn parse_slash_command(input: &str) -> Option<SlashCommand> {
    let input = input.trim();
    let rest = input.strip_prefix('/')?;
    let head = rest.split_whitespace().next()?;

    SlashCommand::from_str(head)
        .ok()
        .or_else(|| match head.to_lowercase().as_str() {
            "q" | "exit" | "bye" => Some(SlashCommand::Quit),
            "n" | "reset" => Some(SlashCommand::New),
            "h" | "?" => Some(SlashCommand::Help),
            _ => None,
        })
}

/// One-line help text listing all available commands
pub fn get_help_text() -> String {
    let entries: Vec<String> = SlashCommand::iter()
        .map(|command| format!("/{} - {}", command.command(), command.description()))
        .collect();
    format!("commands: {}", entries.join(", "))
}
