/// Spoken or typed control phrases understood outside of normal chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum Command {
    Skip,
    Complete,
    Minimize,
    Restore,
    ClearChat,
    Leaderboard,
    Settings,
    Help,
    Quit,
}

/// Phrases per command, checked top to bottom; the first contained phrase
/// wins.
const PHRASES: &[(Command, &[&str])] = &[
    (Command::ClearChat, &["clear chat", "clear messages"]),
    (Command::Restore, &["restore", "show exercise"]),
    (Command::Minimize, &["minimize", "minimise", "hide"]),
    (Command::Skip, &["skip", "next step"]),
    (Command::Complete, &["complete", "done", "finished"]),
    (
        Command::Leaderboard,
        &["leaderboard", "go back", "go home", "progress"],
    ),
    (Command::Settings, &["open settings", "settings"]),
    (Command::Help, &["help", "commands"]),
    (Command::Quit, &["quit", "exit"]),
];

impl Command {
    /// Match a free-text phrase, case-insensitively.
    pub fn parse(phrase: &str) -> Option<Command> {
        let phrase = phrase.trim().to_lowercase();
        if phrase.is_empty() {
            return None;
        }
        PHRASES
            .iter()
            .find(|(_, needles)| needles.iter().any(|n| phrase.contains(n)))
            .map(|(command, _)| *command)
    }

    /// A chat line addressed to the app: `/skip`, `/clear chat`.
    pub fn parse_chat(line: &str) -> Option<Command> {
        line.trim().strip_prefix('/').and_then(Command::parse)
    }

    pub fn all() -> impl Iterator<Item = Command> {
        PHRASES.iter().map(|(command, _)| *command)
    }

    /// The phrases that trigger this command, for help text.
    pub fn phrases(&self) -> &'static [&'static str] {
        PHRASES
            .iter()
            .find(|(command, _)| command == self)
            .map(|(_, needles)| *needles)
            .unwrap_or_default()
    }
}
