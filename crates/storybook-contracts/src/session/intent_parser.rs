use super::command_registry::{CommandSpec, NO_ARG_COMMANDS, RAW_ARG_COMMANDS};

/// One line of session input, classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Noop,
    Help,
    Quit,
    ListLanguages,
    /// `/language` with an empty argument clears the default.
    SetLanguage(Option<String>),
    Story {
        path: String,
        language: Option<String>,
    },
    Unknown {
        command: String,
    },
}

fn find_action(command: &str, specs: &[CommandSpec]) -> Option<&'static str> {
    specs
        .iter()
        .find(|spec| spec.command == command)
        .map(|spec| spec.action)
}

/// Quoted arguments keep their spaces; unbalanced quotes fall back to
/// whitespace splitting.
fn split_args(arg: &str) -> Vec<String> {
    match shell_words::split(arg) {
        Ok(parts) => parts
            .into_iter()
            .filter(|value| !value.is_empty())
            .collect(),
        Err(_) => arg.split_whitespace().map(str::to_string).collect(),
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub fn parse_intent(text: &str) -> Intent {
    let raw_trimmed = text.trim();
    if raw_trimmed.is_empty() {
        return Intent::Noop;
    }

    if let Some(slash_tail) = raw_trimmed.strip_prefix('/') {
        let command_len = slash_tail
            .chars()
            .take_while(|ch| ch.is_ascii_alphanumeric() || *ch == '_')
            .count();
        if command_len > 0 {
            let command = slash_tail[..command_len].to_ascii_lowercase();
            let arg = slash_tail[command_len..].trim();

            if find_action(&command, RAW_ARG_COMMANDS).is_some() {
                return Intent::SetLanguage(non_empty(&split_args(arg).join(" ")));
            }
            return match find_action(&command, NO_ARG_COMMANDS) {
                Some("help") => Intent::Help,
                Some("quit") => Intent::Quit,
                Some("list_languages") => Intent::ListLanguages,
                _ => Intent::Unknown { command },
            };
        }
    }

    let mut parts = split_args(raw_trimmed).into_iter();
    let Some(path) = parts.next() else {
        return Intent::Noop;
    };
    let language = non_empty(&parts.collect::<Vec<_>>().join(" "));
    Intent::Story { path, language }
}
