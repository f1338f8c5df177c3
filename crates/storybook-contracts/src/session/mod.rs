pub mod command_registry;
pub mod intent_parser;

pub use command_registry::SESSION_HELP_COMMANDS;
pub use intent_parser::{parse_intent, Intent};
