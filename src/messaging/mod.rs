mod bus;
mod types;

pub use self::bus::{forward_lines, spawn_console, MessageBus};
pub use self::types::{SynthMessage, COMMAND_HELP};
