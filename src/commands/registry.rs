use super::CommandResult;

pub type CommandHandler = fn(CommandInvocation<'_>) -> CommandResult;

pub struct Command {
    pub name: &'static str,
    pub usage: &'static str,
    pub help: &'static str,
    pub handler: CommandHandler,
}

#[derive(Clone, Copy)]
pub struct CommandInvocation<'a> {
    pub args: &'a str,
}

pub fn all_commands() -> &'static [Command] {
    COMMANDS
}

pub fn find_command(name: &str) -> Option<&'static Command> {
    all_commands()
        .iter()
        .find(|command| command.name.eq_ignore_ascii_case(name))
}

const COMMANDS: &[Command] = &[
    Command {
        name: "help",
        usage: "/help",
        help: "Show available commands.",
        handler: super::handle_help,
    },
    Command {
        name: "new",
        usage: "/new",
        help: "Start a new conversation.",
        handler: super::handle_new,
    },
    Command {
        name: "list",
        usage: "/list",
        help: "List saved conversations.",
        handler: super::handle_list,
    },
    Command {
        name: "switch",
        usage: "/switch <number|id>",
        help: "Switch to another conversation.",
        handler: super::handle_switch,
    },
    Command {
        name: "delete",
        usage: "/delete [number|id]",
        help: "Delete a conversation (the current one by default).",
        handler: super::handle_delete,
    },
    Command {
        name: "clear",
        usage: "/clear",
        help: "Clear the current conversation and the assistant's memory of it.",
        handler: super::handle_clear,
    },
    Command {
        name: "export",
        usage: "/export <file>",
        help: "Write the current conversation to an HTML file.",
        handler: super::handle_export,
    },
    Command {
        name: "quit",
        usage: "/quit",
        help: "Leave the chat.",
        handler: super::handle_quit,
    },
];
