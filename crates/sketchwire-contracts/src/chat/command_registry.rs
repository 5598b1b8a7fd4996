#[derive(Clone, Copy, Debug)]
pub(crate) struct CommandSpec {
    pub command: &'static str,
    pub action: &'static str,
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct RawArgCommandSpec {
    pub command: &'static str,
    pub action: &'static str,
    /// Key the remainder of the line is stored under in `command_args`.
    pub key: &'static str,
}

/// Commands whose remainder is kept verbatim (briefs, instructions, names).
pub(crate) const RAW_ARG_COMMANDS: &[RawArgCommandSpec] = &[
    RawArgCommandSpec {
        command: "generate",
        action: "generate",
        key: "brief",
    },
    RawArgCommandSpec {
        command: "refine",
        action: "refine",
        key: "instruction",
    },
    RawArgCommandSpec {
        command: "show",
        action: "show",
        key: "section",
    },
    RawArgCommandSpec {
        command: "markup_model",
        action: "set_markup_model",
        key: "model",
    },
    RawArgCommandSpec {
        command: "chat_model",
        action: "set_chat_model",
        key: "model",
    },
];

/// Commands taking one filesystem path, possibly quoted.
pub(crate) const SINGLE_PATH_COMMANDS: &[CommandSpec] = &[CommandSpec {
    command: "load",
    action: "load_sketch",
}];

pub(crate) const NO_ARG_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "help",
        action: "help",
    },
    CommandSpec {
        command: "status",
        action: "status",
    },
    CommandSpec {
        command: "diff",
        action: "diff",
    },
    CommandSpec {
        command: "models",
        action: "list_models",
    },
    CommandSpec {
        command: "reset",
        action: "reset",
    },
    CommandSpec {
        command: "quit",
        action: "quit",
    },
    CommandSpec {
        command: "exit",
        action: "quit",
    },
];

pub const CHAT_HELP_COMMANDS: &[&str] = &[
    "/load <path>",
    "/generate [brief]",
    "/refine <instruction>",
    "/show [html|react|explanation]",
    "/diff",
    "/status",
    "/models",
    "/markup_model <name>",
    "/chat_model <name>",
    "/reset",
    "/quit",
];
