//! Interactive line parsing
//!
//! A command line is `NAME arg1|arg2|...`; lines starting with `/` are
//! built-ins.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplInput {
    Empty,
    /// `/commands`
    ListCommands,
    /// `/whoami`
    WhoAmI,
    /// `/exit` or `/quit`
    Exit,
    /// `/help`
    Help,
    Command { name: String, args: Vec<String> },
    UnknownBuiltin(String),
}

pub const HELP: &str = "\
Commands:  NAME arg1|arg2|...   run a catalog command
           /commands            list catalog commands and parameters
           /whoami              show the logged-in user
           /exit                log out and quit";

pub fn parse_line(line: &str) -> ReplInput {
    let line = line.trim();
    if line.is_empty() {
        return ReplInput::Empty;
    }

    if let Some(builtin) = line.strip_prefix('/') {
        return match builtin.trim() {
            "commands" => ReplInput::ListCommands,
            "whoami" => ReplInput::WhoAmI,
            "exit" | "quit" => ReplInput::Exit,
            "help" => ReplInput::Help,
            other => ReplInput::UnknownBuiltin(other.to_string()),
        };
    }

    let (name, rest) = match line.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (line, ""),
    };
    let args = if rest.is_empty() {
        Vec::new()
    } else {
        rest.split('|').map(|a| a.trim().to_string()).collect()
    };

    ReplInput::Command {
        name: name.to_ascii_uppercase(),
        args,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_builtins() {
        assert_eq!(parse_line("  "), ReplInput::Empty);
        assert_eq!(parse_line("/commands"), ReplInput::ListCommands);
        assert_eq!(parse_line("/whoami"), ReplInput::WhoAmI);
        assert_eq!(parse_line("/quit"), ReplInput::Exit);
        assert_eq!(parse_line("/nope"), ReplInput::UnknownBuiltin("nope".into()));
    }

    #[test]
    fn test_parse_command_without_args() {
        assert_eq!(
            parse_line("todos_usuarios"),
            ReplInput::Command {
                name: "TODOS_USUARIOS".into(),
                args: vec![]
            }
        );
    }

    #[test]
    fn test_parse_command_keeps_empty_positions() {
        assert_eq!(
            parse_line("INSERT_TAREA 7|9|Fix leak|2024-03-01||pendiente|Roof"),
            ReplInput::Command {
                name: "INSERT_TAREA".into(),
                args: ["7", "9", "Fix leak", "2024-03-01", "", "pendiente", "Roof"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect()
            }
        );
    }
}
