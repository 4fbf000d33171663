//! Outbound command value

use serde::{Deserialize, Serialize};

/// Command sent to the data server
///
/// A name from the command catalog plus its positional arguments. Built once,
/// encoded once; it has no identity beyond its content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Command {
    name: String,
    args: Vec<String>,
}

impl Command {
    /// Create command with no arguments
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }

    /// Create command with positional arguments
    pub fn with_args<I, S>(name: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Append one argument
    pub fn arg(mut self, value: impl ToString) -> Self {
        self.args.push(value.to_string());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_creation() {
        let cmd = Command::new("TODOS_USUARIOS");
        assert_eq!(cmd.name(), "TODOS_USUARIOS");
        assert!(cmd.args().is_empty());
    }

    #[test]
    fn test_builder_stringifies_arguments() {
        let cmd = Command::new("INSERT_NOMINA").arg(7).arg(1250.5).arg("Salario").arg("salario");
        assert_eq!(cmd.args(), ["7", "1250.5", "Salario", "salario"]);
        assert_eq!(cmd, Command::with_args("INSERT_NOMINA", ["7", "1250.5", "Salario", "salario"]));
    }
}
