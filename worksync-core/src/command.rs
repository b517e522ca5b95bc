//! Structured bundle commands
//!
//! A [`Command`] is the CLI invocation a job submits to the worksheet server
//! (`upload`, `run`, ...). Bundle naming belongs to the reconciliation engine,
//! so a command can never carry its own `-n`/`--name` flag: construction
//! rejects it, and the name is injected only when the command is rendered
//! with [`Command::tokens`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Flag the engine uses to assign bundle names
pub const NAME_FLAG: &str = "-n";

/// Errors raised while building a command
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// The command tried to assign its own bundle name
    #[error("cannot specify '{token}': bundle names are assigned by the reconciler")]
    ReservedFlag { token: String },
}

/// The CLI verb a command runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// Upload local files as a bundle
    Upload,
    /// Run a shell command with bundle dependencies
    Run,
    /// Any other bundle-creating verb (e.g. `make`)
    #[serde(untagged)]
    Other(String),
}

impl Operation {
    pub fn as_str(&self) -> &str {
        match self {
            Operation::Upload => "upload",
            Operation::Run => "run",
            Operation::Other(verb) => verb,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated bundle-creating command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    operation: Operation,
    flags: BTreeMap<String, String>,
    dependencies: Vec<String>,
    arguments: Vec<String>,
}

impl Command {
    /// Build a command from an operation and positional arguments
    ///
    /// # Errors
    /// Returns [`CommandError::ReservedFlag`] if any argument is a bundle
    /// naming flag.
    pub fn new<I, S>(operation: Operation, arguments: I) -> Result<Self, CommandError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let arguments: Vec<String> = arguments.into_iter().map(Into::into).collect();
        if let Some(token) = arguments.iter().find(|arg| is_name_flag(arg)) {
            return Err(CommandError::ReservedFlag {
                token: token.clone(),
            });
        }

        Ok(Self {
            operation,
            flags: BTreeMap::new(),
            dependencies: Vec::new(),
            arguments,
        })
    }

    /// `upload <paths...>`
    pub fn upload<I, S>(paths: I) -> Result<Self, CommandError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(Operation::Upload, paths)
    }

    /// `run :dep1 :dep2 ... "<shell>"`
    pub fn run<I, S>(dependencies: I, shell: impl Into<String>) -> Result<Self, CommandError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut command = Self::new(Operation::Run, [shell.into()])?;
        for dependency in dependencies {
            command = command.with_dependency(dependency);
        }
        Ok(command)
    }

    /// Add a bundle dependency, rendered as `:<name>`
    ///
    /// Adding the same dependency twice has no effect.
    pub fn with_dependency(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !self.dependencies.contains(&name) {
            self.dependencies.push(name);
        }
        self
    }

    /// Add a named flag, rendered as `--<key> <value>` (or `-<key>` for
    /// single-letter keys)
    ///
    /// # Errors
    /// Returns [`CommandError::ReservedFlag`] for the `n`/`name` keys.
    pub fn with_flag(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<Self, CommandError> {
        let key = key.into();
        let bare = key.trim_start_matches('-');
        if bare == "n" || bare == "name" {
            return Err(CommandError::ReservedFlag { token: key });
        }
        self.flags.insert(bare.to_string(), value.into());
        Ok(self)
    }

    pub fn operation(&self) -> &Operation {
        &self.operation
    }

    /// Bundles this command references, in declaration order
    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }

    pub fn flags(&self) -> &BTreeMap<String, String> {
        &self.flags
    }

    /// Render the CLI tokens that create a bundle called `name`
    ///
    /// The naming flag always directly follows the operation:
    /// `[op, "-n", name, flags..., ":deps"..., args...]`.
    pub fn tokens(&self, name: &str) -> Vec<String> {
        let mut tokens = vec![
            self.operation.to_string(),
            NAME_FLAG.to_string(),
            name.to_string(),
        ];

        for (key, value) in &self.flags {
            if key.len() == 1 {
                tokens.push(format!("-{}", key));
            } else {
                tokens.push(format!("--{}", key));
            }
            tokens.push(value.clone());
        }

        tokens.extend(self.dependencies.iter().map(|d| format!(":{}", d)));
        tokens.extend(self.arguments.iter().cloned());
        tokens
    }
}

/// Whether a token assigns a bundle name
pub fn is_name_flag(token: &str) -> bool {
    token == NAME_FLAG || token == "--name" || token.starts_with("--name=")
}

/// Join tokens into a single command line, quoting where the server's shell
/// splitting would otherwise break them apart
pub fn to_command_line(tokens: &[String]) -> String {
    tokens
        .iter()
        .map(|token| quote(token))
        .collect::<Vec<_>>()
        .join(" ")
}

fn quote(token: &str) -> String {
    let plain = !token.is_empty()
        && token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=,@%+".contains(c));
    if plain {
        return token.to_string();
    }

    // Single quotes cannot be escaped inside single quotes: close, escape, reopen.
    format!("'{}'", token.replace('\'', r#"'"'"'"#))
}
