//! Turns the words of a modfile line into a [`ModfileCommand`].

use crate::variable::VarKind;
use thiserror::Error;

/// When a `print` family command produces output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrintGate {
    /// `print`: on load and on unload.
    Always,
    /// `print_load`
    LoadOnly,
    /// `print_unload`
    UnloadOnly,
}

/// One recognized modfile command with its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModfileCommand {
    /// `prepend_path` / `prepend_string`
    Prepend {
        name: String,
        value: String,
        kind: VarKind,
    },
    /// `append_path` / `append_string`
    Append {
        name: String,
        value: String,
        kind: VarKind,
    },
    /// `set`
    Set { name: String, value: String },
    /// `print` / `print_load` / `print_unload`
    Print { message: String, gate: PrintGate },
}

impl ModfileCommand {
    /// The keyword this command is written as in a modfile.
    pub fn keyword(&self) -> &'static str {
        match self {
            ModfileCommand::Prepend { kind: VarKind::Path, .. } => "prepend_path",
            ModfileCommand::Prepend { kind: VarKind::String, .. } => "prepend_string",
            ModfileCommand::Append { kind: VarKind::Path, .. } => "append_path",
            ModfileCommand::Append { kind: VarKind::String, .. } => "append_string",
            ModfileCommand::Set { .. } => "set",
            ModfileCommand::Print { gate: PrintGate::Always, .. } => "print",
            ModfileCommand::Print { gate: PrintGate::LoadOnly, .. } => "print_load",
            ModfileCommand::Print { gate: PrintGate::UnloadOnly, .. } => "print_unload",
        }
    }

    /// The variable this command changes, if any.
    pub fn variable(&self) -> Option<&str> {
        match self {
            ModfileCommand::Prepend { name, .. }
            | ModfileCommand::Append { name, .. }
            | ModfileCommand::Set { name, .. } => Some(name.as_str()),
            ModfileCommand::Print { .. } => None,
        }
    }
}

/// Errors that can occur while building a command from its words.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParsingError {
    /// A recognized command got the wrong number of arguments.
    #[error("'{command}' expects {expected} argument(s), got {found}")]
    WrongArity {
        command: &'static str,
        expected: usize,
        found: usize,
    },
}

enum Shape {
    Prepend(VarKind),
    Append(VarKind),
    Set,
    Print(PrintGate),
}

fn lookup(keyword: &str) -> Option<(&'static str, Shape)> {
    let found = match keyword {
        "prepend_path" => ("prepend_path", Shape::Prepend(VarKind::Path)),
        "prepend_string" => ("prepend_string", Shape::Prepend(VarKind::String)),
        "append_path" => ("append_path", Shape::Append(VarKind::Path)),
        "append_string" => ("append_string", Shape::Append(VarKind::String)),
        "set" => ("set", Shape::Set),
        "print" => ("print", Shape::Print(PrintGate::Always)),
        "print_load" => ("print_load", Shape::Print(PrintGate::LoadOnly)),
        "print_unload" => ("print_unload", Shape::Print(PrintGate::UnloadOnly)),
        _ => return None,
    };
    Some(found)
}

fn take_args<const N: usize>(
    command: &'static str,
    args: Vec<String>,
) -> Result<[String; N], ParsingError> {
    let found = args.len();
    args.try_into().map_err(|_| ParsingError::WrongArity {
        command,
        expected: N,
        found,
    })
}

/// Build a command from the words of one line.
///
/// Returns `Ok(None)` for an empty line and for unknown command names, which
/// are ignored.
pub fn parse_command(words: Vec<String>) -> Result<Option<ModfileCommand>, ParsingError> {
    let mut words = words.into_iter();
    let Some(keyword) = words.next() else {
        return Ok(None);
    };
    let Some((command, shape)) = lookup(&keyword) else {
        return Ok(None);
    };
    let args: Vec<String> = words.collect();

    let parsed = match shape {
        Shape::Prepend(kind) => {
            let [name, value] = take_args(command, args)?;
            ModfileCommand::Prepend { name, value, kind }
        }
        Shape::Append(kind) => {
            let [name, value] = take_args(command, args)?;
            ModfileCommand::Append { name, value, kind }
        }
        Shape::Set => {
            let [name, value] = take_args(command, args)?;
            ModfileCommand::Set { name, value }
        }
        Shape::Print(gate) => {
            let [message] = take_args(command, args)?;
            ModfileCommand::Print { message, gate }
        }
    };
    Ok(Some(parsed))
}
