use crate::error::{ModmError, ModmResult, SyntaxReason};
use crate::eval::{EvalEmitter, Highlight};
use crate::lexer;
use crate::parser::{self, ModfileCommand, PrintGate};
use crate::variable::{VarKind, VariableStore, backup_name};
use log::{debug, trace, warn};
use std::borrow::Cow;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// Whether a modfile is being applied or reverted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Load,
    Unload,
}

/// Runs modfiles against a [`VariableStore`].
///
/// Loading applies each command; unloading applies the inverse of each
/// command, so that unloading a module undoes what loading it did. Output of
/// `print` commands is queued on the [`EvalEmitter`].
///
/// Example
/// ```
/// use modm::{Direction, Environment, EvalEmitter, Interpreter, VariableStore};
///
/// let mut store = VariableStore::new(Environment::default());
/// let mut emitter = EvalEmitter::default();
/// let mut interp = Interpreter::new(&mut store, &mut emitter);
/// interp.apply_line("set CC gcc", Direction::Load).unwrap();
/// assert_eq!(store.get("CC").and_then(|v| v.serialize()).as_deref(), Some("gcc"));
/// ```
pub struct Interpreter<'a> {
    store: &'a mut VariableStore,
    emitter: &'a mut EvalEmitter,
    direction: Direction,
}

impl<'a> Interpreter<'a> {
    pub fn new(store: &'a mut VariableStore, emitter: &'a mut EvalEmitter) -> Self {
        Self {
            store,
            emitter,
            direction: Direction::Load,
        }
    }

    /// Apply the commands of `modfile`.
    pub fn load(&mut self, modfile: &Path) -> ModmResult<()> {
        self.direction = Direction::Load;
        self.parse(modfile)
    }

    /// Revert the commands of `modfile`.
    pub fn unload(&mut self, modfile: &Path) -> ModmResult<()> {
        self.direction = Direction::Unload;
        self.parse(modfile)
    }

    /// Run `modfile` in the current direction.
    ///
    /// A missing file is not an error, and invalid UTF-8 is replaced. On a
    /// syntax error processing stops at the offending line; lines before it
    /// stay applied.
    pub fn parse(&mut self, modfile: &Path) -> ModmResult<()> {
        let bytes = match fs::read(modfile) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("{} does not exist, nothing to do", modfile.display());
                return Ok(());
            }
            Err(e) => return Err(ModmError::io(modfile, e)),
        };
        let content = String::from_utf8_lossy(&bytes);
        if matches!(content, Cow::Owned(_)) {
            warn!("{} is not valid UTF-8, reading it lossily", modfile.display());
        }
        debug!("{:?} {}", self.direction, modfile.display());

        for (index, line) in content.lines().enumerate() {
            self.run_line(modfile, index + 1, line)?;
        }
        Ok(())
    }

    /// Split, parse, and run a single modfile line in `direction`.
    pub fn apply_line(&mut self, line: &str, direction: Direction) -> ModmResult<()> {
        self.direction = direction;
        self.run_line(Path::new("<inline>"), 1, line)
    }

    fn run_line(&mut self, modfile: &Path, number: usize, line: &str) -> ModmResult<()> {
        let syntax_error = |reason: SyntaxReason| ModmError::Syntax {
            file: modfile.to_path_buf(),
            line: number,
            content: line.trim().to_string(),
            reason,
        };
        let words = lexer::split_words(line).map_err(|e| syntax_error(e.into()))?;
        let command = parser::parse_command(words).map_err(|e| syntax_error(e.into()))?;
        if let Some(command) = command {
            self.dispatch(command);
        }
        Ok(())
    }

    fn dispatch(&mut self, command: ModfileCommand) {
        trace!("{:?} {}", self.direction, command.keyword());
        if let Some(name) = command.variable().filter(|name| self.store.is_undecodable(name)) {
            warn!("{name} is not valid UTF-8, leaving it untouched");
            return;
        }
        let undo = self.direction == Direction::Unload;
        match command {
            ModfileCommand::Prepend { name, value, kind } => {
                self.store.get_or_create(&name, kind).prepend(&value, undo);
            }
            ModfileCommand::Append { name, value, kind } => {
                self.store.get_or_create(&name, kind).append(&value, undo);
            }
            ModfileCommand::Set { name, value } => self.set(&name, &value),
            ModfileCommand::Print { message, gate } => {
                let wanted = match gate {
                    PrintGate::Always => true,
                    PrintGate::LoadOnly => !undo,
                    PrintGate::UnloadOnly => undo,
                };
                if wanted {
                    self.emitter.echo(&message, Highlight::Normal, true, false);
                }
            }
        }
    }

    /// `set` keeps the overwritten value in a backup slot on load and puts
    /// it back on unload. Without a backup the variable did not exist before,
    /// so unloading removes it.
    fn set(&mut self, name: &str, value: &str) {
        let backup = backup_name(name);
        match self.direction {
            Direction::Load => {
                let previous = self.store.get_or_create(name, VarKind::String).serialize();
                if let Some(previous) = previous {
                    self.store.get_or_create(&backup, VarKind::String).set(&previous);
                }
                self.store.get_or_create(name, VarKind::String).set(value);
            }
            Direction::Unload => {
                let saved = self.store.get_or_create(&backup, VarKind::String).serialize();
                match saved {
                    Some(saved) => {
                        self.store.get_or_create(name, VarKind::String).set(&saved);
                        self.store.get_or_create(&backup, VarKind::String).unset();
                    }
                    None => self.store.get_or_create(name, VarKind::String).unset(),
                }
            }
        }
    }
}
