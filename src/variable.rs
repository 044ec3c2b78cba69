//! Environment variables with reversible mutations.

use crate::env::{Environment, join_path_list, split_path_list};
use std::collections::BTreeMap;

/// Prefix of the shadow variables that keep the value a `set` overwrote.
pub const BACKUP_PREFIX: &str = "MODM_BACKUP_";

/// Name of the backup slot paired with `name`.
pub fn backup_name(name: &str) -> String {
    format!("{BACKUP_PREFIX}{name}")
}

/// How a variable's value is modelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    /// Opaque text.
    String,
    /// Ordered list of segments joined by the platform path separator.
    Path,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Value {
    Text(String),
    Segments(Vec<String>),
}

/// A single environment variable as seen and modified during one run.
#[derive(Debug, Clone)]
pub struct EnvVariable {
    name: String,
    kind: VarKind,
    value: Option<Value>,
    absent_at_start: bool,
    modified: bool,
    unset: bool,
}

impl EnvVariable {
    /// Create a variable and load its current value from `env`.
    pub fn new(name: impl Into<String>, kind: VarKind, env: &Environment) -> Self {
        let name = name.into();
        let value = env.get_var(&name).map(|raw| match kind {
            VarKind::Path => Value::Segments(split_path_list(raw)),
            VarKind::String => Value::Text(raw.to_string()),
        });
        Self {
            absent_at_start: value.is_none(),
            name,
            kind,
            value,
            modified: false,
            unset: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> VarKind {
        self.kind
    }

    /// True if the variable currently has a value.
    pub fn is_set(&self) -> bool {
        self.value.is_some()
    }

    /// True if any mutation was applied since the variable was created.
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// True if the variable should be removed from the environment.
    pub fn is_unset(&self) -> bool {
        self.unset
    }

    /// Wire form of the value: segments joined by the path separator, or the
    /// text itself. `None` if the variable has no value.
    pub fn serialize(&self) -> Option<String> {
        self.value.as_ref().map(|value| match value {
            Value::Text(text) => text.clone(),
            Value::Segments(segments) => join_path_list(segments),
        })
    }

    /// Prepend `value`, or with `undo` remove its first occurrence.
    pub fn prepend(&mut self, value: &str, undo: bool) {
        match (self.init_value(), undo) {
            (Value::Segments(segments), false) => segments.insert(0, value.to_string()),
            (Value::Text(text), false) => text.insert_str(0, value),
            (Value::Segments(segments), true) => {
                if let Some(pos) = segments.iter().position(|s| s == value) {
                    segments.remove(pos);
                }
            }
            (Value::Text(text), true) => {
                if !value.is_empty() {
                    if let Some(pos) = text.find(value) {
                        text.replace_range(pos..pos + value.len(), "");
                    }
                }
            }
        }
        if undo {
            self.settle_after_undo();
        }
    }

    /// Append `value`, or with `undo` remove its last occurrence.
    pub fn append(&mut self, value: &str, undo: bool) {
        match (self.init_value(), undo) {
            (Value::Segments(segments), false) => segments.push(value.to_string()),
            (Value::Text(text), false) => text.push_str(value),
            (Value::Segments(segments), true) => {
                if let Some(pos) = segments.iter().rposition(|s| s == value) {
                    segments.remove(pos);
                }
            }
            (Value::Text(text), true) => {
                if !value.is_empty() {
                    if let Some(pos) = text.rfind(value) {
                        text.replace_range(pos..pos + value.len(), "");
                    }
                }
            }
        }
        if undo {
            self.settle_after_undo();
        }
    }

    /// Overwrite the value. A path-kind value is split into segments.
    pub fn set(&mut self, value: &str) {
        self.init_value();
        self.value = Some(match self.kind {
            VarKind::Path => Value::Segments(split_path_list(value)),
            VarKind::String => Value::Text(value.to_string()),
        });
    }

    /// Drop the value and mark the variable for removal.
    pub fn unset(&mut self) {
        self.value = None;
        self.unset = true;
        self.modified = true;
    }

    /// Every mutation passes through here: an absent value becomes empty and
    /// the variable is marked modified and no longer pending removal.
    fn init_value(&mut self) -> &mut Value {
        self.modified = true;
        self.unset = false;
        let kind = self.kind;
        self.value.get_or_insert_with(|| match kind {
            VarKind::Path => Value::Segments(Vec::new()),
            VarKind::String => Value::Text(String::new()),
        })
    }

    /// A variable that did not exist before this run and was emptied by an
    /// undo goes back to being unset.
    fn settle_after_undo(&mut self) {
        let empty = match &self.value {
            Some(Value::Segments(segments)) => segments.is_empty(),
            Some(Value::Text(text)) => text.is_empty(),
            None => false,
        };
        if empty && self.absent_at_start {
            self.unset();
        }
    }
}

/// All variables touched during a run, keyed by name.
#[derive(Debug, Clone)]
pub struct VariableStore {
    env: Environment,
    vars: BTreeMap<String, EnvVariable>,
}

impl VariableStore {
    pub fn new(env: Environment) -> Self {
        Self {
            env,
            vars: BTreeMap::new(),
        }
    }

    /// Fetch a variable, creating it with `kind` on first reference.
    ///
    /// The kind of an existing variable is not changed.
    pub fn get_or_create(&mut self, name: &str, kind: VarKind) -> &mut EnvVariable {
        let env = &self.env;
        self.vars
            .entry(name.to_string())
            .or_insert_with(|| EnvVariable::new(name, kind, env))
    }

    pub fn get(&self, name: &str) -> Option<&EnvVariable> {
        self.vars.get(name)
    }

    /// Whether `name` holds bytes that cannot be represented here. Exporting
    /// it would replace the real value with a lossy copy.
    pub fn is_undecodable(&self, name: &str) -> bool {
        self.env.is_undecodable(name)
    }

    /// Variables with at least one mutation, in name order.
    pub fn modified(&self) -> impl Iterator<Item = &EnvVariable> {
        self.vars.values().filter(|var| var.is_modified())
    }
}
