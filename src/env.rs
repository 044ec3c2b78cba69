use log::warn;
use std::collections::{HashMap, HashSet};
use std::env as stdenv;
use std::ffi::OsString;

/// Separator used for path-list variables such as `PATH`.
#[cfg(windows)]
pub const PATH_SEPARATOR: char = ';';
/// Separator used for path-list variables such as `PATH`.
#[cfg(not(windows))]
pub const PATH_SEPARATOR: char = ':';

/// Snapshot of the process environment taken once at start-up.
///
/// Every component that needs to look at environment variables receives a
/// reference to (or a clone of) this snapshot instead of querying the process
/// environment itself. Changes made during a run never go back into the
/// snapshot; they are emitted as shell statements instead.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    vars: HashMap<String, String>,
    /// Variables whose value is not valid Unicode; `vars` holds a lossy copy.
    undecodable: HashSet<String>,
}

impl Environment {
    /// Capture the current process environment.
    pub fn capture() -> Self {
        Self::from_vars_os(stdenv::vars_os())
    }

    /// Build a snapshot from raw OS strings.
    ///
    /// Variables with a non-Unicode name are skipped. A non-Unicode value is
    /// kept as a lossy copy and the variable is flagged, see
    /// [`Environment::is_undecodable`].
    pub fn from_vars_os<I>(vars: I) -> Self
    where
        I: IntoIterator<Item = (OsString, OsString)>,
    {
        let mut env = Self::default();
        for (key, value) in vars {
            let key = match key.into_string() {
                Ok(key) => key,
                Err(raw) => {
                    warn!("skipping variable {}: name is not valid UTF-8", raw.to_string_lossy());
                    continue;
                }
            };
            match value.into_string() {
                Ok(value) => {
                    env.vars.insert(key, value);
                }
                Err(raw) => {
                    env.vars.insert(key.clone(), raw.to_string_lossy().into_owned());
                    env.undecodable.insert(key);
                }
            }
        }
        env
    }

    /// Build a snapshot from explicit key/value pairs.
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
            undecodable: HashSet::new(),
        }
    }

    /// Get the value of an environment variable.
    pub fn get_var(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Set or override a variable in the snapshot.
    pub fn set_var(&mut self, key: impl Into<String>, val: impl Into<String>) {
        let key = key.into();
        self.undecodable.remove(&key);
        self.vars.insert(key, val.into());
    }

    /// Whether the captured value of `key` was not valid Unicode.
    pub fn is_undecodable(&self, key: &str) -> bool {
        self.undecodable.contains(key)
    }

    /// Read a variable as a list of path segments.
    ///
    /// An unset or empty variable yields an empty list.
    pub fn get_path_list(&self, key: &str) -> Vec<String> {
        self.get_var(key).map(split_path_list).unwrap_or_default()
    }
}

/// Split a separator-joined path list. The empty string is the empty list.
pub fn split_path_list(value: &str) -> Vec<String> {
    if value.is_empty() {
        Vec::new()
    } else {
        value.split(PATH_SEPARATOR).map(str::to_string).collect()
    }
}

/// Join path segments with the platform separator.
pub fn join_path_list<S: AsRef<str>>(segments: &[S]) -> String {
    let mut out = String::new();
    for (i, segment) in segments.iter().enumerate() {
        if i > 0 {
            out.push(PATH_SEPARATOR);
        }
        out.push_str(segment.as_ref());
    }
    out
}
