use crate::app::Modm;
use crate::error::ModmError;
use anyhow::Result;

/// Object-safe trait for any `modm` subcommand ready to run.
pub(crate) trait ExecutableCommand {
    /// Executes the command, queuing its output on the driver's emitter.
    fn execute(self: Box<Self>, modm: &mut Modm) -> Result<()>;
}

/// Factory that tries to create a command from a name and its arguments.
pub(crate) trait CommandFactory {
    /// Full name of the command this factory builds.
    fn name(&self) -> &'static str;

    /// Returns `None` when `name` is not this factory's command.
    fn try_create(&self, name: &str, args: &[&str]) -> Option<Box<dyn ExecutableCommand>>;
}

/// Factory for the built-in commands.
pub(crate) struct Factory<T> {
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

/// Expand a possibly abbreviated command name.
///
/// An exact match always wins. Otherwise `given` must be the prefix of
/// exactly one name.
pub(crate) fn resolve_abbreviation<'a, I>(given: &str, names: I) -> Result<&'a str, ModmError>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut candidates: Vec<&'a str> = Vec::new();
    for name in names {
        if name == given {
            return Ok(name);
        }
        if !given.is_empty() && name.starts_with(given) {
            candidates.push(name);
        }
    }
    match candidates.as_slice() {
        [only] => Ok(*only),
        [] => Err(ModmError::UnknownCommand {
            kind: "Command",
            given: given.to_string(),
        }),
        _ => {
            candidates.sort_unstable();
            Err(ModmError::AmbiguousCommand {
                kind: "Command",
                given: given.to_string(),
                candidates: candidates.into_iter().map(str::to_string).collect(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAMES: [&str; 5] = ["help", "avail", "list", "load", "unload"];

    #[test]
    fn test_exact_and_unique_prefix() {
        assert_eq!(resolve_abbreviation("load", NAMES).unwrap(), "load");
        assert_eq!(resolve_abbreviation("av", NAMES).unwrap(), "avail");
        assert_eq!(resolve_abbreviation("lo", NAMES).unwrap(), "load");
        assert_eq!(resolve_abbreviation("u", NAMES).unwrap(), "unload");
    }

    #[test]
    fn test_ambiguous_prefix_lists_candidates() {
        match resolve_abbreviation("l", NAMES) {
            Err(ModmError::AmbiguousCommand { given, candidates, .. }) => {
                assert_eq!(given, "l");
                assert_eq!(candidates, vec!["list", "load"]);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_unknown() {
        assert!(matches!(
            resolve_abbreviation("frobnicate", NAMES),
            Err(ModmError::UnknownCommand { .. })
        ));
        assert!(resolve_abbreviation("", NAMES).is_err());
    }
}
