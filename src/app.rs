//! The `modm` driver: turns one command line into one line of shell code.

use crate::builtin::{Avail, Help, List, Load, Unload};
use crate::command::{CommandFactory, Factory, resolve_abbreviation};
use crate::config::{Config, LOADED_MODULES_VAR};
use crate::env::{Environment, join_path_list};
use crate::error::ModmError;
use crate::eval::{EvalEmitter, Highlight};
use crate::help;
use crate::interpreter::{Direction, Interpreter};
use crate::natsort::natsort_by_key;
use crate::registry::{ModuleName, Registry, version_name};
use crate::variable::{VarKind, VariableStore};
use anyhow::{Context, Result};
use log::{debug, error, info};
use std::path::{Path, PathBuf};

/// Runs `modm` subcommands against a snapshot of the environment.
///
/// Nothing is printed directly; every effect is queued and returned by
/// [`Modm::drain`] as a single line for the calling shell to `eval`.
///
/// Example
/// ```
/// use modm::{Environment, Modm};
///
/// let mut modm = Modm::new(Environment::from_vars([("MODM_USE_COLORS", "no")]));
/// modm.run(&["list"]).unwrap();
/// assert_eq!(modm.drain(), "");
/// ```
pub struct Modm {
    config: Config,
    emitter: EvalEmitter,
    store: VariableStore,
    loaded: Vec<PathBuf>,
    registry: Option<Registry>,
    commands: Vec<Box<dyn CommandFactory>>,
}

impl Modm {
    pub fn new(env: Environment) -> Self {
        let config = Config::from_env(&env);
        Self {
            emitter: EvalEmitter::new(config.use_colors, config.text_width),
            loaded: config.loaded_modules.clone(),
            store: VariableStore::new(env),
            registry: None,
            commands: vec![
                Box::new(Factory::<Help>::default()),
                Box::new(Factory::<Avail>::default()),
                Box::new(Factory::<List>::default()),
                Box::new(Factory::<Load>::default()),
                Box::new(Factory::<Unload>::default()),
            ],
            config,
        }
    }

    /// Run the command line `args` (without the program name).
    ///
    /// User errors are reported through the emitter and do not fail the run.
    /// An `Err` means something unexpected happened; see
    /// [`Modm::report_failure`].
    pub fn run<S: AsRef<str>>(&mut self, args: &[S]) -> Result<()> {
        let Some((first, rest)) = args.split_first() else {
            self.usage_error(&ModmError::NoCommand);
            return Ok(());
        };
        match first.as_ref() {
            "--help" | "-h" => {
                self.help(None);
                return Ok(());
            }
            "--version" => {
                let version = format!("modm version {}", env!("CARGO_PKG_VERSION"));
                self.emitter.echo(&version, Highlight::Normal, true, false);
                return Ok(());
            }
            option if option.starts_with('-') => {
                self.usage_error(&ModmError::UnknownCommand {
                    kind: "Option",
                    given: option.to_string(),
                });
                return Ok(());
            }
            _ => {}
        }

        let name = match resolve_abbreviation(first.as_ref(), self.commands.iter().map(|f| f.name())) {
            Ok(name) => name,
            Err(err @ ModmError::UnknownCommand { .. }) => {
                self.usage_error(&err);
                return Ok(());
            }
            Err(err) => {
                self.report(&err);
                return Ok(());
            }
        };

        let args: Vec<&str> = rest.iter().map(|arg| arg.as_ref()).collect();
        debug!("running '{name}' with {args:?}");
        let command = self
            .commands
            .iter()
            .find_map(|factory| factory.try_create(name, &args))
            .with_context(|| format!("no factory for command '{name}'"))?;
        command.execute(self)
    }

    /// The queued shell code, joined into one line.
    pub fn drain(&mut self) -> String {
        self.emitter.drain()
    }

    pub(crate) fn emitter(&mut self) -> &mut EvalEmitter {
        &mut self.emitter
    }

    /// Report a user error. Ambiguous commands list every candidate with the
    /// part not typed highlighted.
    pub fn report(&mut self, err: &ModmError) {
        match err {
            ModmError::AmbiguousCommand {
                kind,
                given,
                candidates,
            } => {
                let message = format!("{kind} '{given}' is ambiguous. Possible matches:");
                self.emitter.report_error(&message, false);
                for candidate in candidates {
                    let rest = candidate.strip_prefix(given.as_str()).unwrap_or(candidate.as_str());
                    self.emitter.echo_segments(
                        &[
                            ("    ", Highlight::Normal),
                            (given.as_str(), Highlight::Normal),
                            (rest, Highlight::Info),
                        ],
                        true,
                    );
                }
            }
            other => self.emitter.report_error(&other.to_string(), false),
        }
    }

    /// Report an error that escaped [`Modm::run`]. Returns `true` when it was
    /// internal, i.e. the process should exit with a failure status.
    pub fn report_failure(&mut self, err: &anyhow::Error) -> bool {
        match err.downcast_ref::<ModmError>() {
            Some(user) if !user.kind().is_internal() => {
                self.report(user);
                false
            }
            _ => {
                error!("{err:#}");
                self.report_internal(&format!("{err:#}"));
                true
            }
        }
    }

    /// Report an internal error followed by whom to contact about it.
    pub fn report_internal(&mut self, message: &str) {
        self.emitter.report_error(message, true);
        let contact = format!(
            "Please send the command you used and the error message printed above to '{}'.",
            self.config.admin_email
        );
        self.emitter.report_error(&contact, true);
    }

    fn usage_error(&mut self, err: &ModmError) {
        self.report(err);
        self.help(None);
    }

    pub(crate) fn help(&mut self, topic: Option<&str>) {
        match help::topic(topic) {
            Some(text) => self.emitter.echo(text, Highlight::Normal, false, false),
            None => {
                let topic = topic.unwrap_or_default().to_string();
                self.report(&ModmError::UnknownHelpTopic(topic));
                self.emitter
                    .report_error("See 'modm help help' for a list of help topics.", false);
            }
        }
    }

    pub(crate) fn avail(&mut self, names: &[String]) {
        let registry = registry(&mut self.registry, &self.config);

        let mut selected: Vec<usize> = Vec::new();
        if names.is_empty() {
            selected.extend(0..registry.modules().len());
        }
        for name in names {
            match registry.find(name, false) {
                Some(index) if selected.contains(&index) => {}
                Some(index) => selected.push(index),
                None => {
                    let err = ModmError::NotFound(name.clone());
                    self.emitter.report_error(&err.to_string(), false);
                }
            }
        }

        let modules: Vec<_> = selected.iter().filter_map(|&i| registry.get(i)).collect();
        let width = modules.iter().map(|m| m.name.len()).max().unwrap_or(0) + 1;
        for module in modules {
            let mut pieces: Vec<(String, Highlight)> =
                vec![(format!("{:width$} ", format!("{}:", module.name)), Highlight::Normal)];
            for (n, version) in module.versions.iter().enumerate() {
                if n > 0 {
                    pieces.push((", ".to_string(), Highlight::Normal));
                }
                let mut text = version_name(version).to_string();
                if module.is_default(version) {
                    text.push_str("(default)");
                }
                if module.loaded.as_deref() == Some(version.as_path()) {
                    text.push('*');
                    pieces.push((text, Highlight::Info));
                } else {
                    pieces.push((text, Highlight::Normal));
                }
            }
            if let Some(category) = &module.category {
                pieces.push((format!(" [{category}]"), Highlight::Normal));
            }
            let segments: Vec<(&str, Highlight)> =
                pieces.iter().map(|(text, kind)| (text.as_str(), *kind)).collect();
            self.emitter.echo_segments(&segments, true);
        }
    }

    pub(crate) fn list(&mut self) {
        let mut names: Vec<String> = self
            .loaded
            .iter()
            .map(|file| {
                let name = ModuleName::from_file(file);
                format!("{}/{}", name.module, name.version.unwrap_or_default())
            })
            .collect();
        natsort_by_key(&mut names, |name| name.as_str());
        for name in &names {
            self.emitter.echo(name, Highlight::Normal, true, false);
        }
    }

    pub(crate) fn load(&mut self, names: &[String]) -> Result<()> {
        for name in names {
            let file = match registry(&mut self.registry, &self.config).resolve_file(name) {
                Ok(file) => file,
                Err(err) => {
                    self.report(&err);
                    continue;
                }
            };
            self.load_file(&file)?;
        }
        self.export_state();
        Ok(())
    }

    pub(crate) fn unload(&mut self, names: &[String]) -> Result<()> {
        for name in names {
            let requested = ModuleName::parse(name);
            let matching: Vec<PathBuf> = self
                .loaded
                .iter()
                .filter(|file| {
                    let loaded = ModuleName::from_file(file);
                    loaded.module == requested.module
                        && requested.version.is_none_or(|v| loaded.version == Some(v))
                })
                .cloned()
                .collect();

            if matching.is_empty() {
                if registry(&mut self.registry, &self.config).find(name, true).is_none() {
                    self.report(&ModmError::NotFound(name.clone()));
                } else {
                    debug!("'{name}' is not loaded");
                }
                continue;
            }
            for file in &matching {
                self.unload_file(file)?;
            }
        }
        self.export_state();
        Ok(())
    }

    /// Load `file` unless it is loaded already. Another loaded version of the
    /// same module is unloaded first.
    fn load_file(&mut self, file: &Path) -> Result<()> {
        if self.loaded.iter().any(|l| l == file) {
            debug!("{} is already loaded", file.display());
            return Ok(());
        }
        let module = ModuleName::from_file(file).module;
        let others: Vec<PathBuf> = self
            .loaded
            .iter()
            .filter(|l| ModuleName::from_file(l).module == module)
            .cloned()
            .collect();
        for other in &others {
            info!("replacing {} with {}", other.display(), file.display());
            if !self.unload_file(other)? {
                return Ok(());
            }
        }
        if self.apply(file, Direction::Load)? {
            self.loaded.push(file.to_path_buf());
        }
        Ok(())
    }

    fn unload_file(&mut self, file: &Path) -> Result<bool> {
        let done = self.apply(file, Direction::Unload)?;
        if done {
            self.loaded.retain(|l| l != file);
        }
        Ok(done)
    }

    /// Run `file` in `direction`. A user error is reported and gives
    /// `Ok(false)`; internal errors are returned.
    fn apply(&mut self, file: &Path, direction: Direction) -> Result<bool> {
        let mut interp = Interpreter::new(&mut self.store, &mut self.emitter);
        let outcome = match direction {
            Direction::Load => interp.load(file),
            Direction::Unload => interp.unload(file),
        };
        match outcome {
            Ok(()) => Ok(true),
            Err(err) if !err.kind().is_internal() => {
                self.report(&err);
                Ok(false)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Queue exports for every modified variable and the loaded list.
    fn export_state(&mut self) {
        let loaded: Vec<String> = self
            .loaded
            .iter()
            .map(|file| file.to_string_lossy().into_owned())
            .collect();
        self.store
            .get_or_create(LOADED_MODULES_VAR, VarKind::Path)
            .set(&join_path_list(&loaded));

        for var in self.store.modified() {
            match var.serialize() {
                Some(value) if !var.is_unset() => self.emitter.export(var.name(), &value),
                _ => self.emitter.unset(var.name()),
            }
        }
    }
}

/// Discover modules on first use.
fn registry<'r>(slot: &'r mut Option<Registry>, config: &Config) -> &'r Registry {
    slot.get_or_insert_with(|| Registry::discover(&config.modules_path, &config.loaded_modules))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ADMIN_EMAIL_VAR, MODULES_PATH_VAR, USE_COLORS_VAR};
    use std::fs::{self, File};
    use std::io::Write;
    use tempfile::tempdir;

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        File::create(path).unwrap().write_all(content.as_bytes()).unwrap();
    }

    /// `foo/{1.0, 2.0, .default -> 1.0}` and `bar/3.1` with a category.
    fn module_tree(root: &Path) {
        write(
            &root.join("foo/1.0"),
            "prepend_path PATH /opt/foo/bin\nset FOO_HOME /opt/foo\nprint_load 'foo 1.0 loaded'\n",
        );
        write(&root.join("foo/2.0"), "prepend_path PATH /opt/foo2/bin\n");
        write(&root.join("foo/.default"), "1.0\n");
        write(&root.join("bar/3.1"), "append_string CFLAGS ' -lbar'\n");
        write(&root.join("bar/.category"), "libraries\n");
    }

    fn modm(root: &Path, extra: &[(&str, String)]) -> Modm {
        let mut vars = vec![
            (MODULES_PATH_VAR, root.to_string_lossy().into_owned()),
            (USE_COLORS_VAR, "no".to_string()),
        ];
        vars.extend(extra.iter().cloned());
        Modm::new(Environment::from_vars(vars))
    }

    fn path_of(file: &Path) -> String {
        file.to_string_lossy().into_owned()
    }

    #[test]
    fn test_load_exports_changes_and_loaded_list() {
        let dir = tempdir().unwrap();
        module_tree(dir.path());
        let mut modm = modm(dir.path(), &[("PATH", "/usr/bin".to_string())]);

        modm.run(&["load", "foo"]).unwrap();
        let out = modm.drain();
        assert!(out.contains(r#"printf "foo 1.0 loaded\n""#), "{out}");
        assert!(out.contains("export FOO_HOME='/opt/foo'"), "{out}");
        assert!(out.contains(&join_path_list(&["/opt/foo/bin", "/usr/bin"])), "{out}");
        assert!(
            out.contains(&format!(
                "export MODM_LOADED_MODULES='{}'",
                path_of(&dir.path().join("foo/1.0"))
            )),
            "{out}"
        );
        assert!(!out.contains("MODM_BACKUP_FOO_HOME"), "{out}");
    }

    #[test]
    fn test_unload_in_a_later_run_restores_environment() {
        let dir = tempdir().unwrap();
        module_tree(dir.path());
        let mut modm = modm(
            dir.path(),
            &[
                ("PATH", join_path_list(&["/opt/foo/bin", "/usr/bin"])),
                ("FOO_HOME", "/opt/foo".to_string()),
                ("MODM_LOADED_MODULES", path_of(&dir.path().join("foo/1.0"))),
            ],
        );

        modm.run(&["unload", "foo"]).unwrap();
        let out = modm.drain();
        assert!(out.contains("export PATH='/usr/bin'"), "{out}");
        assert!(out.contains("unset FOO_HOME"), "{out}");
        assert!(out.contains("export MODM_LOADED_MODULES=''"), "{out}");
    }

    #[test]
    fn test_loading_other_version_replaces_loaded_one() {
        let dir = tempdir().unwrap();
        module_tree(dir.path());
        let mut modm = modm(
            dir.path(),
            &[
                ("PATH", join_path_list(&["/opt/foo/bin", "/usr/bin"])),
                ("FOO_HOME", "/opt/foo".to_string()),
                ("MODM_LOADED_MODULES", path_of(&dir.path().join("foo/1.0"))),
            ],
        );

        modm.run(&["load", "foo/2.0"]).unwrap();
        let out = modm.drain();
        let path = join_path_list(&["/opt/foo2/bin", "/usr/bin"]);
        assert!(out.contains(&format!("export PATH='{path}'")), "{out}");
        assert!(out.contains("unset FOO_HOME"), "{out}");
        assert!(
            out.contains(&format!(
                "export MODM_LOADED_MODULES='{}'",
                path_of(&dir.path().join("foo/2.0"))
            )),
            "{out}"
        );
    }

    #[test]
    fn test_loading_twice_is_a_noop() {
        let dir = tempdir().unwrap();
        module_tree(dir.path());
        let mut modm = modm(
            dir.path(),
            &[("MODM_LOADED_MODULES", path_of(&dir.path().join("foo/1.0")))],
        );

        modm.run(&["load", "foo/1.0"]).unwrap();
        let out = modm.drain();
        assert!(!out.contains("FOO_HOME"), "{out}");
        assert!(!out.contains("printf"), "{out}");
    }

    #[test]
    fn test_unknown_module_is_reported_and_rest_is_processed() {
        let dir = tempdir().unwrap();
        module_tree(dir.path());
        let mut modm = modm(dir.path(), &[]);

        modm.run(&["load", "nope", "bar"]).unwrap();
        let out = modm.drain();
        assert!(out.contains("modm: Error: Module 'nope' not found."), "{out}");
        assert!(out.contains("export CFLAGS=' -lbar'"), "{out}");
    }

    #[test]
    fn test_unload_known_but_not_loaded_is_silent() {
        let dir = tempdir().unwrap();
        module_tree(dir.path());
        let mut modm = modm(dir.path(), &[]);

        modm.run(&["unload", "bar"]).unwrap();
        let out = modm.drain();
        assert!(!out.contains("Error"), "{out}");

        modm.run(&["unload", "baz"]).unwrap();
        assert!(modm.drain().contains("Module 'baz' not found."));
    }

    #[test]
    fn test_avail_and_list() {
        let dir = tempdir().unwrap();
        module_tree(dir.path());
        let mut modm = modm(
            dir.path(),
            &[("MODM_LOADED_MODULES", path_of(&dir.path().join("foo/2.0")))],
        );

        modm.run(&["avail"]).unwrap();
        assert_eq!(
            modm.drain(),
            r#"printf "bar: 3.1(default) [libraries]\n";printf "foo: 1.0(default), 2.0*\n""#
        );

        modm.run(&["av", "foo"]).unwrap();
        assert_eq!(modm.drain(), r#"printf "foo: 1.0(default), 2.0*\n""#);

        modm.run(&["list"]).unwrap();
        assert_eq!(modm.drain(), r#"printf "foo/2.0\n""#);
    }

    #[test]
    fn test_ambiguous_abbreviation_lists_candidates() {
        let dir = tempdir().unwrap();
        let mut modm = modm(dir.path(), &[]);

        modm.run(&["l"]).unwrap();
        let out = modm.drain();
        assert!(out.contains("modm: Error: Command 'l' is ambiguous."), "{out}");
        assert!(out.contains(r#"printf "    list\n""#), "{out}");
        assert!(out.contains(r#"printf "    load\n""#), "{out}");
    }

    #[test]
    fn test_usage_errors() {
        let dir = tempdir().unwrap();
        let mut modm = modm(dir.path(), &[]);

        modm.run::<&str>(&[]).unwrap();
        let out = modm.drain();
        assert!(out.contains("No command given."), "{out}");
        assert!(out.contains("usage: modm <command>"), "{out}");

        modm.run(&["frobnicate"]).unwrap();
        assert!(modm.drain().contains("Command 'frobnicate' not recognized."));

        modm.run(&["-x"]).unwrap();
        assert!(modm.drain().contains("Option '-x' not recognized."));

        modm.run(&["list", "extra"]).unwrap();
        assert!(modm.drain().contains("modm: Error: "));
    }

    #[test]
    fn test_help_and_version() {
        let dir = tempdir().unwrap();
        let mut modm = modm(dir.path(), &[]);

        modm.run(&["help", "load"]).unwrap();
        assert!(modm.drain().contains("usage: modm load"));

        modm.run(&["help", "nope"]).unwrap();
        let out = modm.drain();
        assert!(out.contains("Unknown help topic 'nope'."), "{out}");
        assert!(out.contains("modm help help"), "{out}");

        modm.run(&["--version"]).unwrap();
        assert_eq!(
            modm.drain(),
            format!(r#"printf "modm version {}\n""#, env!("CARGO_PKG_VERSION"))
        );
    }

    #[test]
    fn test_syntax_error_is_a_user_error() {
        let dir = tempdir().unwrap();
        write(&dir.path().join("broken/1.0"), "set A 1\nset B 'oops\n");
        let mut modm = modm(dir.path(), &[]);

        modm.run(&["load", "broken"]).unwrap();
        let out = modm.drain();
        assert!(out.contains("modm: Error: Bad syntax in module file"), "{out}");
        assert!(out.contains("export A='1'"), "{out}");
        assert!(out.contains("export MODM_LOADED_MODULES=''"), "{out}");
    }

    #[test]
    fn test_badly_encoded_modfile_does_not_stop_the_batch() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("latin1")).unwrap();
        File::create(dir.path().join("latin1/1.0"))
            .unwrap()
            .write_all(b"set A 1\nprint caf\xe9\n")
            .unwrap();
        write(&dir.path().join("bar/1.0"), "set B 2\n");
        let mut modm = modm(dir.path(), &[]);

        modm.run(&["load", "latin1", "bar"]).unwrap();
        let out = modm.drain();
        assert!(!out.contains("Internal error"), "{out}");
        assert!(out.contains("export A='1'"), "{out}");
        assert!(out.contains("export B='2'"), "{out}");
        let loaded = join_path_list(&[
            path_of(&dir.path().join("latin1/1.0")),
            path_of(&dir.path().join("bar/1.0")),
        ]);
        assert!(out.contains(&format!("export MODM_LOADED_MODULES='{loaded}'")), "{out}");
    }

    #[cfg(unix)]
    #[test]
    fn test_internal_error_stops_remaining_names_and_keeps_output() {
        let dir = tempdir().unwrap();
        module_tree(dir.path());
        write(&dir.path().join("alpha/1.0"), "print_load 'alpha loaded'\nset ALPHA 1\n");
        // A loaded "version" that cannot be read back.
        fs::create_dir_all(dir.path().join("foo/0.9")).unwrap();
        let mut modm = modm(
            dir.path(),
            &[("MODM_LOADED_MODULES", path_of(&dir.path().join("foo/0.9")))],
        );

        let err = modm.run(&["load", "alpha", "foo/2.0", "bar"]).unwrap_err();
        assert!(modm.report_failure(&err));
        let out = modm.drain();
        assert!(out.starts_with(r#"printf "alpha loaded\n""#), "{out}");
        assert!(out.contains("modm: Internal error: "), "{out}");
        assert!(!out.contains("CFLAGS"), "{out}");
        assert!(!out.contains("export"), "{out}");
    }

    #[test]
    fn test_failure_reporting() {
        let dir = tempdir().unwrap();
        let mut modm = modm(
            dir.path(),
            &[(ADMIN_EMAIL_VAR, "admin@example.org".to_string())],
        );

        let user = anyhow::Error::new(ModmError::NotFound("foo".to_string()));
        assert!(!modm.report_failure(&user));
        assert!(modm.drain().starts_with(r#"printf "modm: Error: Module 'foo' not found.\n""#));

        let io = std::io::Error::other("disk on fire");
        let internal = anyhow::Error::new(ModmError::io("/mods/foo/1.0", io));
        assert!(modm.report_failure(&internal));
        let out = modm.drain();
        assert!(out.contains("modm: Internal error: "), "{out}");
        assert!(out.contains("admin@example.org"), "{out}");
    }
}
