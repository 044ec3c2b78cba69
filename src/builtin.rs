use crate::app::Modm;
use crate::command::{CommandFactory, ExecutableCommand, Factory};
use crate::eval::Highlight;
use anyhow::Result;
use argh::{EarlyExit, FromArgs};

/// Subcommands known to `modm` at compile time.
///
/// Arguments are parsed with [`argh`] (`FromArgs`); the command then runs
/// against the driver, queuing its effects as shell statements.
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Full name of the command, e.g. "load".
    fn name() -> &'static str;

    fn execute(self, modm: &mut Modm) -> Result<()>;
}

impl<T: BuiltinCommand> ExecutableCommand for T {
    fn execute(self: Box<Self>, modm: &mut Modm) -> Result<()> {
        T::execute(*self, modm)
    }
}

/// Arguments argh refused, or a `--help` it answered itself.
struct InvalidArgs {
    output: String,
    is_error: bool,
}

impl ExecutableCommand for InvalidArgs {
    fn execute(self: Box<Self>, modm: &mut Modm) -> Result<()> {
        let output = self.output.trim_end();
        if self.is_error {
            modm.emitter().report_error(output, false);
        } else {
            modm.emitter().echo(output, Highlight::Normal, true, false);
        }
        Ok(())
    }
}

impl<T: BuiltinCommand + 'static> CommandFactory for Factory<T> {
    fn name(&self) -> &'static str {
        T::name()
    }

    fn try_create(&self, name: &str, args: &[&str]) -> Option<Box<dyn ExecutableCommand>> {
        if name == T::name() {
            Some(match T::from_args(&[name], args) {
                Ok(cmd) => Box::new(cmd),
                Err(EarlyExit { output, status }) => Box::new(InvalidArgs {
                    output,
                    is_error: status.is_err(),
                }),
            })
        } else {
            None
        }
    }
}

#[derive(FromArgs)]
/// List available modules and their versions.
pub struct Avail {
    #[argh(positional, greedy)]
    /// only list these modules.
    pub modules: Vec<String>,
}

impl BuiltinCommand for Avail {
    fn name() -> &'static str {
        "avail"
    }

    fn execute(self, modm: &mut Modm) -> Result<()> {
        modm.avail(&self.modules);
        Ok(())
    }
}

#[derive(FromArgs)]
/// List loaded modules.
pub struct List {}

impl BuiltinCommand for List {
    fn name() -> &'static str {
        "list"
    }

    fn execute(self, modm: &mut Modm) -> Result<()> {
        modm.list();
        Ok(())
    }
}

#[derive(FromArgs)]
/// Load modules into the environment.
pub struct Load {
    #[argh(positional, greedy)]
    /// modules to load, as module or module/version.
    pub modules: Vec<String>,
}

impl BuiltinCommand for Load {
    fn name() -> &'static str {
        "load"
    }

    fn execute(self, modm: &mut Modm) -> Result<()> {
        modm.load(&self.modules)
    }
}

#[derive(FromArgs)]
/// Unload modules from the environment.
pub struct Unload {
    #[argh(positional, greedy)]
    /// modules to unload, as module or module/version.
    pub modules: Vec<String>,
}

impl BuiltinCommand for Unload {
    fn name() -> &'static str {
        "unload"
    }

    fn execute(self, modm: &mut Modm) -> Result<()> {
        modm.unload(&self.modules)
    }
}

#[derive(FromArgs)]
/// Show help on a topic.
pub struct Help {
    #[argh(positional)]
    /// command to show help for.
    pub topic: Option<String>,
}

impl BuiltinCommand for Help {
    fn name() -> &'static str {
        "help"
    }

    fn execute(self, modm: &mut Modm) -> Result<()> {
        modm.help(self.topic.as_deref());
        Ok(())
    }
}
