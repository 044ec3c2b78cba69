//! Help texts shown by `modm help`.

const USAGE: &str = "\
usage: modm <command> [<args>]

Commands:
  avail     List available modules
  list      List loaded modules
  load      Load one or more modules
  unload    Unload one or more modules
  help      Show help for a command

Commands may be abbreviated as long as the abbreviation is unique.
See 'modm help <command>' for more information on a specific command.
";

const HELP: &str = "\
usage: modm help [<topic>]

Show help on <topic>. Without a topic, show general usage.
Available topics: help, avail, list, load, unload.
";

const AVAIL: &str = "\
usage: modm avail [<module>...]

List all modules found in the directories of MODM_MODULES_PATH, together
with their versions. The default version is marked '(default)', loaded
versions are marked with '*'. If modules are given, only those are listed.
";

const LIST: &str = "\
usage: modm list

List all currently loaded modules as <module>/<version>.
";

const LOAD: &str = "\
usage: modm load <module>[/<version>]...

Load the given modules. Without a version, the default version is loaded. If
another version of the same module is already loaded, it is unloaded first.
";

const UNLOAD: &str = "\
usage: modm unload <module>[/<version>]...

Unload the given modules, reverting all changes made to the environment when
they were loaded.
";

/// Help text for `topic`; `None` gives the general usage.
pub fn topic(topic: Option<&str>) -> Option<&'static str> {
    match topic {
        None | Some("usage") => Some(USAGE),
        Some("help") => Some(HELP),
        Some("avail") => Some(AVAIL),
        Some("list") => Some(LIST),
        Some("load") => Some(LOAD),
        Some("unload") => Some(UNLOAD),
        Some(_) => None,
    }
}
