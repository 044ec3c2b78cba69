//! Environment modules through shell `eval`.
//!
//! A module is a directory of version files ("modfiles") found on
//! `MODM_MODULES_PATH`. Loading a version applies its commands to environment
//! variables; unloading applies their inverse. Since a child process cannot
//! change its parent's environment, `modm` prints a single line of shell code
//! instead, meant to be used through a wrapper such as
//!
//! ```sh
//! modm() { eval "$(command modm "$@")"; }
//! ```
//!
//! The main entry point is [`Modm`]. [`Interpreter`] runs modfiles against a
//! [`VariableStore`], and [`Registry`] discovers modules on the search path.

mod app;
mod builtin;
mod command;
pub mod config;
pub mod env;
pub mod error;
pub mod eval;
mod help;
mod interpreter;
pub mod lexer;
pub mod natsort;
pub mod parser;
pub mod registry;
pub mod variable;

pub use app::Modm;
pub use env::Environment;
pub use error::{ErrorKind, ModmError, ModmResult};
pub use eval::{EvalEmitter, Highlight};
pub use interpreter::{Direction, Interpreter};
pub use registry::{ModuleDescriptor, Registry};
pub use variable::{EnvVariable, VarKind, VariableStore};
