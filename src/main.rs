use modm::config::Config;
use modm::{Environment, Modm};
use std::io::Write;
use std::panic::{self, AssertUnwindSafe};
use std::process::ExitCode;

fn main() -> ExitCode {
    let env = Environment::capture();
    // stdout carries the line to eval, so diagnostics go to stderr.
    env_logger::Builder::new()
        .parse_filters(&Config::log_filter(&env))
        .target(env_logger::Target::Stderr)
        .init();

    let args: Vec<String> = std::env::args_os()
        .skip(1)
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect();

    let mut modm = Modm::new(env);
    // Panics are logged and then reported on the eval line.
    panic::set_hook(Box::new(|info| log::error!("{info}")));
    let failed = match panic::catch_unwind(AssertUnwindSafe(|| modm.run(&args))) {
        Ok(Ok(())) => false,
        Ok(Err(err)) => modm.report_failure(&err),
        Err(_) => {
            modm.report_internal("An unknown error occurred.");
            true
        }
    };

    let mut stdout = std::io::stdout().lock();
    if writeln!(stdout, "{}", modm.drain()).is_err() {
        return ExitCode::FAILURE;
    }
    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
