use fwgrab_core::logging;

mod cli;

use crate::cli::{CliCommand, RunStatus};

fn main() {
    // Initialize logging as early as possible.
    if let Err(err) = logging::init_logging() {
        logging::init_logging_stderr();
        tracing::warn!("log file unavailable, logging to stderr: {:#}", err);
    }

    match CliCommand::run_from_args() {
        Ok(RunStatus::Success) => {}
        Ok(RunStatus::PartialFailure) => std::process::exit(1),
        Err(err) => {
            eprintln!("fwgrab error: {:#}", err);
            std::process::exit(1);
        }
    }
}
