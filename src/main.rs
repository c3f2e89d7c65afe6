//! AppModel - configuration-model builder and validator
//!
//! Command-line entry point; see [`appmodel::cli`].

use std::process::ExitCode;

fn main() -> ExitCode {
    appmodel::cli::run_cli()
}
