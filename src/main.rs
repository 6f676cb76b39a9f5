use std::process::ExitCode;

use assetline::{cli, logging};
use console::style;

fn main() -> ExitCode {
    let args = cli::parse();

    if let Err(err) = logging::init_logging(args.log_level) {
        eprintln!("{} {err:?}", style("error:").red());
        return ExitCode::FAILURE;
    }

    match cli::run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {err}", style("error:").red());
            ExitCode::FAILURE
        }
    }
}
