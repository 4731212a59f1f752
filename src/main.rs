use std::process::ExitCode;

use monosplit::ui::output;

fn main() -> ExitCode {
    match monosplit::cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}
