//! paint - a drawing host whose shapes come from extensions

use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = paint::cli::run() {
        eprintln!("Error: {:#}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
