use std::process::ExitCode;

fn main() -> ExitCode {
    studioflow_cli::run()
}
