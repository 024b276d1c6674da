use std::process::ExitCode;

fn main() -> ExitCode {
    rentline_cli::run()
}
