use std::process::ExitCode;

fn main() -> ExitCode {
    lunchly_cli::run()
}
