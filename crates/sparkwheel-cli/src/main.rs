use std::process::ExitCode;

fn main() -> ExitCode {
    sparkwheel_cli::run()
}
