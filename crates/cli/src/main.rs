use std::process::ExitCode;

fn main() -> ExitCode {
    munchbot_cli::run()
}
