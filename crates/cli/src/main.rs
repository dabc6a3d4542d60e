use std::process::ExitCode;

fn main() -> ExitCode {
    ganvie_cli::run()
}
