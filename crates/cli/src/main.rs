use std::process::ExitCode;

fn main() -> ExitCode {
    asesor_cli::run()
}
